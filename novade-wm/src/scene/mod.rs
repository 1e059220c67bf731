//! The layered scene tree.
//!
//! The root holds one fixed child per [`Layer`], ordered bottom to top. Windows,
//! panels, decorations and the lock surface hang off these layer nodes as subtrees.
//! Node positions are relative to the parent node; a node is drawn only when it and
//! all of its ancestors are enabled.
//!
//! Nodes live in a `slotmap`, so a [`SceneNodeId`] held after its node was destroyed
//! simply fails lookup instead of aliasing a new node.

mod hit_test;

pub use hit_test::SceneHit;

use novade_core::types::{Color, Point, Size};
use slotmap::{new_key_type, SlotMap};
use tracing::trace;

use crate::error::SceneError;
use crate::output::PanelId;
use crate::protocol::Region;
use crate::window::WindowId;

new_key_type! {
    /// Handle to a node of the [`SceneTree`].
    pub struct SceneNodeId;
}

/// Fixed stacking layers, bottom to top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Layer {
    Background,
    Bottom,
    Tiled,
    Floating,
    Fullscreen,
    Top,
    Overlay,
    Lock,
    DragIcon,
}

impl Layer {
    pub const ALL: [Layer; 9] = [
        Layer::Background,
        Layer::Bottom,
        Layer::Tiled,
        Layer::Floating,
        Layer::Fullscreen,
        Layer::Top,
        Layer::Overlay,
        Layer::Lock,
        Layer::DragIcon,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Drag icons follow the pointer and never receive input themselves.
    pub fn accepts_input(self) -> bool {
        self != Layer::DragIcon
    }
}

/// The entity a node belongs to, reported by hit-testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeOwner {
    None,
    Window(WindowId),
    Panel(PanelId),
    Lock,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Pure grouping node.
    Tree,
    /// Solid rectangle, used for borders and title-bar parts.
    Rect { size: Size, color: Color },
    /// Client content. `input` of `None` accepts input everywhere.
    Surface { size: Size, input: Option<Region> },
}

#[derive(Debug, Clone)]
pub struct SceneNode {
    parent: Option<SceneNodeId>,
    children: Vec<SceneNodeId>,
    kind: NodeKind,
    position: Point,
    enabled: bool,
    owner: NodeOwner,
}

impl SceneNode {
    pub fn parent(&self) -> Option<SceneNodeId> {
        self.parent
    }

    /// Bottom to top.
    pub fn children(&self) -> &[SceneNodeId] {
        &self.children
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn owner(&self) -> NodeOwner {
        self.owner
    }
}

#[derive(Debug)]
pub struct SceneTree {
    nodes: SlotMap<SceneNodeId, SceneNode>,
    root: SceneNodeId,
    layers: [SceneNodeId; 9],
    max_nodes: usize,
}

impl SceneTree {
    /// Builds the root and the fixed layer nodes.
    ///
    /// `max_nodes` bounds the total node count, fixed nodes included.
    pub fn new(max_nodes: usize) -> Result<Self, SceneError> {
        let fixed = Layer::ALL.len() + 1;
        if max_nodes < fixed {
            return Err(SceneError::AllocationFailed { capacity: max_nodes });
        }

        let mut nodes = SlotMap::with_capacity_and_key(fixed);
        let root = nodes.insert(SceneNode {
            parent: None,
            children: Vec::with_capacity(Layer::ALL.len()),
            kind: NodeKind::Tree,
            position: Point::default(),
            enabled: true,
            owner: NodeOwner::None,
        });
        let layers = Layer::ALL.map(|_| {
            let id = nodes.insert(SceneNode {
                parent: Some(root),
                children: Vec::new(),
                kind: NodeKind::Tree,
                position: Point::default(),
                enabled: true,
                owner: NodeOwner::None,
            });
            nodes[root].children.push(id);
            id
        });

        Ok(Self {
            nodes,
            root,
            layers,
            max_nodes,
        })
    }

    pub fn root(&self) -> SceneNodeId {
        self.root
    }

    pub fn layer(&self, layer: Layer) -> SceneNodeId {
        self.layers[layer.index()]
    }

    /// The layer a node is attached under, if it is still part of the tree.
    pub fn layer_of(&self, id: SceneNodeId) -> Option<Layer> {
        let mut current = id;
        loop {
            let parent = self.nodes.get(current)?.parent?;
            if parent == self.root {
                return Layer::ALL.into_iter().find(|l| self.layers[l.index()] == current);
            }
            current = parent;
        }
    }

    pub fn node(&self, id: SceneNodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: SceneNodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn max_nodes(&self) -> usize {
        self.max_nodes
    }

    /// Number of live nodes attributed to `owner`.
    pub fn owned_count(&self, owner: NodeOwner) -> usize {
        self.nodes.values().filter(|n| n.owner == owner).count()
    }

    fn insert(
        &mut self,
        parent: SceneNodeId,
        kind: NodeKind,
        owner: NodeOwner,
    ) -> Result<SceneNodeId, SceneError> {
        if !self.nodes.contains_key(parent) {
            return Err(SceneError::StaleNode);
        }
        if self.nodes.len() >= self.max_nodes {
            return Err(SceneError::AllocationFailed {
                capacity: self.max_nodes,
            });
        }
        let id = self.nodes.insert(SceneNode {
            parent: Some(parent),
            children: Vec::new(),
            kind,
            position: Point::default(),
            enabled: true,
            owner,
        });
        self.nodes[parent].children.push(id);
        Ok(id)
    }

    pub fn create_tree(
        &mut self,
        parent: SceneNodeId,
        owner: NodeOwner,
    ) -> Result<SceneNodeId, SceneError> {
        self.insert(parent, NodeKind::Tree, owner)
    }

    pub fn create_rect(
        &mut self,
        parent: SceneNodeId,
        size: Size,
        color: Color,
        owner: NodeOwner,
    ) -> Result<SceneNodeId, SceneError> {
        self.insert(parent, NodeKind::Rect { size, color }, owner)
    }

    pub fn create_surface(
        &mut self,
        parent: SceneNodeId,
        size: Size,
        owner: NodeOwner,
    ) -> Result<SceneNodeId, SceneError> {
        self.insert(parent, NodeKind::Surface { size, input: None }, owner)
    }

    fn node_mut(&mut self, id: SceneNodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::StaleNode)
    }

    /// Returns whether the flag actually changed.
    pub fn set_enabled(&mut self, id: SceneNodeId, enabled: bool) -> Result<bool, SceneError> {
        let node = self.node_mut(id)?;
        let changed = node.enabled != enabled;
        node.enabled = enabled;
        Ok(changed)
    }

    /// The node's own flag; `false` for stale ids.
    pub fn is_enabled(&self, id: SceneNodeId) -> bool {
        self.nodes.get(id).map_or(false, |n| n.enabled)
    }

    /// True when the node and every ancestor are enabled.
    pub fn is_effectively_enabled(&self, id: SceneNodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            match self.nodes.get(node_id) {
                Some(node) if node.enabled => current = node.parent,
                _ => return false,
            }
        }
        true
    }

    pub fn set_position(&mut self, id: SceneNodeId, position: Point) -> Result<(), SceneError> {
        self.node_mut(id)?.position = position;
        Ok(())
    }

    pub fn position(&self, id: SceneNodeId) -> Option<Point> {
        self.nodes.get(id).map(|n| n.position)
    }

    /// Position in layout coordinates.
    pub fn absolute_position(&self, id: SceneNodeId) -> Option<Point> {
        let mut node = self.nodes.get(id)?;
        let mut pos = node.position;
        while let Some(parent) = node.parent {
            node = self.nodes.get(parent)?;
            pos = pos + node.position;
        }
        Some(pos)
    }

    pub fn set_size(&mut self, id: SceneNodeId, new_size: Size) -> Result<(), SceneError> {
        match &mut self.node_mut(id)?.kind {
            NodeKind::Rect { size, .. } | NodeKind::Surface { size, .. } => *size = new_size,
            NodeKind::Tree => {}
        }
        Ok(())
    }

    pub fn set_color(&mut self, id: SceneNodeId, new_color: Color) -> Result<(), SceneError> {
        if let NodeKind::Rect { color, .. } = &mut self.node_mut(id)?.kind {
            *color = new_color;
        }
        Ok(())
    }

    pub fn set_input_region(
        &mut self,
        id: SceneNodeId,
        region: Option<Region>,
    ) -> Result<(), SceneError> {
        if let NodeKind::Surface { input, .. } = &mut self.node_mut(id)?.kind {
            *input = region;
        }
        Ok(())
    }

    fn is_fixed(&self, id: SceneNodeId) -> bool {
        id == self.root || self.layers.contains(&id)
    }

    fn is_ancestor(&self, ancestor: SceneNodeId, node: SceneNodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    fn detach(&mut self, id: SceneNodeId) {
        if let Some(parent) = self.nodes.get(id).and_then(|n| n.parent) {
            if let Some(parent_node) = self.nodes.get_mut(parent) {
                parent_node.children.retain(|c| *c != id);
            }
        }
    }

    /// Moves `id` under `new_parent`, on top of its new siblings.
    pub fn reparent(&mut self, id: SceneNodeId, new_parent: SceneNodeId) -> Result<(), SceneError> {
        if self.is_fixed(id) {
            return Err(SceneError::FixedNode);
        }
        if !self.nodes.contains_key(id) || !self.nodes.contains_key(new_parent) {
            return Err(SceneError::StaleNode);
        }
        if self.is_ancestor(id, new_parent) {
            return Err(SceneError::CyclicReparent);
        }
        if self.nodes[id].parent == Some(new_parent) {
            return Ok(());
        }
        self.detach(id);
        self.nodes[id].parent = Some(new_parent);
        self.nodes[new_parent].children.push(id);
        trace!(?id, ?new_parent, "scene node reparented");
        Ok(())
    }

    pub fn raise_to_top(&mut self, id: SceneNodeId) -> Result<(), SceneError> {
        let parent = self.nodes.get(id).ok_or(SceneError::StaleNode)?.parent;
        let parent = parent.ok_or(SceneError::FixedNode)?;
        let siblings = &mut self.node_mut(parent)?.children;
        siblings.retain(|c| *c != id);
        siblings.push(id);
        Ok(())
    }

    pub fn lower_to_bottom(&mut self, id: SceneNodeId) -> Result<(), SceneError> {
        let parent = self.nodes.get(id).ok_or(SceneError::StaleNode)?.parent;
        let parent = parent.ok_or(SceneError::FixedNode)?;
        let siblings = &mut self.node_mut(parent)?.children;
        siblings.retain(|c| *c != id);
        siblings.insert(0, id);
        Ok(())
    }

    /// Reorders the children of `parent` so the listed nodes end up bottom to top in
    /// the given order, above any unlisted children.
    pub fn restack(&mut self, parent: SceneNodeId, order: &[SceneNodeId]) -> Result<(), SceneError> {
        let children = &mut self.node_mut(parent)?.children;
        let listed: Vec<SceneNodeId> = order.iter().copied().filter(|id| children.contains(id)).collect();
        children.retain(|c| !listed.contains(c));
        children.extend(listed);
        Ok(())
    }

    /// Destroys `id` and its whole subtree. Returns the number of nodes removed.
    pub fn destroy(&mut self, id: SceneNodeId) -> Result<usize, SceneError> {
        if self.is_fixed(id) {
            return Err(SceneError::FixedNode);
        }
        if !self.nodes.contains_key(id) {
            return Err(SceneError::StaleNode);
        }
        self.detach(id);

        let mut removed = 0;
        let mut pending = vec![id];
        while let Some(node_id) = pending.pop() {
            if let Some(node) = self.nodes.remove(node_id) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> SceneTree {
        SceneTree::new(64).expect("scene")
    }

    #[test]
    fn test_layers_are_ordered_under_root() {
        let scene = tree();
        let root_children = scene.node(scene.root()).unwrap().children().to_vec();
        let expected: Vec<_> = Layer::ALL.iter().map(|l| scene.layer(*l)).collect();
        assert_eq!(root_children, expected);
        assert_eq!(scene.len(), 10);
        assert_eq!(scene.layer_of(scene.layer(Layer::Overlay)), Some(Layer::Overlay));
    }

    #[test]
    fn test_too_small_budget_is_rejected() {
        assert_eq!(
            SceneTree::new(5).unwrap_err(),
            SceneError::AllocationFailed { capacity: 5 }
        );
    }

    #[test]
    fn test_allocation_failure_when_budget_exhausted() {
        let mut scene = SceneTree::new(11).unwrap();
        let parent = scene.layer(Layer::Tiled);
        scene.create_tree(parent, NodeOwner::None).unwrap();
        let err = scene.create_tree(parent, NodeOwner::None).unwrap_err();
        assert_eq!(err, SceneError::AllocationFailed { capacity: 11 });
    }

    #[test]
    fn test_effective_enable_follows_ancestors() {
        let mut scene = tree();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        let child = scene.create_surface(parent, Size::new(10, 10), NodeOwner::None).unwrap();
        assert!(scene.is_effectively_enabled(child));

        assert!(scene.set_enabled(parent, false).unwrap());
        assert!(!scene.set_enabled(parent, false).unwrap(), "second disable is a no-op");
        assert!(scene.is_enabled(child));
        assert!(!scene.is_effectively_enabled(child));
    }

    #[test]
    fn test_absolute_position_accumulates() {
        let mut scene = tree();
        let parent = scene.create_tree(scene.layer(Layer::Floating), NodeOwner::None).unwrap();
        let child = scene.create_rect(parent, Size::new(4, 4), Color::default(), NodeOwner::None).unwrap();
        scene.set_position(parent, Point::new(100, 50)).unwrap();
        scene.set_position(child, Point::new(2, 3)).unwrap();
        assert_eq!(scene.absolute_position(child), Some(Point::new(102, 53)));
        assert_eq!(scene.layer_of(child), Some(Layer::Floating));
    }

    #[test]
    fn test_reparent_moves_between_layers() {
        let mut scene = tree();
        let node = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        scene.reparent(node, scene.layer(Layer::Fullscreen)).unwrap();
        assert_eq!(scene.layer_of(node), Some(Layer::Fullscreen));
        assert!(scene.node(scene.layer(Layer::Tiled)).unwrap().children().is_empty());
    }

    #[test]
    fn test_reparent_rejects_cycles_and_fixed_nodes() {
        let mut scene = tree();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        let child = scene.create_tree(parent, NodeOwner::None).unwrap();
        assert_eq!(scene.reparent(parent, child), Err(SceneError::CyclicReparent));
        assert_eq!(
            scene.reparent(scene.layer(Layer::Top), parent),
            Err(SceneError::FixedNode)
        );
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut scene = tree();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        let child = scene.create_tree(parent, NodeOwner::None).unwrap();
        scene.create_rect(child, Size::new(1, 1), Color::default(), NodeOwner::None).unwrap();

        assert_eq!(scene.destroy(parent), Ok(3));
        assert!(!scene.contains(child));
        assert_eq!(scene.len(), 10);
        assert_eq!(scene.destroy(parent), Err(SceneError::StaleNode));
        assert_eq!(scene.destroy(scene.root()), Err(SceneError::FixedNode));
    }

    #[test]
    fn test_restack_orders_listed_children() {
        let mut scene = tree();
        let layer = scene.layer(Layer::Tiled);
        let a = scene.create_tree(layer, NodeOwner::None).unwrap();
        let b = scene.create_tree(layer, NodeOwner::None).unwrap();
        let c = scene.create_tree(layer, NodeOwner::None).unwrap();

        scene.restack(layer, &[c, a]).unwrap();
        assert_eq!(scene.node(layer).unwrap().children(), &[b, c, a]);

        scene.lower_to_bottom(a).unwrap();
        scene.raise_to_top(b).unwrap();
        assert_eq!(scene.node(layer).unwrap().children(), &[a, c, b]);
    }
}
