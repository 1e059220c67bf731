//! Topmost-first point lookup over the scene tree.

use novade_core::types::{Point, Rect};

use super::{Layer, NodeKind, NodeOwner, SceneNodeId, SceneTree};

/// Result of [`SceneTree::node_at`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SceneHit {
    pub node: SceneNodeId,
    pub owner: NodeOwner,
    /// Point relative to the hit node's origin.
    pub local: Point,
}

impl SceneTree {
    /// Finds the topmost enabled node under `point`.
    ///
    /// Layers are searched top to bottom and siblings last-to-first, so the first hit
    /// is what the user sees. Surface nodes honour their input region; a point outside
    /// it falls through to whatever lies below.
    pub fn node_at(&self, point: Point) -> Option<SceneHit> {
        Layer::ALL
            .iter()
            .rev()
            .filter(|layer| layer.accepts_input())
            .find_map(|layer| self.hit_node(self.layer(*layer), Point::default(), point))
    }

    fn hit_node(&self, id: SceneNodeId, parent_origin: Point, point: Point) -> Option<SceneHit> {
        let node = self.node(id)?;
        if !node.is_enabled() {
            return None;
        }
        let origin = parent_origin + node.position();

        if let Some(hit) = node
            .children()
            .iter()
            .rev()
            .find_map(|child| self.hit_node(*child, origin, point))
        {
            return Some(hit);
        }

        let local = point - origin;
        let inside = match node.kind() {
            NodeKind::Tree => false,
            NodeKind::Rect { size, .. } => Rect::from_parts(origin, *size).contains_point(point),
            NodeKind::Surface { size, input } => {
                Rect::from_parts(origin, *size).contains_point(point)
                    && input.as_ref().map_or(true, |region| region.contains(local))
            }
        };
        inside.then_some(SceneHit {
            node: id,
            owner: node.owner(),
            local,
        })
    }
}

#[cfg(test)]
mod tests {
    use novade_core::types::{Color, Size};

    use super::*;
    use crate::protocol::Region;

    #[test]
    fn test_topmost_layer_wins() {
        let mut scene = SceneTree::new(32).unwrap();
        let low = scene
            .create_surface(scene.layer(Layer::Tiled), Size::new(100, 100), NodeOwner::None)
            .unwrap();
        let high = scene
            .create_surface(scene.layer(Layer::Top), Size::new(50, 50), NodeOwner::Lock)
            .unwrap();

        let hit = scene.node_at(Point::new(10, 10)).unwrap();
        assert_eq!(hit.node, high);
        assert_eq!(hit.owner, NodeOwner::Lock);

        let hit = scene.node_at(Point::new(70, 70)).unwrap();
        assert_eq!(hit.node, low);
        assert_eq!(hit.local, Point::new(70, 70));
    }

    #[test]
    fn test_disabled_subtree_is_skipped() {
        let mut scene = SceneTree::new(32).unwrap();
        let tree = scene.create_tree(scene.layer(Layer::Floating), NodeOwner::None).unwrap();
        scene.create_rect(tree, Size::new(10, 10), Color::default(), NodeOwner::None).unwrap();
        assert!(scene.node_at(Point::new(1, 1)).is_some());
        scene.set_enabled(tree, false).unwrap();
        assert!(scene.node_at(Point::new(1, 1)).is_none());
    }

    #[test]
    fn test_input_region_lets_input_fall_through() {
        let mut scene = SceneTree::new(32).unwrap();
        let below = scene
            .create_surface(scene.layer(Layer::Tiled), Size::new(100, 100), NodeOwner::None)
            .unwrap();
        let above = scene
            .create_surface(scene.layer(Layer::Floating), Size::new(100, 100), NodeOwner::None)
            .unwrap();
        scene
            .set_input_region(above, Some(Region::new(vec![Rect::new(0, 0, 20, 20)])))
            .unwrap();

        assert_eq!(scene.node_at(Point::new(5, 5)).unwrap().node, above);
        assert_eq!(scene.node_at(Point::new(50, 50)).unwrap().node, below);

        scene.set_input_region(above, Some(Region::default())).unwrap();
        assert_eq!(scene.node_at(Point::new(5, 5)).unwrap().node, below);
    }

    #[test]
    fn test_drag_icons_never_hit() {
        let mut scene = SceneTree::new(32).unwrap();
        scene
            .create_surface(scene.layer(Layer::DragIcon), Size::new(10, 10), NodeOwner::None)
            .unwrap();
        assert!(scene.node_at(Point::new(1, 1)).is_none());
    }
}
