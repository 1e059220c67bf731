//! Server-side decorations: four border rectangles plus an optional four-part title bar.

use novade_core::types::{Color, Point, Size};

use crate::error::SceneError;
use crate::scene::{NodeOwner, SceneNodeId, SceneTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecorationPart {
    BorderTop,
    BorderBottom,
    BorderLeft,
    BorderRight,
    TitleBackground,
    Title,
    MaximizeButton,
    CloseButton,
}

const BORDER_PARTS: [DecorationPart; 4] = [
    DecorationPart::BorderTop,
    DecorationPart::BorderBottom,
    DecorationPart::BorderLeft,
    DecorationPart::BorderRight,
];

const TITLEBAR_PARTS: [DecorationPart; 4] = [
    DecorationPart::TitleBackground,
    DecorationPart::Title,
    DecorationPart::MaximizeButton,
    DecorationPart::CloseButton,
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decorations {
    borders: [SceneNodeId; 4],
    titlebar: Option<[SceneNodeId; 4]>,
}

impl Decorations {
    /// Creates the decoration nodes under `parent`. On failure every node created so
    /// far is destroyed again.
    pub(crate) fn build(
        scene: &mut SceneTree,
        parent: SceneNodeId,
        owner: NodeOwner,
        color: Color,
        with_titlebar: bool,
    ) -> Result<Self, SceneError> {
        let wanted = if with_titlebar { 8 } else { 4 };
        let mut created = Vec::with_capacity(wanted);
        for _ in 0..wanted {
            match scene.create_rect(parent, Size::default(), color, owner) {
                Ok(node) => created.push(node),
                Err(err) => {
                    for node in created {
                        let _ = scene.destroy(node);
                    }
                    return Err(err);
                }
            }
        }
        let borders = [created[0], created[1], created[2], created[3]];
        let titlebar = with_titlebar.then(|| [created[4], created[5], created[6], created[7]]);
        Ok(Self { borders, titlebar })
    }

    pub fn nodes(&self) -> impl Iterator<Item = SceneNodeId> + '_ {
        self.borders.iter().chain(self.titlebar.iter().flatten()).copied()
    }

    pub fn has_titlebar(&self) -> bool {
        self.titlebar.is_some()
    }

    pub fn part_of(&self, node: SceneNodeId) -> Option<DecorationPart> {
        if let Some(i) = self.borders.iter().position(|n| *n == node) {
            return Some(BORDER_PARTS[i]);
        }
        let titlebar = self.titlebar.as_ref()?;
        titlebar.iter().position(|n| *n == node).map(|i| TITLEBAR_PARTS[i])
    }

    /// Positions the parts around an outer frame of `size`, relative to the window
    /// tree. `visible` is false for fullscreen windows.
    pub(crate) fn layout(
        &self,
        scene: &mut SceneTree,
        size: Size,
        border: i32,
        titlebar: i32,
        visible: bool,
    ) -> Result<(), SceneError> {
        let (w, h) = (size.width, size.height);
        let rects = [
            (Point::new(0, 0), Size::new(w, border)),
            (Point::new(0, h - border), Size::new(w, border)),
            (Point::new(0, border), Size::new(border, h - 2 * border)),
            (Point::new(w - border, border), Size::new(border, h - 2 * border)),
        ];
        for (node, (pos, size)) in self.borders.iter().zip(rects) {
            scene.set_position(*node, pos)?;
            scene.set_size(*node, clamp(size))?;
            scene.set_enabled(*node, visible && border > 0)?;
        }

        if let Some(parts) = &self.titlebar {
            let inner = w - 2 * border;
            let rects = [
                (Point::new(border, border), Size::new(inner, titlebar)),
                (Point::new(border, border), Size::new(inner - 2 * titlebar, titlebar)),
                (Point::new(w - border - 2 * titlebar, border), Size::new(titlebar, titlebar)),
                (Point::new(w - border - titlebar, border), Size::new(titlebar, titlebar)),
            ];
            for (node, (pos, size)) in parts.iter().zip(rects) {
                scene.set_position(*node, pos)?;
                scene.set_size(*node, clamp(size))?;
                scene.set_enabled(*node, visible && titlebar > 0)?;
            }
        }
        Ok(())
    }

    pub(crate) fn set_color(&self, scene: &mut SceneTree, color: Color) -> Result<(), SceneError> {
        for node in self.borders {
            scene.set_color(node, color)?;
        }
        if let Some(parts) = &self.titlebar {
            scene.set_color(parts[0], color)?;
        }
        Ok(())
    }
}

fn clamp(size: Size) -> Size {
    Size::new(size.width.max(0), size.height.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SceneError;
    use crate::scene::{Layer, NodeKind};

    #[test]
    fn test_build_with_titlebar_creates_eight_parts() {
        let mut scene = SceneTree::new(64).unwrap();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::Lock).unwrap();
        let deco = Decorations::build(&mut scene, parent, NodeOwner::Lock, Color::default(), true).unwrap();
        assert_eq!(deco.nodes().count(), 8);
        assert!(deco.has_titlebar());
    }

    #[test]
    fn test_build_rolls_back_on_allocation_failure() {
        let mut scene = SceneTree::new(14).unwrap();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        let err = Decorations::build(&mut scene, parent, NodeOwner::None, Color::default(), false).unwrap_err();
        assert_eq!(err, SceneError::AllocationFailed { capacity: 14 });
        assert_eq!(scene.len(), 11, "partial decorations must be destroyed");
    }

    #[test]
    fn test_layout_places_borders_and_buttons() {
        let mut scene = SceneTree::new(64).unwrap();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        let deco = Decorations::build(&mut scene, parent, NodeOwner::None, Color::default(), true).unwrap();
        deco.layout(&mut scene, Size::new(104, 124), 2, 20, true).unwrap();

        let nodes: Vec<_> = deco.nodes().collect();
        assert_eq!(scene.position(nodes[1]), Some(Point::new(0, 122)));
        assert_eq!(scene.position(nodes[3]), Some(Point::new(102, 2)));
        assert_eq!(scene.position(nodes[7]), Some(Point::new(82, 2)));
        assert_eq!(deco.part_of(nodes[7]), Some(DecorationPart::CloseButton));
        match scene.node(nodes[2]).unwrap().kind() {
            NodeKind::Rect { size, .. } => assert_eq!(*size, Size::new(2, 120)),
            other => panic!("unexpected node kind {other:?}"),
        }
    }

    #[test]
    fn test_hidden_layout_disables_parts() {
        let mut scene = SceneTree::new(64).unwrap();
        let parent = scene.create_tree(scene.layer(Layer::Tiled), NodeOwner::None).unwrap();
        let deco = Decorations::build(&mut scene, parent, NodeOwner::None, Color::default(), false).unwrap();
        deco.layout(&mut scene, Size::new(50, 50), 1, 0, false).unwrap();
        assert!(deco.nodes().all(|n| !scene.is_enabled(n)));
    }
}
