//! Panels: layer surfaces anchored to an output edge.
//!
//! Panels live in the four panel layers (background, bottom, top, overlay) under
//! their output's panel subtree. Exclusive panels shrink the output's usable area.

use bitflags::bitflags;
use novade_core::types::{Point, Rect, Size};
use slotmap::new_key_type;
use tracing::{debug, warn};

use super::OutputId;
use crate::compositor::{Compositor, SurfaceTarget};
use crate::diagnostics::DiagnosticSource;
use crate::error::OutputError;
use crate::protocol::SurfaceHandle;
use crate::scene::{Layer, NodeOwner, SceneNodeId};

new_key_type! {
    pub struct PanelId;
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Anchor: u8 {
        const TOP = 1;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelLayer {
    Background,
    Bottom,
    Top,
    Overlay,
}

impl PanelLayer {
    /// Arrangement order: panels closer to the user claim space first.
    pub const ARRANGE_ORDER: [PanelLayer; 4] = [
        PanelLayer::Overlay,
        PanelLayer::Top,
        PanelLayer::Bottom,
        PanelLayer::Background,
    ];

    pub fn scene_layer(self) -> Layer {
        match self {
            PanelLayer::Background => Layer::Background,
            PanelLayer::Bottom => Layer::Bottom,
            PanelLayer::Top => Layer::Top,
            PanelLayer::Overlay => Layer::Overlay,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            PanelLayer::Background => 0,
            PanelLayer::Bottom => 1,
            PanelLayer::Top => 2,
            PanelLayer::Overlay => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Margins {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelDescriptor {
    pub namespace: String,
    pub layer: PanelLayer,
    pub anchor: Anchor,
    /// Positive: reserve that many pixels. Zero: respect others' zones. `-1`: ignore them.
    pub exclusive_zone: i32,
    pub margin: Margins,
    /// Zero on an axis stretches across both anchored edges.
    pub size: Size,
    pub keyboard_interactive: bool,
}

impl PanelDescriptor {
    pub fn new(namespace: impl Into<String>, layer: PanelLayer) -> Self {
        Self {
            namespace: namespace.into(),
            layer,
            anchor: Anchor::empty(),
            exclusive_zone: 0,
            margin: Margins::default(),
            size: Size::default(),
            keyboard_interactive: false,
        }
    }

    pub fn anchored(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn exclusive(mut self, zone: i32) -> Self {
        self.exclusive_zone = zone;
        self
    }

    pub fn sized(mut self, size: Size) -> Self {
        self.size = size;
        self
    }

    pub fn with_margin(mut self, margin: Margins) -> Self {
        self.margin = margin;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.keyboard_interactive = true;
        self
    }
}

#[derive(Debug)]
pub struct Panel {
    pub(crate) id: PanelId,
    pub(crate) output: OutputId,
    pub(crate) descriptor: PanelDescriptor,
    pub(crate) geometry: Rect,
    pub(crate) mapped: bool,
    pub(crate) node: Option<SceneNodeId>,
    pub(crate) surface: Box<dyn SurfaceHandle>,
    pub(crate) configured: Option<Size>,
}

impl Panel {
    pub fn id(&self) -> PanelId {
        self.id
    }

    pub fn output(&self) -> OutputId {
        self.output
    }

    pub fn descriptor(&self) -> &PanelDescriptor {
        &self.descriptor
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
    Top,
    Bottom,
    Left,
    Right,
}

fn exclusive_edge(anchor: Anchor) -> Option<Edge> {
    let horizontal = Anchor::LEFT | Anchor::RIGHT;
    let vertical = Anchor::TOP | Anchor::BOTTOM;
    if anchor == Anchor::TOP || anchor == Anchor::TOP | horizontal {
        Some(Edge::Top)
    } else if anchor == Anchor::BOTTOM || anchor == Anchor::BOTTOM | horizontal {
        Some(Edge::Bottom)
    } else if anchor == Anchor::LEFT || anchor == Anchor::LEFT | vertical {
        Some(Edge::Left)
    } else if anchor == Anchor::RIGHT || anchor == Anchor::RIGHT | vertical {
        Some(Edge::Right)
    } else {
        None
    }
}

fn place(bounds: Rect, desc: &PanelDescriptor) -> Rect {
    let a = desc.anchor;
    let m = desc.margin;

    let both_h = a.contains(Anchor::LEFT | Anchor::RIGHT);
    let both_v = a.contains(Anchor::TOP | Anchor::BOTTOM);

    let mut width = desc.size.width;
    if width == 0 && both_h {
        width = bounds.width - m.left - m.right;
    }
    let mut height = desc.size.height;
    if height == 0 && both_v {
        height = bounds.height - m.top - m.bottom;
    }
    let width = width.max(0);
    let height = height.max(0);

    let x = if both_h && desc.size.width == 0 {
        bounds.x + m.left
    } else if a.contains(Anchor::LEFT) && !a.contains(Anchor::RIGHT) {
        bounds.x + m.left
    } else if a.contains(Anchor::RIGHT) && !a.contains(Anchor::LEFT) {
        bounds.right() - width - m.right
    } else {
        bounds.x + (bounds.width - width) / 2
    };
    let y = if both_v && desc.size.height == 0 {
        bounds.y + m.top
    } else if a.contains(Anchor::TOP) && !a.contains(Anchor::BOTTOM) {
        bounds.y + m.top
    } else if a.contains(Anchor::BOTTOM) && !a.contains(Anchor::TOP) {
        bounds.bottom() - height - m.bottom
    } else {
        bounds.y + (bounds.height - height) / 2
    };
    Rect::new(x, y, width, height)
}

fn claim(usable: &mut Rect, desc: &PanelDescriptor) {
    let zone = desc.exclusive_zone;
    let m = desc.margin;
    match exclusive_edge(desc.anchor) {
        Some(Edge::Top) => {
            let d = zone + m.top;
            usable.y += d;
            usable.height -= d;
        }
        Some(Edge::Bottom) => usable.height -= zone + m.bottom,
        Some(Edge::Left) => {
            let d = zone + m.left;
            usable.x += d;
            usable.width -= d;
        }
        Some(Edge::Right) => usable.width -= zone + m.right,
        None => {}
    }
    usable.width = usable.width.max(0);
    usable.height = usable.height.max(0);
}

/// Lays out the panels of one output and returns its usable area.
///
/// Exclusive panels are placed first and claim their zones; the remaining panels are
/// placed inside what is left (or the full output for a zone of `-1`).
pub fn arrange_panels<'a>(output: Rect, panels: impl IntoIterator<Item = &'a mut Panel>) -> Rect {
    let mut panels: Vec<&mut Panel> = panels.into_iter().collect();
    let mut usable = output;

    for exclusive_pass in [true, false] {
        for layer in PanelLayer::ARRANGE_ORDER {
            for panel in panels.iter_mut() {
                let desc = &panel.descriptor;
                if desc.layer != layer || (desc.exclusive_zone > 0) != exclusive_pass {
                    continue;
                }
                let bounds = if desc.exclusive_zone < 0 { output } else { usable };
                panel.geometry = place(bounds, desc);
                if exclusive_pass && panel.mapped {
                    claim(&mut usable, &panel.descriptor);
                }
            }
        }
    }
    usable
}

impl Compositor {
    /// Registers a panel surface on `output` (or the active output).
    pub fn create_panel(
        &mut self,
        output: Option<OutputId>,
        descriptor: PanelDescriptor,
        mut surface: Box<dyn SurfaceHandle>,
    ) -> Result<PanelId, OutputError> {
        let target = output
            .filter(|id| self.outputs.get(*id).map_or(false, |o| o.enabled))
            .or_else(|| self.outputs.default_target());
        let Some(target) = target else {
            surface.close();
            return Err(OutputError::UnknownName(descriptor.namespace));
        };

        let id = self.panels.insert_with_key(|id| Panel {
            id,
            output: target,
            descriptor,
            geometry: Rect::default(),
            mapped: false,
            node: None,
            surface,
            configured: None,
        });
        if let Some(out) = self.outputs.get_mut(target) {
            out.panels.push(id);
            out.needs_arrange = true;
        }
        debug!(panel = ?id, output = ?target, "panel created");
        Ok(id)
    }

    pub fn map_panel(&mut self, id: PanelId) -> Result<(), OutputError> {
        let Some(panel) = self.panels.get(id) else {
            return Ok(());
        };
        if panel.mapped {
            return Ok(());
        }
        let output = panel.output;
        let layer = panel.descriptor.layer;
        let parent = self
            .outputs
            .get(output)
            .and_then(|o| o.scene.as_ref())
            .map(|s| s.panel_trees[layer.index()])
            .ok_or(OutputError::NotFound(output))?;

        let node = match self.scene.create_surface(parent, Size::default(), NodeOwner::Panel(id)) {
            Ok(node) => node,
            Err(source) => {
                let name = self.outputs.get(output).map(|o| o.name.clone()).unwrap_or_default();
                self.diagnostics.record(
                    DiagnosticSource::Output,
                    format!("panel on '{name}' could not be mapped: {source}"),
                );
                return Err(OutputError::Scene { name, source });
            }
        };

        let mut takes_keyboard = false;
        if let Some(panel) = self.panels.get_mut(id) {
            panel.node = Some(node);
            panel.mapped = true;
            takes_keyboard = panel.descriptor.keyboard_interactive
                && matches!(panel.descriptor.layer, PanelLayer::Top | PanelLayer::Overlay)
                && self.focus.panel_keyboard.is_none();
        }
        if takes_keyboard && self.lock.is_none() {
            if let Some(window) = self.focus.focused.and_then(|w| self.windows.get_mut(w)) {
                window.surface.keyboard_leave();
            }
            if let Some(panel) = self.panels.get_mut(id) {
                panel.surface.keyboard_enter();
            }
        }
        if takes_keyboard {
            self.focus.panel_keyboard = Some(id);
        }
        if let Some(out) = self.outputs.get_mut(output) {
            out.needs_arrange = true;
        }
        Ok(())
    }

    pub fn unmap_panel(&mut self, id: PanelId) {
        let Some(panel) = self.panels.get_mut(id) else {
            return;
        };
        if !panel.mapped {
            return;
        }
        panel.mapped = false;
        if let Some(node) = panel.node.take() {
            if let Err(err) = self.scene.destroy(node) {
                warn!(panel = ?id, %err, "panel scene node already gone");
            }
        }
        let released_keyboard = self.focus.panel_keyboard == Some(id);
        if released_keyboard {
            self.focus.panel_keyboard = None;
            panel.surface.keyboard_leave();
        }
        let output = panel.output;
        if let Some(out) = self.outputs.get_mut(output) {
            out.needs_arrange = true;
        }
        if released_keyboard {
            self.restore_keyboard_focus();
        }
    }

    pub fn destroy_panel(&mut self, id: PanelId) {
        self.unmap_panel(id);
        let Some(panel) = self.panels.remove(id) else {
            return;
        };
        if let Some(out) = self.outputs.get_mut(panel.output) {
            out.panels.retain(|p| *p != id);
            out.needs_arrange = true;
        }
        self.surfaces.retain(|_, target| *target != SurfaceTarget::Panel(id));
        debug!(panel = ?id, "panel destroyed");
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(id)
    }

    /// Re-lays out the panels of `output`, updates its usable area and positions the
    /// panel scene nodes. Returns whether the usable area changed.
    pub(crate) fn arrange_output_panels(&mut self, output: OutputId) -> bool {
        let Some(out) = self.outputs.get(output) else {
            return false;
        };
        let geometry = out.geometry();
        let old_usable = out.usable_area;
        let ids = out.panels.clone();

        let usable = arrange_panels(
            geometry,
            self.panels.iter_mut().filter(|(id, _)| ids.contains(id)).map(|(_, p)| p),
        );

        for id in ids {
            let Some(panel) = self.panels.get_mut(id) else {
                continue;
            };
            if let Some(node) = panel.node {
                let _ = self.scene.set_position(node, Point::new(panel.geometry.x, panel.geometry.y));
                let _ = self.scene.set_size(node, panel.geometry.size());
                let _ = self.scene.set_input_region(node, panel.surface.input_region());
            }
            if panel.configured != Some(panel.geometry.size()) {
                panel.surface.send_configure(panel.geometry.size());
                panel.configured = Some(panel.geometry.size());
            }
        }

        if let Some(out) = self.outputs.get_mut(output) {
            out.usable_area = usable;
        }
        usable != old_usable
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessSurface;

    fn panel(desc: PanelDescriptor) -> Panel {
        Panel {
            id: PanelId::default(),
            output: OutputId::default(),
            descriptor: desc,
            geometry: Rect::default(),
            mapped: true,
            node: None,
            surface: Box::new(HeadlessSurface::new("panel")),
            configured: None,
        }
    }

    #[test]
    fn test_top_bar_claims_exclusive_zone() {
        let mut bar = panel(
            PanelDescriptor::new("bar", PanelLayer::Top)
                .anchored(Anchor::TOP | Anchor::LEFT | Anchor::RIGHT)
                .sized(Size::new(0, 30))
                .exclusive(30),
        );
        let usable = arrange_panels(Rect::new(0, 0, 1920, 1080), [&mut bar]);
        assert_eq!(bar.geometry(), Rect::new(0, 0, 1920, 30));
        assert_eq!(usable, Rect::new(0, 30, 1920, 1050));
    }

    #[test]
    fn test_non_exclusive_panel_respects_claimed_space() {
        let mut bar = panel(
            PanelDescriptor::new("bar", PanelLayer::Top)
                .anchored(Anchor::TOP | Anchor::LEFT | Anchor::RIGHT)
                .sized(Size::new(0, 30))
                .exclusive(30),
        );
        let mut notification = panel(
            PanelDescriptor::new("notify", PanelLayer::Overlay)
                .anchored(Anchor::TOP | Anchor::RIGHT)
                .sized(Size::new(300, 100))
                .with_margin(Margins { top: 5, right: 5, ..Margins::default() }),
        );
        let usable = arrange_panels(Rect::new(0, 0, 1920, 1080), [&mut bar, &mut notification]);
        assert_eq!(notification.geometry(), Rect::new(1615, 35, 300, 100));
        assert_eq!(usable, Rect::new(0, 30, 1920, 1050));
    }

    #[test]
    fn test_unmapped_panel_claims_nothing() {
        let mut dock = panel(
            PanelDescriptor::new("dock", PanelLayer::Bottom)
                .anchored(Anchor::LEFT)
                .sized(Size::new(64, 0))
                .exclusive(64),
        );
        dock.mapped = false;
        let usable = arrange_panels(Rect::new(0, 0, 800, 600), [&mut dock]);
        assert_eq!(usable, Rect::new(0, 0, 800, 600));
    }

    #[test]
    fn test_left_and_bottom_zones_stack() {
        let mut dock = panel(
            PanelDescriptor::new("dock", PanelLayer::Bottom)
                .anchored(Anchor::LEFT | Anchor::TOP | Anchor::BOTTOM)
                .sized(Size::new(64, 0))
                .exclusive(64),
        );
        let mut bar = panel(
            PanelDescriptor::new("bar", PanelLayer::Top)
                .anchored(Anchor::BOTTOM)
                .sized(Size::new(200, 20))
                .exclusive(20),
        );
        let usable = arrange_panels(Rect::new(100, 0, 800, 600), [&mut dock, &mut bar]);
        assert_eq!(bar.geometry(), Rect::new(400, 580, 200, 20));
        assert_eq!(dock.geometry(), Rect::new(100, 0, 64, 580));
        assert_eq!(usable, Rect::new(164, 0, 736, 580));
    }
}
