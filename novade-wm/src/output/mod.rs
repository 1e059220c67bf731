//! Physical outputs and their place in the shared layout.
//!
//! An [`Output`] is one display: a mode, a scale, a position inside the layout
//! space, the area left over after panels claimed their exclusive zones, and the set
//! of workspace tags it currently shows.

mod hotplug;
mod layout;
mod panel;

pub use hotplug::OutputChange;
pub use layout::OutputLayout;
pub use panel::{arrange_panels, Anchor, Margins, Panel, PanelDescriptor, PanelId, PanelLayer};

use novade_core::types::{Point, Rect, Size};
use serde::Serialize;
use slotmap::new_key_type;

use crate::scene::SceneNodeId;
use crate::tags::Tags;

new_key_type! {
    /// Handle to an [`Output`] in the [`OutputLayout`].
    pub struct OutputId;
}

/// What a backend reports when a display appears.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputDescriptor {
    pub name: String,
    /// Mode in physical pixels.
    pub mode: Size,
    pub scale: f64,
    /// `None` places the output to the right of the current layout.
    pub position: Option<Point>,
    pub enabled: bool,
}

impl OutputDescriptor {
    pub fn new(name: impl Into<String>, mode: Size) -> Self {
        Self {
            name: name.into(),
            mode,
            scale: 1.0,
            position: None,
            enabled: true,
        }
    }

    pub fn at(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

#[derive(Debug)]
pub struct Output {
    pub(crate) id: OutputId,
    pub(crate) name: String,
    pub(crate) mode: Size,
    pub(crate) scale: f64,
    pub(crate) position: Point,
    pub(crate) enabled: bool,
    pub(crate) usable_area: Rect,
    pub(crate) active_tags: Tags,
    pub(crate) previous_tags: Tags,
    pub(crate) panels: Vec<PanelId>,
    pub(crate) needs_arrange: bool,
    pub(crate) scene: Option<OutputScene>,
}

/// Per-output panel subtrees, one under each panel layer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OutputScene {
    pub(crate) panel_trees: [SceneNodeId; 4],
}

impl Output {
    pub(crate) fn new(id: OutputId, desc: &OutputDescriptor, position: Point, tags: Tags) -> Self {
        let mut output = Self {
            id,
            name: desc.name.clone(),
            mode: desc.mode,
            scale: if desc.scale > 0.0 { desc.scale } else { 1.0 },
            position,
            enabled: desc.enabled,
            usable_area: Rect::default(),
            active_tags: tags,
            previous_tags: tags,
            panels: Vec::new(),
            needs_arrange: true,
            scene: None,
        };
        output.usable_area = output.geometry();
        output
    }

    pub fn id(&self) -> OutputId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mode(&self) -> Size {
        self.mode
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Logical size: the mode divided by the scale.
    pub fn logical_size(&self) -> Size {
        Size::new(
            (self.mode.width as f64 / self.scale).round() as i32,
            (self.mode.height as f64 / self.scale).round() as i32,
        )
    }

    /// Full extent in layout coordinates.
    pub fn geometry(&self) -> Rect {
        Rect::from_parts(self.position, self.logical_size())
    }

    /// Geometry minus panel exclusive zones.
    pub fn usable_area(&self) -> Rect {
        self.usable_area
    }

    pub fn active_tags(&self) -> Tags {
        self.active_tags
    }

    pub fn panels(&self) -> &[PanelId] {
        &self.panels
    }

    pub fn info(&self) -> OutputInfo {
        OutputInfo {
            id: self.id,
            name: self.name.clone(),
            geometry: self.geometry(),
            usable_area: self.usable_area,
            scale: self.scale,
            enabled: self.enabled,
            active_tags: self.active_tags,
        }
    }
}

/// Read-only snapshot handed to the policy engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputInfo {
    pub id: OutputId,
    pub name: String,
    pub geometry: Rect,
    pub usable_area: Rect,
    pub scale: f64,
    pub enabled: bool,
    pub active_tags: Tags,
}
