//! Managed application windows.
//!
//! A [`Window`] walks `Created → InitialCommit → Mapped → (Resizing ⇄ Mapped) →
//! Unmapped → Destroyed`. Its scene subtree (content node plus decorations) exists
//! only while mapped and is owned exclusively by the window. Handlers never apply
//! geometry, borders or visibility directly; they set [`PendingChanges`] that the
//! refresh pass drains.

pub mod configure;
pub mod decoration;
mod lifecycle;
pub mod properties;
mod state;

pub use configure::{ConfigureState, PendingConfigure};
pub use decoration::{DecorationPart, Decorations};
pub use properties::{PropertyFallback, PropertyValue, WindowProperty};

use bitflags::bitflags;
use novade_core::types::{Point, Rect, Size};
use serde::Serialize;
use slotmap::new_key_type;

use crate::output::OutputId;
use crate::protocol::{DecorationMode, SizeHints, SurfaceHandle};
use crate::scene::SceneNodeId;
use crate::tags::Tags;

new_key_type! {
    /// Handle to a [`Window`] in the compositor registry.
    pub struct WindowId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WindowState {
    Created,
    InitialCommit,
    Mapped,
    Resizing,
    Unmapped,
    Destroyed,
}

bitflags! {
    /// User- and client-visible window state flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WindowFlags: u8 {
        const HIDDEN = 1;
        const MINIMIZED = 1 << 1;
        const URGENT = 1 << 2;
        const FULLSCREEN = 1 << 3;
        const MAXIMIZED = 1 << 4;
    }
}

bitflags! {
    /// Per-window dirty flags drained by the refresh pass.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PendingChanges: u8 {
        const GEOMETRY = 1;
        const BORDER = 1 << 1;
        const VISIBILITY = 1 << 2;
        const FOCUS = 1 << 3;
    }
}

/// The scene nodes owned by a mapped window.
#[derive(Debug, Clone)]
pub struct WindowScene {
    pub(crate) tree: SceneNodeId,
    pub(crate) content: SceneNodeId,
    pub(crate) decorations: Decorations,
}

impl WindowScene {
    pub fn tree(&self) -> SceneNodeId {
        self.tree
    }

    pub fn content(&self) -> SceneNodeId {
        self.content
    }

    pub fn decorations(&self) -> &Decorations {
        &self.decorations
    }
}

/// Border and title-bar thickness around the client content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Frame {
    pub border: i32,
    pub titlebar: i32,
}

impl Frame {
    pub fn content_offset(&self) -> Point {
        Point::new(self.border, self.border + self.titlebar)
    }

    pub fn content_size(&self, outer: Size) -> Size {
        Size::new(
            (outer.width - 2 * self.border).max(1),
            (outer.height - 2 * self.border - self.titlebar).max(1),
        )
    }

    pub fn outer_size(&self, content: Size) -> Size {
        Size::new(
            content.width + 2 * self.border,
            content.height + 2 * self.border + self.titlebar,
        )
    }
}

#[derive(Debug)]
pub struct Window {
    pub(crate) id: WindowId,
    pub(crate) surface: Box<dyn SurfaceHandle>,
    pub(crate) state: WindowState,
    pub(crate) managed: bool,
    /// Outer frame geometry in layout coordinates, decorations included.
    pub(crate) geometry: Rect,
    /// Geometry to restore when leaving fullscreen or maximized.
    pub(crate) prev_geometry: Rect,
    pub(crate) committed_size: Size,
    pub(crate) flags: WindowFlags,
    /// Flags last announced to the client and to observers.
    pub(crate) reported_flags: WindowFlags,
    pub(crate) floating: bool,
    pub(crate) output: Option<OutputId>,
    pub(crate) tags: Tags,
    pub(crate) banned: bool,
    pub(crate) suspended: bool,
    pub(crate) activated: bool,
    pub(crate) scene: Option<WindowScene>,
    pub(crate) configure: ConfigureState,
    pub(crate) pending: PendingChanges,
    pub(crate) initial_configured: bool,
    pub(crate) size_hints: SizeHints,
    pub(crate) decoration_mode: DecorationMode,
    pub(crate) frame: Frame,
    pub(crate) app_id: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) pid: Option<u32>,
}

impl Window {
    pub(crate) fn new(id: WindowId, surface: Box<dyn SurfaceHandle>) -> Self {
        let app_id = surface.app_id();
        let title = surface.title();
        let pid = surface.pid();
        Self {
            id,
            surface,
            state: WindowState::Created,
            managed: false,
            geometry: Rect::default(),
            prev_geometry: Rect::default(),
            committed_size: Size::default(),
            flags: WindowFlags::empty(),
            reported_flags: WindowFlags::empty(),
            floating: false,
            output: None,
            tags: Tags::EMPTY,
            banned: true,
            suspended: false,
            activated: false,
            scene: None,
            configure: ConfigureState::default(),
            pending: PendingChanges::empty(),
            initial_configured: false,
            size_hints: SizeHints::default(),
            decoration_mode: DecorationMode::ServerSide,
            frame: Frame::default(),
            app_id,
            title,
            pid,
        }
    }

    pub fn id(&self) -> WindowId {
        self.id
    }

    pub fn state(&self) -> WindowState {
        self.state
    }

    /// Mapped or in the middle of a resize handshake.
    pub fn is_mapped(&self) -> bool {
        matches!(self.state, WindowState::Mapped | WindowState::Resizing)
    }

    pub fn is_managed(&self) -> bool {
        self.managed
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn prev_geometry(&self) -> Rect {
        self.prev_geometry
    }

    /// Geometry of the client content inside the frame.
    pub fn content_geometry(&self) -> Rect {
        Rect::from_parts(
            self.geometry.origin() + self.effective_frame().content_offset(),
            self.effective_frame().content_size(self.geometry.size()),
        )
    }

    /// Fullscreen windows are drawn without decorations.
    pub fn effective_frame(&self) -> Frame {
        if self.flags.contains(WindowFlags::FULLSCREEN) {
            Frame::default()
        } else {
            self.frame
        }
    }

    pub fn flags(&self) -> WindowFlags {
        self.flags
    }

    pub fn reported_flags(&self) -> WindowFlags {
        self.reported_flags
    }

    pub fn is_floating(&self) -> bool {
        self.floating
    }

    pub fn is_fullscreen(&self) -> bool {
        self.flags.contains(WindowFlags::FULLSCREEN)
    }

    pub fn output(&self) -> Option<OutputId> {
        self.output
    }

    pub fn tags(&self) -> Tags {
        self.tags
    }

    pub fn is_banned(&self) -> bool {
        self.banned
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn scene(&self) -> Option<&WindowScene> {
        self.scene.as_ref()
    }

    pub fn configure_state(&self) -> &ConfigureState {
        &self.configure
    }

    pub fn pending(&self) -> PendingChanges {
        self.pending
    }

    pub fn decoration_mode(&self) -> DecorationMode {
        self.decoration_mode
    }

    pub fn app_id(&self) -> Option<&str> {
        self.app_id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Visibility as the flags and tags say it should be, before banning applies it.
    pub(crate) fn computed_visible(&self, active_tags: Option<Tags>) -> bool {
        self.is_mapped()
            && !self.flags.intersects(WindowFlags::HIDDEN | WindowFlags::MINIMIZED)
            && active_tags.map_or(false, |active| self.tags.intersects(active))
    }

    pub fn info(&self) -> WindowInfo {
        WindowInfo {
            id: self.id,
            app_id: self.app_id.clone(),
            title: self.title.clone(),
            pid: self.pid,
            state: self.state,
            output: self.output,
            tags: self.tags,
            geometry: self.geometry,
            floating: self.floating,
            fullscreen: self.flags.contains(WindowFlags::FULLSCREEN),
            maximized: self.flags.contains(WindowFlags::MAXIMIZED),
            minimized: self.flags.contains(WindowFlags::MINIMIZED),
            hidden: self.flags.contains(WindowFlags::HIDDEN),
            urgent: self.flags.contains(WindowFlags::URGENT),
        }
    }
}

/// Read-only snapshot handed to the policy engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowInfo {
    pub id: WindowId,
    pub app_id: Option<String>,
    pub title: Option<String>,
    pub pid: Option<u32>,
    pub state: WindowState,
    pub output: Option<OutputId>,
    pub tags: Tags,
    pub geometry: Rect,
    pub floating: bool,
    pub fullscreen: bool,
    pub maximized: bool,
    pub minimized: bool,
    pub hidden: bool,
    pub urgent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessSurface;

    fn window() -> Window {
        Window::new(WindowId::default(), Box::new(HeadlessSurface::new("term")))
    }

    #[test]
    fn test_new_window_defaults() {
        let w = window();
        assert_eq!(w.state(), WindowState::Created);
        assert!(w.is_banned(), "new windows start banned until the first visibility pass");
        assert!(!w.is_mapped());
        assert_eq!(w.app_id(), Some("term"));
    }

    #[test]
    fn test_frame_math() {
        let frame = Frame { border: 2, titlebar: 20 };
        assert_eq!(frame.content_offset(), Point::new(2, 22));
        assert_eq!(frame.outer_size(Size::new(800, 600)), Size::new(804, 624));
        assert_eq!(frame.content_size(Size::new(804, 624)), Size::new(800, 600));
    }

    #[test]
    fn test_fullscreen_drops_frame() {
        let mut w = window();
        w.frame = Frame { border: 3, titlebar: 0 };
        w.geometry = Rect::new(10, 10, 106, 106);
        assert_eq!(w.content_geometry(), Rect::new(13, 13, 100, 100));
        w.flags.insert(WindowFlags::FULLSCREEN);
        assert_eq!(w.content_geometry(), Rect::new(10, 10, 106, 106));
    }

    #[test]
    fn test_computed_visibility() {
        let mut w = window();
        w.state = WindowState::Mapped;
        w.tags = Tags::single(2).unwrap();
        assert!(!w.computed_visible(Tags::single(1)));
        assert!(w.computed_visible(Tags::single(2)));
        assert!(!w.computed_visible(None), "windows without an output are never visible");
        w.flags.insert(WindowFlags::MINIMIZED);
        assert!(!w.computed_visible(Tags::single(2)));
    }
}
