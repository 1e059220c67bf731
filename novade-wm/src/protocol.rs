//! The boundary between the compositor core and client surfaces.
//!
//! The core never speaks a wire protocol itself. Every client surface it manages is
//! reached through a [`SurfaceHandle`], which a backend implements on top of whatever
//! protocol objects it owns. Inbound protocol events arrive as
//! [`crate::backend::BackendEvent`]s keyed by a backend-chosen [`SurfaceKey`].

use std::fmt;

use novade_core::types::{Point, Rect, Size};

/// Configure serial chosen by the surface implementation.
pub type Serial = u32;

/// Backend-chosen identifier of a client surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceKey(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecorationMode {
    ClientSide,
    ServerSide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    Vertical,
    Horizontal,
}

/// Size constraints announced by the client before its first map.
///
/// A zero dimension means "unconstrained".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SizeHints {
    pub min: Size,
    pub max: Size,
    pub preferred: Option<Size>,
}

impl SizeHints {
    /// Clamps `size` into the announced bounds.
    pub fn constrain(&self, size: Size) -> Size {
        let mut width = size.width.max(self.min.width);
        let mut height = size.height.max(self.min.height);
        if self.max.width > 0 {
            width = width.min(self.max.width);
        }
        if self.max.height > 0 {
            height = height.min(self.max.height);
        }
        Size::new(width.max(1), height.max(1))
    }
}

/// Surface-local input region. An empty region lets all input pass through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    pub fn new(rects: Vec<Rect>) -> Self {
        Self {
            rects: rects.into_iter().filter(|r| !r.is_empty()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    pub fn contains(&self, point: Point) -> bool {
        self.rects.iter().any(|r| r.contains_point(point))
    }
}

/// A client surface as seen by the core.
///
/// Outbound calls are fire-and-forget from the core's point of view; only
/// [`SurfaceHandle::send_configure`] returns the serial the client must acknowledge.
pub trait SurfaceHandle: fmt::Debug {
    fn app_id(&self) -> Option<String>;
    fn title(&self) -> Option<String>;
    fn pid(&self) -> Option<u32>;

    /// Activation token the client presented when it created the surface.
    fn activation_token(&self) -> Option<String> {
        None
    }

    fn size_hints(&self) -> SizeHints {
        SizeHints::default()
    }

    /// `None` means the client did not negotiate; server-side decorations are used.
    fn preferred_decoration(&self) -> Option<DecorationMode> {
        None
    }

    /// `None` means the whole surface accepts input.
    fn input_region(&self) -> Option<Region> {
        None
    }

    fn send_configure(&mut self, size: Size) -> Serial;
    fn set_decoration_mode(&mut self, mode: DecorationMode);
    fn set_preferred_scale(&mut self, scale: f64);
    fn set_activated(&mut self, activated: bool);
    fn set_suspended(&mut self, suspended: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn set_maximized(&mut self, maximized: bool);

    fn keyboard_enter(&mut self);
    fn keyboard_leave(&mut self);
    fn send_key(&mut self, keycode: u32, state: KeyState);
    fn send_pointer_motion(&mut self, local: Point);
    fn send_button(&mut self, button: u32, state: ButtonState);
    fn send_axis(&mut self, orientation: AxisOrientation, delta: f64);

    /// Politely asks the client to close.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_hints_constrain() {
        let hints = SizeHints {
            min: Size::new(100, 50),
            max: Size::new(400, 0),
            preferred: None,
        };
        assert_eq!(hints.constrain(Size::new(10, 10)), Size::new(100, 50));
        assert_eq!(hints.constrain(Size::new(1000, 1000)), Size::new(400, 1000));
    }

    #[test]
    fn test_region_drops_empty_rects() {
        let region = Region::new(vec![Rect::new(0, 0, 0, 10), Rect::new(0, 0, 10, 10)]);
        assert_eq!(region.rects().len(), 1);
        assert!(region.contains(Point::new(5, 5)));
        assert!(!region.contains(Point::new(15, 5)));
        assert!(Region::default().is_empty());
    }
}
