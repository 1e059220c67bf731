//! Input routing, bindings and focus.
//!
//! Events from the backend enter through [`Compositor::handle_input`]. Keyboard
//! events are matched against the hard-coded VT switch, the policy engine and the
//! binding table before reaching a client. Pointer events are hit-tested against the
//! scene and routed to an active grab, a panel, a window or the empty desktop.

pub mod bindings;
pub mod constraints;
mod dispatch;
pub mod focus;
pub mod keysym;

pub use bindings::{button_number, BindingTables, ButtonBinding, ButtonContext, KeyBinding};
pub use constraints::{ConstraintKind, PointerConstraint, PointerConstraints};
pub use dispatch::{Grab, GrabKind, PointerTarget};
pub use focus::{FocusStack, FocusState};
pub use keysym::{Keysym, Modifiers};

use novade_core::types::Point;

use crate::protocol::{AxisOrientation, ButtonState, KeyState};
use crate::window::WindowId;

/// A device event already translated by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    Key {
        keycode: u32,
        /// Symbol with the active modifiers applied.
        keysym: Keysym,
        /// Symbol of the unmodified key.
        level0: Keysym,
        state: KeyState,
    },
    Modifiers(Modifiers),
    /// Absolute pointer position in layout coordinates.
    PointerMotion { position: Point },
    /// `button` is a Linux evdev code.
    Button { button: u32, state: ButtonState },
    Axis { orientation: AxisOrientation, delta: f64 },
}

/// Seat state owned by the dispatcher.
#[derive(Debug, Default)]
pub struct InputState {
    pub(crate) bindings: BindingTables,
    pub(crate) modifiers: Modifiers,
    pub(crate) pointer: Point,
    pub(crate) pointer_focus: Option<PointerTarget>,
    pub(crate) grab: Option<Grab>,
    pub(crate) constraints: PointerConstraints,
    /// Keycodes whose press was consumed; their release is swallowed too.
    pub(crate) consumed_keys: Vec<u32>,
    pub(crate) consumed_buttons: Vec<u32>,
}

impl InputState {
    pub fn new(bindings: BindingTables) -> Self {
        Self {
            bindings,
            ..Self::default()
        }
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    pub fn grab(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    pub fn pointer_focus(&self) -> Option<PointerTarget> {
        self.pointer_focus
    }

    pub fn constraints(&self) -> &PointerConstraints {
        &self.constraints
    }

    /// Drops every reference to a window that is going away.
    pub(crate) fn forget_window(&mut self, id: WindowId) {
        if self.grab.as_ref().map_or(false, |g| g.window == id) {
            self.grab = None;
        }
        if self.pointer_focus == Some(PointerTarget::Window(id)) {
            self.pointer_focus = None;
        }
        self.constraints.forget(id);
    }
}
