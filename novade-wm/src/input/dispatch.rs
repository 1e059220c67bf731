//! Event routing.
//!
//! Keys: VT switching (hard-coded) → lock surface → policy key match → binding
//! table → keyboard focus holder.
//!
//! Buttons: lock surface → grab → panel bindings → global bindings → window under
//! the pointer → desktop bindings. Global bindings are transparent over windows and
//! consuming elsewhere. Scroll steps are matched as a press and release of buttons
//! 4 to 7 and never reach a client as buttons.

use novade_core::types::{Point, Rect, Size};
use tracing::{debug, trace};

use super::bindings::{button_number, ButtonContext};
use super::keysym::{Keysym, Modifiers};
use super::InputEvent;
use crate::backend::BackendRequest;
use crate::compositor::Compositor;
use crate::diagnostics::DiagnosticSource;
use crate::output::PanelId;
use crate::policy::KeyCombo;
use crate::protocol::{AxisOrientation, ButtonState, KeyState};
use crate::scene::NodeOwner;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrabKind {
    Move,
    Resize,
}

/// An interactive move or resize. Owns all pointer input until a button is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grab {
    pub kind: GrabKind,
    pub window: WindowId,
    pub start_pointer: Point,
    pub start_geometry: Rect,
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    Window(WindowId),
    Panel(PanelId),
    Lock,
    Desktop,
}

impl Compositor {
    /// Entry point for every device event.
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::Key {
                keycode,
                keysym,
                level0,
                state,
            } => self.handle_key(keycode, keysym, level0, state),
            InputEvent::Modifiers(modifiers) => self.input.modifiers = modifiers,
            InputEvent::PointerMotion { position } => self.handle_pointer_motion(position),
            InputEvent::Button { button, state } => self.handle_button(button, state),
            InputEvent::Axis { orientation, delta } => self.handle_axis(orientation, delta),
        }
    }

    pub fn pointer_target_at(&self, point: Point) -> PointerTarget {
        match self.scene.node_at(point).map(|hit| hit.owner) {
            Some(NodeOwner::Window(id)) => PointerTarget::Window(id),
            Some(NodeOwner::Panel(id)) => PointerTarget::Panel(id),
            Some(NodeOwner::Lock) => PointerTarget::Lock,
            Some(NodeOwner::None) | None => PointerTarget::Desktop,
        }
    }

    pub fn window_under_pointer(&self) -> Option<WindowId> {
        match self.pointer_target_at(self.input.pointer) {
            PointerTarget::Window(id) => Some(id),
            _ => None,
        }
    }

    fn handle_key(&mut self, keycode: u32, keysym: Keysym, level0: Keysym, state: KeyState) {
        let modifiers = self.input.modifiers;

        if state == KeyState::Released {
            if let Some(i) = self.input.consumed_keys.iter().position(|k| *k == keycode) {
                self.input.consumed_keys.swap_remove(i);
                return;
            }
        } else if let Some(vt) = vt_switch_target(modifiers, keysym) {
            debug!(vt, "switching virtual terminal");
            self.input.consumed_keys.push(keycode);
            self.backend_requests.push(BackendRequest::SwitchVt(vt));
            return;
        }

        if let Some(lock) = self.lock.as_mut() {
            lock.surface.send_key(keycode, state);
            return;
        }

        if state == KeyState::Pressed {
            let combo = KeyCombo::new(modifiers, keysym, level0);
            if let Some(actions) = self.policy.match_key(&combo, &mut self.diagnostics) {
                trace!(keysym = %keysym, "key consumed by policy");
                self.input.consumed_keys.push(keycode);
                for action in actions {
                    self.run_binding_action(action);
                }
                return;
            }

            let binding = self
                .input
                .bindings
                .match_key(modifiers, keysym, level0)
                .map(|b| b.action.clone());
            if let Some(action) = binding {
                trace!(keysym = %keysym, "key binding matched");
                self.input.consumed_keys.push(keycode);
                self.run_binding_action(action);
                return;
            }
        }

        if let Some(panel) = self.focus.panel_keyboard.and_then(|p| self.panels.get_mut(p)) {
            panel.surface.send_key(keycode, state);
        } else if let Some(window) = self.focus.focused.and_then(|f| self.windows.get_mut(f)) {
            window.surface.send_key(keycode, state);
        }
    }

    fn run_binding_action(&mut self, action: crate::actions::Action) {
        if let Err(err) = self.perform(action) {
            self.diagnostics
                .record(DiagnosticSource::Input, format!("binding action failed: {err}"));
        }
    }

    fn handle_pointer_motion(&mut self, position: Point) {
        let bounds = self.outputs.bounds();
        let mut position = if bounds.is_empty() {
            position
        } else {
            Point::new(
                position.x.clamp(bounds.x, bounds.right() - 1),
                position.y.clamp(bounds.y, bounds.bottom() - 1),
            )
        };

        if let Some((window, _)) = self.input.constraints.active() {
            if self.focus.focused == Some(window) {
                if let Some(content) = self.windows.get(window).map(|w| w.content_geometry()) {
                    position = self.input.constraints.apply(self.input.pointer, position, content);
                }
            }
        }
        self.input.pointer = position;

        if let Some(lock) = self.lock.as_mut() {
            lock.surface.send_pointer_motion(position);
            return;
        }

        if let Some(grab) = self.input.grab {
            self.update_grab(grab, position);
            return;
        }

        let target = self.pointer_target_at(position);
        match target {
            PointerTarget::Window(id) => {
                if let Some(window) = self.windows.get_mut(id) {
                    let local = position - window.content_geometry().origin();
                    window.surface.send_pointer_motion(local);
                }
            }
            PointerTarget::Panel(id) => {
                if let Some(panel) = self.panels.get_mut(id) {
                    let local = position - panel.geometry.origin();
                    panel.surface.send_pointer_motion(local);
                }
            }
            PointerTarget::Lock | PointerTarget::Desktop => {}
        }
        self.input.pointer_focus = Some(target);
    }

    fn update_grab(&mut self, grab: Grab, position: Point) {
        let delta = position - grab.start_pointer;
        let result = match grab.kind {
            GrabKind::Move => self.move_window(grab.window, grab.start_geometry.origin() + delta),
            GrabKind::Resize => {
                let size = Size::new(
                    (grab.start_geometry.width + delta.x).max(1),
                    (grab.start_geometry.height + delta.y).max(1),
                );
                self.resize_window(grab.window, Rect::from_parts(grab.start_geometry.origin(), size))
            }
        };
        if result.is_err() {
            self.input.grab = None;
        }
    }

    fn begin_grab(&mut self, id: WindowId, kind: GrabKind) {
        if self.input.grab.is_some() || self.lock.is_some() {
            return;
        }
        let Some(window) = self.windows.get(id).filter(|w| w.is_mapped() && !w.is_fullscreen()) else {
            return;
        };
        let start_geometry = window.geometry;
        if !window.floating {
            let _ = self.set_floating(id, true);
        }
        let _ = self.raise_window(id);
        self.input.grab = Some(Grab {
            kind,
            window: id,
            start_pointer: self.input.pointer,
            start_geometry,
        });
        debug!(window = ?id, ?kind, "interactive grab started");
    }

    pub(crate) fn begin_move_grab(&mut self, id: WindowId) {
        self.begin_grab(id, GrabKind::Move);
    }

    pub(crate) fn begin_resize_grab(&mut self, id: WindowId) {
        self.begin_grab(id, GrabKind::Resize);
    }

    /// Runs the first matching binding for `button` in the precedence order for
    /// `target`. Returns whether a binding ran.
    fn run_button_bindings(&mut self, target: PointerTarget, button: u32) -> bool {
        let modifiers = self.input.modifiers;
        let mut contexts = Vec::with_capacity(2);
        if matches!(target, PointerTarget::Panel(_)) {
            contexts.push(ButtonContext::Panel);
        }
        contexts.push(ButtonContext::Global);
        if target == PointerTarget::Desktop {
            contexts.push(ButtonContext::Desktop);
        }

        for context in contexts {
            let action = self
                .input
                .bindings
                .match_button(context, modifiers, button)
                .map(|b| b.action.clone());
            if let Some(action) = action {
                trace!(button, ?context, "button binding matched");
                self.run_binding_action(action);
                return true;
            }
        }
        false
    }

    fn handle_button(&mut self, code: u32, state: ButtonState) {
        if let Some(lock) = self.lock.as_mut() {
            lock.surface.send_button(code, state);
            return;
        }

        if let Some(grab) = self.input.grab {
            if state == ButtonState::Released {
                debug!(window = ?grab.window, "interactive grab ended");
                self.input.grab = None;
                self.input.consumed_buttons.retain(|b| *b != code);
            }
            return;
        }

        if state == ButtonState::Released {
            if let Some(i) = self.input.consumed_buttons.iter().position(|b| *b == code) {
                self.input.consumed_buttons.swap_remove(i);
                return;
            }
        }

        let target = self.pointer_target_at(self.input.pointer);
        let pressed = state == ButtonState::Pressed;
        let bound = pressed && self.run_button_bindings(target, button_number(code));
        let grabbed = self.input.grab.is_some();

        match target {
            PointerTarget::Window(id) => {
                if pressed && !grabbed {
                    if self.config.general.focus_on_click && self.is_window_visible(id) {
                        self.focus_window(id);
                    }
                    let _ = self.raise_window(id);
                }
                if grabbed {
                    self.input.consumed_buttons.push(code);
                } else if let Some(window) = self.windows.get_mut(id) {
                    window.surface.send_button(code, state);
                }
            }
            PointerTarget::Panel(id) => {
                if bound || grabbed {
                    self.input.consumed_buttons.push(code);
                } else if let Some(panel) = self.panels.get_mut(id) {
                    panel.surface.send_button(code, state);
                }
            }
            PointerTarget::Desktop => {
                if pressed {
                    if let Some(output) = self.outputs.output_at(self.input.pointer) {
                        self.outputs.set_active(output);
                    }
                    self.input.consumed_buttons.push(code);
                }
            }
            PointerTarget::Lock => {}
        }
    }

    fn handle_axis(&mut self, orientation: AxisOrientation, delta: f64) {
        if delta == 0.0 {
            return;
        }
        if let Some(lock) = self.lock.as_mut() {
            lock.surface.send_axis(orientation, delta);
            return;
        }
        if self.input.grab.is_some() {
            return;
        }

        let button = match (orientation, delta < 0.0) {
            (AxisOrientation::Vertical, true) => 4,
            (AxisOrientation::Vertical, false) => 5,
            (AxisOrientation::Horizontal, true) => 6,
            (AxisOrientation::Horizontal, false) => 7,
        };
        let target = self.pointer_target_at(self.input.pointer);
        trace!(button, ?target, "scroll synthesized as button press and release");
        // Bindings fire on the press; the synthesized release has nothing to match.
        let bound = self.run_button_bindings(target, button);

        match target {
            PointerTarget::Window(id) => {
                if let Some(window) = self.windows.get_mut(id) {
                    window.surface.send_axis(orientation, delta);
                }
            }
            PointerTarget::Panel(id) if !bound => {
                if let Some(panel) = self.panels.get_mut(id) {
                    panel.surface.send_axis(orientation, delta);
                }
            }
            _ => {}
        }
    }
}

/// Hard-coded VT switching. Bypasses every table so it works even when the policy
/// engine is broken.
fn vt_switch_target(modifiers: Modifiers, keysym: Keysym) -> Option<u32> {
    if let Some(vt) = keysym.switch_vt() {
        return Some(vt);
    }
    let ctrl_alt = Modifiers::CTRL | Modifiers::ALT;
    let f = keysym.0.checked_sub(Keysym::F1.0)?;
    (modifiers.stripped().contains(ctrl_alt) && f < 12).then_some(f + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vt_switch_keys() {
        let f2 = Keysym(Keysym::F1.0 + 1);
        assert_eq!(vt_switch_target(Modifiers::CTRL | Modifiers::ALT, f2), Some(2));
        assert_eq!(vt_switch_target(Modifiers::CTRL, f2), None);
        assert_eq!(vt_switch_target(Modifiers::empty(), Keysym(Keysym::SWITCH_VT_1.0 + 4)), Some(5));
        assert_eq!(vt_switch_target(Modifiers::CTRL | Modifiers::ALT, Keysym::RETURN), None);
    }
}
