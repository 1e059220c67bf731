//! Keyboard focus and the focus stack.
//!
//! Keyboard enter/leave is sent to clients at the moment focus changes, because a
//! surface handle held until the next refresh may already be gone. Everything else a
//! focus change implies (stack order, activation flags, pointer constraint binding) is
//! recorded as pending and applied by the refresh pass after geometry.

use tracing::{debug, trace};

use crate::compositor::Compositor;
use crate::output::PanelId;
use crate::policy::Notification;
use crate::window::properties::WindowProperty;
use crate::window::{PendingChanges, WindowFlags, WindowId};

/// Most recently focused windows, newest first. Holds membership only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FocusStack {
    entries: Vec<WindowId>,
}

impl FocusStack {
    /// Moves `id` to the front, inserting it if absent.
    pub fn touch(&mut self, id: WindowId) {
        self.entries.retain(|w| *w != id);
        self.entries.insert(0, id);
    }

    pub fn remove(&mut self, id: WindowId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|w| *w != id);
        before != self.entries.len()
    }

    pub fn contains(&self, id: WindowId) -> bool {
        self.entries.contains(&id)
    }

    pub fn first(&self) -> Option<WindowId> {
        self.entries.first().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = WindowId> + '_ {
        self.entries.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct FocusState {
    pub(crate) focused: Option<WindowId>,
    pub(crate) stack: FocusStack,
    /// Stack, activation and constraint updates wait for refresh step 7.
    pub(crate) pending: bool,
    /// Focus was lost; the next refresh picks a visible window.
    pub(crate) refocus_needed: bool,
    /// An exclusive keyboard-interactive panel holds the keyboard.
    pub(crate) panel_keyboard: Option<PanelId>,
}

impl FocusState {
    pub fn focused(&self) -> Option<WindowId> {
        self.focused
    }

    pub fn stack(&self) -> &FocusStack {
        &self.stack
    }

    pub fn panel_keyboard(&self) -> Option<PanelId> {
        self.panel_keyboard
    }

    pub fn has_pending(&self) -> bool {
        self.pending || self.refocus_needed
    }
}

impl Compositor {
    pub fn focused_window(&self) -> Option<WindowId> {
        self.focus.focused
    }

    pub fn focus_state(&self) -> &FocusState {
        &self.focus
    }

    fn keyboard_available(&self) -> bool {
        self.focus.panel_keyboard.is_none() && self.lock.is_none()
    }

    /// Gives `id` keyboard focus right away and schedules the rest of the change.
    pub fn focus_window(&mut self, id: WindowId) {
        if !self.windows.get(id).map_or(false, |w| w.is_mapped()) {
            return;
        }
        let old = self.focus.focused;
        if old == Some(id) {
            return;
        }
        let keyboard = self.keyboard_available();
        if let Some(previous) = old.and_then(|o| self.windows.get_mut(o)) {
            if keyboard {
                previous.surface.keyboard_leave();
            }
            previous.pending.insert(PendingChanges::BORDER | PendingChanges::FOCUS);
        }
        let output = self.windows.get_mut(id).and_then(|window| {
            if keyboard {
                window.surface.keyboard_enter();
            }
            window.pending.insert(PendingChanges::BORDER | PendingChanges::FOCUS);
            window.output
        });
        if let Some(output) = output {
            self.outputs.set_active(output);
        }

        self.focus.focused = Some(id);
        self.focus.pending = true;
        self.focus.refocus_needed = false;
        debug!(old = ?old, new = ?id, "keyboard focus changed");

        let urgent = self
            .windows
            .get(id)
            .map_or(false, |w| w.flags.contains(WindowFlags::URGENT));
        if urgent {
            let _ = self.set_urgent(id, false);
        }
        self.announce_focus_change(old, Some(id));
    }

    /// Drops keyboard focus. The next refresh looks for a replacement.
    pub(crate) fn clear_focus(&mut self) {
        let Some(old) = self.focus.focused.take() else {
            return;
        };
        let keyboard = self.keyboard_available();
        if let Some(window) = self.windows.get_mut(old) {
            if keyboard {
                window.surface.keyboard_leave();
            }
            window.pending.insert(PendingChanges::BORDER | PendingChanges::FOCUS);
        }
        self.focus.pending = true;
        self.focus.refocus_needed = true;
        debug!(old = ?old, "keyboard focus cleared");
        self.announce_focus_change(Some(old), None);
    }

    fn announce_focus_change(&mut self, old: Option<WindowId>, new: Option<WindowId>) {
        self.notify(Notification::FocusChanged { old, new });
        for id in [old, new].into_iter().flatten() {
            self.notify_property(id, WindowProperty::Focus);
        }
    }

    /// Removes every focus reference to a window that is being unmapped or destroyed.
    pub(crate) fn purge_focus(&mut self, id: WindowId) {
        self.focus.stack.remove(id);
        if self.focus.focused == Some(id) {
            self.clear_focus();
        }
    }

    /// Visible windows on the active output, bottom of the stack first.
    fn focus_candidates(&self) -> Vec<WindowId> {
        let active = self.outputs.default_target();
        self.stacking
            .iter()
            .copied()
            .filter(|id| {
                self.windows.get(*id).map_or(false, |w| w.output == active)
                    && self.is_window_visible(*id)
            })
            .collect()
    }

    pub fn focus_next(&mut self) {
        self.cycle_focus(true);
    }

    pub fn focus_prev(&mut self) {
        self.cycle_focus(false);
    }

    fn cycle_focus(&mut self, forward: bool) {
        let candidates = self.focus_candidates();
        if candidates.is_empty() {
            return;
        }
        let len = candidates.len();
        let next = match self
            .focus
            .focused
            .and_then(|f| candidates.iter().position(|c| *c == f))
        {
            Some(i) if forward => (i + 1) % len,
            Some(i) => (i + len - 1) % len,
            None => len - 1,
        };
        self.focus_window(candidates[next]);
    }

    /// Refresh step 7: settles the one pending focus change.
    pub(crate) fn apply_pending_focus(&mut self) {
        if self.focus.refocus_needed && self.focus.focused.is_none() {
            self.focus.refocus_needed = false;
            let candidates = self.focus_candidates();
            let pick = self
                .focus
                .stack
                .iter()
                .find(|id| candidates.contains(id))
                .or_else(|| candidates.last().copied());
            if let Some(id) = pick {
                trace!(window = ?id, "refocusing");
                self.focus_window(id);
            }
        }
        self.focus.refocus_needed = false;

        if !self.focus.pending {
            return;
        }
        self.focus.pending = false;

        let focused = self.focus.focused;
        if let Some(id) = focused {
            self.focus.stack.touch(id);
        }
        for (id, window) in self.windows.iter_mut() {
            let activated = focused == Some(id) && window.is_mapped();
            if window.activated != activated {
                window.activated = activated;
                window.surface.set_activated(activated);
                window.pending.insert(PendingChanges::BORDER);
            }
            window.pending.remove(PendingChanges::FOCUS);
        }
        let (deactivated, activated) = self.input.constraints.rebind(focused);
        if deactivated.is_some() || activated.is_some() {
            debug!(?deactivated, ?activated, "pointer constraint rebound");
        }
    }

    /// Gives the keyboard back to the focused window after a panel or lock released it.
    pub(crate) fn restore_keyboard_focus(&mut self) {
        if !self.keyboard_available() {
            return;
        }
        if let Some(window) = self.focus.focused.and_then(|id| self.windows.get_mut(id)) {
            window.surface.keyboard_enter();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn test_focus_stack_is_most_recent_first_without_duplicates() {
        let mut map: SlotMap<WindowId, ()> = SlotMap::with_key();
        let (a, b) = (map.insert(()), map.insert(()));
        let mut stack = FocusStack::default();
        stack.touch(a);
        stack.touch(b);
        stack.touch(a);
        assert_eq!(stack.iter().collect::<Vec<_>>(), vec![a, b]);
        assert!(stack.remove(b));
        assert!(!stack.remove(b));
        assert_eq!(stack.len(), 1);
    }
}
