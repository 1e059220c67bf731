//! Pointer constraints bound to the focused window.
//!
//! A window may hold one constraint. Only the focused window's constraint is active;
//! focus changes deactivate the old one and activate the new one.

use std::collections::HashMap;

use novade_core::types::{Point, Rect};
use tracing::debug;

use crate::compositor::Compositor;
use crate::error::WindowError;
use crate::window::WindowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintKind {
    /// The pointer does not move while the constraint is active.
    Locked,
    /// The pointer stays inside this rectangle, relative to the window content.
    Confined(Rect),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerConstraint {
    pub kind: ConstraintKind,
    pub active: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PointerConstraints {
    entries: HashMap<WindowId, PointerConstraint>,
    active: Option<WindowId>,
}

impl PointerConstraints {
    pub fn set(&mut self, window: WindowId, kind: ConstraintKind) {
        let active = self.active == Some(window);
        self.entries.insert(window, PointerConstraint { kind, active });
    }

    pub fn remove(&mut self, window: WindowId) -> bool {
        if self.active == Some(window) {
            self.active = None;
        }
        self.entries.remove(&window).is_some()
    }

    pub(crate) fn forget(&mut self, window: WindowId) {
        self.remove(window);
    }

    pub fn get(&self, window: WindowId) -> Option<&PointerConstraint> {
        self.entries.get(&window)
    }

    pub fn active(&self) -> Option<(WindowId, PointerConstraint)> {
        let id = self.active?;
        self.entries.get(&id).map(|c| (id, *c))
    }

    /// Moves activation to `focused`. Returns the window whose constraint was
    /// deactivated and the one that was activated, if either changed.
    pub fn rebind(&mut self, focused: Option<WindowId>) -> (Option<WindowId>, Option<WindowId>) {
        let next = focused.filter(|id| self.entries.contains_key(id));
        if next == self.active {
            return (None, None);
        }
        let old = self.active.take();
        if let Some(c) = old.and_then(|id| self.entries.get_mut(&id)) {
            c.active = false;
        }
        if let Some(c) = next.and_then(|id| self.entries.get_mut(&id)) {
            c.active = true;
        }
        self.active = next;
        (old, next)
    }

    /// Applies the active constraint to a pointer move from `current` to `proposed`.
    /// `content` is the constrained window's content rectangle in layout coordinates.
    pub fn apply(&self, current: Point, proposed: Point, content: Rect) -> Point {
        let Some((_, constraint)) = self.active() else {
            return proposed;
        };
        match constraint.kind {
            ConstraintKind::Locked => current,
            ConstraintKind::Confined(region) => {
                let region = region.translate(content.x, content.y).intersection(&content);
                match region {
                    Some(r) if !r.is_empty() => Point::new(
                        proposed.x.clamp(r.x, r.right() - 1),
                        proposed.y.clamp(r.y, r.bottom() - 1),
                    ),
                    _ => current,
                }
            }
        }
    }
}

impl Compositor {
    /// Attaches a constraint to `window`. It becomes active once the window has focus.
    pub fn set_pointer_constraint(&mut self, window: WindowId, kind: ConstraintKind) -> Result<(), WindowError> {
        if !self.windows.contains_key(window) {
            return Err(WindowError::NotFound(window));
        }
        self.input.constraints.set(window, kind);
        let (old, new) = self.input.constraints.rebind(self.focus.focused);
        debug!(?window, ?kind, deactivated = ?old, activated = ?new, "pointer constraint set");
        Ok(())
    }

    pub fn remove_pointer_constraint(&mut self, window: WindowId) -> bool {
        self.input.constraints.remove(window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn ids() -> (WindowId, WindowId) {
        let mut map: SlotMap<WindowId, ()> = SlotMap::with_key();
        (map.insert(()), map.insert(()))
    }

    #[test]
    fn test_rebind_follows_focus() {
        let (a, b) = ids();
        let mut constraints = PointerConstraints::default();
        constraints.set(a, ConstraintKind::Locked);
        constraints.set(b, ConstraintKind::Locked);

        assert_eq!(constraints.rebind(Some(a)), (None, Some(a)));
        assert!(constraints.get(a).unwrap().active);
        assert_eq!(constraints.rebind(Some(b)), (Some(a), Some(b)));
        assert!(!constraints.get(a).unwrap().active);
        assert_eq!(constraints.rebind(Some(b)), (None, None));
    }

    #[test]
    fn test_locked_pointer_does_not_move() {
        let (a, _) = ids();
        let mut constraints = PointerConstraints::default();
        constraints.set(a, ConstraintKind::Locked);
        constraints.rebind(Some(a));
        let content = Rect::new(0, 0, 100, 100);
        assert_eq!(constraints.apply(Point::new(5, 5), Point::new(50, 50), content), Point::new(5, 5));
    }

    #[test]
    fn test_confined_pointer_is_clamped() {
        let (a, _) = ids();
        let mut constraints = PointerConstraints::default();
        constraints.set(a, ConstraintKind::Confined(Rect::new(10, 10, 20, 20)));
        constraints.rebind(Some(a));
        let content = Rect::new(100, 100, 200, 200);
        assert_eq!(
            constraints.apply(Point::new(115, 115), Point::new(500, 0), content),
            Point::new(129, 110)
        );
    }

    #[test]
    fn test_inactive_constraint_is_ignored() {
        let (a, _) = ids();
        let mut constraints = PointerConstraints::default();
        constraints.set(a, ConstraintKind::Locked);
        let content = Rect::new(0, 0, 100, 100);
        assert_eq!(constraints.apply(Point::new(5, 5), Point::new(50, 50), content), Point::new(50, 50));
    }
}
