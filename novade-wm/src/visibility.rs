//! Banning: the once-per-cycle pass that makes rendering match computed visibility.
//!
//! A window is shown iff it is mapped, neither hidden nor minimized, and shares a tag
//! with its output's active set. Mutations only set `visibility_dirty`; the pass runs
//! from the refresh scheduler. All unbans are applied before any ban so a workspace
//! switch never shows an empty screen in between.

use tracing::{debug, trace, warn};

use crate::compositor::Compositor;
use crate::tags::Tags;
use crate::window::{PendingChanges, WindowFlags, WindowId};
use crate::window::properties::WindowProperty;

/// What one visibility pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityReport {
    pub unbanned: Vec<WindowId>,
    pub banned: Vec<WindowId>,
}

impl VisibilityReport {
    pub fn is_empty(&self) -> bool {
        self.unbanned.is_empty() && self.banned.is_empty()
    }
}

const REPORTED: WindowFlags = WindowFlags::HIDDEN.union(WindowFlags::MINIMIZED);

impl Compositor {
    fn active_tags_for(&self, id: WindowId) -> Option<Tags> {
        let output = self.windows.get(id)?.output?;
        self.outputs
            .get(output)
            .filter(|o| o.enabled)
            .map(|o| o.active_tags)
    }

    /// Whether `id` would be shown by the next pass.
    pub fn is_window_visible(&self, id: WindowId) -> bool {
        self.windows
            .get(id)
            .map_or(false, |w| w.computed_visible(self.active_tags_for(id)))
    }

    /// Pre-pass run at mutation time: drops focus from a window that is about to be
    /// banned, so focus never points at an invisible window.
    pub(crate) fn unfocus_if_invisible(&mut self) {
        if let Some(focused) = self.focus.focused {
            if !self.is_window_visible(focused) {
                debug!(window = ?focused, "focused window became invisible");
                self.clear_focus();
            }
        }
    }

    /// Runs the unban pass, then the ban pass. Running it again without an
    /// intervening mutation changes nothing.
    pub fn run_visibility_pass(&mut self) -> VisibilityReport {
        self.visibility_dirty = false;
        let order: Vec<WindowId> = self.stacking.clone();
        let computed: Vec<(WindowId, bool)> = order
            .iter()
            .map(|id| (*id, self.is_window_visible(*id)))
            .collect();

        let mut report = VisibilityReport::default();

        for (id, visible) in &computed {
            let Some(window) = self.windows.get_mut(*id) else {
                continue;
            };
            if !*visible || !window.banned {
                continue;
            }
            let Some(tree) = window.scene.as_ref().map(|s| s.tree) else {
                continue;
            };
            if let Err(err) = self.scene.set_enabled(tree, true) {
                warn!(window = ?id, %err, "cannot enable window scene");
                continue;
            }
            window.banned = false;
            if window.suspended {
                window.suspended = false;
                window.surface.set_suspended(false);
            }
            window.reported_flags.remove(REPORTED);
            window.pending.remove(PendingChanges::VISIBILITY);
            report.unbanned.push(*id);
        }

        for (id, visible) in &computed {
            let Some(window) = self.windows.get_mut(*id) else {
                continue;
            };
            if *visible || window.banned {
                window.pending.remove(PendingChanges::VISIBILITY);
                continue;
            }
            if let Some(tree) = window.scene.as_ref().map(|s| s.tree) {
                if let Err(err) = self.scene.set_enabled(tree, false) {
                    warn!(window = ?id, %err, "cannot disable window scene");
                }
            }
            window.banned = true;
            if !window.suspended {
                window.suspended = true;
                window.surface.set_suspended(true);
            }
            window.reported_flags = (window.reported_flags - REPORTED) | (window.flags & REPORTED);
            window.pending.remove(PendingChanges::VISIBILITY);
            report.banned.push(*id);
            if self.focus.focused == Some(*id) {
                self.clear_focus();
            }
        }

        for id in report.unbanned.iter().chain(&report.banned) {
            self.notify_property(*id, WindowProperty::Visible);
        }
        if !report.is_empty() {
            trace!(
                unbanned = report.unbanned.len(),
                banned = report.banned.len(),
                "visibility pass"
            );
        }
        report
    }
}
