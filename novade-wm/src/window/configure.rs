//! The resize handshake: configure, acknowledge, commit.
//!
//! Requests are coalesced in a single `requested` slot. The refresh pass sends it;
//! if a configure is still in flight, the new one supersedes it under a fresh serial.
//! A window therefore never has more than one outstanding configure.

use novade_core::types::{Rect, Size};
use tracing::{debug, trace};

use super::properties::WindowProperty;
use super::{PendingChanges, WindowId, WindowState};
use crate::compositor::Compositor;
use crate::error::WindowError;
use crate::protocol::{Serial, SurfaceHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingConfigure {
    pub serial: Serial,
    pub size: Size,
    pub acked: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigureState {
    requested: Option<Size>,
    outstanding: Option<PendingConfigure>,
}

impl ConfigureState {
    /// Queues a content size. Returns `true` if an earlier request was replaced.
    pub fn request(&mut self, size: Size) -> bool {
        self.requested.replace(size).is_some()
    }

    pub fn requested(&self) -> Option<Size> {
        self.requested
    }

    pub fn outstanding(&self) -> Option<&PendingConfigure> {
        self.outstanding.as_ref()
    }

    /// 0 or 1.
    pub fn outstanding_count(&self) -> usize {
        usize::from(self.outstanding.is_some())
    }

    /// Sends the queued request, superseding any configure still in flight.
    pub fn flush(&mut self, surface: &mut dyn SurfaceHandle) -> Option<Serial> {
        let size = self.requested.take()?;
        if self.outstanding.map_or(false, |o| o.size == size && !o.acked) {
            return None;
        }
        let serial = surface.send_configure(size);
        self.outstanding = Some(PendingConfigure {
            serial,
            size,
            acked: false,
        });
        Some(serial)
    }

    /// Returns `false` for serials that do not match the outstanding configure.
    pub fn ack(&mut self, serial: Serial) -> bool {
        match self.outstanding.as_mut() {
            Some(pending) if pending.serial == serial => {
                pending.acked = true;
                true
            }
            _ => false,
        }
    }

    /// Completes the handshake on commit if the outstanding configure was acked.
    pub fn complete(&mut self) -> Option<Size> {
        match self.outstanding {
            Some(pending) if pending.acked => {
                self.outstanding = None;
                Some(pending.size)
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.requested = None;
        self.outstanding = None;
    }
}

impl Compositor {
    /// Requests a new client content size. Sent by the next refresh pass.
    pub fn configure_request(&mut self, id: WindowId, size: Size) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if matches!(window.state, WindowState::Unmapped | WindowState::Destroyed) {
            return Err(WindowError::InvalidState {
                id,
                state: window.state,
                operation: "configure",
            });
        }
        if window.configure.request(size) {
            trace!(window = ?id, %size, "configure request coalesced");
        }
        window.pending.insert(PendingChanges::GEOMETRY);
        Ok(())
    }

    /// Moves and resizes the outer frame. The client is asked for the matching
    /// content size.
    pub fn resize_window(&mut self, id: WindowId, geometry: Rect) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        let hints = window.size_hints;
        let frame = window.effective_frame();
        let content = hints.constrain(frame.content_size(geometry.size()));
        let outer = frame.outer_size(content);
        let new_geometry = Rect::from_parts(geometry.origin(), outer);
        let size_changed = content != window.committed_size;
        if new_geometry == window.geometry && !size_changed {
            return Ok(());
        }
        let moved = new_geometry != window.geometry;
        let mapped = window.is_mapped();
        window.geometry = new_geometry;
        window.pending.insert(PendingChanges::GEOMETRY);
        if size_changed && mapped {
            self.configure_request(id, content)?;
        }
        if moved {
            self.notify_property(id, WindowProperty::Geometry);
        }
        Ok(())
    }

    pub fn ack_configure(&mut self, id: WindowId, serial: Serial) -> Result<bool, WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        let matched = window.configure.ack(serial);
        if !matched {
            debug!(window = ?id, serial, "stale configure ack ignored");
        }
        Ok(matched)
    }

    /// Sends queued configures; refresh step 3.
    pub(crate) fn flush_configures(&mut self) {
        for (id, window) in self.windows.iter_mut() {
            if !window.is_mapped() {
                continue;
            }
            if let Some(serial) = window.configure.flush(window.surface.as_mut()) {
                window.state = WindowState::Resizing;
                trace!(window = ?id, serial, "configure sent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessSurface;

    #[test]
    fn test_second_request_coalesces() {
        let mut state = ConfigureState::default();
        assert!(!state.request(Size::new(640, 480)));
        assert!(state.request(Size::new(800, 600)));
        assert_eq!(state.requested(), Some(Size::new(800, 600)));
        assert_eq!(state.outstanding_count(), 0);
    }

    #[test]
    fn test_flush_supersedes_in_flight_configure() {
        let mut surface = HeadlessSurface::new("app");
        let mut state = ConfigureState::default();

        state.request(Size::new(640, 480));
        let first = state.flush(&mut surface).unwrap();
        state.request(Size::new(800, 600));
        let second = state.flush(&mut surface).unwrap();

        assert_ne!(first, second);
        assert_eq!(state.outstanding_count(), 1);
        assert_eq!(state.outstanding().unwrap().size, Size::new(800, 600));
        assert!(!state.ack(first), "superseded serial is stale");
        assert!(state.ack(second));
        assert_eq!(state.complete(), Some(Size::new(800, 600)));
        assert_eq!(state.outstanding_count(), 0);
    }

    #[test]
    fn test_identical_request_is_not_resent() {
        let mut surface = HeadlessSurface::new("app");
        let mut state = ConfigureState::default();
        state.request(Size::new(10, 10));
        assert!(state.flush(&mut surface).is_some());
        state.request(Size::new(10, 10));
        assert!(state.flush(&mut surface).is_none());
        assert_eq!(surface.log().configures.len(), 1);
    }

    #[test]
    fn test_commit_without_ack_keeps_outstanding() {
        let mut surface = HeadlessSurface::new("app");
        let mut state = ConfigureState::default();
        state.request(Size::new(10, 10));
        state.flush(&mut surface);
        assert_eq!(state.complete(), None);
        assert_eq!(state.outstanding_count(), 1);
    }
}
