//! Window state operations: fullscreen, maximize, minimize, hide, urgency, floating,
//! tags and stacking.
//!
//! Each operation mutates state, marks the relevant pending flags and emits a
//! property notification. Anything that can make the focused window invisible runs
//! the visibility pre-pass immediately.

use novade_core::types::{Point, Rect};
use tracing::debug;

use super::{PendingChanges, WindowFlags, WindowId};
use crate::compositor::Compositor;
use crate::error::{OutputError, WindowError};
use crate::output::OutputId;
use crate::policy::Notification;
use crate::tags::Tags;
use crate::window::properties::WindowProperty;

impl Compositor {
    fn window_output_rects(&self, id: WindowId) -> Result<(Rect, Rect), WindowError> {
        let window = self.windows.get(id).ok_or(WindowError::NotFound(id))?;
        Ok(window
            .output
            .and_then(|o| self.outputs.get(o))
            .map(|o| (o.geometry(), o.usable_area))
            .unwrap_or((window.geometry, window.geometry)))
    }

    pub fn set_fullscreen(&mut self, id: WindowId, fullscreen: bool) -> Result<(), WindowError> {
        let (output_geometry, usable) = self.window_output_rects(id)?;
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.flags.contains(WindowFlags::FULLSCREEN) == fullscreen {
            return Ok(());
        }

        let target = if fullscreen {
            if !window.flags.contains(WindowFlags::MAXIMIZED) {
                window.prev_geometry = window.geometry;
            }
            window.flags.insert(WindowFlags::FULLSCREEN);
            output_geometry
        } else {
            window.flags.remove(WindowFlags::FULLSCREEN);
            if window.flags.contains(WindowFlags::MAXIMIZED) {
                usable
            } else {
                window.prev_geometry
            }
        };
        window.surface.set_fullscreen(fullscreen);
        window.pending.insert(PendingChanges::GEOMETRY | PendingChanges::BORDER);

        self.resize_window(id, target)?;
        self.stacking_dirty = true;
        debug!(window = ?id, fullscreen, "fullscreen changed");
        self.notify_property(id, WindowProperty::Fullscreen);
        Ok(())
    }

    pub fn set_maximized(&mut self, id: WindowId, maximized: bool) -> Result<(), WindowError> {
        let (_, usable) = self.window_output_rects(id)?;
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.flags.contains(WindowFlags::MAXIMIZED) == maximized {
            return Ok(());
        }
        let fullscreen = window.flags.contains(WindowFlags::FULLSCREEN);
        if maximized && !fullscreen {
            window.prev_geometry = window.geometry;
        }
        window.flags.set(WindowFlags::MAXIMIZED, maximized);
        window.surface.set_maximized(maximized);
        let target = if maximized { usable } else { window.prev_geometry };

        if !fullscreen {
            self.resize_window(id, target)?;
        }
        self.notify_property(id, WindowProperty::Maximized);
        Ok(())
    }

    pub fn set_minimized(&mut self, id: WindowId, minimized: bool) -> Result<(), WindowError> {
        self.set_visibility_flag(id, WindowFlags::MINIMIZED, minimized, WindowProperty::Minimized)
    }

    pub fn set_hidden(&mut self, id: WindowId, hidden: bool) -> Result<(), WindowError> {
        self.set_visibility_flag(id, WindowFlags::HIDDEN, hidden, WindowProperty::Hidden)
    }

    fn set_visibility_flag(
        &mut self,
        id: WindowId,
        flag: WindowFlags,
        on: bool,
        property: WindowProperty,
    ) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.flags.contains(flag) == on {
            return Ok(());
        }
        window.flags.set(flag, on);
        window.pending.insert(PendingChanges::VISIBILITY);
        self.visibility_dirty = true;
        self.unfocus_if_invisible();
        self.notify_property(id, property);
        Ok(())
    }

    pub fn set_urgent(&mut self, id: WindowId, urgent: bool) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.flags.contains(WindowFlags::URGENT) == urgent {
            return Ok(());
        }
        window.flags.set(WindowFlags::URGENT, urgent);
        window.pending.insert(PendingChanges::BORDER);
        self.notify_property(id, WindowProperty::Urgent);
        Ok(())
    }

    pub fn set_floating(&mut self, id: WindowId, floating: bool) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.floating == floating {
            return Ok(());
        }
        window.floating = floating;
        window.pending.insert(PendingChanges::GEOMETRY);
        let output = window.output;
        if let Some(out) = output.and_then(|o| self.outputs.get_mut(o)) {
            out.needs_arrange = true;
        }
        self.stacking_dirty = true;
        self.notify_property(id, WindowProperty::Floating);
        Ok(())
    }

    /// Moves a window without resizing it.
    pub fn move_window(&mut self, id: WindowId, origin: Point) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.geometry.origin() == origin {
            return Ok(());
        }
        window.geometry = Rect::from_parts(origin, window.geometry.size());
        window.pending.insert(PendingChanges::GEOMETRY);
        self.notify_property(id, WindowProperty::Geometry);
        Ok(())
    }

    /// Replaces the window's tag set. Empty sets are rejected silently.
    pub fn set_window_tags(&mut self, id: WindowId, tags: Tags) -> Result<(), WindowError> {
        let tags = tags.masked(self.tag_count());
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if tags.is_empty() || window.tags == tags {
            return Ok(());
        }
        window.tags = tags;
        window.pending.insert(PendingChanges::VISIBILITY);
        let output = window.output;
        if let Some(out) = output.and_then(|o| self.outputs.get_mut(o)) {
            out.needs_arrange = true;
        }
        self.visibility_dirty = true;
        self.unfocus_if_invisible();
        self.notify_property(id, WindowProperty::Tags);
        Ok(())
    }

    pub fn toggle_window_tags(&mut self, id: WindowId, tags: Tags) -> Result<(), WindowError> {
        let current = self.windows.get(id).ok_or(WindowError::NotFound(id))?.tags;
        self.set_window_tags(id, current ^ tags)
    }

    /// Shows `tags` on `output` (or the active output). An empty set swaps back to the
    /// previously shown tags.
    pub fn view_tags(&mut self, output: Option<OutputId>, tags: Tags) -> Result<(), OutputError> {
        let tags = tags.masked(self.tag_count());
        let id = self.resolve_output(output)?;
        let out = self.outputs.get_mut(id).ok_or(OutputError::NotFound(id))?;
        let next = if tags.is_empty() { out.previous_tags } else { tags };
        if next == out.active_tags {
            return Ok(());
        }
        out.previous_tags = out.active_tags;
        out.active_tags = next;
        self.after_tag_view_change(id);
        Ok(())
    }

    /// Flips `tags` in the output's active set. Toggling away every tag is allowed and
    /// leaves the output empty.
    pub fn toggle_view_tags(&mut self, output: Option<OutputId>, tags: Tags) -> Result<(), OutputError> {
        let tags = tags.masked(self.tag_count());
        let id = self.resolve_output(output)?;
        let out = self.outputs.get_mut(id).ok_or(OutputError::NotFound(id))?;
        if tags.is_empty() {
            return Ok(());
        }
        out.previous_tags = out.active_tags;
        out.active_tags = out.active_tags ^ tags;
        self.after_tag_view_change(id);
        Ok(())
    }

    fn resolve_output(&self, output: Option<OutputId>) -> Result<OutputId, OutputError> {
        match output {
            Some(id) if self.outputs.contains(id) => Ok(id),
            Some(id) => Err(OutputError::NotFound(id)),
            None => self
                .outputs
                .default_target()
                .ok_or_else(|| OutputError::UnknownName("<active>".into())),
        }
    }

    fn after_tag_view_change(&mut self, id: OutputId) {
        if let Some(out) = self.outputs.get_mut(id) {
            out.needs_arrange = true;
            debug!(output = ?id, tags = ?out.active_tags, "active tags changed");
        }
        self.visibility_dirty = true;
        self.unfocus_if_invisible();
        self.focus.refocus_needed = true;
        if let Some(out) = self.outputs.get(id) {
            let info = out.info();
            self.notify(Notification::OutputChanged(info));
        }
    }

    /// Moves the window to the top of the stacking order.
    pub fn raise_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        if !self.windows.contains_key(id) {
            return Err(WindowError::NotFound(id));
        }
        if self.stacking.last() != Some(&id) {
            self.stacking.retain(|w| *w != id);
            self.stacking.push(id);
            self.stacking_dirty = true;
        }
        Ok(())
    }

    pub fn lower_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        if !self.windows.contains_key(id) {
            return Err(WindowError::NotFound(id));
        }
        if self.stacking.first() != Some(&id) {
            self.stacking.retain(|w| *w != id);
            self.stacking.insert(0, id);
            self.stacking_dirty = true;
        }
        Ok(())
    }

    /// Asks the client to close; the window goes away when it destroys its surface.
    pub fn close_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        window.surface.close();
        debug!(window = ?id, "close requested");
        Ok(())
    }

    /// Updates identity strings after the client changed them.
    pub fn update_window_title(&mut self, id: WindowId, title: Option<String>) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.title == title {
            return Ok(());
        }
        window.title = title;
        self.notify_property(id, WindowProperty::Title);
        Ok(())
    }

    pub fn update_window_app_id(&mut self, id: WindowId, app_id: Option<String>) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.app_id == app_id {
            return Ok(());
        }
        window.app_id = app_id;
        self.notify_property(id, WindowProperty::AppId);
        Ok(())
    }
}
