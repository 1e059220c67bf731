//! Window lifecycle transitions.
//!
//! Protocol violations are normalized rather than rejected: mapping a window that
//! never committed runs the initial commit first, a duplicate map runs the missing
//! unmap, and destroying a mapped window unmaps it first.

use std::time::Instant;

use novade_core::types::{Color, Rect, Size};
use tracing::{debug, info, warn};

use super::{Decorations, Frame, PendingChanges, Window, WindowId, WindowProperty, WindowScene, WindowState};
use crate::compositor::{Compositor, SurfaceTarget};
use crate::diagnostics::DiagnosticSource;
use crate::error::{SceneError, WindowError};
use crate::policy::{Notification, PlacementQuery};
use crate::protocol::{DecorationMode, SurfaceHandle};
use crate::output::OutputId;
use crate::scene::{Layer, NodeOwner, SceneNodeId};
use crate::tags::Tags;

const FALLBACK_CONTENT: Size = Size::new(640, 480);

impl Compositor {
    /// A surface appeared. The window is registered and stacked but has no output,
    /// geometry or scene yet.
    pub fn create_window(&mut self, surface: Box<dyn SurfaceHandle>) -> WindowId {
        let id = self.windows.insert_with_key(|id| Window::new(id, surface));
        self.stacking.push(id);
        debug!(window = ?id, "window created");
        self.notify(Notification::WindowCreated(id));
        id
    }

    /// First content submission. Applies pre-map configuration exactly once.
    pub fn initial_commit(&mut self, id: WindowId) -> Result<(), WindowError> {
        let scale = self
            .outputs
            .default_target()
            .and_then(|o| self.outputs.get(o))
            .map_or(1.0, |o| o.scale);
        let appearance = &self.config.appearance;
        let (border, titlebar) = (appearance.border_width, appearance.titlebar_height);

        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if window.initial_configured || window.state != WindowState::Created {
            return Ok(());
        }

        window.size_hints = window.surface.size_hints();
        window.surface.set_preferred_scale(scale);

        let mode = window
            .surface
            .preferred_decoration()
            .unwrap_or(DecorationMode::ServerSide);
        window.decoration_mode = mode;
        window.surface.set_decoration_mode(mode);
        window.frame = Frame {
            border,
            titlebar: if mode == DecorationMode::ServerSide { titlebar } else { 0 },
        };

        let initial = window.size_hints.preferred.unwrap_or_default();
        window.surface.send_configure(initial);
        window.initial_configured = true;
        window.state = WindowState::InitialCommit;
        debug!(window = ?id, ?mode, scale, "initial commit");
        Ok(())
    }

    /// A client committed content of `size`.
    pub fn commit_window(&mut self, id: WindowId, size: Size) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        window.committed_size = size;
        match window.state {
            WindowState::Created => return self.initial_commit(id),
            WindowState::Mapped | WindowState::Resizing => {}
            _ => return Ok(()),
        }

        let frame = window.effective_frame();
        let before = window.geometry;
        if window.configure.complete().is_some() {
            if window.configure.outstanding().is_none() {
                window.state = WindowState::Mapped;
            }
            if window.floating && !window.is_fullscreen() {
                window.geometry = Rect::from_parts(window.geometry.origin(), frame.outer_size(size));
            }
            window.pending.insert(PendingChanges::GEOMETRY);
        } else if window.configure.outstanding().is_none()
            && window.floating
            && !window.is_fullscreen()
            && !size.is_empty()
            && size != frame.content_size(window.geometry.size())
        {
            window.geometry = Rect::from_parts(window.geometry.origin(), frame.outer_size(size));
            window.pending.insert(PendingChanges::GEOMETRY);
        }
        if window.geometry != before {
            self.notify_property(id, WindowProperty::Geometry);
        }
        Ok(())
    }

    /// Places the window, builds its scene subtree and decorations, and emits the
    /// one-time manage notification.
    pub fn map_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        let state = self.windows.get(id).ok_or(WindowError::NotFound(id))?.state;
        match state {
            WindowState::Created => self.initial_commit(id)?,
            WindowState::Mapped | WindowState::Resizing => {
                debug!(window = ?id, "duplicate map, unmapping first");
                self.unmap_window(id)?;
            }
            WindowState::Destroyed => {
                return Err(WindowError::InvalidState {
                    id,
                    state,
                    operation: "map",
                })
            }
            WindowState::InitialCommit | WindowState::Unmapped => {}
        }

        let (token, pid, query_info) = {
            let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
            window.app_id = window.surface.app_id();
            window.title = window.surface.title();
            window.pid = window.surface.pid();
            (window.surface.activation_token(), window.pid, window.info())
        };
        let token = self.activation.take_match(token.as_deref(), pid, Instant::now());

        let query = PlacementQuery {
            window: query_info,
            active_output: self.outputs.default_target(),
            outputs: self.outputs.enabled().map(|o| o.info()).collect(),
        };
        let placement = self.policy.place(&query, &mut self.diagnostics);

        let enabled = |o: &OutputId| self.outputs.get(*o).map_or(false, |out| out.enabled);
        let output = placement
            .output
            .filter(|o| enabled(o))
            .or_else(|| token.as_ref().and_then(|t| t.output).filter(|o| enabled(o)))
            .or_else(|| self.outputs.default_target());
        let (usable, output_tags) = output
            .and_then(|o| self.outputs.get(o))
            .map(|o| (o.usable_area, o.active_tags))
            .unwrap_or_default();

        let tag_count = self.tag_count();
        let default_tags = Tags::from_bits(self.config.general.default_tags).masked(tag_count);
        let tags = placement
            .tags
            .map(|t| t.masked(tag_count))
            .filter(|t| !t.is_empty())
            .or_else(|| token.as_ref().map(|t| t.tags).filter(|t| !t.is_empty()))
            .unwrap_or(if output_tags.is_empty() { default_tags } else { output_tags });

        let color = self.config.appearance.border_color_normal;
        let window = self.windows.get(id).ok_or(WindowError::NotFound(id))?;
        let hints = window.size_hints;
        let floating = placement.floating.unwrap_or_else(|| {
            window.floating
                || (hints.min == hints.max && !hints.min.is_empty())
        });
        let frame = window.frame;
        let with_titlebar = window.decoration_mode == DecorationMode::ServerSide && frame.titlebar > 0;

        let layer = if floating { Layer::Floating } else { Layer::Tiled };
        let scene = match self.build_window_scene(id, layer, color, with_titlebar) {
            Ok(scene) => scene,
            Err(source) => {
                self.abort_window(id, source.clone());
                return Err(WindowError::Scene { id, source });
            }
        };

        let committed = self.windows.get(id).map(|w| w.committed_size).unwrap_or_default();
        let content = if !committed.is_empty() {
            committed
        } else if let Some(preferred) = hints.preferred.filter(|s| !s.is_empty()) {
            preferred
        } else if !usable.is_empty() {
            Size::new(usable.width / 2, usable.height / 2)
        } else {
            FALLBACK_CONTENT
        };
        let content = hints.constrain(content);
        let outer = frame.outer_size(content);
        let geometry = placement
            .geometry
            .unwrap_or_else(|| {
                Rect::new(
                    usable.x + (usable.width - outer.width) / 2,
                    usable.y + (usable.height - outer.height) / 2,
                    outer.width,
                    outer.height,
                )
            })
            .clamp_into(&usable);

        let newly_managed = {
            let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
            window.output = output;
            window.tags = tags;
            window.floating = floating;
            window.geometry = geometry;
            window.prev_geometry = geometry;
            window.scene = Some(scene);
            window.state = WindowState::Mapped;
            window.banned = true;
            window.pending = PendingChanges::all();
            let newly = !window.managed;
            window.managed = true;
            newly
        };
        let target_content = frame.content_size(geometry.size());
        if target_content != committed {
            self.configure_request(id, target_content)?;
        }

        self.stacking.retain(|w| *w != id);
        self.stacking.push(id);
        self.stacking_dirty = true;
        self.visibility_dirty = true;
        if let Some(out) = output.and_then(|o| self.outputs.get_mut(o)) {
            out.needs_arrange = true;
        }

        info!(window = ?id, ?output, %geometry, floating, "window mapped");
        if newly_managed {
            if let Some(window) = self.windows.get(id) {
                let info = window.info();
                self.notify(Notification::WindowManaged(info));
            }
        }

        let wants_focus = token.is_some() || placement.focus.unwrap_or(true);
        let visible = self
            .windows
            .get(id)
            .map_or(false, |w| w.computed_visible(output.and_then(|o| self.outputs.get(o)).map(|o| o.active_tags)));
        if wants_focus && visible {
            self.focus_window(id);
        }
        Ok(())
    }

    fn build_window_scene(
        &mut self,
        id: WindowId,
        layer: Layer,
        color: Color,
        with_titlebar: bool,
    ) -> Result<WindowScene, SceneError> {
        let owner = NodeOwner::Window(id);
        let tree = self.scene.create_tree(self.scene.layer(layer), owner)?;
        match self.populate_window_tree(tree, owner, color, with_titlebar) {
            Ok(scene) => Ok(scene),
            Err(err) => {
                let _ = self.scene.destroy(tree);
                Err(err)
            }
        }
    }

    fn populate_window_tree(
        &mut self,
        tree: SceneNodeId,
        owner: NodeOwner,
        color: Color,
        with_titlebar: bool,
    ) -> Result<WindowScene, SceneError> {
        self.scene.set_enabled(tree, false)?;
        let content = self.scene.create_surface(tree, Size::default(), owner)?;
        let decorations = Decorations::build(&mut self.scene, tree, owner, color, with_titlebar)?;
        Ok(WindowScene {
            tree,
            content,
            decorations,
        })
    }

    /// Tears down a window whose mapping failed. Nothing of it stays registered.
    fn abort_window(&mut self, id: WindowId, err: SceneError) {
        self.diagnostics.record(
            DiagnosticSource::Window,
            format!("window {id:?} could not be mapped: {err}"),
        );
        self.purge_window(id);
        if let Some(mut window) = self.windows.remove(id) {
            window.state = WindowState::Destroyed;
            window.surface.close();
            self.graveyard.push(window);
        }
        self.notify(Notification::WindowDestroyed(id));
    }

    /// Disables rendering, destroys the scene subtree and drops the window from focus.
    /// The window stays registered until destroyed.
    pub fn unmap_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        let window = self.windows.get_mut(id).ok_or(WindowError::NotFound(id))?;
        if !window.is_mapped() {
            return Ok(());
        }
        window.state = WindowState::Unmapped;
        window.configure.clear();
        window.pending = PendingChanges::empty();
        window.banned = true;
        window.activated = false;
        let output = window.output;
        if let Some(scene) = window.scene.take() {
            if let Err(err) = self
                .scene
                .set_enabled(scene.tree, false)
                .and_then(|_| self.scene.destroy(scene.tree))
            {
                warn!(window = ?id, %err, "window scene already gone");
            }
        }

        self.purge_focus(id);
        self.input.forget_window(id);
        if let Some(out) = output.and_then(|o| self.outputs.get_mut(o)) {
            out.needs_arrange = true;
        }
        self.visibility_dirty = true;
        self.stacking_dirty = true;

        debug!(window = ?id, "window unmapped");
        self.notify(Notification::WindowUnmapped(id));
        Ok(())
    }

    /// Removes the window from every registry and schedules it for finalization.
    pub fn destroy_window(&mut self, id: WindowId) -> Result<(), WindowError> {
        let window = self.windows.get(id).ok_or(WindowError::NotFound(id))?;
        if window.is_mapped() {
            self.unmap_window(id)?;
        }

        self.purge_window(id);
        if let Some(mut window) = self.windows.remove(id) {
            window.state = WindowState::Destroyed;
            self.graveyard.push(window);
        }
        debug!(window = ?id, "window destroyed");
        self.notify(Notification::WindowDestroyed(id));
        Ok(())
    }

    fn purge_window(&mut self, id: WindowId) {
        self.stacking.retain(|w| *w != id);
        self.purge_focus(id);
        self.input.forget_window(id);
        self.surfaces.retain(|_, target| *target != SurfaceTarget::Window(id));
        self.property_fallback.forget(id);
    }

    pub fn window(&self, id: WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// All registered windows, bottom of the stacking order first.
    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.stacking.iter().filter_map(|id| self.windows.get(*id))
    }

    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn stacking(&self) -> &[WindowId] {
        &self.stacking
    }
}
