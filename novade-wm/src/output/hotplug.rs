//! Output hotplug, reconfiguration and window migration.

use novade_core::types::{Point, Rect, Size};
use tracing::{debug, info, warn};

use super::{OutputDescriptor, OutputId, OutputScene, PanelLayer};
use crate::compositor::Compositor;
use crate::diagnostics::DiagnosticSource;
use crate::error::{CompositorError, OutputError, SceneError, WindowError};
use crate::policy::Notification;
use crate::scene::NodeOwner;
use crate::tags::Tags;
use crate::window::{PendingChanges, WindowFlags, WindowId};
use crate::window::properties::WindowProperty;

/// One entry of a layout reconfiguration. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputChange {
    pub name: String,
    pub enabled: Option<bool>,
    pub position: Option<Point>,
    pub mode: Option<Size>,
    pub scale: Option<f64>,
}

impl OutputChange {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

impl Compositor {
    /// Hotplug: adds an output to the layout and gives it its panel subtrees.
    pub fn add_output(&mut self, desc: OutputDescriptor) -> Result<OutputId, OutputError> {
        let general = &self.config.general;
        let tags = Tags::from_bits(general.default_tags).masked(u32::from(general.tag_count));
        let id = self.outputs.insert(&desc, tags)?;

        if let Err(source) = self.build_output_scene(id) {
            self.outputs.remove(id);
            self.diagnostics.record(
                DiagnosticSource::Output,
                format!("output '{}' could not be added: {source}", desc.name),
            );
            return Err(OutputError::Scene {
                name: desc.name,
                source,
            });
        }

        info!(output = ?id, name = %desc.name, enabled = desc.enabled, "output added");
        if desc.enabled {
            self.adopt_orphaned_windows(id);
        }
        self.visibility_dirty = true;
        if let Some(output) = self.outputs.get(id) {
            let info = output.info();
            self.notify(Notification::OutputAdded(info));
        }
        Ok(id)
    }

    fn build_output_scene(&mut self, id: OutputId) -> Result<(), SceneError> {
        let layers = [
            PanelLayer::Background,
            PanelLayer::Bottom,
            PanelLayer::Top,
            PanelLayer::Overlay,
        ];
        let mut created = Vec::with_capacity(layers.len());
        for layer in layers {
            let parent = self.scene.layer(layer.scene_layer());
            match self.scene.create_tree(parent, NodeOwner::None) {
                Ok(node) => created.push(node),
                Err(err) => {
                    for node in created {
                        let _ = self.scene.destroy(node);
                    }
                    return Err(err);
                }
            }
        }
        let panel_trees = [created[0], created[1], created[2], created[3]];

        let enabled = self.outputs.get(id).map_or(false, |o| o.enabled);
        for tree in panel_trees {
            self.scene.set_enabled(tree, enabled)?;
        }
        if let Some(output) = self.outputs.get_mut(id) {
            output.scene = Some(OutputScene { panel_trees });
        }
        Ok(())
    }

    /// Hot-unplug. Runs detach from layout, then reassignment of windows to the
    /// fallback output, then frees the panel subtrees and the output itself.
    pub fn remove_output(&mut self, id: OutputId) -> Result<(), OutputError> {
        let name = self
            .outputs
            .get(id)
            .map(|o| o.name.clone())
            .ok_or(OutputError::NotFound(id))?;

        self.outputs.detach(id);

        let fallback = self.outputs.fallback(id);
        self.evacuate_output(id, fallback);

        let panels = self.outputs.get(id).map(|o| o.panels.clone()).unwrap_or_default();
        for panel in panels {
            if let Some(p) = self.panels.get_mut(panel) {
                p.surface.close();
            }
            self.destroy_panel(panel);
        }

        if let Some(output) = self.outputs.remove(id) {
            if let Some(scene) = output.scene {
                for tree in scene.panel_trees {
                    if let Err(err) = self.scene.destroy(tree) {
                        warn!(output = %name, %err, "panel subtree already gone");
                    }
                }
            }
        }

        info!(output = ?id, name = %name, fallback = ?fallback, "output removed");
        self.visibility_dirty = true;
        self.notify(Notification::OutputRemoved { id, name });
        Ok(())
    }

    /// Enables or disables an output in place. Disabling migrates its windows to the
    /// fallback output.
    pub fn set_output_enabled(&mut self, id: OutputId, enabled: bool) -> Result<(), OutputError> {
        let output = self.outputs.get_mut(id).ok_or(OutputError::NotFound(id))?;
        if output.enabled == enabled {
            return Ok(());
        }
        output.enabled = enabled;
        output.needs_arrange = true;
        let trees = output.scene.map(|s| s.panel_trees);
        if let Some(trees) = trees {
            for tree in trees {
                let _ = self.scene.set_enabled(tree, enabled);
            }
        }
        self.outputs.recompute_bounds();

        if enabled {
            if self.outputs.default_target() == Some(id) {
                self.outputs.set_active(id);
            }
            self.adopt_orphaned_windows(id);
        } else {
            let fallback = self.outputs.fallback(id);
            if self.outputs.active() == Some(id) {
                if let Some(fallback) = fallback {
                    self.outputs.set_active(fallback);
                }
            }
            self.evacuate_output(id, fallback);
        }

        debug!(output = ?id, enabled, "output enable state changed");
        self.visibility_dirty = true;
        if let Some(output) = self.outputs.get(id) {
            let info = output.info();
            self.notify(Notification::OutputChanged(info));
        }
        Ok(())
    }

    /// Applies a batch of layout changes: disables first, then enables and
    /// reconfigurations, then bounds and usable areas are recomputed.
    ///
    /// Unknown output names reject the whole batch before anything changes.
    pub fn apply_output_changes(&mut self, changes: &[OutputChange]) -> Result<(), OutputError> {
        let mut resolved = Vec::with_capacity(changes.len());
        for change in changes {
            let id = self
                .outputs
                .by_name(&change.name)
                .ok_or_else(|| OutputError::UnknownName(change.name.clone()))?;
            if let Some(mode) = change.mode {
                if mode.width <= 0 || mode.height <= 0 {
                    return Err(OutputError::InvalidMode {
                        name: change.name.clone(),
                        width: mode.width,
                        height: mode.height,
                    });
                }
            }
            resolved.push((id, change));
        }

        for (id, change) in &resolved {
            if change.enabled == Some(false) {
                self.set_output_enabled(*id, false)?;
            }
        }

        for (id, change) in &resolved {
            if let Some(output) = self.outputs.get_mut(*id) {
                if let Some(position) = change.position {
                    output.position = position;
                }
                if let Some(mode) = change.mode {
                    output.mode = mode;
                }
                if let Some(scale) = change.scale.filter(|s| *s > 0.0) {
                    output.scale = scale;
                }
                output.needs_arrange = true;
            }
            if change.enabled == Some(true) {
                self.set_output_enabled(*id, true)?;
            }
        }

        self.outputs.recompute_bounds();
        for id in self.outputs.ids() {
            if let Some(output) = self.outputs.get_mut(id) {
                output.needs_arrange = true;
            }
        }
        self.visibility_dirty = true;
        Ok(())
    }

    /// Moves every window of `from` to `fallback`, clamping it into the fallback's
    /// usable area. Without a fallback the windows are orphaned until an output
    /// appears.
    fn evacuate_output(&mut self, from: OutputId, fallback: Option<OutputId>) {
        let target = fallback.and_then(|f| self.outputs.get(f)).map(|o| (o.id, o.geometry(), o.usable_area));

        let mut moved = Vec::new();
        for (id, window) in self.windows.iter_mut() {
            if window.output != Some(from) {
                continue;
            }
            let before = window.geometry;
            match target {
                Some((target_id, geometry, usable)) => {
                    window.output = Some(target_id);
                    if window.flags.contains(WindowFlags::FULLSCREEN) {
                        window.prev_geometry = window.prev_geometry.clamp_into(&usable);
                        window.geometry = geometry;
                    } else {
                        window.geometry = window.geometry.clamp_into(&usable);
                    }
                    window.pending.insert(PendingChanges::GEOMETRY);
                }
                None => window.output = None,
            }
            moved.push((id, before != window.geometry));
        }

        if let Some((target_id, _, _)) = target {
            if let Some(output) = self.outputs.get_mut(target_id) {
                output.needs_arrange = true;
            }
        }
        for (id, resized) in moved {
            debug!(window = ?id, from = ?from, to = ?fallback, "window migrated");
            self.notify_property(id, WindowProperty::Output);
            if resized {
                self.notify_property(id, WindowProperty::Geometry);
            }
        }
    }

    fn adopt_orphaned_windows(&mut self, id: OutputId) {
        let Some(usable) = self.outputs.get(id).map(|o| o.usable_area) else {
            return;
        };
        let orphans: Vec<WindowId> = self
            .windows
            .iter()
            .filter(|(_, w)| w.output.is_none() && w.is_mapped())
            .map(|(wid, _)| wid)
            .collect();
        for wid in orphans {
            let mut resized = false;
            if let Some(window) = self.windows.get_mut(wid) {
                window.output = Some(id);
                let clamped = window.geometry.clamp_into(&usable);
                resized = clamped != window.geometry;
                window.geometry = clamped;
                window.pending.insert(PendingChanges::GEOMETRY);
            }
            self.notify_property(wid, WindowProperty::Output);
            if resized {
                self.notify_property(wid, WindowProperty::Geometry);
            }
        }
    }

    /// Moves a window to another output, keeping its position relative to the
    /// output origin and then clamping it into the target's usable area. Tag
    /// membership is kept; the target's active tags are used only when none of the
    /// window's tags exist there.
    pub fn move_window_to_output(
        &mut self,
        window: WindowId,
        target: OutputId,
    ) -> Result<(), CompositorError> {
        let (target_geometry, usable, target_tags) = self
            .outputs
            .get(target)
            .filter(|o| o.enabled)
            .map(|o| (o.geometry(), o.usable_area, o.active_tags))
            .ok_or(OutputError::NotFound(target))?;
        let source = self
            .windows
            .get(window)
            .ok_or(WindowError::NotFound(window))?
            .output;
        if source == Some(target) {
            return Ok(());
        }
        let source_origin = source
            .and_then(|s| self.outputs.get(s))
            .map(|o| o.position)
            .unwrap_or_default();

        let translate = |rect: Rect| {
            rect.translate(
                target_geometry.x - source_origin.x,
                target_geometry.y - source_origin.y,
            )
            .clamp_into(&usable)
        };

        let tag_count = self.tag_count();
        let mut resized = false;
        if let Some(w) = self.windows.get_mut(window) {
            let before = w.geometry;
            w.output = Some(target);
            if w.flags.contains(WindowFlags::FULLSCREEN) {
                w.prev_geometry = translate(w.prev_geometry);
                w.geometry = target_geometry;
            } else {
                w.geometry = translate(w.geometry);
            }
            resized = before != w.geometry;
            let kept = w.tags.masked(tag_count);
            if !kept.is_empty() {
                w.tags = kept;
            } else if !target_tags.is_empty() {
                w.tags = target_tags;
            }
            w.pending.insert(PendingChanges::GEOMETRY);
        }

        for output in [source, Some(target)].into_iter().flatten() {
            if let Some(out) = self.outputs.get_mut(output) {
                out.needs_arrange = true;
            }
        }
        if self.focus.focused == Some(window) {
            self.outputs.set_active(target);
        }
        self.visibility_dirty = true;
        self.unfocus_if_invisible();
        self.notify_property(window, WindowProperty::Output);
        if resized {
            self.notify_property(window, WindowProperty::Geometry);
        }
        Ok(())
    }

    pub fn output_at(&self, point: Point) -> Option<OutputId> {
        self.outputs.output_at(point)
    }

    pub fn active_output(&self) -> Option<OutputId> {
        self.outputs.active()
    }

    pub fn set_active_output(&mut self, id: OutputId) {
        self.outputs.set_active(id);
    }
}
