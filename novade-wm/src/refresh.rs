//! The deferred refresh pass.
//!
//! Handlers only mark pending state. Right before the event loop blocks, one pass
//! drains it in a fixed order:
//!
//! 1. tell the policy engine a refresh is starting and run the actions it queued
//! 2. arrange outputs: panels, usable areas, tiled/maximized/fullscreen geometry
//! 3. push window geometry into the scene and send coalesced configures
//! 4. border colors
//! 5. the visibility pass
//! 6. z-order
//! 7. the pending focus change, then the borders it recolored
//! 8. free destroyed windows and expire activation tokens
//!
//! Geometry always lands before focus, and a refresh requested while one is running
//! is dropped until the next loop iteration.

use std::time::Instant;

use novade_core::types::Rect;
use tracing::{debug, trace, warn};

use crate::compositor::Compositor;
use crate::diagnostics::DiagnosticSource;
use crate::output::OutputId;
use crate::policy::{ArrangeQuery, Notification};
use crate::scene::{Layer, SceneNodeId};
use crate::window::{PendingChanges, WindowFlags, WindowId};

impl Compositor {
    /// Runs one refresh pass. Returns `false` if a pass was already running.
    pub fn refresh(&mut self) -> bool {
        if self.refresh_in_progress {
            trace!("nested refresh request dropped");
            return false;
        }
        self.refresh_in_progress = true;
        self.actions.reset_cycle();

        self.notify(Notification::RefreshStarting);
        let performed = self.perform_queued_actions();
        if performed > 0 {
            trace!(performed, "policy actions applied");
        }

        self.arrange_outputs();

        self.apply_window_geometry();
        self.flush_configures();

        self.apply_borders();

        if self.visibility_dirty {
            self.run_visibility_pass();
        }

        if self.stacking_dirty {
            self.restack_scene();
        }

        self.apply_pending_focus();
        // Activation changes above mark borders again.
        self.apply_borders();

        if !self.graveyard.is_empty() {
            trace!(count = self.graveyard.len(), "finalizing destroyed windows");
            self.graveyard.clear();
        }
        let expired = self.activation.expire_due(Instant::now());
        if expired > 0 {
            debug!(expired, "activation tokens expired");
        }

        self.refresh_in_progress = false;
        true
    }

    /// Whether pending state is left that another pass would drain.
    pub fn needs_refresh(&self) -> bool {
        self.visibility_dirty
            || self.stacking_dirty
            || self.focus.has_pending()
            || !self.actions.is_empty()
            || !self.graveyard.is_empty()
            || self.outputs.iter().any(|o| o.needs_arrange && o.enabled)
            || self.windows.values().any(|w| w.is_mapped() && !w.pending.is_empty())
    }

    fn arrange_outputs(&mut self) {
        for id in self.outputs.ids() {
            let needs = self
                .outputs
                .get(id)
                .map_or(false, |o| o.needs_arrange && o.enabled);
            if !needs {
                continue;
            }
            let usable_changed = self.arrange_output_panels(id);
            self.arrange_output_windows(id, usable_changed);
            if let Some(output) = self.outputs.get_mut(id) {
                output.needs_arrange = false;
            }
        }
        self.fit_lock_surface();
    }

    /// Asks the policy engine to tile the visible windows of `output`, then re-fits
    /// maximized and fullscreen windows.
    fn arrange_output_windows(&mut self, output: OutputId, usable_changed: bool) {
        let Some((info, geometry, usable)) = self
            .outputs
            .get(output)
            .map(|o| (o.info(), o.geometry(), o.usable_area))
        else {
            return;
        };

        let on_output: Vec<WindowId> = self
            .stacking
            .iter()
            .copied()
            .filter(|id| {
                self.windows
                    .get(*id)
                    .map_or(false, |w| w.output == Some(output) && w.is_mapped())
            })
            .collect();

        let tiled: Vec<WindowId> = on_output
            .iter()
            .copied()
            .filter(|id| {
                self.windows.get(*id).map_or(false, |w| {
                    !w.floating && !w.flags.intersects(WindowFlags::FULLSCREEN | WindowFlags::MAXIMIZED)
                }) && self.is_window_visible(*id)
            })
            .collect();

        if !tiled.is_empty() {
            let query = ArrangeQuery {
                output: info,
                usable_area: usable,
                windows: tiled.clone(),
            };
            let placements = self.policy.arrange(&query, &mut self.diagnostics);
            for (id, rect) in placements {
                if !tiled.contains(&id) {
                    warn!(window = ?id, "policy arranged a window it was not asked about");
                    continue;
                }
                if let Err(err) = self.resize_window(id, rect.clamp_into(&usable)) {
                    self.diagnostics
                        .record(DiagnosticSource::Refresh, format!("arrange failed: {err}"));
                }
            }
        }

        for id in on_output {
            let Some(window) = self.windows.get(id) else {
                continue;
            };
            let target: Option<Rect> = if window.flags.contains(WindowFlags::FULLSCREEN) {
                (window.geometry != geometry).then_some(geometry)
            } else if window.flags.contains(WindowFlags::MAXIMIZED) {
                (window.geometry != usable).then_some(usable)
            } else if usable_changed {
                let clamped = window.geometry.clamp_into(&usable);
                (clamped != window.geometry).then_some(clamped)
            } else {
                None
            };
            if let Some(target) = target {
                if let Err(err) = self.resize_window(id, target) {
                    self.diagnostics
                        .record(DiagnosticSource::Refresh, format!("refit failed: {err}"));
                }
            }
        }
    }

    /// Step 3: scene positions, content sizes, decoration layout and input regions.
    fn apply_window_geometry(&mut self) {
        let mut failures = Vec::new();
        for (id, window) in self.windows.iter_mut() {
            if !window.is_mapped() || !window.pending.contains(PendingChanges::GEOMETRY) {
                continue;
            }
            window.pending.remove(PendingChanges::GEOMETRY);
            let Some(scene) = window.scene.as_ref() else {
                continue;
            };
            let frame = window.effective_frame();
            let content = window.content_geometry();
            let fullscreen = window.flags.contains(WindowFlags::FULLSCREEN);

            let result = self
                .scene
                .set_position(scene.tree, window.geometry.origin())
                .and_then(|_| self.scene.set_position(scene.content, frame.content_offset()))
                .and_then(|_| self.scene.set_size(scene.content, content.size()))
                .and_then(|_| self.scene.set_input_region(scene.content, window.surface.input_region()))
                .and_then(|_| {
                    scene.decorations.layout(
                        &mut self.scene,
                        window.geometry.size(),
                        frame.border,
                        frame.titlebar,
                        !fullscreen,
                    )
                });
            if let Err(err) = result {
                failures.push((id, err));
            }
        }
        for (id, err) in failures {
            self.diagnostics
                .record(DiagnosticSource::Refresh, format!("geometry of {id:?} not applied: {err}"));
        }
    }

    /// Step 4: urgent beats focused beats normal.
    fn apply_borders(&mut self) {
        let appearance = &self.config.appearance;
        let focused = self.focus.focused;
        for (id, window) in self.windows.iter_mut() {
            if !window.pending.contains(PendingChanges::BORDER) {
                continue;
            }
            window.pending.remove(PendingChanges::BORDER);
            let Some(scene) = window.scene.as_ref() else {
                continue;
            };
            let color = if window.flags.contains(WindowFlags::URGENT) {
                appearance.border_color_urgent
            } else if focused == Some(id) {
                appearance.border_color_focused
            } else {
                appearance.border_color_normal
            };
            if let Err(err) = scene.decorations.set_color(&mut self.scene, color) {
                warn!(window = ?id, %err, "border color not applied");
            }
        }
    }

    /// Step 6: moves window subtrees into the layer their state asks for and orders
    /// each layer like the stacking list.
    fn restack_scene(&mut self) {
        self.stacking_dirty = false;
        let layers = [Layer::Tiled, Layer::Floating, Layer::Fullscreen];
        let mut order: [Vec<SceneNodeId>; 3] = Default::default();

        for id in &self.stacking {
            let Some(window) = self.windows.get(*id) else {
                continue;
            };
            let Some(tree) = window.scene.as_ref().map(|s| s.tree) else {
                continue;
            };
            let index = if window.flags.contains(WindowFlags::FULLSCREEN) {
                2
            } else if window.floating {
                1
            } else {
                0
            };
            let parent = self.scene.layer(layers[index]);
            if self.scene.node(tree).and_then(|n| n.parent()) != Some(parent) {
                if let Err(err) = self.scene.reparent(tree, parent) {
                    warn!(window = ?id, %err, "cannot move window to its layer");
                    continue;
                }
                trace!(window = ?id, layer = ?layers[index], "window changed layer");
            }
            order[index].push(tree);
        }

        for (layer, nodes) in layers.iter().zip(order.iter()) {
            let parent = self.scene.layer(*layer);
            if let Err(err) = self.scene.restack(parent, nodes) {
                warn!(?layer, %err, "restack failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::headless::HeadlessSurface;
    use crate::output::OutputDescriptor;
    use crate::policy::NoopPolicy;
    use novade_core::config::WmConfig;
    use novade_core::types::{Color, Point, Size};
    use crate::scene::NodeKind;

    fn compositor() -> Compositor {
        let mut config = WmConfig::default();
        config.appearance.border_width = 2;
        let mut c = Compositor::new(config, Box::new(NoopPolicy)).unwrap();
        c.add_output(OutputDescriptor::new("A", Size::new(1920, 1080))).unwrap();
        c
    }

    fn mapped(c: &mut Compositor, app: &str) -> WindowId {
        let id = c.create_window(Box::new(HeadlessSurface::new(app)));
        c.commit_window(id, Size::default()).unwrap();
        c.map_window(id).unwrap();
        id
    }

    fn border_color(c: &Compositor, id: WindowId) -> Color {
        let node = c.window(id).unwrap().scene().unwrap().decorations().nodes().next().unwrap();
        match c.scene().node(node).unwrap().kind() {
            NodeKind::Rect { color, .. } => *color,
            other => panic!("unexpected node {other:?}"),
        }
    }

    #[test]
    fn test_refresh_applies_geometry_and_visibility() {
        let mut c = compositor();
        let id = mapped(&mut c, "term");
        assert!(c.refresh());

        let window = c.window(id).unwrap();
        let tree = window.scene().unwrap().tree();
        assert_eq!(c.scene().position(tree), Some(window.geometry().origin()));
        assert!(c.scene().is_effectively_enabled(tree));
        assert!(!window.is_banned());
        assert_eq!(c.focused_window(), Some(id));
        assert!(!c.needs_refresh());
    }

    #[test]
    fn test_nested_refresh_is_dropped() {
        let mut c = compositor();
        c.refresh_in_progress = true;
        assert!(!c.refresh());
        c.refresh_in_progress = false;
        assert!(c.refresh());
    }

    #[test]
    fn test_border_color_follows_focus_and_urgency() {
        let mut c = compositor();
        let a = mapped(&mut c, "a");
        let b = mapped(&mut c, "b");
        c.refresh();
        let appearance = c.config().appearance.clone();
        assert_eq!(border_color(&c, b), appearance.border_color_focused);
        assert_eq!(border_color(&c, a), appearance.border_color_normal);

        c.set_urgent(a, true).unwrap();
        c.refresh();
        assert_eq!(border_color(&c, a), appearance.border_color_urgent);
    }

    #[test]
    fn test_focus_change_settles_in_one_pass() {
        let mut c = compositor();
        let a = mapped(&mut c, "a");
        let b = mapped(&mut c, "b");
        c.refresh();
        assert!(!c.needs_refresh());

        c.focus_window(a);
        c.refresh();
        let appearance = c.config().appearance.clone();
        assert_eq!(border_color(&c, a), appearance.border_color_focused);
        assert_eq!(border_color(&c, b), appearance.border_color_normal);
        assert!(c.window(a).unwrap().pending().is_empty());
        assert!(!c.needs_refresh());
    }

    #[test]
    fn test_fullscreen_moves_window_to_fullscreen_layer() {
        let mut c = compositor();
        let id = mapped(&mut c, "video");
        c.refresh();
        c.set_fullscreen(id, true).unwrap();
        c.refresh();

        let window = c.window(id).unwrap();
        assert_eq!(window.geometry(), Rect::new(0, 0, 1920, 1080));
        let tree = window.scene().unwrap().tree();
        assert_eq!(c.scene().layer_of(tree), Some(Layer::Fullscreen));
        assert_eq!(c.scene().position(tree), Some(Point::new(0, 0)));

        c.set_fullscreen(id, false).unwrap();
        c.refresh();
        let window = c.window(id).unwrap();
        assert_eq!(window.geometry(), window.prev_geometry());
        assert_eq!(c.scene().layer_of(tree), Some(Layer::Tiled));
    }

    #[test]
    fn test_graveyard_is_emptied() {
        let mut c = compositor();
        let id = mapped(&mut c, "short-lived");
        c.destroy_window(id).unwrap();
        assert_eq!(c.graveyard_len(), 1);
        c.refresh();
        assert_eq!(c.graveyard_len(), 0);
    }
}
