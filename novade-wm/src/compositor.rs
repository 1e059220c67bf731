//! The compositor context.
//!
//! [`Compositor`] owns every registry (outputs, panels, windows, the scene tree, focus
//! and input state) and is threaded explicitly through all handlers. It is only ever
//! touched from the event loop thread.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use novade_core::config::WmConfig;
use novade_core::types::{Rect, Size};
use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::actions::ActionQueue;
use crate::activation::ActivationTokens;
use crate::backend::{BackendEvent, BackendRequest, SurfaceEvent};
use crate::diagnostics::{DiagnosticSource, Diagnostics};
use crate::error::{CompositorError, SceneError, StartupError};
use crate::input::{BindingTables, FocusState, InputState};
use crate::output::{OutputDescriptor, OutputId, OutputLayout, Panel, PanelId};
use crate::policy::{Notification, PolicyEngine, PolicyHost};
use crate::process::ProcessManager;
use crate::protocol::{SurfaceHandle, SurfaceKey};
use crate::scene::{Layer, NodeOwner, SceneNodeId, SceneTree};
use crate::window::properties::CustomProperties;
use crate::window::{PropertyFallback, Window, WindowId};

/// What a backend surface key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceTarget {
    Window(WindowId),
    Panel(PanelId),
    Lock,
}

/// The session lock surface. While present it receives all input.
#[derive(Debug)]
pub(crate) struct LockSurface {
    pub(crate) surface: Box<dyn SurfaceHandle>,
    pub(crate) node: SceneNodeId,
}

#[derive(Debug)]
pub struct Compositor {
    pub(crate) config: WmConfig,
    pub(crate) scene: SceneTree,
    pub(crate) outputs: OutputLayout,
    pub(crate) panels: SlotMap<PanelId, Panel>,
    pub(crate) windows: SlotMap<WindowId, Window>,
    /// Bottom to top.
    pub(crate) stacking: Vec<WindowId>,
    pub(crate) focus: FocusState,
    pub(crate) input: InputState,
    pub(crate) activation: ActivationTokens,
    pub(crate) processes: ProcessManager,
    pub(crate) diagnostics: Diagnostics,
    pub(crate) policy: PolicyHost,
    pub(crate) property_fallback: Box<dyn PropertyFallback>,
    pub(crate) surfaces: HashMap<SurfaceKey, SurfaceTarget>,
    pub(crate) visibility_dirty: bool,
    pub(crate) stacking_dirty: bool,
    pub(crate) refresh_in_progress: bool,
    /// Destroyed windows waiting for the end of the refresh pass.
    pub(crate) graveyard: Vec<Window>,
    pub(crate) backend_requests: Vec<BackendRequest>,
    pub(crate) quit_requested: bool,
    pub(crate) lock: Option<LockSurface>,
    pub(crate) actions: ActionQueue,
}

impl Compositor {
    /// Builds an empty compositor. Outputs are added by the backend afterwards.
    pub fn new(config: WmConfig, policy: Box<dyn PolicyEngine>) -> Result<Self, StartupError> {
        let scene = SceneTree::new(config.scene.max_nodes)?;
        let mut diagnostics = Diagnostics::default();

        let (bindings, errors) = BindingTables::from_config(&config.bindings);
        for err in errors {
            diagnostics.record(DiagnosticSource::Config, err.to_string());
        }

        let timeout = Duration::from_secs(config.general.activation_timeout_secs);
        let action_limit = config.general.max_policy_actions_per_cycle;
        info!(
            tag_count = config.general.tag_count,
            max_nodes = config.scene.max_nodes,
            "compositor initialized"
        );
        Ok(Self {
            scene,
            outputs: OutputLayout::new(),
            panels: SlotMap::with_key(),
            windows: SlotMap::with_key(),
            stacking: Vec::new(),
            focus: FocusState::default(),
            input: InputState::new(bindings),
            activation: ActivationTokens::new(timeout),
            processes: ProcessManager::new(),
            diagnostics,
            policy: PolicyHost::new(policy),
            property_fallback: Box::new(CustomProperties::default()),
            surfaces: HashMap::new(),
            visibility_dirty: false,
            stacking_dirty: false,
            refresh_in_progress: false,
            graveyard: Vec::new(),
            backend_requests: Vec::new(),
            quit_requested: false,
            lock: None,
            actions: ActionQueue::new(action_limit),
            config,
        })
    }

    pub fn config(&self) -> &WmConfig {
        &self.config
    }

    pub(crate) fn tag_count(&self) -> u32 {
        u32::from(self.config.general.tag_count)
    }

    pub fn scene(&self) -> &SceneTree {
        &self.scene
    }

    pub fn outputs(&self) -> &OutputLayout {
        &self.outputs
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.values()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Text of all retained diagnostics, for display by the policy engine.
    pub fn diagnostics_text(&self) -> String {
        self.diagnostics.text()
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    pub fn bindings(&self) -> &BindingTables {
        &self.input.bindings
    }

    pub fn bindings_mut(&mut self) -> &mut BindingTables {
        &mut self.input.bindings
    }

    pub fn activation_tokens(&self) -> &ActivationTokens {
        &self.activation
    }

    pub(crate) fn activation_tokens_mut(&mut self) -> &mut ActivationTokens {
        &mut self.activation
    }

    pub fn set_property_fallback(&mut self, fallback: Box<dyn PropertyFallback>) {
        self.property_fallback = fallback;
    }

    pub fn take_backend_requests(&mut self) -> Vec<BackendRequest> {
        std::mem::take(&mut self.backend_requests)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn request_quit(&mut self) {
        self.quit_requested = true;
    }

    pub fn graveyard_len(&self) -> usize {
        self.graveyard.len()
    }

    pub fn is_visibility_dirty(&self) -> bool {
        self.visibility_dirty
    }

    pub fn surface_target(&self, key: SurfaceKey) -> Option<SurfaceTarget> {
        self.surfaces.get(&key).copied()
    }

    /// Sends a notification to the policy engine and queues the actions it returns.
    pub(crate) fn notify(&mut self, notification: Notification) {
        let actions = self.policy.notify(&notification, &mut self.diagnostics);
        if !actions.is_empty() {
            self.queue_actions(actions);
        }
    }

    /// Adds the outputs a backend reported at startup. A backend that yields no
    /// usable output is a fatal error.
    pub fn add_initial_outputs(&mut self, outputs: Vec<OutputDescriptor>) -> Result<(), StartupError> {
        let mut added = 0;
        for desc in outputs {
            let name = desc.name.clone();
            match self.add_output(desc) {
                Ok(_) => added += 1,
                Err(err) => warn!(output = %name, %err, "skipping output"),
            }
        }
        if added == 0 {
            return Err(crate::error::BackendError::NoOutputs("startup".into()).into());
        }
        Ok(())
    }

    /// Routes one backend event. Failures are absorbed into diagnostics.
    pub fn handle_backend_event(&mut self, event: BackendEvent) {
        let result: Result<(), CompositorError> = match event {
            BackendEvent::Input(input) => {
                self.handle_input(input);
                Ok(())
            }
            BackendEvent::OutputConnected(desc) => self.add_output(desc).map(|_| ()).map_err(Into::into),
            BackendEvent::OutputDisconnected(name) => match self.outputs.by_name(&name) {
                Some(id) => self.remove_output(id).map_err(Into::into),
                None => {
                    debug!(output = %name, "disconnect for unknown output ignored");
                    Ok(())
                }
            },
            BackendEvent::OutputsChanged(changes) => self.apply_output_changes(&changes).map_err(Into::into),
            BackendEvent::NewToplevel { key, surface } => {
                let id = self.create_window(surface);
                self.surfaces.insert(key, SurfaceTarget::Window(id));
                Ok(())
            }
            BackendEvent::NewPanel {
                key,
                output,
                descriptor,
                surface,
            } => {
                let output = output.and_then(|name| self.outputs.by_name(&name));
                self.create_panel(output, descriptor, surface)
                    .map(|id| {
                        self.surfaces.insert(key, SurfaceTarget::Panel(id));
                    })
                    .map_err(Into::into)
            }
            BackendEvent::NewLockSurface { key, surface } => self
                .lock_session(surface)
                .map(|_| {
                    self.surfaces.insert(key, SurfaceTarget::Lock);
                })
                .map_err(Into::into),
            BackendEvent::Surface { key, event } => self.handle_surface_event(key, event),
            BackendEvent::Closed => {
                info!("backend closed the display connection");
                self.quit_requested = true;
                Ok(())
            }
        };
        if let Err(err) = result {
            self.diagnostics
                .record(DiagnosticSource::Window, format!("backend event failed: {err}"));
        }
    }

    fn handle_surface_event(&mut self, key: SurfaceKey, event: SurfaceEvent) -> Result<(), CompositorError> {
        let Some(target) = self.surfaces.get(&key).copied() else {
            debug!(?key, ?event, "event for unknown surface ignored");
            return Ok(());
        };
        match target {
            SurfaceTarget::Window(id) => self.handle_window_event(id, event),
            SurfaceTarget::Panel(id) => {
                match event {
                    SurfaceEvent::Map => self.map_panel(id)?,
                    SurfaceEvent::Unmap => self.unmap_panel(id),
                    SurfaceEvent::Destroy => {
                        self.destroy_panel(id);
                        self.surfaces.remove(&key);
                    }
                    _ => {}
                }
                Ok(())
            }
            SurfaceTarget::Lock => {
                if matches!(event, SurfaceEvent::Unmap | SurfaceEvent::Destroy) {
                    self.unlock_session();
                    self.surfaces.remove(&key);
                }
                Ok(())
            }
        }
    }

    fn handle_window_event(&mut self, id: WindowId, event: SurfaceEvent) -> Result<(), CompositorError> {
        match event {
            SurfaceEvent::Commit(size) => self.commit_window(id, size)?,
            SurfaceEvent::AckConfigure(serial) => {
                self.ack_configure(id, serial)?;
            }
            SurfaceEvent::Map => self.map_window(id)?,
            SurfaceEvent::Unmap => self.unmap_window(id)?,
            SurfaceEvent::Destroy => self.destroy_window(id)?,
            SurfaceEvent::Title(title) => self.update_window_title(id, title)?,
            SurfaceEvent::AppId(app_id) => self.update_window_app_id(id, app_id)?,
            SurfaceEvent::RequestFullscreen(on) => self.set_fullscreen(id, on)?,
            SurfaceEvent::RequestMaximized(on) => self.set_maximized(id, on)?,
            SurfaceEvent::RequestMinimize => self.set_minimized(id, true)?,
            SurfaceEvent::RequestActivate(token) => self.activate_window(id, token.as_deref()),
            SurfaceEvent::RequestMove => self.begin_move_grab(id),
            SurfaceEvent::RequestResize => self.begin_resize_grab(id),
            SurfaceEvent::PointerConstraint(Some(kind)) => self.set_pointer_constraint(id, kind)?,
            SurfaceEvent::PointerConstraint(None) => {
                self.remove_pointer_constraint(id);
            }
        }
        Ok(())
    }

    /// A client asked for its window to be activated. With a live matching token the
    /// window is focused; otherwise it is only marked urgent.
    pub fn activate_window(&mut self, id: WindowId, token: Option<&str>) {
        if self.focus.focused == Some(id) {
            return;
        }
        let matched = token
            .and_then(|t| self.activation.take_match(Some(t), None, Instant::now()))
            .is_some();
        if matched && self.is_window_visible(id) {
            debug!(window = ?id, "activation token honoured");
            self.focus_window(id);
            let _ = self.raise_window(id);
        } else {
            debug!(window = ?id, matched, "activation request marks window urgent");
            let _ = self.set_urgent(id, true);
        }
    }

    /// Shows the lock surface over every output and moves all input to it.
    pub fn lock_session(&mut self, mut surface: Box<dyn SurfaceHandle>) -> Result<(), SceneError> {
        if self.lock.is_some() {
            warn!("session already locked, rejecting second lock surface");
            surface.close();
            return Ok(());
        }
        let bounds = self.outputs.bounds();
        let node = self
            .scene
            .create_surface(self.scene.layer(Layer::Lock), bounds.size(), NodeOwner::Lock)?;
        self.scene.set_position(node, bounds.origin())?;

        if let Some(window) = self.focus.focused.and_then(|id| self.windows.get_mut(id)) {
            window.surface.keyboard_leave();
        }
        if let Some(panel) = self.focus.panel_keyboard.and_then(|id| self.panels.get_mut(id)) {
            panel.surface.keyboard_leave();
        }
        self.input.grab = None;
        surface.send_configure(bounds.size());
        surface.keyboard_enter();
        self.lock = Some(LockSurface { surface, node });
        info!("session locked");
        Ok(())
    }

    pub fn unlock_session(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        if let Err(err) = self.scene.destroy(lock.node) {
            warn!(%err, "lock scene node already gone");
        }
        if let Some(panel) = self.focus.panel_keyboard.and_then(|id| self.panels.get_mut(id)) {
            panel.surface.keyboard_enter();
        }
        self.restore_keyboard_focus();
        info!("session unlocked");
    }

    pub fn is_locked(&self) -> bool {
        self.lock.is_some()
    }

    /// Resizes the lock surface after the layout changed.
    pub(crate) fn fit_lock_surface(&mut self) {
        let bounds: Rect = self.outputs.bounds();
        if let Some(lock) = self.lock.as_mut() {
            let current = match self.scene.node(lock.node).map(|n| n.kind().clone()) {
                Some(crate::scene::NodeKind::Surface { size, .. }) => size,
                _ => Size::default(),
            };
            if current != bounds.size() {
                let _ = self.scene.set_position(lock.node, bounds.origin());
                let _ = self.scene.set_size(lock.node, bounds.size());
                lock.surface.send_configure(bounds.size());
            }
        }
    }

    /// Tears everything down: windows, then panels, then outputs, then the policy
    /// engine.
    pub fn shutdown(&mut self) {
        info!(windows = self.windows.len(), outputs = self.outputs.len(), "shutting down");
        let windows: Vec<WindowId> = self.windows.keys().collect();
        for id in windows {
            if let Err(err) = self.destroy_window(id) {
                warn!(window = ?id, %err, "window teardown failed");
            }
        }
        self.graveyard.clear();

        let panels: Vec<PanelId> = self.panels.keys().collect();
        for id in panels {
            self.destroy_panel(id);
        }
        self.unlock_session();

        let outputs: Vec<OutputId> = self.outputs.ids();
        for id in outputs {
            if let Err(err) = self.remove_output(id) {
                warn!(output = ?id, %err, "output teardown failed");
            }
        }
        self.surfaces.clear();
        self.activation.clear();

        self.notify(Notification::Shutdown);
        self.policy.detach();
    }
}
