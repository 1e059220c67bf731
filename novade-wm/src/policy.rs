//! The boundary to the external policy engine.
//!
//! The core notifies the engine of transitions and consults it for placement, key
//! matches and tiling. Every call is made through [`PolicyHost`], which contains
//! failures: an `Err` is logged, recorded as a diagnostic and replaced by the
//! built-in default, so a broken script never corrupts compositor state.

use std::fmt;

use novade_core::types::Rect;
use serde::Serialize;
use tracing::{debug, warn};

use crate::actions::Action;
use crate::diagnostics::{DiagnosticSource, Diagnostics};
use crate::error::PolicyError;
use crate::input::{Keysym, Modifiers};
use crate::output::{OutputId, OutputInfo};
use crate::tags::Tags;
use crate::window::properties::WindowProperty;
use crate::window::{WindowId, WindowInfo};

/// Transitions reported to the policy engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Notification {
    WindowCreated(WindowId),
    /// Sent once per window, the first time it is mapped.
    WindowManaged(WindowInfo),
    WindowUnmapped(WindowId),
    WindowDestroyed(WindowId),
    OutputAdded(OutputInfo),
    OutputRemoved { id: OutputId, name: String },
    OutputChanged(OutputInfo),
    PropertyChanged { window: WindowId, property: WindowProperty },
    FocusChanged { old: Option<WindowId>, new: Option<WindowId> },
    RefreshStarting,
    Shutdown,
}

/// Placement request for a window about to be mapped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementQuery {
    pub window: WindowInfo,
    pub active_output: Option<OutputId>,
    pub outputs: Vec<OutputInfo>,
}

/// The engine's answer. `None` fields fall back to the built-in choice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Placement {
    pub output: Option<OutputId>,
    pub tags: Option<Tags>,
    pub floating: Option<bool>,
    /// Outer frame geometry; clamped into the output's usable area.
    pub geometry: Option<Rect>,
    pub focus: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KeyCombo {
    pub modifiers: u8,
    pub keysym: u32,
    pub level0: u32,
}

impl KeyCombo {
    pub fn new(modifiers: Modifiers, keysym: Keysym, level0: Keysym) -> Self {
        Self {
            modifiers: modifiers.stripped().bits(),
            keysym: keysym.0,
            level0: level0.0,
        }
    }
}

/// Tiling request for the visible, non-floating windows of one output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArrangeQuery {
    pub output: OutputInfo,
    pub usable_area: Rect,
    pub windows: Vec<WindowId>,
}

/// Callbacks implemented by the policy engine.
///
/// Every method has a "no decision" default. Actions returned from callbacks are
/// queued and run by the refresh pass of the same cycle.
pub trait PolicyEngine: fmt::Debug {
    fn name(&self) -> &str {
        "policy"
    }

    fn notify(&mut self, _notification: &Notification) -> Result<Vec<Action>, PolicyError> {
        Ok(Vec::new())
    }

    fn place_window(&mut self, _query: &PlacementQuery) -> Result<Placement, PolicyError> {
        Ok(Placement::default())
    }

    /// `Ok(Some(..))` consumes the key and runs the actions; `Ok(None)` passes it on.
    fn match_key(&mut self, _combo: &KeyCombo) -> Result<Option<Vec<Action>>, PolicyError> {
        Ok(None)
    }

    /// Returns outer geometries for tiled windows. Windows left out keep theirs.
    fn arrange(&mut self, _query: &ArrangeQuery) -> Result<Vec<(WindowId, Rect)>, PolicyError> {
        Ok(Vec::new())
    }

    fn shutdown(&mut self) {}
}

/// An engine that never decides anything.
#[derive(Debug, Default)]
pub struct NoopPolicy;

impl PolicyEngine for NoopPolicy {
    fn name(&self) -> &str {
        "noop"
    }
}

/// Owns the engine and guards every call into it.
#[derive(Debug)]
pub struct PolicyHost {
    engine: Option<Box<dyn PolicyEngine>>,
    failures: u64,
}

impl PolicyHost {
    pub fn new(engine: Box<dyn PolicyEngine>) -> Self {
        debug!(engine = engine.name(), "policy engine attached");
        Self {
            engine: Some(engine),
            failures: 0,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.engine.is_some()
    }

    /// Number of failed calls since startup.
    pub fn failures(&self) -> u64 {
        self.failures
    }

    fn contain<T: Default>(
        &mut self,
        call: &str,
        diagnostics: &mut Diagnostics,
        f: impl FnOnce(&mut dyn PolicyEngine) -> Result<T, PolicyError>,
    ) -> T {
        let Some(engine) = self.engine.as_deref_mut() else {
            return T::default();
        };
        match f(engine) {
            Ok(value) => value,
            Err(err) => {
                self.failures += 1;
                warn!(call, %err, "policy callback failed, using default");
                diagnostics.record(DiagnosticSource::Policy, format!("{call}: {err}"));
                T::default()
            }
        }
    }

    pub fn notify(&mut self, notification: &Notification, diagnostics: &mut Diagnostics) -> Vec<Action> {
        self.contain("notify", diagnostics, |e| e.notify(notification))
    }

    pub fn place(&mut self, query: &PlacementQuery, diagnostics: &mut Diagnostics) -> Placement {
        self.contain("place_window", diagnostics, |e| e.place_window(query))
    }

    pub fn match_key(&mut self, combo: &KeyCombo, diagnostics: &mut Diagnostics) -> Option<Vec<Action>> {
        self.contain("match_key", diagnostics, |e| e.match_key(combo))
    }

    pub fn arrange(&mut self, query: &ArrangeQuery, diagnostics: &mut Diagnostics) -> Vec<(WindowId, Rect)> {
        self.contain("arrange", diagnostics, |e| e.arrange(query))
    }

    /// Shuts the engine down and drops it. Later calls return defaults.
    pub fn detach(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            debug!(engine = engine.name(), "policy engine detached");
            engine.shutdown();
        }
    }
}
