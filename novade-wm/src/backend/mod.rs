//! Hardware and protocol backends.
//!
//! A backend owns the display connection and the client protocol. It reports outputs
//! at startup and then feeds [`BackendEvent`]s through a `calloop` channel. Client
//! surfaces are identified by a [`SurfaceKey`] the backend chooses; the compositor
//! maps keys to windows and panels.

pub mod headless;

use calloop::channel::Sender;
use novade_core::types::Size;

use crate::error::BackendError;
use crate::input::{ConstraintKind, InputEvent};
use crate::output::{OutputChange, OutputDescriptor, PanelDescriptor};
use crate::protocol::{Serial, SurfaceHandle, SurfaceKey};

pub trait Backend {
    fn name(&self) -> &str;

    /// Connects to the display and returns the outputs present at startup. Failure
    /// here is fatal.
    fn init(&mut self, events: Sender<BackendEvent>) -> Result<Vec<OutputDescriptor>, BackendError>;

    fn switch_vt(&mut self, vt: u32) -> Result<(), BackendError>;
}

/// Events a backend delivers to the compositor.
#[derive(Debug)]
pub enum BackendEvent {
    Input(InputEvent),
    OutputConnected(OutputDescriptor),
    OutputDisconnected(String),
    OutputsChanged(Vec<OutputChange>),
    NewToplevel {
        key: SurfaceKey,
        surface: Box<dyn SurfaceHandle>,
    },
    NewPanel {
        key: SurfaceKey,
        /// Requested output by name; `None` uses the active output.
        output: Option<String>,
        descriptor: PanelDescriptor,
        surface: Box<dyn SurfaceHandle>,
    },
    NewLockSurface {
        key: SurfaceKey,
        surface: Box<dyn SurfaceHandle>,
    },
    Surface {
        key: SurfaceKey,
        event: SurfaceEvent,
    },
    /// The display connection is gone.
    Closed,
}

/// Per-surface protocol events.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Commit(Size),
    AckConfigure(Serial),
    Map,
    Unmap,
    Destroy,
    Title(Option<String>),
    AppId(Option<String>),
    RequestFullscreen(bool),
    RequestMaximized(bool),
    RequestMinimize,
    /// Activation request, optionally carrying a token.
    RequestActivate(Option<String>),
    RequestMove,
    RequestResize,
    PointerConstraint(Option<ConstraintKind>),
}

/// Requests from the compositor that only the backend can carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendRequest {
    SwitchVt(u32),
}
