//! Error types for the compositor core.
//!
//! Each component owns a small `thiserror` enum; [`CompositorError`] wraps them for
//! callers that cross component boundaries. Only [`StartupError`] is fatal: every
//! other error is logged, recorded in the diagnostics ring and absorbed by the caller.

use std::io;

use novade_core::error::{ConfigError, CoreError};
use thiserror::Error;

use crate::output::OutputId;
use crate::window::{WindowId, WindowState};

/// Errors raised by the scene tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The node budget configured in `[scene] max_nodes` is exhausted.
    #[error("scene node allocation failed: {capacity} nodes in use")]
    AllocationFailed { capacity: usize },

    /// The referenced node was already destroyed.
    #[error("scene node no longer exists")]
    StaleNode,

    /// The node cannot be moved under one of its own descendants.
    #[error("cannot reparent a scene node into its own subtree")]
    CyclicReparent,

    /// The root and the fixed layer nodes are never destroyed or moved.
    #[error("scene layer nodes are fixed")]
    FixedNode,
}

/// Errors raised by window operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WindowError {
    #[error("window {0:?} does not exist")]
    NotFound(WindowId),

    #[error("window {id:?} cannot {operation} while {state:?}")]
    InvalidState {
        id: WindowId,
        state: WindowState,
        operation: &'static str,
    },

    #[error("failed to build scene for window {id:?}: {source}")]
    Scene {
        id: WindowId,
        #[source]
        source: SceneError,
    },

    #[error("property '{name}' is read-only")]
    ReadOnlyProperty { name: String },

    #[error("property '{name}' expects a {expected} value")]
    PropertyType { name: String, expected: &'static str },

    #[error("unknown property '{name}'")]
    UnknownProperty { name: String },
}

/// Errors raised by output management.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OutputError {
    #[error("output {0:?} does not exist")]
    NotFound(OutputId),

    #[error("no output named '{0}'")]
    UnknownName(String),

    #[error("an output named '{0}' already exists")]
    DuplicateName(String),

    #[error("output '{name}' has an invalid mode {width}x{height}")]
    InvalidMode { name: String, width: i32, height: i32 },

    #[error("failed to build scene for output '{name}': {source}")]
    Scene {
        name: String,
        #[source]
        source: SceneError,
    },
}

/// Errors reported by a policy engine call. Always contained at the call boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("policy script error: {0}")]
    Script(String),

    #[error("policy returned an invalid value: {0}")]
    InvalidResponse(String),
}

/// Errors raised while parsing a binding action string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("unknown action '{0}'")]
    Unknown(String),

    #[error("action '{action}' needs an argument")]
    MissingArgument { action: String },

    #[error("action '{action}' got an invalid argument '{value}'")]
    InvalidArgument { action: String, value: String },
}

/// Errors raised while spawning or reaping child processes.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("spawn command is empty")]
    EmptyCommand,

    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to install signal pipe: {0}")]
    SignalPipe(#[source] io::Error),

    #[error("waitpid failed: {0}")]
    Wait(#[from] nix::Error),
}

/// Errors raised by a hardware/display backend.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend '{0}' provides no outputs")]
    NoOutputs(String),

    #[error("backend event channel closed")]
    ChannelClosed,

    #[error("virtual terminal switching is not supported by the {0} backend")]
    VtUnsupported(String),

    #[error("backend I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Aggregate error for operations that cross component boundaries.
#[derive(Debug, Error)]
pub enum CompositorError {
    #[error(transparent)]
    Scene(#[from] SceneError),

    #[error(transparent)]
    Window(#[from] WindowError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Action(#[from] ActionError),

    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Fatal errors: the process exits non-zero with a diagnostic.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("core error: {0}")]
    Core(#[from] CoreError),

    #[error("scene graph could not be created: {0}")]
    Scene(#[from] SceneError),

    #[error("backend failed to start: {0}")]
    Backend(#[from] BackendError),

    #[error("event loop error: {0}")]
    EventLoop(String),

    #[error("signal handling could not be installed: {0}")]
    Signals(#[from] ProcessError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_error_display() {
        let err = SceneError::AllocationFailed { capacity: 16 };
        assert_eq!(err.to_string(), "scene node allocation failed: 16 nodes in use");
    }

    #[test]
    fn test_compositor_error_is_transparent() {
        let err: CompositorError = PolicyError::Script("boom".into()).into();
        assert_eq!(err.to_string(), "policy script error: boom");
    }

    #[test]
    fn test_startup_error_wraps_backend() {
        let err: StartupError = BackendError::NoOutputs("headless".into()).into();
        assert!(err.to_string().contains("headless"));
    }
}
