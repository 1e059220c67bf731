//! # NovaDE Window Manager Core (`novade-wm`)
//!
//! This crate is the compositor core of the NovaDE window manager. It owns the
//! on-screen state of every application window across all outputs and reconciles
//! hardware, protocol and policy events into one consistent scene.
//!
//! Components, leaves first:
//! - [`scene`] and [`output`]: the layered scene tree, physical outputs, the shared
//!   layout and panel (layer surface) arrangement.
//! - [`window`]: the per-window state machine `Created → InitialCommit → Mapped →
//!   (Resizing ⇄ Mapped) → Unmapped → Destroyed`, decorations and the typed property table.
//! - [`visibility`]: the once-per-cycle banning pass.
//! - [`input`]: hit-testing, bindings, grabs, pointer constraints and the focus stack.
//! - [`refresh`]: the deferred pass that drains all pending state right before the
//!   event loop blocks.
//!
//! Everything hangs off one explicit [`Compositor`] context. Entities live in
//! generation-checked `slotmap` arenas, so every back-reference is a fallible lookup.
//! The external policy engine is reached through the [`policy::PolicyEngine`] trait;
//! hardware and clients through [`backend::Backend`] and [`protocol::SurfaceHandle`].

pub mod actions;
pub mod activation;
pub mod backend;
pub mod compositor;
pub mod diagnostics;
pub mod error;
pub mod event_loop;
pub mod input;
pub mod output;
pub mod policy;
pub mod process;
pub mod protocol;
pub mod refresh;
pub mod scene;
pub mod tags;
pub mod visibility;
pub mod window;

pub use actions::{Action, Target, Toggle};
pub use compositor::Compositor;
pub use error::{CompositorError, StartupError};
pub use output::{OutputDescriptor, OutputId};
pub use policy::{NoopPolicy, Notification, PolicyEngine};
pub use protocol::{SurfaceHandle, SurfaceKey};
pub use tags::Tags;
pub use window::{WindowId, WindowState};
