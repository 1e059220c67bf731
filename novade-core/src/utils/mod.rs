//! Utility helpers for the NovaDE core layer.
//!
//! - [`fs`]: directory creation with [`crate::CoreError`] mapping.
//! - [`paths`]: XDG base-directory resolution for the window manager.

pub mod fs;
pub mod paths;
