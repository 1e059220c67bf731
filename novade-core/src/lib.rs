//! # NovaDE Core Library (`novade-core`)
//!
//! `novade-core` is the foundation layer of the NovaDE window manager. It carries the
//! pieces every other crate in the workspace leans on:
//!
//! - **Error Handling**: [`CoreError`] and its specific companions [`ConfigError`] and
//!   [`LoggingError`].
//! - **Geometry and Color**: integer [`Point`], [`Size`] and [`Rect`] used for output
//!   layouts and window placement, plus the RGBA [`Color`] used by decorations.
//! - **Configuration**: the TOML-backed [`WmConfig`] with defaults and validation,
//!   loaded through [`ConfigLoader`].
//! - **Logging**: a `tracing` based setup with console and optional rolling-file output.
//!
//! ```rust,ignore
//! use novade_core::config::ConfigLoader;
//! use novade_core::logging::init_logging;
//!
//! fn main() -> Result<(), novade_core::CoreError> {
//!     let config = ConfigLoader::load()?;
//!     init_logging(&config.logging, false)?;
//!     tracing::info!("NovaDE core initialized.");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

pub use config::{ConfigLoader, LoggingConfig, WmConfig};
pub use error::{ConfigError, CoreError, LoggingError};
pub use logging::{init_logging, init_minimal_logging};
pub use types::{Color, ColorParseError, Point, Rect, Size};
