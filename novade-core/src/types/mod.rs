//! Core data types shared across the NovaDE window manager.
//!
//! - [`geometry`]: integer points, sizes and rectangles in layout coordinates.
//! - [`color`]: RGBA colors for borders and title bars.

pub mod color;
pub mod geometry;

pub use color::{Color, ColorParseError};
pub use geometry::{Point, Rect, Size};
