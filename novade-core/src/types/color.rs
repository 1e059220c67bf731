//! RGBA colors for decorations.
//!
//! Colors are stored as 8-bit channels, which is what the scene's rectangle nodes
//! consume. They parse from `#rgb`, `#rgba`, `#rrggbb` and `#rrggbbaa` strings.

use serde::{de::Error as SerdeError, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Error type for color parsing operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    /// The string does not start with `#`.
    #[error("Invalid hex color string format: '{0}'. Expected #RGB, #RGBA, #RRGGBB, or #RRGGBBAA.")]
    InvalidHexFormat(String),

    /// A component was not valid hexadecimal.
    #[error("Invalid hex digit in '{input_str}': {source}")]
    InvalidHexDigit {
        input_str: String,
        #[source]
        source: ParseIntError,
    },

    /// Wrong number of digits after `#`.
    #[error("Invalid hex color string length: '{0}'. Expected 3, 4, 6, or 8 characters after '#'.")]
    InvalidHexLength(String),
}

/// An RGBA color with 8-bit channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    /// Creates a color from its four channels.
    pub const fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Color { r, g, b, a }
    }

    /// Creates an opaque color.
    pub const fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Color::from_rgba8(r, g, b, 0xff)
    }

    /// Parses a hexadecimal color string.
    ///
    /// ```
    /// use novade_core::types::Color;
    /// assert_eq!(Color::from_hex("#ff8000").unwrap(), Color::from_rgb8(255, 128, 0));
    /// assert_eq!(Color::from_hex("#0008").unwrap(), Color::from_rgba8(0, 0, 0, 0x88));
    /// ```
    pub fn from_hex(hex_str: &str) -> Result<Self, ColorParseError> {
        let digits = hex_str
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::InvalidHexFormat(hex_str.to_string()))?;

        let parse = |s: &str| {
            u8::from_str_radix(s, 16).map_err(|source| ColorParseError::InvalidHexDigit {
                input_str: hex_str.to_string(),
                source,
            })
        };
        // Short forms repeat each digit: "f" -> "ff".
        let short = |i: usize| -> Result<u8, ColorParseError> {
            let c = &digits[i..i + 1];
            parse(&format!("{c}{c}"))
        };

        if !digits.is_ascii() {
            return Err(ColorParseError::InvalidHexFormat(hex_str.to_string()));
        }
        match digits.len() {
            3 => Ok(Color::from_rgb8(short(0)?, short(1)?, short(2)?)),
            4 => Ok(Color::from_rgba8(short(0)?, short(1)?, short(2)?, short(3)?)),
            6 => Ok(Color::from_rgb8(parse(&digits[0..2])?, parse(&digits[2..4])?, parse(&digits[4..6])?)),
            8 => Ok(Color::from_rgba8(
                parse(&digits[0..2])?,
                parse(&digits[2..4])?,
                parse(&digits[4..6])?,
                parse(&digits[6..8])?,
            )),
            _ => Err(ColorParseError::InvalidHexLength(hex_str.to_string())),
        }
    }

    /// Formats the color as `#rrggbbaa`.
    pub fn to_hex_with_alpha(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Color::from_hex(s.trim())
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_with_alpha())
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex_with_alpha())
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Color::from_hex(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_lengths() {
        assert_eq!(Color::from_hex("#fff").unwrap(), Color::from_rgb8(255, 255, 255));
        assert_eq!(Color::from_hex("#1234").unwrap(), Color::from_rgba8(0x11, 0x22, 0x33, 0x44));
        assert_eq!(Color::from_hex("#005577").unwrap(), Color::from_rgb8(0x00, 0x55, 0x77));
        assert_eq!(Color::from_hex("#00557780").unwrap(), Color::from_rgba8(0x00, 0x55, 0x77, 0x80));
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(Color::from_hex("005577"), Err(ColorParseError::InvalidHexFormat(_))));
        assert!(matches!(Color::from_hex("#12345"), Err(ColorParseError::InvalidHexLength(_))));
        assert!(matches!(Color::from_hex("#zzzzzz"), Err(ColorParseError::InvalidHexDigit { .. })));
    }

    #[test]
    fn hex_round_trip_through_display() {
        let c = Color::from_rgba8(0x12, 0x34, 0x56, 0x78);
        assert_eq!(c.to_string(), "#12345678");
        assert_eq!(c.to_string().parse::<Color>().unwrap(), c);
    }
}
