//! Configuration Loading for the NovaDE window manager.
//!
//! [`ConfigLoader`] locates `config.toml`, deserializes it, falls back to defaults
//! when the file is missing and validates the result.
//!
//! ## Validation
//!
//! - Log level and format are normalized to lowercase and checked.
//! - Relative log file paths are resolved against the application data directory.
//! - `general.tag_count` must lie in `1..=32` and `general.default_tags` must select
//!   at least one existing tag.
//! - Border width and title bar height must not be negative.

use std::fs;
use std::path::Path;

use crate::config::WmConfig;
use crate::error::{ConfigError, CoreError};
use crate::utils::fs as nova_fs;
use crate::utils::paths::{get_app_data_dir, get_config_file_path};

/// `ConfigLoader` provides static methods to load and validate [`WmConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads and validates the configuration from its default location.
    ///
    /// A missing file is not an error: `WmConfig::default()` is validated and returned.
    pub fn load() -> Result<WmConfig, CoreError> {
        let path = get_config_file_path()?;
        Self::load_from_path(&path)
    }

    /// Loads and validates the configuration from an explicit path.
    pub fn load_from_path(path: &Path) -> Result<WmConfig, CoreError> {
        match fs::read_to_string(path) {
            Ok(content) => {
                tracing::info!("Loading configuration from {:?}", path);
                Self::load_from_str(&content)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No configuration file at {:?}, using defaults.", path);
                let mut config = WmConfig::default();
                Self::validate_config(&mut config)?;
                Ok(config)
            }
            Err(e) => Err(CoreError::Config(ConfigError::ReadError {
                path: path.to_path_buf(),
                source: e,
            })),
        }
    }

    /// Parses and validates configuration from a TOML string.
    pub fn load_from_str(content: &str) -> Result<WmConfig, CoreError> {
        let mut config: WmConfig = if content.trim().is_empty() {
            WmConfig::default()
        } else {
            toml::from_str(content).map_err(ConfigError::ParseError)?
        };
        Self::validate_config(&mut config)?;
        Ok(config)
    }

    /// Validates and normalizes a configuration in place.
    pub fn validate_config(config: &mut WmConfig) -> Result<(), CoreError> {
        let level_lower = config.logging.level.to_lowercase();
        match level_lower.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {
                config.logging.level = level_lower;
            }
            _ => {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Invalid log level: '{}'. Must be one of trace, debug, info, warn, error.",
                    config.logging.level
                ))));
            }
        }

        let format_lower = config.logging.format.to_lowercase();
        match format_lower.as_str() {
            "text" | "json" => {
                config.logging.format = format_lower;
            }
            _ => {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Invalid log format: '{}'. Must be one of text, json.",
                    config.logging.format
                ))));
            }
        }

        if let Some(log_path) = &config.logging.file_path {
            if !log_path.is_absolute() {
                let absolute_path = get_app_data_dir()?.join(log_path);
                config.logging.file_path = Some(absolute_path);
            }
            if let Some(parent_dir) = config.logging.file_path.as_ref().and_then(|p| p.parent()) {
                if !parent_dir.as_os_str().is_empty() && !parent_dir.exists() {
                    nova_fs::ensure_dir_exists(parent_dir)?;
                }
            }
        }

        let general = &config.general;
        if general.tag_count == 0 || general.tag_count > 32 {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "Invalid tag_count: {}. Must be between 1 and 32.",
                general.tag_count
            ))));
        }
        let tag_mask = if general.tag_count == 32 {
            u32::MAX
        } else {
            (1u32 << general.tag_count) - 1
        };
        if general.default_tags & tag_mask == 0 {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "default_tags {:#x} selects no tag out of {}.",
                general.default_tags, general.tag_count
            ))));
        }
        if general.activation_timeout_secs == 0 {
            return Err(CoreError::Config(ConfigError::ValidationError(
                "activation_timeout_secs must be greater than zero.".to_string(),
            )));
        }
        config.general.default_tags &= tag_mask;

        let appearance = &config.appearance;
        if appearance.border_width < 0 || appearance.titlebar_height < 0 {
            return Err(CoreError::Config(ConfigError::ValidationError(format!(
                "border_width ({}) and titlebar_height ({}) must not be negative.",
                appearance.border_width, appearance.titlebar_height
            ))));
        }

        for output in &config.headless.outputs {
            if output.width <= 0 || output.height <= 0 || output.scale <= 0.0 {
                return Err(CoreError::Config(ConfigError::ValidationError(format!(
                    "Headless output '{}' has an invalid mode {}x{}@{}.",
                    output.name, output.width, output.height, output.scale
                ))));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = ConfigLoader::load_from_path(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, WmConfig::default());
    }

    #[test]
    fn load_from_file_normalizes_values() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"DEBUG\"\nformat = \"Json\"\n[general]\ntag_count = 4\ndefault_tags = 0x13").unwrap();
        let config = ConfigLoader::load_from_path(file.path()).unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        // Bits beyond the fourth tag are dropped.
        assert_eq!(config.general.default_tags, 0x3);
    }

    #[test]
    fn invalid_log_level_is_rejected() {
        let err = ConfigLoader::load_from_str("[logging]\nlevel = \"loud\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::ValidationError(_))));
    }

    #[test]
    fn tag_count_out_of_range_is_rejected() {
        assert!(ConfigLoader::load_from_str("[general]\ntag_count = 0").is_err());
        assert!(ConfigLoader::load_from_str("[general]\ntag_count = 33").is_err());
        assert!(ConfigLoader::load_from_str("[general]\ntag_count = 32").is_ok());
    }

    #[test]
    fn zero_activation_timeout_is_rejected_before_masking() {
        let err = ConfigLoader::load_from_str("[general]\ndefault_tags = 0x3\nactivation_timeout_secs = 0")
            .unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::ValidationError(m)) if m.contains("activation_timeout_secs")));
    }

    #[test]
    fn parse_errors_surface_as_parse_error() {
        let err = ConfigLoader::load_from_str("[general\n").unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::ParseError(_))));
    }

    #[test]
    fn negative_border_is_rejected() {
        assert!(ConfigLoader::load_from_str("[appearance]\nborder_width = -1").is_err());
    }

    #[test]
    fn absolute_log_path_gets_parent_created() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("logs/wm.log");
        let content = format!("[logging]\nfile_path = {:?}", log.to_string_lossy());
        let config = ConfigLoader::load_from_str(&content).unwrap();
        assert_eq!(config.logging.file_path, Some(log.clone()));
        assert!(log.parent().unwrap().is_dir());
    }
}
