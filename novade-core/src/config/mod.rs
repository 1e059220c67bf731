//! Configuration Management for the NovaDE window manager.
//!
//! ## Key Components:
//!
//! - [`types`]: the configuration schema, rooted at [`WmConfig`].
//! - [`defaults`]: default values used by `serde` when a field is missing.
//! - [`loader`]: [`ConfigLoader`], which locates, parses and validates the TOML file.
//!
//! ## Configuration Loading Process:
//!
//! 1. `ConfigLoader::load()` resolves the file path (`$NOVADE_WM_CONFIG` or
//!    `<xdg config>/novade-wm/config.toml`).
//! 2. A missing file yields `WmConfig::default()`.
//! 3. Present files are parsed as TOML; unknown fields are rejected.
//! 4. The result is validated (log level/format normalization, tag count range,
//!    relative log path resolution).
//!
//! ```rust,ignore
//! use novade_core::config::ConfigLoader;
//!
//! match ConfigLoader::load() {
//!     Ok(config) => println!("{} tags configured", config.general.tag_count),
//!     Err(e) => {
//!         novade_core::logging::init_minimal_logging();
//!         tracing::error!("Configuration error: {}", e);
//!     }
//! }
//! ```

pub mod defaults;
pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{
    AppearanceConfig, BindingsConfig, ButtonBindingConfig, GeneralConfig, HeadlessConfig,
    HeadlessOutputConfig, KeyBindingConfig, LoggingConfig, SceneConfig, WmConfig,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Color;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn test_wm_config_default() {
        let config = WmConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.general.tag_count, 9);
        assert_eq!(config.general.default_tags, 1);
        assert_eq!(config.general.activation_timeout_secs, 20);
        assert_eq!(config.headless.outputs.len(), 1);
        assert_eq!(config.headless.outputs[0].width, 1920);
        assert!(config.bindings.keys.is_empty());
    }

    #[test]
    fn test_wm_config_deserialize_minimal() {
        let json_data = r#"{
            "logging": { "level": "debug" },
            "general": { "tag_count": 4 }
        }"#;
        let config: WmConfig = serde_json::from_str(json_data).expect("Failed to deserialize WmConfig");
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.file_path, None);
        assert_eq!(config.general.tag_count, 4);
        assert!(config.general.focus_on_click);
    }

    #[test]
    fn test_wm_config_deserialize_full_toml() {
        let toml_str = r##"
            [logging]
            level = "trace"
            file_path = "/var/log/novade-wm.log"
            format = "json"

            [appearance]
            border_width = 3
            border_color_focused = "#ff0000"

            [[headless.outputs]]
            name = "A"
            width = 1920
            height = 1080

            [[headless.outputs]]
            name = "B"
            width = 1920
            height = 1080
            x = 1920

            [[bindings.keys]]
            modifiers = ["super"]
            key = "Return"
            action = "spawn foot"

            [[bindings.buttons]]
            button = 4
            context = "desktop"
            action = "view 2"
        "##;
        let config: WmConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.logging.file_path, Some(PathBuf::from("/var/log/novade-wm.log")));
        assert_eq!(config.appearance.border_width, 3);
        assert_eq!(config.appearance.border_color_focused, Color::from_rgb8(255, 0, 0));
        assert_eq!(config.headless.outputs[1].x, 1920);
        assert_eq!(config.bindings.keys[0].modifiers, vec!["super".to_string()]);
        assert_eq!(config.bindings.buttons[0].context, "desktop");
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let toml_str = r#"
            [general]
            tag_cnt = 3
        "#;
        assert!(toml::from_str::<WmConfig>(toml_str).is_err());
    }
}
