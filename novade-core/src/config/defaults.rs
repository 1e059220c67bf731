//! Default configuration values.
//!
//! These functions back the `#[serde(default = "...")]` attributes in
//! [`super::types`], so a partially written `config.toml` is always complete.

use super::types::{
    AppearanceConfig, BindingsConfig, GeneralConfig, HeadlessConfig, HeadlessOutputConfig,
    LoggingConfig, SceneConfig,
};
use crate::types::Color;
use std::path::PathBuf;

pub(super) fn default_logging_config() -> LoggingConfig {
    LoggingConfig {
        level: default_log_level(),
        file_path: default_log_file_path(),
        format: default_log_format(),
    }
}

/// Returns the default log level string (`"info"`).
pub(super) fn default_log_level() -> String {
    "info".to_string()
}

/// Returns the default log file path (`None`, i.e. console only).
pub(super) fn default_log_file_path() -> Option<PathBuf> {
    None
}

/// Returns the default log format string (`"text"`).
pub(super) fn default_log_format() -> String {
    "text".to_string()
}

pub(super) fn default_general_config() -> GeneralConfig {
    GeneralConfig {
        tag_count: default_tag_count(),
        default_tags: default_tags(),
        focus_on_click: default_true(),
        activation_timeout_secs: default_activation_timeout_secs(),
        max_policy_actions_per_cycle: default_max_policy_actions(),
    }
}

pub(super) fn default_tag_count() -> u8 {
    9
}

pub(super) fn default_tags() -> u32 {
    1
}

pub(super) fn default_true() -> bool {
    true
}

/// Activation tokens expire after 20 seconds unless configured otherwise.
pub(super) fn default_activation_timeout_secs() -> u64 {
    20
}

pub(super) fn default_max_policy_actions() -> usize {
    1024
}

pub(super) fn default_appearance_config() -> AppearanceConfig {
    AppearanceConfig {
        border_width: default_border_width(),
        titlebar_height: 0,
        border_color_normal: default_border_color_normal(),
        border_color_focused: default_border_color_focused(),
        border_color_urgent: default_border_color_urgent(),
    }
}

pub(super) fn default_border_width() -> i32 {
    1
}

pub(super) fn default_border_color_normal() -> Color {
    Color::from_rgb8(0x44, 0x44, 0x44)
}

pub(super) fn default_border_color_focused() -> Color {
    Color::from_rgb8(0x00, 0x55, 0x77)
}

pub(super) fn default_border_color_urgent() -> Color {
    Color::from_rgb8(0xff, 0x00, 0x00)
}

pub(super) fn default_scene_config() -> SceneConfig {
    SceneConfig {
        max_nodes: default_max_scene_nodes(),
    }
}

pub(super) fn default_max_scene_nodes() -> usize {
    65_536
}

pub(super) fn default_headless_config() -> HeadlessConfig {
    HeadlessConfig {
        outputs: vec![HeadlessOutputConfig {
            name: "HEADLESS-1".to_string(),
            width: 1920,
            height: 1080,
            x: 0,
            y: 0,
            scale: default_scale(),
            enabled: true,
        }],
    }
}

pub(super) fn default_scale() -> f64 {
    1.0
}

pub(super) fn default_bindings_config() -> BindingsConfig {
    BindingsConfig::default()
}

pub(super) fn default_button_context() -> String {
    "global".to_string()
}
