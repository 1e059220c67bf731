//! Configuration Data Structures for the NovaDE window manager.
//!
//! Every struct uses `#[serde(deny_unknown_fields)]` and pulls missing values
//! from [`super::defaults`].

use super::defaults;
use crate::types::Color;
use serde::Deserialize;
use std::path::PathBuf;

/// Configuration settings for the logging subsystem.
///
/// ```
/// use novade_core::config::LoggingConfig;
///
/// let default_log_config = LoggingConfig::default();
/// assert_eq!(default_log_config.level, "info");
/// assert_eq!(default_log_config.file_path, None);
/// assert_eq!(default_log_config.format, "text");
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Valid values (case-insensitive): "trace", "debug", "info", "warn", "error".
    #[serde(default = "defaults::default_log_level")]
    pub level: String,
    /// Optional log file. Relative paths are resolved against the local data directory.
    #[serde(default = "defaults::default_log_file_path")]
    pub file_path: Option<PathBuf>,
    /// "text" or "json".
    #[serde(default = "defaults::default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        defaults::default_logging_config()
    }
}

/// Window management behavior.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    /// Number of tags (workspaces) per output, 1..=32.
    #[serde(default = "defaults::default_tag_count")]
    pub tag_count: u8,
    /// Tag mask that outputs start with and that new windows inherit when the
    /// policy engine does not decide otherwise.
    #[serde(default = "defaults::default_tags")]
    pub default_tags: u32,
    /// Focus and raise a window when it is clicked.
    #[serde(default = "defaults::default_true")]
    pub focus_on_click: bool,
    /// Lifetime of activation tokens handed to spawned processes.
    #[serde(default = "defaults::default_activation_timeout_secs")]
    pub activation_timeout_secs: u64,
    /// Upper bound of policy-requested actions applied per cycle.
    #[serde(default = "defaults::default_max_policy_actions")]
    pub max_policy_actions_per_cycle: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        defaults::default_general_config()
    }
}

/// Border and title bar appearance.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AppearanceConfig {
    #[serde(default = "defaults::default_border_width")]
    pub border_width: i32,
    /// Height of the title bar decoration; `0` disables title bars.
    #[serde(default)]
    pub titlebar_height: i32,
    #[serde(default = "defaults::default_border_color_normal")]
    pub border_color_normal: Color,
    #[serde(default = "defaults::default_border_color_focused")]
    pub border_color_focused: Color,
    #[serde(default = "defaults::default_border_color_urgent")]
    pub border_color_urgent: Color,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        defaults::default_appearance_config()
    }
}

/// Scene graph limits.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SceneConfig {
    /// Maximum number of live scene nodes. Creating more fails like an
    /// out-of-memory allocation would.
    #[serde(default = "defaults::default_max_scene_nodes")]
    pub max_nodes: usize,
}

impl Default for SceneConfig {
    fn default() -> Self {
        defaults::default_scene_config()
    }
}

/// One virtual output of the headless backend.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeadlessOutputConfig {
    pub name: String,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub x: i32,
    #[serde(default)]
    pub y: i32,
    #[serde(default = "defaults::default_scale")]
    pub scale: f64,
    #[serde(default = "defaults::default_true")]
    pub enabled: bool,
}

/// Headless backend setup.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct HeadlessConfig {
    #[serde(default)]
    pub outputs: Vec<HeadlessOutputConfig>,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        defaults::default_headless_config()
    }
}

/// A declarative key binding, e.g. `modifiers = ["super"]`, `key = "Return"`,
/// `action = "spawn foot"`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KeyBindingConfig {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub key: String,
    pub action: String,
}

/// A declarative pointer button binding. `context` is one of `global`, `panel`
/// or `desktop`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ButtonBindingConfig {
    #[serde(default)]
    pub modifiers: Vec<String>,
    pub button: u32,
    #[serde(default = "defaults::default_button_context")]
    pub context: String,
    pub action: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BindingsConfig {
    #[serde(default)]
    pub keys: Vec<KeyBindingConfig>,
    #[serde(default)]
    pub buttons: Vec<ButtonBindingConfig>,
}

/// Root configuration structure of the window manager.
///
/// ```
/// use novade_core::config::WmConfig;
///
/// let toml_str = r#"
/// [logging]
/// level = "warn"
///
/// [general]
/// tag_count = 5
/// "#;
/// let config: WmConfig = toml::from_str(toml_str).unwrap();
/// assert_eq!(config.logging.level, "warn");
/// assert_eq!(config.general.tag_count, 5);
/// assert_eq!(config.appearance.border_width, 1);
/// ```
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WmConfig {
    #[serde(default = "defaults::default_logging_config")]
    pub logging: LoggingConfig,
    #[serde(default = "defaults::default_general_config")]
    pub general: GeneralConfig,
    #[serde(default = "defaults::default_appearance_config")]
    pub appearance: AppearanceConfig,
    #[serde(default = "defaults::default_scene_config")]
    pub scene: SceneConfig,
    #[serde(default = "defaults::default_headless_config")]
    pub headless: HeadlessConfig,
    #[serde(default = "defaults::default_bindings_config")]
    pub bindings: BindingsConfig,
}

impl Default for WmConfig {
    fn default() -> Self {
        Self {
            logging: defaults::default_logging_config(),
            general: defaults::default_general_config(),
            appearance: defaults::default_appearance_config(),
            scene: defaults::default_scene_config(),
            headless: defaults::default_headless_config(),
            bindings: defaults::default_bindings_config(),
        }
    }
}
