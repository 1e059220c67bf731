//! XDG Base Directory resolution for the window manager.
//!
//! Relies on the `directories-next` crate. Application directories are derived from
//! the `QUALIFIER` / `ORGANIZATION` / `APPLICATION` triple below, e.g.
//! `~/.config/novade-wm` on Linux.

use crate::error::{ConfigError, CoreError};
use directories_next::ProjectDirs;
use std::path::PathBuf;

const QUALIFIER: &str = "org";
const ORGANIZATION: &str = "NovaDE";
const APPLICATION: &str = "novade-wm";

/// Environment variable that overrides the configuration file location.
pub const CONFIG_PATH_ENV: &str = "NOVADE_WM_CONFIG";

fn project_dirs(dir_type: &str) -> Result<ProjectDirs, CoreError> {
    ProjectDirs::from(QUALIFIER, ORGANIZATION, APPLICATION).ok_or_else(|| {
        CoreError::Config(ConfigError::DirectoryUnavailable {
            dir_type: dir_type.to_string(),
        })
    })
}

/// Returns the application-specific configuration directory.
pub fn get_app_config_dir() -> Result<PathBuf, CoreError> {
    Ok(project_dirs("App Config")?.config_dir().to_path_buf())
}

/// Returns the application-specific local data directory, used to resolve relative
/// log paths.
pub fn get_app_data_dir() -> Result<PathBuf, CoreError> {
    Ok(project_dirs("App Data")?.data_local_dir().to_path_buf())
}

/// Returns the configuration file path, honoring [`CONFIG_PATH_ENV`].
pub fn get_config_file_path() -> Result<PathBuf, CoreError> {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(get_app_config_dir()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(target_os = "linux")]
    fn app_dirs_are_application_specific() {
        // Sandboxes without a home directory have no project dirs at all.
        if let (Ok(config), Ok(data)) = (get_app_config_dir(), get_app_data_dir()) {
            assert!(config.ends_with(APPLICATION));
            assert!(data.ends_with(APPLICATION));
        }
    }
}
