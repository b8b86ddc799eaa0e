//! Default paths for rgsweep
//!
//! The configuration file is optional; when present it is looked up at:
//! - `$RGSWEEP_CONFIG` (if set)
//! - `$XDG_CONFIG_HOME/rgsweep/config.toml`
//! - `~/.config/rgsweep/config.toml`

use std::path::PathBuf;

/// Environment variable for overriding the config file path
pub const RGSWEEP_CONFIG_ENV: &str = "RGSWEEP_CONFIG";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Application subdirectory name
const APP_DIR: &str = "rgsweep";

/// Get the default configuration file path, honouring `$RGSWEEP_CONFIG`.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(RGSWEEP_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    config_path_without_env()
}

/// Get the config path without checking the RGSWEEP_CONFIG env var.
pub fn config_path_without_env() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    // Last resort: working directory
    PathBuf::from(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_ends_with_filename() {
        let path = config_path_without_env();
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }
}
