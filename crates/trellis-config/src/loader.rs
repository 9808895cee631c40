//! Config file loading.

use crate::error::ConfigError;
use crate::model::TrellisConfig;
use directories::ProjectDirs;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_FILE: &str = "trellis.json5";

/// Default config file path under the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "trellis").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

/// Load config from an explicit path.
pub fn load_from_path(path: &Path) -> Result<TrellisConfig, ConfigError> {
    debug!("loading config (path={})", path.display());
    let contents = fs::read_to_string(path)?;
    let config: TrellisConfig = json5::from_str(&contents)?;
    if config.policy.store_id.is_empty() {
        return Err(ConfigError::Invalid(
            "policy.store_id must be set".to_string(),
        ));
    }
    Ok(config)
}

/// Load config from the default location, falling back to defaults when the
/// file does not exist.
pub fn load_config() -> Result<TrellisConfig, ConfigError> {
    let Some(path) = default_config_path() else {
        debug!("no platform config directory, using defaults");
        return Ok(TrellisConfig::default());
    };
    if !path.exists() {
        debug!("config file missing, using defaults (path={})", path.display());
        return Ok(TrellisConfig::default());
    }
    load_from_path(&path)
}
