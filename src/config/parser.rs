//! Configuration document persistence (JSON).
//!
//! The document must round-trip every field exactly, including empty
//! collections, so live edits saved back to disk never lose state.

use std::fs;
use std::path::Path;

use crate::common::error::{ConfigError, ConfigResult};
use crate::config::types::ConfigData;

/// Load configuration from a JSON file.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<ConfigData> {
    let path = path.as_ref();

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;

    load_config_str(&content)
}

/// Load configuration from a JSON string.
pub fn load_config_str(content: &str) -> ConfigResult<ConfigData> {
    serde_json::from_str(content).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })
}

/// Save configuration to a JSON file, pretty-printed for hand editing.
pub fn save_config(path: impl AsRef<Path>, config: &ConfigData) -> ConfigResult<()> {
    let path = path.as_ref();

    let content = serde_json::to_string_pretty(config).map_err(|e| ConfigError::Parse {
        message: e.to_string(),
    })?;

    fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.display().to_string(),
        source,
    })
}
