//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `COURIER_CONFIG` - Path to the config document
//! - `COURIER_BOT_TOKEN` - Platform bot token
//! - `COURIER_PLATFORM_SERVER` - Platform guild name or ID
//! - `COURIER_GAME_BOT_NAME` - Bot name in game chat

use std::env;

use crate::config::types::ConfigData;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "COURIER";

/// Default config document path.
const DEFAULT_CONFIG_PATH: &str = "courier.json";

/// Path to the config document, overridable via `COURIER_CONFIG`.
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Apply environment variable overrides to a config.
///
/// This allows sensitive values like the bot token to be provided via
/// environment variables instead of the config file.
pub fn apply_env_overrides(mut config: ConfigData) -> ConfigData {
    if let Ok(token) = env::var(format!("{}_BOT_TOKEN", ENV_PREFIX)) {
        config.bot_token = token;
    }

    if let Ok(server) = env::var(format!("{}_PLATFORM_SERVER", ENV_PREFIX)) {
        config.platform_server = server;
    }

    if let Ok(name) = env::var(format!("{}_GAME_BOT_NAME", ENV_PREFIX)) {
        config.game_bot_name = name;
    }

    config
}
