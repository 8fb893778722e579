//! Courier configuration host.
//!
//! Loads the relay configuration, applies corrections and environment
//! overrides, and reports static verification findings. Channel link
//! resolution needs a live platform connection and is performed by the
//! embedding host after connect.

use anyhow::{bail, Result};
use tracing::{error, info, warn};

use courier::config::coordinator::correct;
use courier::config::env::{apply_env_overrides, get_config_path};
use courier::config::parser::load_config;
use courier::config::validate::static_errors;
use courier::links::registry::LinkRegistry;

fn main() -> Result<()> {
    let config_path = get_config_path();
    let loaded = load_config(&config_path);

    // RUST_LOG wins; otherwise the config's log level applies.
    let log_level = loaded
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    info!("Courier v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Loading configuration from {}...", config_path);

    let config = loaded.map_err(|e| {
        error!("Failed to load configuration: {}", e);
        error!(
            "Please ensure {} exists and is properly formatted.",
            config_path
        );
        e
    })?;
    let mut config = apply_env_overrides(config);

    for correction in correct(&mut config) {
        info!("Config correction: {}", correction);
    }

    info!("Configuration loaded successfully");
    info!("  Platform server: {}", config.platform_server);
    info!("  Game bot name: {}", config.game_bot_name);
    info!("  Command prefix: {}", config.command_prefix);
    info!("  Configured links: {}", config.link_count());

    let registry = LinkRegistry::new();
    registry.rebuild(&config);
    for link in registry.snapshot().iter() {
        info!("  {}", link);
    }

    let errors = static_errors(&config);
    if !errors.is_empty() {
        for message in &errors {
            warn!("Verification error: {}", message);
        }
        bail!("configuration verification found {} error(s)", errors.len());
    }

    info!("Static verification passed");
    Ok(())
}
