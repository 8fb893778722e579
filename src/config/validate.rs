//! Static configuration validation.
//!
//! Checks required top-level settings and provides helpful messages.
//! Static verification never fails the process; the errors are
//! reported to the operator and the affected features stay inactive.

use crate::config::types::ConfigData;
use crate::links::types::defaults;

/// Collect static configuration errors.
pub fn static_errors(config: &ConfigData) -> Vec<String> {
    let mut errors = Vec::new();

    if config.platform_server.trim().is_empty() {
        errors.push("Platform server not configured.".to_string());
    }

    if config.bot_token.trim().is_empty() {
        errors.push("Bot token not configured. See the README for install instructions.".to_string());
    }

    if !config.invite_message.trim().is_empty()
        && !config
            .invite_message
            .to_lowercase()
            .contains(&defaults::INVITE_LINK_TOKEN.to_lowercase())
    {
        errors.push(format!(
            "Invite message does not contain the invite link token {}.",
            defaults::INVITE_LINK_TOKEN
        ));
    }

    errors
}

/// Quick check that the minimum required fields are populated.
pub fn has_required_fields(config: &ConfigData) -> bool {
    !config.platform_server.trim().is_empty() && !config.bot_token.trim().is_empty()
}
