//! Configuration type definitions.
//!
//! `ConfigData` is the persisted document: scalar settings plus one
//! typed sub-collection per link kind. The sub-collections are the
//! source of truth for persistence and editing; the flat registry
//! table is rebuilt from them after every structural change.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::links::types::{
    defaults, ChatLink, CurrencyLink, FeedLink, PlayerListLink, ServerInfoLink,
};

/// Root configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigData {
    // Platform connection identity. Changing either of these while
    // running forces a full reconnect.
    /// Name or numeric ID of the platform guild to operate in.
    pub platform_server: String,
    /// Bot credential for the platform API.
    pub bot_token: String,

    /// Name the relay bot posts under in game chat.
    pub game_bot_name: String,
    /// Roles recognized as having admin permissions on the platform.
    pub admin_roles: Vec<String>,
    /// Prefix for platform-side commands.
    pub command_prefix: String,
    /// Message posted by the invite command; must contain the
    /// invite-link token.
    pub invite_message: String,
    /// Max tracked-trade displays per user.
    pub max_tracked_trades_per_user: i32,
    /// Log filter used when `RUST_LOG` is not set.
    pub log_level: String,

    // Game server presentation, used by the report collaborators.
    pub server_name: String,
    pub server_description: String,
    pub server_logo: String,
    pub connection_info: String,

    /// Display-label overrides per guild ID, used as the fan-out
    /// prefix. Falls back to the guild's own name.
    pub guild_labels: HashMap<u64, String>,

    // Link sub-collections, one per kind.
    pub chat_links: Vec<ChatLink>,
    pub trade_feeds: Vec<FeedLink>,
    pub crafting_feeds: Vec<FeedLink>,
    pub server_status_feeds: Vec<FeedLink>,
    pub player_status_feeds: Vec<FeedLink>,
    pub election_feeds: Vec<FeedLink>,
    pub server_info_displays: Vec<ServerInfoLink>,
    pub work_party_displays: Vec<FeedLink>,
    pub player_list_displays: Vec<PlayerListLink>,
    pub currency_displays: Vec<CurrencyLink>,
    pub election_displays: Vec<FeedLink>,
    pub snippet_inputs: Vec<FeedLink>,
    pub command_channels: Vec<FeedLink>,
}

impl Default for ConfigData {
    fn default() -> Self {
        Self {
            platform_server: String::new(),
            bot_token: String::new(),
            game_bot_name: defaults::GAME_BOT_NAME.to_string(),
            admin_roles: defaults::ADMIN_ROLES.iter().map(|s| s.to_string()).collect(),
            command_prefix: defaults::COMMAND_PREFIX.to_string(),
            invite_message: defaults::INVITE_MESSAGE.to_string(),
            max_tracked_trades_per_user: defaults::MAX_TRACKED_TRADES_PER_USER,
            log_level: defaults::LOG_LEVEL.to_string(),
            server_name: String::new(),
            server_description: String::new(),
            server_logo: String::new(),
            connection_info: String::new(),
            guild_labels: HashMap::new(),
            chat_links: Vec::new(),
            trade_feeds: Vec::new(),
            crafting_feeds: Vec::new(),
            server_status_feeds: Vec::new(),
            player_status_feeds: Vec::new(),
            election_feeds: Vec::new(),
            server_info_displays: Vec::new(),
            work_party_displays: Vec::new(),
            player_list_displays: Vec::new(),
            currency_displays: Vec::new(),
            election_displays: Vec::new(),
            snippet_inputs: Vec::new(),
            command_channels: Vec::new(),
        }
    }
}

impl ConfigData {
    /// Total number of configured links across all sub-collections.
    pub fn link_count(&self) -> usize {
        self.chat_links.len()
            + self.trade_feeds.len()
            + self.crafting_feeds.len()
            + self.server_status_feeds.len()
            + self.player_status_feeds.len()
            + self.election_feeds.len()
            + self.server_info_displays.len()
            + self.work_party_displays.len()
            + self.player_list_displays.len()
            + self.currency_displays.len()
            + self.election_displays.len()
            + self.snippet_inputs.len()
            + self.command_channels.len()
    }
}

/// Immutable copy of the configuration taken after every successful
/// save. Used solely to diff the live config against the last-saved
/// state and classify changes as critical or cosmetic.
#[derive(Debug, Clone)]
pub struct ConfigSnapshot(ConfigData);

impl ConfigSnapshot {
    pub fn of(config: &ConfigData) -> Self {
        Self(config.clone())
    }

    /// Whether identity-critical fields changed since this snapshot.
    pub fn critical_change(&self, config: &ConfigData) -> bool {
        self.0.bot_token != config.bot_token || self.0.platform_server != config.platform_server
    }

    /// Whether the command prefix changed since this snapshot. Prefix
    /// changes only take effect after a restart, which is worth telling
    /// the operator about.
    pub fn prefix_changed(&self, config: &ConfigData) -> bool {
        self.0.command_prefix != config.command_prefix
    }
}
