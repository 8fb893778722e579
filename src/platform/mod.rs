//! Interfaces to the two chat networks.
//!
//! Client plumbing (connecting, authenticating, transport rate limits)
//! lives behind these traits; the relay core only ever talks to them.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::common::error::DeliveryResult;
use crate::common::RichBlock;
use crate::links::types::ResolvedChannel;

/// Outbound send surface for both networks.
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    /// Send plain text to a game chat channel.
    async fn send_game_text(&self, channel: &str, text: &str) -> DeliveryResult<()>;

    /// Send plain text to a platform channel.
    async fn send_platform_text(&self, channel_id: u64, text: &str) -> DeliveryResult<()>;

    /// Send a rich content block to a platform channel.
    async fn send_platform_rich(&self, channel_id: u64, block: &RichBlock) -> DeliveryResult<()>;
}

/// Live platform state used for link resolution and permission checks.
#[async_trait]
pub trait NetworkState: Send + Sync {
    /// Whether the platform connection is currently established.
    fn is_connected(&self) -> bool;

    /// Resolve a configured channel name-or-ID against live state.
    async fn resolve_channel(&self, target: &str) -> Option<ResolvedChannel>;

    /// Whether the bot may render rich content in the given channel.
    async fn channel_allows_rich_content(&self, channel_id: u64) -> bool;

    /// Display label for a guild, used as the fan-out prefix when no
    /// operator override is configured for the guild ID.
    async fn guild_label(&self, guild_id: u64) -> String;
}

/// Membership resolution for mention rewriting.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    /// Resolve a user ID to the display name used in the guild.
    async fn resolve_display_name(&self, user_id: u64) -> Option<String>;

    /// Snapshot of known user display names, keyed by ID.
    async fn user_names(&self) -> HashMap<u64, String>;

    /// Snapshot of known role names, keyed by ID.
    async fn role_names(&self) -> HashMap<u64, String>;

    /// Snapshot of known channel names, keyed by ID.
    async fn channel_names(&self) -> HashMap<u64, String>;
}
