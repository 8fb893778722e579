//! Channel link type definitions.
//!
//! Every link pairs a platform channel with one category of relay
//! traffic. The variants share a single resolution/validity contract:
//! a link routes only when its platform channel reference has been
//! resolved against live platform state.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::Origin;

/// Direction of chat synchronization for a chat channel link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncDirection {
    /// Game chat is mirrored to the platform only.
    GameToPlatform,
    /// Platform chat is mirrored to the game only.
    PlatformToGame,
    /// Messages flow both ways.
    Duplex,
}

impl Default for SyncDirection {
    fn default() -> Self {
        Self::Duplex
    }
}

impl SyncDirection {
    /// Whether this link subscribes to events originating on `origin`.
    pub fn accepts(&self, origin: Origin) -> bool {
        match origin {
            Origin::Game => matches!(self, Self::GameToPlatform | Self::Duplex),
            Origin::Platform => matches!(self, Self::PlatformToGame | Self::Duplex),
        }
    }
}

/// Whether broad "everyone/here"-style mentions may pass through a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadMentionPermission {
    /// Broad mentions are neutralized before delivery.
    NoUser,
    /// Any user may trigger broad mentions.
    AnyUser,
}

impl Default for BroadMentionPermission {
    fn default() -> Self {
        Self::NoUser
    }
}

/// Fine-grained mention allow-list overriding the broad flag per kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionOverrides {
    pub users: bool,
    pub roles: bool,
    pub channels: bool,
}

/// A platform channel resolved against live platform state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChannel {
    pub guild_id: u64,
    pub channel_id: u64,
    pub name: String,
}

/// A lazily resolved reference to a platform channel.
///
/// Persisted as the configured name-or-ID string; the resolved channel
/// is runtime state and never serialized.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelRef {
    /// Channel name or numeric ID as configured by the operator.
    pub target: String,
    #[serde(skip)]
    resolved: Option<ResolvedChannel>,
}

impl ChannelRef {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            resolved: None,
        }
    }

    /// Attach the resolution result. Idempotent; resolving to the same
    /// channel again is a no-op.
    pub fn initialize(&mut self, resolved: ResolvedChannel) {
        self.resolved = Some(resolved);
    }

    /// Drop the resolution, e.g. after a platform reconnect.
    pub fn invalidate(&mut self) {
        self.resolved = None;
    }

    /// A link is never partially valid: both the configured target and
    /// the live resolution must be present.
    pub fn is_valid(&self) -> bool {
        !self.target.trim().is_empty() && self.resolved.is_some()
    }

    pub fn resolved(&self) -> Option<&ResolvedChannel> {
        self.resolved.as_ref()
    }

    /// Whether this reference points at the given live channel, by ID
    /// or by case-insensitive name.
    pub fn refers_to(&self, channel_id: u64, channel_name: &str) -> bool {
        if let Some(res) = &self.resolved {
            return res.channel_id == channel_id;
        }
        self.target == channel_id.to_string() || self.target.eq_ignore_ascii_case(channel_name)
    }
}

/// A chat crossposting link between a game channel and a platform channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLink {
    pub platform_channel: ChannelRef,
    /// Game chat channel name this link is anchored to.
    pub source_channel: String,
    #[serde(default)]
    pub direction: SyncDirection,
    /// Prefix outbound platform messages with a time tag.
    #[serde(default)]
    pub use_timestamp: bool,
    #[serde(default)]
    pub broad_mentions: BroadMentionPermission,
    #[serde(default)]
    pub mention_overrides: MentionOverrides,
}

impl Default for ChatLink {
    fn default() -> Self {
        Self {
            platform_channel: ChannelRef::default(),
            source_channel: defaults::DEFAULT_CHAT_CHANNEL.to_string(),
            direction: SyncDirection::default(),
            use_timestamp: false,
            broad_mentions: BroadMentionPermission::default(),
            mention_overrides: MentionOverrides::default(),
        }
    }
}

impl fmt::Display for ChatLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chat [#{} <-> {}]",
            self.source_channel, self.platform_channel.target
        )
    }
}

/// A one-way structured-posting link with no extra settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedLink {
    pub platform_channel: ChannelRef,
}

impl FeedLink {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            platform_channel: ChannelRef::new(target),
        }
    }
}

/// Component toggles for the server info display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfoLink {
    pub platform_channel: ChannelRef,
    pub use_name: bool,
    pub use_description: bool,
    pub use_logo: bool,
    pub use_connection_info: bool,
    pub use_player_count: bool,
    pub use_player_list: bool,
    pub use_current_time: bool,
    pub use_election_list: bool,
}

impl Default for ServerInfoLink {
    fn default() -> Self {
        Self {
            platform_channel: ChannelRef::default(),
            use_name: true,
            use_description: true,
            use_logo: true,
            use_connection_info: true,
            use_player_count: true,
            use_player_list: true,
            use_current_time: true,
            use_election_list: true,
        }
    }
}

/// Settings for the player list display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerListLink {
    pub platform_channel: ChannelRef,
    pub use_player_count: bool,
    pub use_login_time: bool,
}

/// Settings for the currency display. Numeric fields are clamped to
/// defaults by the coordinator's correction pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyLink {
    pub platform_channel: ChannelRef,
    pub max_minted_count: i32,
    pub max_personal_count: i32,
    pub max_top_holder_count: i32,
}

impl Default for CurrencyLink {
    fn default() -> Self {
        Self {
            platform_channel: ChannelRef::default(),
            max_minted_count: defaults::MAX_MINTED_CURRENCIES,
            max_personal_count: defaults::MAX_PERSONAL_CURRENCIES,
            max_top_holder_count: defaults::MAX_TOP_CURRENCY_HOLDERS,
        }
    }
}

/// The category a flat registry entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Chat,
    TradeFeed,
    CraftingFeed,
    ServerStatusFeed,
    PlayerStatusFeed,
    ElectionFeed,
    ServerInfoDisplay,
    WorkPartyDisplay,
    PlayerListDisplay,
    CurrencyDisplay,
    ElectionDisplay,
    SnippetInput,
    CommandChannel,
}

impl LinkKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Chat => "Chat",
            Self::TradeFeed => "Trade Feed",
            Self::CraftingFeed => "Crafting Feed",
            Self::ServerStatusFeed => "Server Status Feed",
            Self::PlayerStatusFeed => "Player Status Feed",
            Self::ElectionFeed => "Election Feed",
            Self::ServerInfoDisplay => "Server Info Display",
            Self::WorkPartyDisplay => "Work Party Display",
            Self::PlayerListDisplay => "Player List Display",
            Self::CurrencyDisplay => "Currency Display",
            Self::ElectionDisplay => "Election Display",
            Self::SnippetInput => "Snippet Input",
            Self::CommandChannel => "Command Channel",
        }
    }
}

/// A configured link, tagged by kind with its payload.
///
/// Processed through exhaustive matching; all variants share the
/// resolution/validity contract of their platform channel reference.
#[derive(Debug, Clone)]
pub enum Link {
    Chat(ChatLink),
    TradeFeed(FeedLink),
    CraftingFeed(FeedLink),
    ServerStatusFeed(FeedLink),
    PlayerStatusFeed(FeedLink),
    ElectionFeed(FeedLink),
    ServerInfoDisplay(ServerInfoLink),
    WorkPartyDisplay(FeedLink),
    PlayerListDisplay(PlayerListLink),
    CurrencyDisplay(CurrencyLink),
    ElectionDisplay(FeedLink),
    SnippetInput(FeedLink),
    CommandChannel(FeedLink),
}

impl Link {
    pub fn kind(&self) -> LinkKind {
        match self {
            Self::Chat(_) => LinkKind::Chat,
            Self::TradeFeed(_) => LinkKind::TradeFeed,
            Self::CraftingFeed(_) => LinkKind::CraftingFeed,
            Self::ServerStatusFeed(_) => LinkKind::ServerStatusFeed,
            Self::PlayerStatusFeed(_) => LinkKind::PlayerStatusFeed,
            Self::ElectionFeed(_) => LinkKind::ElectionFeed,
            Self::ServerInfoDisplay(_) => LinkKind::ServerInfoDisplay,
            Self::WorkPartyDisplay(_) => LinkKind::WorkPartyDisplay,
            Self::PlayerListDisplay(_) => LinkKind::PlayerListDisplay,
            Self::CurrencyDisplay(_) => LinkKind::CurrencyDisplay,
            Self::ElectionDisplay(_) => LinkKind::ElectionDisplay,
            Self::SnippetInput(_) => LinkKind::SnippetInput,
            Self::CommandChannel(_) => LinkKind::CommandChannel,
        }
    }

    pub fn channel(&self) -> &ChannelRef {
        match self {
            Self::Chat(l) => &l.platform_channel,
            Self::TradeFeed(l)
            | Self::CraftingFeed(l)
            | Self::ServerStatusFeed(l)
            | Self::PlayerStatusFeed(l)
            | Self::ElectionFeed(l)
            | Self::WorkPartyDisplay(l)
            | Self::ElectionDisplay(l)
            | Self::SnippetInput(l)
            | Self::CommandChannel(l) => &l.platform_channel,
            Self::ServerInfoDisplay(l) => &l.platform_channel,
            Self::PlayerListDisplay(l) => &l.platform_channel,
            Self::CurrencyDisplay(l) => &l.platform_channel,
        }
    }

    pub fn channel_mut(&mut self) -> &mut ChannelRef {
        match self {
            Self::Chat(l) => &mut l.platform_channel,
            Self::TradeFeed(l)
            | Self::CraftingFeed(l)
            | Self::ServerStatusFeed(l)
            | Self::PlayerStatusFeed(l)
            | Self::ElectionFeed(l)
            | Self::WorkPartyDisplay(l)
            | Self::ElectionDisplay(l)
            | Self::SnippetInput(l)
            | Self::CommandChannel(l) => &mut l.platform_channel,
            Self::ServerInfoDisplay(l) => &mut l.platform_channel,
            Self::PlayerListDisplay(l) => &mut l.platform_channel,
            Self::CurrencyDisplay(l) => &mut l.platform_channel,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.channel().is_valid()
    }

    pub fn as_chat(&self) -> Option<&ChatLink> {
        match self {
            Self::Chat(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Chat(l) => write!(f, "{}", l),
            other => write!(f, "{} [{}]", other.kind().label(), other.channel().target),
        }
    }
}

/// Default values applied by the correction pass.
pub mod defaults {
    pub const GAME_BOT_NAME: &str = "Courier";
    pub const COMMAND_PREFIX: &str = "?";
    pub const DEFAULT_CHAT_CHANNEL: &str = "general";
    pub const LOG_LEVEL: &str = "info";
    pub const INVITE_MESSAGE: &str = "Join us on the community server!\n[LINK]";
    /// Token in the invite message replaced with the actual invite link.
    pub const INVITE_LINK_TOKEN: &str = "[LINK]";
    pub const MAX_TRACKED_TRADES_PER_USER: i32 = 5;
    pub const MAX_MINTED_CURRENCIES: i32 = 1;
    pub const MAX_PERSONAL_CURRENCIES: i32 = 3;
    pub const MAX_TOP_CURRENCY_HOLDERS: i32 = 3;
    /// Hard cap for top-currency-holder display entries.
    pub const TOP_CURRENCY_HOLDER_LIMIT: i32 = 15;
    pub const ADMIN_ROLES: [&str; 3] = ["Admin", "Administrator", "Moderator"];
}
