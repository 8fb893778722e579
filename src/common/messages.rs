//! Canonical message types for relay communication.
//!
//! This module defines the single source of truth for the event and
//! payload types flowing between the game server and the platform.

/// The network a message originated on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// The game server's internal chat.
    Game,
    /// The community platform (guild channels).
    Platform,
}

/// Kind of mention token carried by a platform message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MentionKind {
    User,
    Role,
    Channel,
}

/// A mention entry attached to an inbound event.
#[derive(Debug, Clone)]
pub struct Mention {
    pub kind: MentionKind,
    pub target_id: u64,
}

/// An attachment entry attached to an inbound event.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub file_name: String,
}

/// A chat message event from the game server.
#[derive(Debug, Clone)]
pub struct GameChatEvent {
    /// Game chat channel name (e.g. "general", "trade").
    pub channel: String,
    /// Author's game display name.
    pub author: String,
    /// Raw message text.
    pub content: String,
}

/// A chat message event from the platform.
#[derive(Debug, Clone)]
pub struct PlatformChatEvent {
    /// Platform channel the message was posted in.
    pub channel_id: u64,
    /// Channel name, as known at event time.
    pub channel_name: String,
    /// Guild the channel belongs to.
    pub guild_id: u64,
    /// Author's platform user ID.
    pub author_id: u64,
    /// Author's display name in the guild.
    pub author_name: String,
    /// Raw message text, platform token syntax included.
    pub content: String,
    /// Mention tokens present in the message, in order.
    pub mentions: Vec<Mention>,
    /// Attachments present on the message, in order.
    pub attachments: Vec<Attachment>,
}

/// A field of a rich content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichField {
    pub title: String,
    pub body: String,
}

/// An embed-like rich content block for platform destinations.
///
/// Built by the report collaborators; the relay only carries it and
/// degrades it to plain text when the destination cannot render it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RichBlock {
    pub title: String,
    pub fields: Vec<RichField>,
    pub footer: String,
}

impl RichBlock {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_field(mut self, title: impl Into<String>, body: impl Into<String>) -> Self {
        self.fields.push(RichField {
            title: title.into(),
            body: body.into(),
        });
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = footer.into();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.fields.is_empty() && self.footer.is_empty()
    }
}

/// An outbound message addressed to one destination.
#[derive(Debug, Clone)]
pub enum OutboundMessage {
    /// Plain text to a game chat channel.
    Game { channel: String, text: String },
    /// Text and optional rich block to a platform channel.
    Platform {
        channel_id: u64,
        text: String,
        rich: Option<RichBlock>,
    },
}
