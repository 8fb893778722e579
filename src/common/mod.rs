//! Shared types and error definitions.

pub mod error;
pub mod messages;

pub use messages::{
    Attachment, GameChatEvent, Mention, MentionKind, Origin, OutboundMessage, PlatformChatEvent,
    RichBlock, RichField,
};
