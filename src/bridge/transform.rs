//! Per-network content rewriting.
//!
//! Translates message bodies between platform token syntax (mention and
//! emoji tokens) and the plain text the game chat can render, and the
//! other way around. Every transform is total: any input string yields
//! an output string, unmatched tokens stay as readable literals.

use std::collections::HashMap;

use chrono::Local;
use fancy_regex::Regex;

use crate::common::{Attachment, PlatformChatEvent};
use crate::links::types::{BroadMentionPermission, ChatLink};

/// Zero-width space, inserted after mention sigils to keep the text
/// readable without letting the destination parse it as a mention.
const NEUTRALIZER: char = '\u{200B}';

/// Membership name snapshots used for mention rewriting.
///
/// Collected once per inbound event so the rewrite itself stays
/// synchronous and free of lookups against live state.
#[derive(Debug, Clone, Default)]
pub struct NameMaps {
    pub users: HashMap<u64, String>,
    pub roles: HashMap<u64, String>,
    pub channels: HashMap<u64, String>,
}

/// Message transformer for game <-> platform content rewriting.
#[derive(Debug, Clone)]
pub struct ContentTransformer {
    /// Pattern for platform user mentions (<@123> or <@!123>).
    user_mention: Regex,
    /// Pattern for platform channel mentions (<#123>).
    channel_mention: Regex,
    /// Pattern for platform role mentions (<@&123>).
    role_mention: Regex,
    /// Pattern for platform custom emojis (<:name:id> or <a:name:id>).
    custom_emoji: Regex,
    /// Pattern for broad mentions (@everyone / @here).
    broad_mention: Regex,
    /// Emoji shortcode -> game icon name overrides.
    icon_map: HashMap<String, String>,
}

impl Default for ContentTransformer {
    fn default() -> Self {
        Self::new(HashMap::new())
    }
}

impl ContentTransformer {
    /// Create a transformer. `icon_map` maps lowercase emoji shortcodes
    /// to the icon names the game chat understands; shortcodes without
    /// a mapping pass through as `:shortcode:` text.
    pub fn new(icon_map: HashMap<String, String>) -> Self {
        Self {
            user_mention: Regex::new(r"<@!?(\d+)>").unwrap(),
            channel_mention: Regex::new(r"<#(\d+)>").unwrap(),
            role_mention: Regex::new(r"<@&(\d+)>").unwrap(),
            custom_emoji: Regex::new(r"<a?:([a-zA-Z0-9_]+):\d+>").unwrap(),
            broad_mention: Regex::new(r"@(everyone|here)").unwrap(),
            icon_map,
        }
    }

    /// Rewrite a platform message body for the game chat.
    ///
    /// Mentions resolve against the supplied name snapshots; an ID with
    /// no entry stays as the literal token. Attachments are listed by
    /// file name in a trailing section.
    pub fn platform_to_game(&self, event: &PlatformChatEvent, names: &NameMaps) -> String {
        let step1 = self.unicode_emojis_to_icons(&event.content);
        let step2 = self.resolve_user_mentions(&step1, &names.users);
        let step3 = self.resolve_role_mentions(&step2, &names.roles);
        let step4 = self.resolve_channel_mentions(&step3, &names.channels);
        let step5 = self.custom_emojis_to_icons(&step4);
        self.append_attachments(step5, &event.attachments)
    }

    /// Wrap a game message body for a platform channel link.
    ///
    /// Optionally prefixes a time tag and neutralizes the mention
    /// categories the link does not grant.
    pub fn game_to_platform(&self, text: &str, link: &ChatLink) -> String {
        let mut result = self.neutralize_mentions(text, link);

        if link.use_timestamp {
            result = format!("[{}] {}", Local::now().format("%H:%M"), result);
        }

        result
    }

    /// Convert platform user mentions to plain `@DisplayName` text.
    fn resolve_user_mentions(&self, message: &str, users: &HashMap<u64, String>) -> String {
        self.user_mention
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                if let Ok(user_id) = caps[1].parse::<u64>() {
                    if let Some(name) = users.get(&user_id) {
                        return format!("@{}", name);
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    /// Convert platform role mentions to plain `@RoleName` text.
    fn resolve_role_mentions(&self, message: &str, roles: &HashMap<u64, String>) -> String {
        self.role_mention
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                if let Ok(role_id) = caps[1].parse::<u64>() {
                    if let Some(name) = roles.get(&role_id) {
                        return format!("@{}", name);
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    /// Convert platform channel mentions to plain `#ChannelName` text.
    fn resolve_channel_mentions(&self, message: &str, channels: &HashMap<u64, String>) -> String {
        self.channel_mention
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                if let Ok(channel_id) = caps[1].parse::<u64>() {
                    if let Some(name) = channels.get(&channel_id) {
                        return format!("#{}", name);
                    }
                }
                caps[0].to_string()
            })
            .to_string()
    }

    /// Convert custom emoji tokens to icon tags the game can render,
    /// degrading unmapped names to a plain `:name:` token.
    fn custom_emojis_to_icons(&self, message: &str) -> String {
        self.custom_emoji
            .replace_all(message, |caps: &fancy_regex::Captures| -> String {
                let name = caps[1].to_lowercase();
                match self.icon_map.get(&name) {
                    Some(icon) => format!(":{}:", icon),
                    None => format!(":{}:", name),
                }
            })
            .to_string()
    }

    /// Convert Unicode emoji to icon tags via their shortcode, mapped
    /// through the icon table when an override exists.
    fn unicode_emojis_to_icons(&self, message: &str) -> String {
        let mut result = String::with_capacity(message.len() * 2);
        let mut chars = message.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch.is_ascii() {
                result.push(ch);
                continue;
            }

            // Multi-codepoint emoji need the following scalar too.
            let mut grapheme = ch.to_string();
            if let Some(&next) = chars.peek() {
                if !next.is_ascii() && emojis::get(&format!("{}{}", grapheme, next)).is_some() {
                    grapheme.push(next);
                    chars.next();
                }
            }

            match emojis::get(grapheme.as_str()) {
                Some(emoji) => {
                    let shortcode = emoji.shortcode().unwrap_or_else(|| emoji.name());
                    let icon = self
                        .icon_map
                        .get(&shortcode.to_lowercase())
                        .map(String::as_str)
                        .unwrap_or(shortcode);
                    result.push(':');
                    result.push_str(icon);
                    result.push(':');
                }
                None => result.push_str(&grapheme),
            }
        }

        result
    }

    /// Append an "Attachments:" section listing file names.
    fn append_attachments(&self, mut message: String, attachments: &[Attachment]) -> String {
        if attachments.is_empty() {
            return message;
        }

        message.push_str("\nAttachments:");
        for attachment in attachments {
            message.push('\n');
            message.push_str(&attachment.file_name);
        }
        message
    }

    /// Neutralize mention syntax the link does not grant by inserting a
    /// zero-width space after the sigil.
    fn neutralize_mentions(&self, text: &str, link: &ChatLink) -> String {
        let mut result = text.to_string();

        if link.broad_mentions == BroadMentionPermission::NoUser {
            result = self
                .broad_mention
                .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                    format!("@{}{}", NEUTRALIZER, &caps[1])
                })
                .to_string();
        }

        if !link.mention_overrides.users {
            result = self
                .user_mention
                .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                    format!("<@{}{}>", NEUTRALIZER, &caps[1])
                })
                .to_string();
        }

        if !link.mention_overrides.roles {
            result = self
                .role_mention
                .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                    format!("<@&{}{}>", NEUTRALIZER, &caps[1])
                })
                .to_string();
        }

        if !link.mention_overrides.channels {
            result = self
                .channel_mention
                .replace_all(&result, |caps: &fancy_regex::Captures| -> String {
                    format!("<#{}{}>", NEUTRALIZER, &caps[1])
                })
                .to_string();
        }

        result
    }
}
