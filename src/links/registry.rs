//! The flat, validated routing table of channel links.
//!
//! Typed sub-collections in `ConfigData` are the source of truth for
//! persistence and editing; this registry aggregates them into one
//! flat table for validation and lookup. Readers operate on an `Arc`
//! snapshot that is replaced wholesale on rebuild, never mutated in
//! place, so concurrent reads never observe a partially built table.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info, warn};

use crate::common::error::LinkError;
use crate::common::Origin;
use crate::config::types::ConfigData;
use crate::config::validate::static_errors;
use crate::links::types::{ChannelRef, ChatLink, FeedLink, Link};
use crate::platform::NetworkState;

/// Scope selector for configuration verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyScope {
    /// Required top-level settings only.
    StaticOnly,
    /// Channel link resolution against live platform state only.
    ChannelLinksOnly,
    /// Both.
    All,
}

impl VerifyScope {
    fn includes_static(&self) -> bool {
        matches!(self, Self::StaticOnly | Self::All)
    }

    fn includes_links(&self) -> bool {
        matches!(self, Self::ChannelLinksOnly | Self::All)
    }
}

/// Outcome of a verification pass. Verification never fails the
/// process; unresolved links are reported and excluded from routing.
#[derive(Debug, Default)]
pub struct VerificationReport {
    pub static_errors: Vec<String>,
    pub unresolved_links: Vec<LinkError>,
    pub verified_links: usize,
}

impl VerificationReport {
    pub fn is_clean(&self) -> bool {
        self.static_errors.is_empty() && self.unresolved_links.is_empty()
    }
}

/// Immutable snapshot of all configured links.
#[derive(Debug, Default)]
pub struct LinkTable {
    entries: Vec<Link>,
    /// Index: lowercase game source channel -> chat link positions.
    by_source_channel: HashMap<String, Vec<usize>>,
    /// Operator display-label overrides per guild ID.
    guild_labels: HashMap<u64, String>,
}

impl LinkTable {
    fn from_config(config: &ConfigData) -> Self {
        let mut entries = Vec::with_capacity(config.link_count());

        entries.extend(config.chat_links.iter().cloned().map(Link::Chat));
        entries.extend(config.trade_feeds.iter().cloned().map(Link::TradeFeed));
        entries.extend(config.crafting_feeds.iter().cloned().map(Link::CraftingFeed));
        entries.extend(
            config
                .server_status_feeds
                .iter()
                .cloned()
                .map(Link::ServerStatusFeed),
        );
        entries.extend(
            config
                .player_status_feeds
                .iter()
                .cloned()
                .map(Link::PlayerStatusFeed),
        );
        entries.extend(config.election_feeds.iter().cloned().map(Link::ElectionFeed));
        entries.extend(
            config
                .server_info_displays
                .iter()
                .cloned()
                .map(Link::ServerInfoDisplay),
        );
        entries.extend(
            config
                .work_party_displays
                .iter()
                .cloned()
                .map(Link::WorkPartyDisplay),
        );
        entries.extend(
            config
                .player_list_displays
                .iter()
                .cloned()
                .map(Link::PlayerListDisplay),
        );
        entries.extend(
            config
                .currency_displays
                .iter()
                .cloned()
                .map(Link::CurrencyDisplay),
        );
        entries.extend(
            config
                .election_displays
                .iter()
                .cloned()
                .map(Link::ElectionDisplay),
        );
        entries.extend(config.snippet_inputs.iter().cloned().map(Link::SnippetInput));
        entries.extend(
            config
                .command_channels
                .iter()
                .cloned()
                .map(Link::CommandChannel),
        );

        let mut by_source_channel: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            if let Link::Chat(chat) = entry {
                by_source_channel
                    .entry(chat.source_channel.to_lowercase())
                    .or_default()
                    .push(idx);
            }
        }

        Self {
            entries,
            by_source_channel,
            guild_labels: config.guild_labels.clone(),
        }
    }

    /// Operator label override for a guild, preferred over the guild's
    /// own name when prefixing fan-out copies.
    pub fn guild_label_override(&self, guild_id: u64) -> Option<&str> {
        self.guild_labels.get(&guild_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.entries.iter()
    }

    /// Whether any valid chat link currently subscribes to events from
    /// the given origin. Cheap existence check used by the relay to
    /// skip transform work.
    pub fn any_chat_route(&self, origin: Origin) -> bool {
        self.entries.iter().any(|entry| match entry {
            Link::Chat(chat) => chat.platform_channel.is_valid() && chat.direction.accepts(origin),
            _ => false,
        })
    }

    /// All valid chat links whose source channel matches (case
    /// insensitive) and whose direction accepts events from `origin`.
    pub fn links_for_source_channel(&self, channel: &str, origin: Origin) -> Vec<&ChatLink> {
        self.by_source_channel
            .get(&channel.to_lowercase())
            .map(|indices| {
                indices
                    .iter()
                    .filter_map(|&i| self.entries[i].as_chat())
                    .filter(|chat| chat.platform_channel.is_valid() && chat.direction.accepts(origin))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Inverse lookup: all valid chat links anchored to the given
    /// platform channel. Used to find the logical channel grouping for
    /// cross-guild fan-out.
    pub fn links_for_destination_channel(
        &self,
        channel_id: u64,
        channel_name: &str,
    ) -> Vec<&ChatLink> {
        self.entries
            .iter()
            .filter_map(Link::as_chat)
            .filter(|chat| {
                chat.platform_channel.is_valid()
                    && chat.platform_channel.refers_to(channel_id, channel_name)
            })
            .collect()
    }

    /// Valid command-channel links, used by the command gateway.
    pub fn command_channels(&self) -> Vec<&FeedLink> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Link::CommandChannel(l) if l.platform_channel.is_valid() => Some(l),
                _ => None,
            })
            .collect()
    }
}

/// Registry handle with atomically swappable table snapshots.
///
/// Single-writer rule: only the config coordinator calls `rebuild`;
/// everything else reads snapshots.
#[derive(Debug, Default)]
pub struct LinkRegistry {
    table: RwLock<Arc<LinkTable>>,
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current table snapshot. Holds no lock beyond the clone.
    pub fn snapshot(&self) -> Arc<LinkTable> {
        self.table
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Clear and repopulate the flat link table from all typed
    /// sub-collections. Idempotent, O(total links).
    pub fn rebuild(&self, config: &ConfigData) {
        let table = Arc::new(LinkTable::from_config(config));
        debug!(links = table.len(), "Rebuilt link table");
        let mut guard = self
            .table
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = table;
    }

    /// Verify the configuration within the requested scope.
    ///
    /// Static checks inspect required top-level settings. Link checks
    /// resolve every link's platform channel against live state; they
    /// are only attempted while the platform connection is established.
    /// Resolution results are written back into the config's
    /// sub-collections and the table is rebuilt, so freshly resolved
    /// links start routing immediately.
    pub async fn validate(
        &self,
        scope: VerifyScope,
        config: &mut ConfigData,
        state: &dyn NetworkState,
    ) -> VerificationReport {
        let mut report = VerificationReport::default();

        if scope.includes_static() {
            report.static_errors = static_errors(config);
            if report.static_errors.is_empty() {
                info!("Static configuration verification completed without errors");
            } else {
                warn!(
                    "Static configuration errors detected:\n{}",
                    report.static_errors.join("\n")
                );
            }
        }

        if scope.includes_links() {
            if !state.is_connected() {
                debug!("Platform not connected; skipping channel link verification");
                return report;
            }

            for channel in channel_refs_mut(config) {
                let target = channel.target.trim().to_string();
                if target.is_empty() {
                    report.unresolved_links.push(LinkError::EmptyReference);
                    continue;
                }
                match state.resolve_channel(&target).await {
                    Some(resolved) => {
                        channel.initialize(resolved);
                        report.verified_links += 1;
                    }
                    None => {
                        channel.invalidate();
                        report.unresolved_links.push(LinkError::ChannelNotFound {
                            channel: target,
                        });
                    }
                }
            }

            self.rebuild(config);

            if report.unresolved_links.is_empty() {
                info!(
                    verified = report.verified_links,
                    "All channel links successfully verified"
                );
            } else {
                let lines: Vec<String> = report
                    .unresolved_links
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                info!("Unverified channels detected:\n * {}", lines.join("\n * "));
            }
        }

        report
    }
}

/// Mutable references to every channel reference in the config, in
/// sub-collection order.
fn channel_refs_mut(config: &mut ConfigData) -> Vec<&mut ChannelRef> {
    let mut refs: Vec<&mut ChannelRef> = Vec::new();
    refs.extend(config.chat_links.iter_mut().map(|l| &mut l.platform_channel));
    refs.extend(config.trade_feeds.iter_mut().map(|l| &mut l.platform_channel));
    refs.extend(config.crafting_feeds.iter_mut().map(|l| &mut l.platform_channel));
    refs.extend(
        config
            .server_status_feeds
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(
        config
            .player_status_feeds
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(config.election_feeds.iter_mut().map(|l| &mut l.platform_channel));
    refs.extend(
        config
            .server_info_displays
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(
        config
            .work_party_displays
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(
        config
            .player_list_displays
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(
        config
            .currency_displays
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(
        config
            .election_displays
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs.extend(config.snippet_inputs.iter_mut().map(|l| &mut l.platform_channel));
    refs.extend(
        config
            .command_channels
            .iter_mut()
            .map(|l| &mut l.platform_channel),
    );
    refs
}
