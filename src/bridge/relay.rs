//! Chat relay core.
//!
//! Decides destinations for one inbound chat event and hands the
//! rewritten copies to the outbound dispatcher. The engine only reads
//! atomic registry snapshots and owns no mutable shared state, so
//! concurrent inbound events never interfere.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::bridge::dispatch::Dispatcher;
use crate::bridge::transform::{ContentTransformer, NameMaps};
use crate::common::{GameChatEvent, Origin, OutboundMessage, PlatformChatEvent, RichBlock};
use crate::links::registry::LinkRegistry;
use crate::links::types::LinkKind;
use crate::platform::{MembershipDirectory, NetworkState};

/// Marker shown after an author name when the platform account has no
/// linked game account.
const UNLINKED_MARKER: char = '*';

/// Routes inbound chat events through the link table.
pub struct RelayEngine {
    registry: Arc<LinkRegistry>,
    transformer: ContentTransformer,
    dispatcher: Dispatcher,
    state: Arc<dyn NetworkState>,
    directory: Arc<dyn MembershipDirectory>,
    ops: AtomicU64,
}

impl RelayEngine {
    pub fn new(
        registry: Arc<LinkRegistry>,
        transformer: ContentTransformer,
        dispatcher: Dispatcher,
        state: Arc<dyn NetworkState>,
        directory: Arc<dyn MembershipDirectory>,
    ) -> Self {
        Self {
            registry,
            transformer,
            dispatcher,
            state,
            directory,
            ops: AtomicU64::new(0),
        }
    }

    /// Messages relayed since startup. Status reporting only.
    pub fn ops_count(&self) -> u64 {
        self.ops.load(Ordering::Relaxed)
    }

    /// Stop accepting events and drain queued deliveries.
    pub async fn shutdown(self) {
        self.dispatcher.shutdown().await;
    }

    /// Handle one game chat message.
    pub async fn on_game_message(&self, event: &GameChatEvent) {
        let table = self.registry.snapshot();
        if !table.any_chat_route(Origin::Game) {
            return;
        }

        let links = table.links_for_source_channel(&event.channel, Origin::Game);
        if links.is_empty() {
            trace!("No platform link for game channel '{}'", event.channel);
            return;
        }

        for link in links {
            let channel_id = match link.platform_channel.resolved() {
                Some(resolved) => resolved.channel_id,
                None => continue,
            };
            let text = self
                .transformer
                .game_to_platform(&format!("{}: {}", event.author, event.content), link);
            self.dispatcher.dispatch(OutboundMessage::Platform {
                channel_id,
                text,
                rich: None,
            });
        }

        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    /// Handle one platform chat message: forward to the paired game
    /// channel, then fan out to every other guild linked to the same
    /// source channel name, skipping the origin guild.
    pub async fn on_platform_message(&self, event: &PlatformChatEvent) {
        let table = self.registry.snapshot();
        if !table.any_chat_route(Origin::Platform) {
            return;
        }

        let direct: Vec<_> = table
            .links_for_destination_channel(event.channel_id, &event.channel_name)
            .into_iter()
            .filter(|link| link.direction.accepts(Origin::Platform))
            .collect();
        if direct.is_empty() {
            return;
        }

        let (users, roles, channels) = futures::join!(
            self.directory.user_names(),
            self.directory.role_names(),
            self.directory.channel_names()
        );
        let names = NameMaps {
            users,
            roles,
            channels,
        };
        let body = self.transformer.platform_to_game(event, &names);

        let author = match self.directory.resolve_display_name(event.author_id).await {
            Some(name) => name,
            None => format!("{}{}", event.author_name, UNLINKED_MARKER),
        };
        let label = match table.guild_label_override(event.guild_id) {
            Some(label) => label.to_string(),
            None => self.state.guild_label(event.guild_id).await,
        };

        let mut game_channels = HashSet::new();
        for link in &direct {
            if !game_channels.insert(link.source_channel.to_lowercase()) {
                continue;
            }
            self.dispatcher.dispatch(OutboundMessage::Game {
                channel: link.source_channel.clone(),
                text: format!("[{}] {} {}", label, author, body),
            });
        }

        // Cross-guild fan-out keys on exact source channel name equality.
        let mut fanned = HashSet::from([event.channel_id]);
        for link in &direct {
            for peer in table.links_for_source_channel(&link.source_channel, Origin::Platform) {
                let resolved = match peer.platform_channel.resolved() {
                    Some(resolved) => resolved,
                    None => continue,
                };
                if resolved.guild_id == event.guild_id {
                    continue;
                }
                if !fanned.insert(resolved.channel_id) {
                    continue;
                }
                let copy = self.transformer.game_to_platform(&event.content, peer);
                self.dispatcher.dispatch(OutboundMessage::Platform {
                    channel_id: resolved.channel_id,
                    text: format!("[{}] {} {}", label, author, copy),
                    rich: None,
                });
            }
        }

        self.ops.fetch_add(1, Ordering::Relaxed);
    }

    /// Post an update to every valid link of the given kind. Used by
    /// the feed and display collaborators.
    pub fn post_update(&self, kind: LinkKind, text: &str, rich: Option<RichBlock>) {
        let table = self.registry.snapshot();
        let mut posted = 0usize;

        for link in table.iter() {
            if link.kind() != kind || !link.is_valid() {
                continue;
            }
            let channel_id = match link.channel().resolved() {
                Some(resolved) => resolved.channel_id,
                None => continue,
            };
            self.dispatcher.dispatch(OutboundMessage::Platform {
                channel_id,
                text: text.to_string(),
                rich: rich.clone(),
            });
            posted += 1;
        }

        debug!(?kind, posted, "Posted update to linked channels");
    }
}
