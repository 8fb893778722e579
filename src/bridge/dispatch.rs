//! Outbound delivery.
//!
//! One bounded queue and worker task per destination network. The
//! worker splits oversized text at the network's character limit,
//! degrades rich blocks to plain text where the destination cannot
//! render them, and logs each delivery failure without touching the
//! other destinations or the inbound pipeline.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::common::error::DeliveryError;
use crate::common::{OutboundMessage, RichBlock};
use crate::platform::{ChatOutbound, NetworkState};

/// Single-message character limit on the platform side.
pub const PLATFORM_MESSAGE_LIMIT: usize = 2000;
/// Single-message character limit on the game side.
pub const GAME_MESSAGE_LIMIT: usize = 1000;

const QUEUE_DEPTH: usize = 256;

/// Split text into ordered chunks of at most `limit` characters,
/// breaking at line boundaries where possible. Concatenating the
/// chunks yields the original text.
pub fn split_text(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for segment in text.split_inclusive('\n') {
        let segment_len = segment.chars().count();

        if current_len + segment_len <= limit {
            current.push_str(segment);
            current_len += segment_len;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if segment_len <= limit {
            current.push_str(segment);
            current_len = segment_len;
        } else {
            // A single line longer than the limit gets hard breaks.
            for ch in segment.chars() {
                current.push(ch);
                current_len += 1;
                if current_len == limit {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
            }
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

/// Flatten a rich block into the plain-text form used when the
/// destination cannot render rich content.
pub fn rich_block_to_text(block: &RichBlock) -> String {
    let mut lines = Vec::new();

    if !block.title.is_empty() {
        lines.push(block.title.clone());
    }
    for field in &block.fields {
        lines.push(format!("**{}**\n{}", field.title, field.body));
    }
    if !block.footer.is_empty() {
        lines.push(block.footer.clone());
    }

    lines.join("\n")
}

/// Fire-and-forget outbound dispatcher.
///
/// `dispatch` never blocks the caller; a full queue drops the message
/// with a warning rather than stalling the inbound pipeline.
pub struct Dispatcher {
    game_tx: mpsc::Sender<OutboundMessage>,
    platform_tx: mpsc::Sender<OutboundMessage>,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Start the per-network delivery workers.
    pub fn spawn(outbound: Arc<dyn ChatOutbound>, state: Arc<dyn NetworkState>) -> Self {
        let (game_tx, game_rx) = mpsc::channel(QUEUE_DEPTH);
        let (platform_tx, platform_rx) = mpsc::channel(QUEUE_DEPTH);

        let workers = vec![
            tokio::spawn(deliver_worker(game_rx, outbound.clone(), state.clone())),
            tokio::spawn(deliver_worker(platform_rx, outbound, state)),
        ];

        Self {
            game_tx,
            platform_tx,
            workers,
        }
    }

    /// Queue a message for delivery.
    pub fn dispatch(&self, message: OutboundMessage) {
        let (queue, network) = match &message {
            OutboundMessage::Game { .. } => (&self.game_tx, "game"),
            OutboundMessage::Platform { .. } => (&self.platform_tx, "platform"),
        };

        match queue.try_send(message) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("Outbound queue for {} is full; dropping message", network);
            }
            Err(TrySendError::Closed(_)) => {
                warn!("{}", DeliveryError::QueueClosed { network });
            }
        }
    }

    /// Stop accepting new messages and drain what is already queued.
    pub async fn shutdown(self) {
        drop(self.game_tx);
        drop(self.platform_tx);
        for worker in self.workers {
            if let Err(e) = worker.await {
                warn!("Delivery worker ended abnormally: {}", e);
            }
        }
    }
}

/// Drains one delivery queue in order. Per-destination failures are
/// logged and never stop the worker.
async fn deliver_worker(
    mut rx: mpsc::Receiver<OutboundMessage>,
    outbound: Arc<dyn ChatOutbound>,
    state: Arc<dyn NetworkState>,
) {
    while let Some(message) = rx.recv().await {
        match message {
            OutboundMessage::Game { channel, text } => {
                for chunk in split_text(&text, GAME_MESSAGE_LIMIT) {
                    if let Err(e) = outbound.send_game_text(&channel, &chunk).await {
                        warn!("Delivery to game channel '{}' failed: {}", channel, e);
                        break;
                    }
                }
            }
            OutboundMessage::Platform {
                channel_id,
                text,
                rich,
            } => {
                deliver_platform(&*outbound, &*state, channel_id, text, rich).await;
            }
        }
    }
    debug!("Delivery queue closed; worker exiting");
}

async fn deliver_platform(
    outbound: &dyn ChatOutbound,
    state: &dyn NetworkState,
    channel_id: u64,
    text: String,
    rich: Option<RichBlock>,
) {
    let mut text = text;
    let mut rich_to_send = None;

    if let Some(block) = rich.filter(|b| !b.is_empty()) {
        if state.channel_allows_rich_content(channel_id).await {
            rich_to_send = Some(block);
        } else {
            // Degrade to text ahead of the size split so long blocks
            // still arrive whole.
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(&rich_block_to_text(&block));
        }
    }

    if !text.is_empty() {
        for chunk in split_text(&text, PLATFORM_MESSAGE_LIMIT) {
            if let Err(e) = outbound.send_platform_text(channel_id, &chunk).await {
                warn!("Delivery to platform channel {} failed: {}", channel_id, e);
                return;
            }
        }
    }

    if let Some(block) = rich_to_send {
        if let Err(e) = outbound.send_platform_rich(channel_id, &block).await {
            warn!("Rich delivery to platform channel {} failed: {}", channel_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::DeliveryError;
    use crate::common::error::DeliveryResult;
    use crate::links::types::ResolvedChannel;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        game: Mutex<Vec<(String, String)>>,
        platform: Mutex<Vec<(u64, String)>>,
        rich: Mutex<Vec<(u64, RichBlock)>>,
        failing_channel: Option<u64>,
        rich_denied_channel: Option<u64>,
    }

    #[async_trait]
    impl ChatOutbound for Recorder {
        async fn send_game_text(&self, channel: &str, text: &str) -> DeliveryResult<()> {
            self.game
                .lock()
                .unwrap()
                .push((channel.to_string(), text.to_string()));
            Ok(())
        }

        async fn send_platform_text(&self, channel_id: u64, text: &str) -> DeliveryResult<()> {
            if self.failing_channel == Some(channel_id) {
                return Err(DeliveryError::SendFailed {
                    channel_id,
                    message: "boom".to_string(),
                });
            }
            self.platform
                .lock()
                .unwrap()
                .push((channel_id, text.to_string()));
            Ok(())
        }

        async fn send_platform_rich(&self, channel_id: u64, block: &RichBlock) -> DeliveryResult<()> {
            if self.rich_denied_channel == Some(channel_id) {
                return Err(DeliveryError::PermissionDenied {
                    channel_id,
                    permission: "embed_links".to_string(),
                });
            }
            self.rich.lock().unwrap().push((channel_id, block.clone()));
            Ok(())
        }
    }

    struct PlainTextOnly;

    #[async_trait]
    impl NetworkState for PlainTextOnly {
        fn is_connected(&self) -> bool {
            true
        }

        async fn resolve_channel(&self, _target: &str) -> Option<ResolvedChannel> {
            None
        }

        async fn channel_allows_rich_content(&self, _channel_id: u64) -> bool {
            false
        }

        async fn guild_label(&self, _guild_id: u64) -> String {
            String::new()
        }
    }

    struct RichAllowed;

    #[async_trait]
    impl NetworkState for RichAllowed {
        fn is_connected(&self) -> bool {
            true
        }

        async fn resolve_channel(&self, _target: &str) -> Option<ResolvedChannel> {
            None
        }

        async fn channel_allows_rich_content(&self, _channel_id: u64) -> bool {
            true
        }

        async fn guild_label(&self, _guild_id: u64) -> String {
            String::new()
        }
    }

    #[test]
    fn split_short_text_is_identity() {
        assert_eq!(split_text("hello", 100), vec!["hello".to_string()]);
    }

    #[test]
    fn split_produces_four_chunks_at_three_limits_plus_five() {
        const LIMIT: usize = 100;
        let text: String = "x".repeat(3 * LIMIT + 5);

        let chunks = split_text(&text, LIMIT);

        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= LIMIT));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_prefers_line_boundaries() {
        let text = format!("{}\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = split_text(&text, 100);

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], format!("{}\n", "a".repeat(60)));
        assert_eq!(chunks[1], "b".repeat(60));
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_counts_characters_not_bytes() {
        let text = "å".repeat(10);
        let chunks = split_text(&text, 4);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn rich_block_flattens_to_labeled_text() {
        let block = RichBlock::new("Server Info")
            .with_field("Players", "3 online")
            .with_field("Time", "Day 12")
            .with_footer("updated just now");

        let text = rich_block_to_text(&block);

        assert_eq!(
            text,
            "Server Info\n**Players**\n3 online\n**Time**\nDay 12\nupdated just now"
        );
    }

    #[tokio::test]
    async fn rich_block_degrades_when_channel_disallows_rich() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::spawn(recorder.clone(), Arc::new(PlainTextOnly));

        dispatcher.dispatch(OutboundMessage::Platform {
            channel_id: 9,
            text: "status".to_string(),
            rich: Some(RichBlock::new("Info").with_field("Players", "3")),
        });
        dispatcher.shutdown().await;

        let sent = recorder.platform.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1, "status\nInfo\n**Players**\n3");
        assert!(recorder.rich.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn rich_block_sent_natively_when_allowed() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::spawn(recorder.clone(), Arc::new(RichAllowed));

        dispatcher.dispatch(OutboundMessage::Platform {
            channel_id: 9,
            text: String::new(),
            rich: Some(RichBlock::new("Info")),
        });
        dispatcher.shutdown().await;

        assert!(recorder.platform.lock().unwrap().is_empty());
        assert_eq!(recorder.rich.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn one_failing_destination_does_not_block_others() {
        let recorder = Arc::new(Recorder {
            failing_channel: Some(7),
            ..Default::default()
        });
        let dispatcher = Dispatcher::spawn(recorder.clone(), Arc::new(RichAllowed));

        dispatcher.dispatch(OutboundMessage::Platform {
            channel_id: 7,
            text: "dropped".to_string(),
            rich: None,
        });
        dispatcher.dispatch(OutboundMessage::Platform {
            channel_id: 8,
            text: "delivered".to_string(),
            rich: None,
        });
        dispatcher.shutdown().await;

        let sent = recorder.platform.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], (8, "delivered".to_string()));
    }

    #[tokio::test]
    async fn denied_rich_send_does_not_stop_later_deliveries() {
        let recorder = Arc::new(Recorder {
            rich_denied_channel: Some(7),
            ..Default::default()
        });
        let dispatcher = Dispatcher::spawn(recorder.clone(), Arc::new(RichAllowed));

        dispatcher.dispatch(OutboundMessage::Platform {
            channel_id: 7,
            text: String::new(),
            rich: Some(RichBlock::new("Info")),
        });
        dispatcher.dispatch(OutboundMessage::Platform {
            channel_id: 8,
            text: "still here".to_string(),
            rich: None,
        });
        dispatcher.shutdown().await;

        assert!(recorder.rich.lock().unwrap().is_empty());
        let sent = recorder.platform.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0], (8, "still here".to_string()));
    }

    #[tokio::test]
    async fn long_game_text_is_split_in_order() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::spawn(recorder.clone(), Arc::new(RichAllowed));

        let text = "y".repeat(GAME_MESSAGE_LIMIT + 10);
        dispatcher.dispatch(OutboundMessage::Game {
            channel: "general".to_string(),
            text: text.clone(),
        });
        dispatcher.shutdown().await;

        let sent = recorder.game.lock().unwrap();
        assert_eq!(sent.len(), 2);
        let joined: String = sent.iter().map(|(_, t)| t.as_str()).collect();
        assert_eq!(joined, text);
    }
}
