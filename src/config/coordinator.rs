//! Configuration change coordination.
//!
//! Sits beside the link registry and owns the configuration lifecycle:
//! {Clean} -> (edit detected) -> {Dirty} -> (save) ->
//! {Clean | RestartRequired}.
//!
//! Every mutation to a link sub-collection goes through an edit
//! function returning an explicit change descriptor; the coordinator
//! consumes it instead of relying on ambient collection events. Not
//! every notification is structural, so any non-add/remove/replace
//! descriptor saves immediately rather than risking a lost edit.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::common::error::RestartError;
use crate::config::parser::save_config;
use crate::config::types::{ConfigData, ConfigSnapshot};
use crate::links::registry::{LinkRegistry, VerifyScope};
use crate::links::types::defaults;
use crate::platform::NetworkState;

/// Descriptor returned by a link collection edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionChange {
    Added,
    Removed,
    Replaced,
    Cleared,
    /// The edit touched nothing.
    None,
}

impl CollectionChange {
    /// Structural changes get full change-handling; anything else is
    /// conservatively saved right away.
    fn is_structural(&self) -> bool {
        matches!(self, Self::Added | Self::Removed | Self::Replaced)
    }
}

/// Configuration lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Clean,
    Dirty,
    RestartRequired,
}

/// Request for a full platform reconnect, sent when identity-critical
/// fields change.
#[derive(Debug, Clone, Copy)]
pub struct RestartRequest;

struct Inner {
    config: ConfigData,
    snapshot: ConfigSnapshot,
    state: LifecycleState,
    restart_pending: bool,
}

/// Coordinates live edits: correction, persistence, registry rebuild,
/// verification, and restart scheduling.
///
/// Saves are serialized behind the inner mutex; there are never
/// concurrent writers to the config document.
pub struct ConfigCoordinator {
    inner: Mutex<Inner>,
    path: PathBuf,
    registry: Arc<LinkRegistry>,
    network: Arc<dyn NetworkState>,
    restart_tx: mpsc::UnboundedSender<RestartRequest>,
    change_tx: watch::Sender<u64>,
}

impl ConfigCoordinator {
    pub fn new(
        config: ConfigData,
        path: impl Into<PathBuf>,
        registry: Arc<LinkRegistry>,
        network: Arc<dyn NetworkState>,
        restart_tx: mpsc::UnboundedSender<RestartRequest>,
    ) -> Self {
        let snapshot = ConfigSnapshot::of(&config);
        registry.rebuild(&config);
        let (change_tx, _) = watch::channel(0);
        Self {
            inner: Mutex::new(Inner {
                config,
                snapshot,
                state: LifecycleState::Clean,
                restart_pending: false,
            }),
            path: path.into(),
            registry,
            network,
            restart_tx,
            change_tx,
        }
    }

    /// Subscribe to change notifications. The value is a generation
    /// counter bumped after each verified change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.change_tx.subscribe()
    }

    pub async fn state(&self) -> LifecycleState {
        self.inner.lock().await.state
    }

    /// Read access to the live configuration.
    pub async fn with_config<R>(&self, f: impl FnOnce(&ConfigData) -> R) -> R {
        f(&self.inner.lock().await.config)
    }

    /// Apply an edit to a link sub-collection and route the resulting
    /// change descriptor.
    pub async fn edit(
        &self,
        f: impl FnOnce(&mut ConfigData) -> CollectionChange,
    ) -> CollectionChange {
        let change = {
            let mut inner = self.inner.lock().await;
            let change = f(&mut inner.config);
            if change != CollectionChange::None {
                inner.state = LifecycleState::Dirty;
            }
            change
        };

        debug!(?change, "Config collection changed");

        if change.is_structural() {
            self.handle_config_changed().await;
        } else if change != CollectionChange::None {
            // Save on any other notification so nothing is lost.
            let mut inner = self.inner.lock().await;
            self.save_locked(&mut inner);
            self.registry.rebuild(&inner.config);
            inner.state = LifecycleState::Clean;
        }

        change
    }

    /// Apply an edit to scalar (non-collection) fields, then run full
    /// change handling. This is the path that detects critical changes
    /// to the bot token or the platform server.
    pub async fn edit_fields(&self, f: impl FnOnce(&mut ConfigData)) {
        {
            let mut inner = self.inner.lock().await;
            f(&mut inner.config);
            inner.state = LifecycleState::Dirty;
        }
        self.handle_config_changed().await;
    }

    /// Full change handling: correct, save, rebuild, diff, and either
    /// schedule a restart or verify and notify.
    pub async fn handle_config_changed(&self) {
        // Corrections trigger one more round; correct() is monotone so
        // the second pass always reports zero corrections.
        for _ in 0..2 {
            let mut inner = self.inner.lock().await;

            let critical = inner.snapshot.critical_change(&inner.config);
            if inner.snapshot.prefix_changed(&inner.config) {
                info!("Command prefix changed - restart required to take effect.");
            }

            let corrections = self.save_locked(&mut inner);
            self.registry.rebuild(&inner.config);

            if critical {
                // The reconnect path re-verifies; verification here
                // would be redundant.
                inner.state = LifecycleState::RestartRequired;
                if inner.restart_pending {
                    warn!("{}", RestartError::AlreadyInProgress);
                    return;
                }
                info!("Critical config data changed - scheduling restart");
                inner.restart_pending = true;
                if self.restart_tx.send(RestartRequest).is_err() {
                    warn!("Restart requested but no restart handler is listening");
                }
                return;
            }

            if corrections == 0 {
                let report = self
                    .registry
                    .validate(VerifyScope::All, &mut inner.config, self.network.as_ref())
                    .await;
                if !report.is_clean() {
                    debug!(
                        static_errors = report.static_errors.len(),
                        unresolved = report.unresolved_links.len(),
                        "Verification finished with findings"
                    );
                }
                inner.state = LifecycleState::Clean;
                self.change_tx.send_modify(|gen| *gen += 1);
                return;
            }
            // A correction was made; loop once more so the corrected
            // values go through verification and notification.
        }
    }

    /// Called by the host once a scheduled reconnect has finished.
    /// Re-verifies every link against the fresh connection.
    pub async fn restart_complete(&self) {
        let mut inner = self.inner.lock().await;
        inner.restart_pending = false;

        let report = self
            .registry
            .validate(VerifyScope::All, &mut inner.config, self.network.as_ref())
            .await;
        if !report.is_clean() {
            debug!(
                static_errors = report.static_errors.len(),
                unresolved = report.unresolved_links.len(),
                "Post-restart verification finished with findings"
            );
        }
        inner.state = LifecycleState::Clean;
        self.change_tx.send_modify(|gen| *gen += 1);
    }

    /// Called by the host when a scheduled reconnect failed. The
    /// failure is surfaced, never retried; a later critical edit
    /// schedules the next attempt.
    pub async fn restart_failed(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        inner.restart_pending = false;
        error!(
            "{}",
            RestartError::ReconnectFailed {
                message: message.into(),
            }
        );
    }

    /// Correct, persist, and snapshot the config. Returns the number
    /// of corrections made. Persistence failures are logged, never
    /// fatal.
    fn save_locked(&self, inner: &mut Inner) -> usize {
        let corrections = correct(&mut inner.config);
        for correction in &corrections {
            info!("Config correction: {}", correction);
        }

        if let Err(e) = save_config(&self.path, &inner.config) {
            warn!("Failed to persist configuration: {}", e);
        }

        inner.snapshot = ConfigSnapshot::of(&inner.config);
        corrections.len()
    }
}

/// Repair out-of-range and empty required fields in place, reporting
/// each correction. Monotone: already-valid fields are left untouched,
/// so a second pass always reports nothing.
pub fn correct(config: &mut ConfigData) -> Vec<String> {
    let mut corrections = Vec::new();

    if config.game_bot_name.trim().is_empty() {
        config.game_bot_name = defaults::GAME_BOT_NAME.to_string();
        corrections.push("Game bot name found empty - reset to default".to_string());
    }

    if config.command_prefix.is_empty() {
        config.command_prefix = defaults::COMMAND_PREFIX.to_string();
        corrections.push("Command prefix found empty - reset to default".to_string());
    }

    if config.invite_message.trim().is_empty() {
        config.invite_message = defaults::INVITE_MESSAGE.to_string();
        corrections.push("Invite message found empty - reset to default".to_string());
    }

    if config.max_tracked_trades_per_user < 0 {
        config.max_tracked_trades_per_user = defaults::MAX_TRACKED_TRADES_PER_USER;
        corrections.push("Max tracked trades below zero - reset to default".to_string());
    }

    for (i, link) in config.currency_displays.iter_mut().enumerate() {
        if link.max_minted_count < 0 {
            link.max_minted_count = defaults::MAX_MINTED_CURRENCIES;
            corrections.push(format!("currency_displays[{}].max_minted_count reset", i));
        }
        if link.max_personal_count < 0 {
            link.max_personal_count = defaults::MAX_PERSONAL_CURRENCIES;
            corrections.push(format!("currency_displays[{}].max_personal_count reset", i));
        }
        if link.max_top_holder_count < 0
            || link.max_top_holder_count > defaults::TOP_CURRENCY_HOLDER_LIMIT
        {
            link.max_top_holder_count = defaults::MAX_TOP_CURRENCY_HOLDERS;
            corrections.push(format!("currency_displays[{}].max_top_holder_count reset", i));
        }
    }

    corrections
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::links::types::{ChatLink, ChannelRef, CurrencyLink, ResolvedChannel, SyncDirection};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Network state stub that resolves everything and counts calls.
    #[derive(Default)]
    struct StubNetwork {
        connected: bool,
        resolve_calls: AtomicUsize,
    }

    #[async_trait]
    impl NetworkState for StubNetwork {
        fn is_connected(&self) -> bool {
            self.connected
        }

        async fn resolve_channel(&self, target: &str) -> Option<ResolvedChannel> {
            self.resolve_calls.fetch_add(1, Ordering::SeqCst);
            Some(ResolvedChannel {
                guild_id: 1,
                channel_id: 100,
                name: target.to_string(),
            })
        }

        async fn channel_allows_rich_content(&self, _channel_id: u64) -> bool {
            true
        }

        async fn guild_label(&self, _guild_id: u64) -> String {
            "Guild".to_string()
        }
    }

    fn coordinator_with(
        config: ConfigData,
        network: Arc<StubNetwork>,
    ) -> (ConfigCoordinator, mpsc::UnboundedReceiver<RestartRequest>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.json");
        let (restart_tx, restart_rx) = mpsc::unbounded_channel();
        let coordinator = ConfigCoordinator::new(
            config,
            path,
            Arc::new(LinkRegistry::new()),
            network,
            restart_tx,
        );
        (coordinator, restart_rx, dir)
    }

    fn valid_config() -> ConfigData {
        ConfigData {
            platform_server: "My Guild".to_string(),
            bot_token: "token".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn correct_is_idempotent() {
        let mut config = ConfigData {
            game_bot_name: String::new(),
            command_prefix: String::new(),
            max_tracked_trades_per_user: -3,
            currency_displays: vec![CurrencyLink {
                max_minted_count: -1,
                max_top_holder_count: 99,
                ..Default::default()
            }],
            ..valid_config()
        };

        let first = correct(&mut config);
        assert_eq!(first.len(), 5);

        // Second pass with no intervening edits performs zero corrections.
        let second = correct(&mut config);
        assert!(second.is_empty());

        assert_eq!(config.game_bot_name, defaults::GAME_BOT_NAME);
        assert_eq!(config.command_prefix, defaults::COMMAND_PREFIX);
        assert_eq!(config.max_tracked_trades_per_user, defaults::MAX_TRACKED_TRADES_PER_USER);
        assert_eq!(config.currency_displays[0].max_minted_count, defaults::MAX_MINTED_CURRENCIES);
        assert_eq!(
            config.currency_displays[0].max_top_holder_count,
            defaults::MAX_TOP_CURRENCY_HOLDERS
        );
    }

    #[tokio::test]
    async fn structural_edit_rebuilds_registry_and_notifies() {
        let network = Arc::new(StubNetwork {
            connected: true,
            ..Default::default()
        });
        let (coordinator, _restart_rx, _dir) = coordinator_with(valid_config(), network);
        let mut changes = coordinator.subscribe();

        let change = coordinator
            .edit(|config| {
                config.chat_links.push(ChatLink {
                    platform_channel: ChannelRef::new("town-square"),
                    source_channel: "general".to_string(),
                    direction: SyncDirection::Duplex,
                    use_timestamp: false,
                    broad_mentions: Default::default(),
                    mention_overrides: Default::default(),
                });
                CollectionChange::Added
            })
            .await;

        assert_eq!(change, CollectionChange::Added);
        assert_eq!(coordinator.state().await, LifecycleState::Clean);
        assert!(changes.has_changed().unwrap());
        // Verification resolved the new link, so it routes already.
        let table = coordinator.registry.snapshot();
        assert_eq!(
            table
                .links_for_source_channel("general", crate::common::Origin::Game)
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn critical_change_schedules_restart_and_skips_verification() {
        let network = Arc::new(StubNetwork {
            connected: true,
            ..Default::default()
        });
        let (coordinator, mut restart_rx, _dir) =
            coordinator_with(valid_config(), network.clone());

        coordinator
            .edit_fields(|config| {
                config.bot_token = "rotated-token".to_string();
            })
            .await;

        assert_eq!(coordinator.state().await, LifecycleState::RestartRequired);
        assert!(restart_rx.try_recv().is_ok());
        // Verification skipped: no resolution attempts were made.
        assert_eq!(network.resolve_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn correction_triggers_exactly_one_extra_round() {
        let network = Arc::new(StubNetwork {
            connected: false,
            ..Default::default()
        });
        let mut config = valid_config();
        config.game_bot_name = String::new();
        let (coordinator, _restart_rx, _dir) = coordinator_with(config, network);

        coordinator.edit_fields(|_| {}).await;

        // The correction round settled into Clean, not an endless loop.
        assert_eq!(coordinator.state().await, LifecycleState::Clean);
        coordinator
            .with_config(|c| assert_eq!(c.game_bot_name, defaults::GAME_BOT_NAME))
            .await;
    }

    #[tokio::test]
    async fn duplicate_critical_change_schedules_one_restart() {
        let network = Arc::new(StubNetwork {
            connected: true,
            ..Default::default()
        });
        let (coordinator, mut restart_rx, _dir) = coordinator_with(valid_config(), network);

        coordinator
            .edit_fields(|config| config.bot_token = "first".to_string())
            .await;
        coordinator
            .edit_fields(|config| config.bot_token = "second".to_string())
            .await;

        assert_eq!(coordinator.state().await, LifecycleState::RestartRequired);
        assert!(restart_rx.try_recv().is_ok());
        // The second edit rode the already-scheduled restart.
        assert!(restart_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn completed_restart_reverifies_and_clears_state() {
        let network = Arc::new(StubNetwork {
            connected: true,
            ..Default::default()
        });
        let mut config = valid_config();
        config.chat_links.push(ChatLink {
            platform_channel: ChannelRef::new("town-square"),
            source_channel: "general".to_string(),
            direction: SyncDirection::Duplex,
            use_timestamp: false,
            broad_mentions: Default::default(),
            mention_overrides: Default::default(),
        });
        let (coordinator, mut restart_rx, _dir) = coordinator_with(config, network.clone());

        coordinator
            .edit_fields(|config| config.bot_token = "rotated".to_string())
            .await;
        assert!(restart_rx.try_recv().is_ok());
        assert_eq!(network.resolve_calls.load(Ordering::SeqCst), 0);

        coordinator.restart_complete().await;

        assert_eq!(coordinator.state().await, LifecycleState::Clean);
        assert!(network.resolve_calls.load(Ordering::SeqCst) > 0);
    }

    #[tokio::test]
    async fn failed_restart_leaves_state_requiring_restart() {
        let network = Arc::new(StubNetwork {
            connected: false,
            ..Default::default()
        });
        let (coordinator, mut restart_rx, _dir) = coordinator_with(valid_config(), network);

        coordinator
            .edit_fields(|config| config.bot_token = "rotated".to_string())
            .await;
        assert!(restart_rx.try_recv().is_ok());

        coordinator.restart_failed("gateway unreachable").await;
        assert_eq!(coordinator.state().await, LifecycleState::RestartRequired);

        // The next critical edit schedules a fresh attempt.
        coordinator
            .edit_fields(|config| config.bot_token = "rotated-again".to_string())
            .await;
        assert!(restart_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn non_structural_change_saves_directly() {
        let network = Arc::new(StubNetwork {
            connected: true,
            ..Default::default()
        });
        let (coordinator, _restart_rx, _dir) = coordinator_with(valid_config(), network.clone());
        let mut changes = coordinator.subscribe();

        let change = coordinator
            .edit(|config| {
                config.trade_feeds.clear();
                CollectionChange::Cleared
            })
            .await;

        assert_eq!(change, CollectionChange::Cleared);
        assert_eq!(coordinator.state().await, LifecycleState::Clean);
        // Direct save path: no verification, no subscriber notification.
        assert_eq!(network.resolve_calls.load(Ordering::SeqCst), 0);
        assert!(!changes.has_changed().unwrap());
    }
}
