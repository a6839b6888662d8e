//! Account roster refresher.
//!
//! Keeps a cached copy of the full account roster for the summary and
//! drill-down views, refreshed on a slow cadence (the roster changes far
//! less often than positions). The first refresh happens at spawn, so the
//! API has accounts before the first scan pass finishes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{error, info, warn};

use crate::domain::entities::account::Account;
use crate::infrastructure::directory::{enumerate_accounts, AccountDirectory};
use crate::persistence::snapshot;

/// Channel capacity for roster control messages
const ROSTER_CHANNEL_CAPACITY: usize = 8;

/// Messages that can be sent to the roster actor
#[derive(Debug)]
pub enum RosterMessage {
    /// Refresh the roster now instead of waiting for the next tick
    RefreshNow,
    /// Shutdown the actor
    Shutdown,
}

#[derive(Debug)]
struct RosterState {
    accounts: Arc<Vec<Account>>,
    refreshed_at: Option<DateTime<Utc>>,
}

/// Shared roster state: one writer (the actor), many readers.
#[derive(Debug)]
pub struct RosterCache {
    state: RwLock<RosterState>,
}

impl Default for RosterCache {
    fn default() -> Self {
        RosterCache {
            state: RwLock::new(RosterState {
                accounts: Arc::new(Vec::new()),
                refreshed_at: None,
            }),
        }
    }
}

impl RosterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn accounts(&self) -> Arc<Vec<Account>> {
        self.state.read().await.accounts.clone()
    }

    pub async fn snapshot(&self) -> (Arc<Vec<Account>>, Option<DateTime<Utc>>) {
        let state = self.state.read().await;
        (state.accounts.clone(), state.refreshed_at)
    }

    pub async fn publish(&self, accounts: Vec<Account>) {
        let mut state = self.state.write().await;
        state.accounts = Arc::new(accounts);
        state.refreshed_at = Some(Utc::now());
    }

    /// Preloads a persisted roster at boot; the stale `saved_at` stamp is
    /// kept so the API shows the data's real age.
    pub async fn warm_start(&self, accounts: Vec<Account>, saved_at: DateTime<Utc>) {
        let mut state = self.state.write().await;
        state.accounts = Arc::new(accounts);
        state.refreshed_at = Some(saved_at);
    }
}

#[derive(Debug, Clone)]
pub struct RosterConfig {
    pub refresh: Duration,
    pub fetch_timeout: Duration,
    pub range: (u64, u64),
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for RosterConfig {
    fn default() -> Self {
        RosterConfig {
            refresh: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(10),
            range: (1, 100_000),
            snapshot_dir: None,
        }
    }
}

pub struct RosterActor {
    directory: Arc<dyn AccountDirectory>,
    cache: Arc<RosterCache>,
    config: RosterConfig,
}

impl RosterActor {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        cache: Arc<RosterCache>,
        config: RosterConfig,
    ) -> Self {
        RosterActor {
            directory,
            cache,
            config,
        }
    }

    pub fn spawn(
        directory: Arc<dyn AccountDirectory>,
        cache: Arc<RosterCache>,
        config: RosterConfig,
    ) -> (mpsc::Sender<RosterMessage>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(ROSTER_CHANNEL_CAPACITY);
        let actor = RosterActor::new(directory, cache, config);

        let handle = tokio::spawn(async move {
            actor.run(rx).await;
        });

        info!("RosterActor spawned");
        (tx, handle)
    }

    /// Main actor loop
    async fn run(self, mut rx: mpsc::Receiver<RosterMessage>) {
        info!("RosterActor started (refresh every {:?})", self.config.refresh);

        // The first tick fires immediately, which doubles as the boot-time
        // roster load.
        let mut ticker = interval(self.config.refresh);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }

                msg = rx.recv() => {
                    match msg {
                        Some(RosterMessage::RefreshNow) => {
                            self.refresh().await;
                        }
                        Some(RosterMessage::Shutdown) => {
                            info!("RosterActor received shutdown signal");
                            break;
                        }
                        None => {
                            error!("RosterActor control channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("RosterActor stopped");
    }

    async fn refresh(&self) {
        match enumerate_accounts(
            self.directory.as_ref(),
            self.config.range,
            self.config.fetch_timeout,
        )
        .await
        {
            Ok(accounts) if accounts.is_empty() => {
                warn!("roster refresh returned no accounts, keeping previous roster");
            }
            Ok(accounts) => {
                info!("roster refreshed: {} accounts", accounts.len());
                if let Some(ref dir) = self.config.snapshot_dir {
                    if let Err(e) = snapshot::save_roster(dir, &accounts).await {
                        warn!("failed to persist roster snapshot: {}", e);
                    }
                }
                self.cache.publish(accounts).await;
            }
            Err(e) => {
                warn!("roster refresh failed ({}), keeping previous roster", e);
            }
        }
    }
}
