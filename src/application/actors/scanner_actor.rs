//! Position scanner actor.
//!
//! Drives the polling loop behind the dashboard: while `scanning` is set,
//! it sweeps every login's open positions through a bounded worker pool
//! and publishes the accumulating result list after each login completes.
//! The first pass of a cycle enumerates the account universe (group
//! listing, then numeric-range fallback); subsequent passes reuse the
//! stored login roster and only re-fetch positions. One slow or failing
//! login costs its own results, never the pass.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Instant};
use tracing::{error, info, warn};

use crate::application::scan_cache::ScanCache;
use crate::domain::entities::account::Account;
use crate::domain::entities::position::PositionRecord;
use crate::domain::errors::ScanError;
use crate::domain::services::normalize::Normalizer;
use crate::infrastructure::directory::{enumerate_accounts, AccountDirectory};
use crate::persistence::snapshot;

/// Channel capacity for scanner control messages
const SCANNER_CHANNEL_CAPACITY: usize = 8;

/// Progress is logged every N completed logins to keep large books quiet
const PROGRESS_LOG_EVERY: usize = 100;

/// Messages that can be sent to the scanner actor
#[derive(Debug)]
pub enum ScannerMessage {
    /// Shutdown the actor
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    /// Idle poll cadence of the actor loop.
    pub tick: Duration,
    /// Minimum delay between the end of one pass and the start of the next.
    pub rescan_delay: Duration,
    /// Upper bound on concurrent per-login fetches.
    pub worker_cap: usize,
    /// Per-call timeout around every directory call.
    pub fetch_timeout: Duration,
    /// Login range for fallback enumeration, inclusive.
    pub range: (u64, u64),
    /// When set, each completed pass is persisted here.
    pub snapshot_dir: Option<PathBuf>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        ScannerConfig {
            tick: Duration::from_secs(1),
            rescan_delay: Duration::from_secs(5),
            worker_cap: 10,
            fetch_timeout: Duration::from_secs(10),
            range: (1, 100_000),
            snapshot_dir: None,
        }
    }
}

pub struct ScannerActor {
    directory: Arc<dyn AccountDirectory>,
    cache: Arc<ScanCache>,
    normalizer: Normalizer,
    config: ScannerConfig,
    last_pass_end: Option<Instant>,
}

impl ScannerActor {
    pub fn new(
        directory: Arc<dyn AccountDirectory>,
        cache: Arc<ScanCache>,
        normalizer: Normalizer,
        config: ScannerConfig,
    ) -> Self {
        ScannerActor {
            directory,
            cache,
            normalizer,
            config,
            last_pass_end: None,
        }
    }

    /// Spawn the scanner actor. The join handle is kept so shutdown can
    /// wait for an in-flight pass with a bounded timeout.
    pub fn spawn(
        directory: Arc<dyn AccountDirectory>,
        cache: Arc<ScanCache>,
        normalizer: Normalizer,
        config: ScannerConfig,
    ) -> (mpsc::Sender<ScannerMessage>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(SCANNER_CHANNEL_CAPACITY);
        let actor = ScannerActor::new(directory, cache, normalizer, config);

        let handle = tokio::spawn(async move {
            actor.run(rx).await;
        });

        info!("ScannerActor spawned");
        (tx, handle)
    }

    /// Main actor loop
    async fn run(mut self, mut rx: mpsc::Receiver<ScannerMessage>) {
        info!(
            "ScannerActor started (tick {:?}, rescan delay {:?}, worker cap {})",
            self.config.tick, self.config.rescan_delay, self.config.worker_cap
        );

        let mut ticker = interval(self.config.tick);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.on_tick().await;
                }

                msg = rx.recv() => {
                    match msg {
                        Some(ScannerMessage::Shutdown) => {
                            info!("ScannerActor received shutdown signal");
                            break;
                        }
                        None => {
                            error!("ScannerActor control channel closed");
                            break;
                        }
                    }
                }
            }
        }

        info!("ScannerActor stopped");
    }

    async fn on_tick(&mut self) {
        if !self.cache.is_scanning().await {
            return;
        }
        if let Some(end) = self.last_pass_end {
            if end.elapsed() < self.config.rescan_delay {
                return;
            }
        }

        let result = if self.cache.full_scan_done().await {
            self.run_incremental_pass().await
        } else {
            self.run_full_pass().await
        };
        self.last_pass_end = Some(Instant::now());

        // A failed pass never kills the loop: scanning is cleared so the
        // state is visible, and the next start begins a fresh cycle.
        if let Err(e) = result {
            error!("scan pass failed: {}", e);
            self.cache.set_scanning(false).await;
        }
    }

    /// Full pass: enumerate the account universe, then fetch everyone.
    async fn run_full_pass(&self) -> Result<(), ScanError> {
        info!("starting full scan");

        let accounts = enumerate_accounts(
            self.directory.as_ref(),
            self.config.range,
            self.config.fetch_timeout,
        )
        .await
        .map_err(ScanError::Enumeration)?;

        if accounts.is_empty() {
            warn!("enumeration found no accounts, stopping scanning");
            self.cache.set_scanning(false).await;
            return Ok(());
        }

        let logins = Arc::new(dedup_logins(&accounts));
        self.cache.begin_pass(Some(logins.clone()), logins.len()).await;

        let (positions, tickets) = self.scan_logins(&logins).await;
        info!(
            "full scan completed: {} positions across {} logins",
            positions.len(),
            logins.len()
        );

        let positions = Arc::new(positions);
        self.cache.complete_pass(positions.clone(), tickets, true).await;
        self.persist_pass(&logins, &positions).await;
        Ok(())
    }

    /// Incremental pass: re-fetch positions for the stored login roster
    /// without touching enumeration. Data is replaced whole, not merged.
    async fn run_incremental_pass(&self) -> Result<(), ScanError> {
        let mut logins = self.cache.stored_logins().await;

        if logins.is_empty() {
            warn!("no stored logins for incremental scan, re-enumerating");
            match enumerate_accounts(
                self.directory.as_ref(),
                self.config.range,
                self.config.fetch_timeout,
            )
            .await
            {
                Ok(accounts) if !accounts.is_empty() => {
                    logins = Arc::new(dedup_logins(&accounts));
                }
                Ok(_) => {
                    warn!("still no logins available, stopping scanning");
                    self.cache.set_scanning(false).await;
                    return Ok(());
                }
                Err(e) => {
                    warn!("re-enumeration failed ({}), stopping scanning", e);
                    self.cache.set_scanning(false).await;
                    return Ok(());
                }
            }
        }

        self.cache.begin_pass(Some(logins.clone()), logins.len()).await;

        let (positions, tickets) = self.scan_logins(&logins).await;
        info!(
            "incremental scan completed: {} positions across {} logins",
            positions.len(),
            logins.len()
        );

        let positions = Arc::new(positions);
        self.cache.complete_pass(positions.clone(), tickets, false).await;
        self.persist_pass(&logins, &positions).await;
        Ok(())
    }

    /// Fetches every login through a bounded pool, handling results in
    /// completion order. Each completion republishes the whole accumulator.
    async fn scan_logins(&self, logins: &[String]) -> (Vec<PositionRecord>, Vec<u64>) {
        let worker_count = self.config.worker_cap.min(logins.len()).max(1);
        let total = logins.len();

        let mut results = stream::iter(logins.iter().cloned())
            .map(|login| {
                let directory = self.directory.clone();
                let normalizer = self.normalizer;
                let fetch_timeout = self.config.fetch_timeout;
                async move {
                    let records =
                        fetch_login_positions(directory.as_ref(), &login, fetch_timeout, &normalizer)
                            .await;
                    (login, records)
                }
            })
            .buffer_unordered(worker_count);

        let mut accumulator: Vec<PositionRecord> = Vec::new();
        let mut completed = 0usize;
        while let Some((login, records)) = results.next().await {
            accumulator.extend(records);
            completed += 1;
            self.cache
                .publish_partial(Arc::new(accumulator.clone()), completed, &login)
                .await;
            if completed % PROGRESS_LOG_EVERY == 0 {
                info!(
                    "scan progress: {}/{} logins, {} positions",
                    completed,
                    total,
                    accumulator.len()
                );
            }
        }

        let tickets = accumulator.iter().filter_map(|p| p.ticket).collect();
        (accumulator, tickets)
    }

    async fn persist_pass(&self, logins: &[String], positions: &[PositionRecord]) {
        if let Some(ref dir) = self.config.snapshot_dir {
            if let Err(e) = snapshot::save_positions(dir, logins, positions).await {
                warn!("failed to persist positions snapshot: {}", e);
            }
        }
    }
}

/// One login's fetch, degraded to an empty result on error or timeout so
/// the pool and the pass carry on.
async fn fetch_login_positions(
    directory: &dyn AccountDirectory,
    login: &str,
    fetch_timeout: Duration,
    normalizer: &Normalizer,
) -> Vec<PositionRecord> {
    match timeout(fetch_timeout, directory.open_positions(login)).await {
        Ok(Ok(rows)) => rows
            .iter()
            .filter_map(|raw| normalizer.position(login, raw))
            .collect(),
        Ok(Err(e)) => {
            warn!("position fetch failed for login {}: {}", login, e);
            Vec::new()
        }
        Err(_) => {
            warn!("position fetch timed out for login {}", login);
            Vec::new()
        }
    }
}

/// First-appearance dedup of the enumerated logins.
fn dedup_logins(accounts: &[Account]) -> Vec<String> {
    let mut seen = HashSet::new();
    accounts
        .iter()
        .filter(|account| seen.insert(account.login.clone()))
        .map(|account| account.login.clone())
        .collect()
}
