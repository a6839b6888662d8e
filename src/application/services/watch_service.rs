//! Application facade over the scanner, the roster, and the directory.
//!
//! Owns the actor handles and the shared caches; every HTTP handler and
//! CLI command goes through this type. Matrix reads never touch the
//! bridge: they pivot whatever the scanner has published. Realized P&L
//! is the exception, fetching closed deals on demand through a bounded
//! pool and a TTL'd cache.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use lru::LruCache;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use crate::application::actors::{
    RosterActor, RosterCache, RosterMessage, ScannerActor, ScannerMessage,
};
use crate::application::scan_cache::{ScanCache, ScanSnapshot};
use crate::config::WatchConfig;
use crate::domain::entities::account::{summarize, Account, RosterSummary};
use crate::domain::entities::position::{DealRecord, PositionRecord};
use crate::domain::errors::{DirectoryError, ScanError};
use crate::domain::services::exposure::ExposureMatrix;
use crate::domain::services::normalize::Normalizer;
use crate::domain::services::rollup::{symbol_breakdown, symbol_rollup, LoginExposure, SymbolExposure};
use crate::infrastructure::directory::AccountDirectory;
use crate::persistence::snapshot;

/// How long shutdown waits for each actor to finish its current work
const SHUTDOWN_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// LRU capacity for per-login closed-deal lists
const DEALS_CACHE_CAPACITY: usize = 4096;

type ActorSlot<M> = Mutex<Option<(mpsc::Sender<M>, JoinHandle<()>)>>;

pub struct WatchService {
    pub config: WatchConfig,
    directory: Arc<dyn AccountDirectory>,
    scan_cache: Arc<ScanCache>,
    roster: Arc<RosterCache>,
    normalizer: Normalizer,
    scanner: ActorSlot<ScannerMessage>,
    roster_actor: ActorSlot<RosterMessage>,
    deals_cache: Mutex<LruCache<String, (Instant, Arc<Vec<DealRecord>>)>>,
}

impl WatchService {
    pub fn new(config: WatchConfig, directory: Arc<dyn AccountDirectory>) -> Self {
        let cache_capacity =
            NonZeroUsize::new(DEALS_CACHE_CAPACITY).expect("Cache capacity must be non-zero");

        WatchService {
            normalizer: Normalizer::new(config.unknown_side),
            config,
            directory,
            scan_cache: Arc::new(ScanCache::new()),
            roster: Arc::new(RosterCache::new()),
            scanner: Mutex::new(None),
            roster_actor: Mutex::new(None),
            deals_cache: Mutex::new(LruCache::new(cache_capacity)),
        }
    }

    /// Preload both caches from the snapshot directory, if configured.
    /// Loaded data is display-only: the first live pass still re-enumerates.
    pub async fn warm_start(&self) {
        let Some(ref dir) = self.config.snapshot_dir else {
            return;
        };

        if let Some(saved) = snapshot::load_roster(dir).await {
            info!(
                "warm start: {} accounts from roster snapshot of {}",
                saved.accounts.len(),
                saved.saved_at
            );
            self.roster.warm_start(saved.accounts, saved.saved_at).await;
        }

        if let Some(saved) = snapshot::load_positions(dir).await {
            info!(
                "warm start: {} positions across {} logins from snapshot of {}",
                saved.positions.len(),
                saved.logins.len(),
                saved.saved_at
            );
            self.scan_cache
                .warm_start(saved.positions, saved.logins, saved.saved_at)
                .await;
        }
    }

    /// Spawn the scanner and roster actors. Calling this twice is a no-op.
    pub async fn start_actors(&self) {
        let mut scanner = self.scanner.lock().await;
        if scanner.is_none() {
            *scanner = Some(ScannerActor::spawn(
                self.directory.clone(),
                self.scan_cache.clone(),
                self.normalizer,
                self.config.scanner_config(),
            ));
        } else {
            debug!("scanner actor already running");
        }
        drop(scanner);

        let mut roster_actor = self.roster_actor.lock().await;
        if roster_actor.is_none() {
            *roster_actor = Some(RosterActor::spawn(
                self.directory.clone(),
                self.roster.clone(),
                self.config.roster_config(),
            ));
        } else {
            debug!("roster actor already running");
        }
    }

    // ---- scan control ----------------------------------------------------

    pub async fn scan_status(&self) -> ScanSnapshot {
        self.scan_cache.snapshot().await
    }

    pub async fn start_scanning(&self) {
        info!("scanning enabled");
        self.scan_cache.set_scanning(true).await;
    }

    pub async fn stop_scanning(&self) {
        info!("scanning disabled");
        self.scan_cache.set_scanning(false).await;
    }

    /// Forces the next pass to re-enumerate the account universe, and turns
    /// scanning on so the pass actually runs.
    pub async fn rescan(&self) {
        info!("full rescan requested");
        self.scan_cache.request_full_rescan().await;
        self.scan_cache.set_scanning(true).await;
    }

    // ---- open positions and pivots ---------------------------------------

    pub async fn positions(&self) -> Arc<Vec<PositionRecord>> {
        self.scan_cache.snapshot().await.positions
    }

    pub async fn net_lot_matrix(&self, symbols: Option<&[String]>) -> ExposureMatrix {
        let positions = self.filtered_positions(symbols).await;
        ExposureMatrix::net_lot(&positions)
    }

    pub async fn open_pnl_matrix(&self, symbols: Option<&[String]>) -> ExposureMatrix {
        let positions = self.filtered_positions(symbols).await;
        ExposureMatrix::open_pnl(&positions)
    }

    /// Net-lot and open-P&L column totals per symbol, largest absolute
    /// net exposure first.
    pub async fn symbol_rollup(&self) -> Vec<SymbolExposure> {
        let positions = self.positions().await;
        symbol_rollup(
            &ExposureMatrix::net_lot(&positions),
            &ExposureMatrix::open_pnl(&positions),
        )
    }

    /// Per-login exposure for one exact symbol.
    pub async fn symbol_breakdown(&self, symbol: &str) -> Vec<LoginExposure> {
        let positions = self.positions().await;
        symbol_breakdown(&positions, symbol)
    }

    async fn filtered_positions(&self, symbols: Option<&[String]>) -> Vec<PositionRecord> {
        let positions = self.positions().await;
        match symbols {
            Some(filter) => positions
                .iter()
                .filter(|p| filter.iter().any(|s| s == &p.symbol))
                .cloned()
                .collect(),
            None => positions.as_ref().clone(),
        }
    }

    // ---- realized P&L -----------------------------------------------------

    /// Realized P&L pivot over closed deals. The login universe is the
    /// account roster when one is loaded, otherwise the scanner's stored
    /// logins. Deals are fetched through the same bounded pool discipline
    /// as position scans, behind a TTL'd cache.
    pub async fn realized_matrix(&self, symbols: Option<&[String]>) -> ExposureMatrix {
        let logins = self.deal_login_universe().await;
        if logins.is_empty() {
            return ExposureMatrix::realized_pnl(&[]);
        }

        let worker_count = self.config.scan_workers.min(logins.len()).max(1);
        let mut results = stream::iter(logins.into_iter())
            .map(|login| async move { self.deals_for(&login).await })
            .buffer_unordered(worker_count);

        let mut deals: Vec<DealRecord> = Vec::new();
        while let Some(batch) = results.next().await {
            deals.extend(batch.iter().cloned());
        }

        if let Some(filter) = symbols {
            deals.retain(|d| filter.iter().any(|s| s == &d.symbol));
        }
        ExposureMatrix::realized_pnl(&deals)
    }

    /// Closed deals for one login, cached for the configured TTL. Failures
    /// cache an empty list so a broken login is retried on the TTL cadence,
    /// not on every matrix read.
    pub async fn deals_for(&self, login: &str) -> Arc<Vec<DealRecord>> {
        let ttl = self.config.deals_cache_ttl();
        {
            let mut cache = self.deals_cache.lock().await;
            if let Some((fetched_at, deals)) = cache.get(login) {
                if fetched_at.elapsed() < ttl {
                    return deals.clone();
                }
            }
        }

        // Lock released across the fetch so slow logins don't serialize
        // the whole pool.
        let deals = match timeout(
            self.config.fetch_timeout(),
            self.directory.deals_by_login(login),
        )
        .await
        {
            Ok(Ok(rows)) => rows
                .iter()
                .filter_map(|raw| self.normalizer.deal(login, raw))
                .collect(),
            Ok(Err(e)) => {
                warn!("deal fetch failed for login {}: {}", login, e);
                Vec::new()
            }
            Err(_) => {
                warn!("deal fetch timed out for login {}", login);
                Vec::new()
            }
        };

        let deals = Arc::new(deals);
        let mut cache = self.deals_cache.lock().await;
        cache.put(login.to_string(), (Instant::now(), deals.clone()));
        deals
    }

    async fn deal_login_universe(&self) -> Vec<String> {
        let accounts = self.roster.accounts().await;
        if !accounts.is_empty() {
            return accounts.iter().map(|a| a.login.clone()).collect();
        }
        self.scan_cache.stored_logins().await.as_ref().clone()
    }

    // ---- account roster ---------------------------------------------------

    pub async fn accounts(&self) -> (Arc<Vec<Account>>, Option<DateTime<Utc>>) {
        self.roster.snapshot().await
    }

    pub async fn roster_summary(&self) -> RosterSummary {
        let accounts = self.roster.accounts().await;
        summarize(&accounts)
    }

    /// Raw detail blob for one login, straight off the bridge.
    pub async fn account_details(&self, login: &str) -> Result<Value, DirectoryError> {
        timeout(
            self.config.fetch_timeout(),
            self.directory.account_details(login),
        )
        .await
        .map_err(|_| DirectoryError::Timeout)?
    }

    /// Asks the roster actor for an immediate refresh.
    pub async fn refresh_roster(&self) -> Result<(), ScanError> {
        let roster_actor = self.roster_actor.lock().await;
        match roster_actor.as_ref() {
            Some((tx, _)) => {
                tx.send(RosterMessage::RefreshNow).await?;
                Ok(())
            }
            None => Err(ScanError::ControlChannel(
                "roster actor not running".to_string(),
            )),
        }
    }

    // ---- lifecycle --------------------------------------------------------

    /// Stops both actors, waiting a bounded time for each to drain.
    pub async fn shutdown(&self) {
        info!("Shutting down watch service...");

        if let Some((tx, handle)) = self.scanner.lock().await.take() {
            if tx.send(ScannerMessage::Shutdown).await.is_err() {
                warn!("scanner actor already gone");
            }
            if timeout(SHUTDOWN_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("scanner actor did not stop in time");
            }
        }

        if let Some((tx, handle)) = self.roster_actor.lock().await.take() {
            if tx.send(RosterMessage::Shutdown).await.is_err() {
                warn!("roster actor already gone");
            }
            if timeout(SHUTDOWN_JOIN_TIMEOUT, handle).await.is_err() {
                warn!("roster actor did not stop in time");
            }
        }

        info!("Watch service shutdown complete");
    }
}
