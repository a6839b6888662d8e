//! Shared state of the position scanner.
//!
//! One writer (the scanner actor) and many readers (HTTP handlers, CLI)
//! share this cache. Readers never see a half-built list: every publish
//! swaps in a complete `Arc<Vec<_>>`, growing monotonically within a pass,
//! so a snapshot taken mid-pass is simply the pass so far. The `scanning`
//! and `full_scan_done` flags are owned by the control surface and the
//! scanner respectively; the actor only ever reads `scanning` on its tick.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::domain::entities::position::PositionRecord;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScanProgress {
    /// Logins finished in the current pass.
    pub current: usize,
    /// Logins queued for the current pass.
    pub total: usize,
    /// Login whose results landed most recently.
    pub current_login: String,
}

/// Point-in-time view of the cache. Cheap to clone; the record list and
/// login roster are shared, not copied.
#[derive(Debug, Clone)]
pub struct ScanSnapshot {
    pub positions: Arc<Vec<PositionRecord>>,
    pub logins: Arc<Vec<String>>,
    pub stored_tickets: Arc<Vec<u64>>,
    pub scanning: bool,
    pub full_scan_done: bool,
    pub progress: ScanProgress,
    /// Completion time of the last full or incremental pass.
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug)]
struct ScanState {
    positions: Arc<Vec<PositionRecord>>,
    logins: Arc<Vec<String>>,
    stored_tickets: Arc<Vec<u64>>,
    scanning: bool,
    full_scan_done: bool,
    progress: ScanProgress,
    timestamp: Option<DateTime<Utc>>,
}

impl Default for ScanState {
    fn default() -> Self {
        ScanState {
            positions: Arc::new(Vec::new()),
            logins: Arc::new(Vec::new()),
            stored_tickets: Arc::new(Vec::new()),
            scanning: false,
            full_scan_done: false,
            progress: ScanProgress::default(),
            timestamp: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanCache {
    state: RwLock<ScanState>,
}

impl ScanCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> ScanSnapshot {
        let state = self.state.read().await;
        ScanSnapshot {
            positions: state.positions.clone(),
            logins: state.logins.clone(),
            stored_tickets: state.stored_tickets.clone(),
            scanning: state.scanning,
            full_scan_done: state.full_scan_done,
            progress: state.progress.clone(),
            timestamp: state.timestamp,
        }
    }

    pub async fn is_scanning(&self) -> bool {
        self.state.read().await.scanning
    }

    pub async fn set_scanning(&self, on: bool) {
        self.state.write().await.scanning = on;
    }

    pub async fn full_scan_done(&self) -> bool {
        self.state.read().await.full_scan_done
    }

    /// Forces the next pass to re-enumerate the account universe.
    pub async fn request_full_rescan(&self) {
        self.state.write().await.full_scan_done = false;
    }

    pub async fn stored_logins(&self) -> Arc<Vec<String>> {
        self.state.read().await.logins.clone()
    }

    /// Opens a pass: progress is reset to `0 / total`, and a full pass
    /// installs the freshly enumerated login roster.
    pub async fn begin_pass(&self, logins: Option<Arc<Vec<String>>>, total: usize) {
        let mut state = self.state.write().await;
        if let Some(logins) = logins {
            state.logins = logins;
        }
        state.progress = ScanProgress {
            current: 0,
            total,
            current_login: String::new(),
        };
    }

    /// Publishes the accumulator after one login's results landed. The
    /// pass grows the published list; it never shrinks between publishes.
    pub async fn publish_partial(
        &self,
        positions: Arc<Vec<PositionRecord>>,
        completed: usize,
        login: &str,
    ) {
        let mut state = self.state.write().await;
        state.positions = positions;
        state.progress.current = completed;
        state.progress.current_login = login.to_string();
    }

    /// Closes a pass: final list, ticket index, completion timestamp, and
    /// (for full passes) the switch to incremental mode.
    pub async fn complete_pass(
        &self,
        positions: Arc<Vec<PositionRecord>>,
        tickets: Vec<u64>,
        mark_full_done: bool,
    ) {
        let mut state = self.state.write().await;
        state.positions = positions;
        state.stored_tickets = Arc::new(tickets);
        if mark_full_done {
            state.full_scan_done = true;
        }
        state.timestamp = Some(Utc::now());
    }

    /// Preloads positions from a persisted snapshot at boot. Display-only:
    /// `full_scan_done` stays false so the first live pass re-enumerates.
    pub async fn warm_start(
        &self,
        positions: Vec<PositionRecord>,
        logins: Vec<String>,
        saved_at: DateTime<Utc>,
    ) {
        let mut state = self.state.write().await;
        state.positions = Arc::new(positions);
        state.logins = Arc::new(logins);
        state.timestamp = Some(saved_at);
    }
}
