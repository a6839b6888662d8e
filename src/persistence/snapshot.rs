//! JSON snapshots of the roster and position caches.
//!
//! Written opportunistically (roster on every refresh, positions at the
//! end of every pass) and read once at boot to warm the display. Loading
//! is forgiving: a missing or unreadable file means "no snapshot", never
//! an error, because the live scanner rebuilds everything anyway.

use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, warn};

use crate::domain::entities::account::Account;
use crate::domain::entities::position::PositionRecord;

pub const ROSTER_FILE: &str = "accounts_cache.json";
pub const POSITIONS_FILE: &str = "positions_cache.json";

#[derive(Debug, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub saved_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PositionsSnapshot {
    pub saved_at: DateTime<Utc>,
    pub logins: Vec<String>,
    pub positions: Vec<PositionRecord>,
}

pub async fn save_roster(dir: &Path, accounts: &[Account]) -> io::Result<()> {
    let snapshot = RosterSnapshot {
        saved_at: Utc::now(),
        accounts: accounts.to_vec(),
    };
    write_json(dir, ROSTER_FILE, &snapshot).await
}

pub async fn load_roster(dir: &Path) -> Option<RosterSnapshot> {
    read_json(dir, ROSTER_FILE).await
}

pub async fn save_positions(
    dir: &Path,
    logins: &[String],
    positions: &[PositionRecord],
) -> io::Result<()> {
    let snapshot = PositionsSnapshot {
        saved_at: Utc::now(),
        logins: logins.to_vec(),
        positions: positions.to_vec(),
    };
    write_json(dir, POSITIONS_FILE, &snapshot).await
}

pub async fn load_positions(dir: &Path) -> Option<PositionsSnapshot> {
    read_json(dir, POSITIONS_FILE).await
}

async fn write_json<T: Serialize>(dir: &Path, file: &str, value: &T) -> io::Result<()> {
    fs::create_dir_all(dir).await?;
    let body = serde_json::to_vec_pretty(value)?;
    fs::write(dir.join(file), body).await
}

async fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Option<T> {
    let path = dir.join(file);
    let bytes = match fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("no snapshot at {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("ignoring unreadable snapshot {}: {}", path.display(), e);
            None
        }
    }
}
