use std::path::PathBuf;
use std::time::Duration;

use crate::application::actors::{RosterConfig, ScannerConfig};
use crate::domain::entities::position::Side;

/// Which account directory the daemon talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMode {
    /// Manager HTTP bridge (production)
    Rest,
    /// Seeded in-memory directory, no bridge required
    Mock,
}

/// Daemon configuration, compiled defaults overridable from the environment
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub bridge_mode: BridgeMode,
    pub bridge_base_url: String,
    pub bridge_api_token: Option<String>,
    pub http_bind: String,
    pub scan_tick_seconds: u64,      // scanner idle poll cadence
    pub rescan_delay_seconds: u64,   // pause between scan passes
    pub scan_workers: usize,         // per-login fetch pool cap
    pub fetch_timeout_ms: u64,       // per bridge call
    pub range_scan_start: u64,       // fallback enumeration range, inclusive
    pub range_scan_end: u64,
    pub roster_refresh_seconds: u64, // account roster cadence
    pub scan_on_start: bool,         // begin scanning at boot
    pub unknown_side: Side,          // side when a payload carries none
    pub snapshot_dir: Option<PathBuf>, // cache persistence, off when None
    pub deals_cache_ttl_seconds: u64, // realized P&L deal cache
    pub mock_accounts: usize,        // fixture size in mock mode
}

impl Default for WatchConfig {
    fn default() -> Self {
        WatchConfig {
            bridge_mode: BridgeMode::Mock,
            bridge_base_url: "http://127.0.0.1:8787".to_string(),
            bridge_api_token: None,
            http_bind: "127.0.0.1:3000".to_string(),
            scan_tick_seconds: 1,
            rescan_delay_seconds: 5,
            scan_workers: 10,
            fetch_timeout_ms: 10_000,
            range_scan_start: 1,
            range_scan_end: 100_000,
            roster_refresh_seconds: 300,
            scan_on_start: true,
            unknown_side: Side::Buy,
            snapshot_dir: None,
            deals_cache_ttl_seconds: 60,
            mock_accounts: 64,
        }
    }
}

/// Parses "buy" / "sell" (any case) into a side.
pub fn parse_side(value: &str) -> Option<Side> {
    match value.trim().to_lowercase().as_str() {
        "buy" => Some(Side::Buy),
        "sell" => Some(Side::Sell),
        _ => None,
    }
}

impl WatchConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> WatchConfig {
        let mut config = WatchConfig::default();

        if let Ok(mode) = std::env::var("BRIDGE_MODE") {
            match mode.trim().to_lowercase().as_str() {
                "rest" | "http" | "bridge" => config.bridge_mode = BridgeMode::Rest,
                "mock" | "memory" => config.bridge_mode = BridgeMode::Mock,
                other => {
                    tracing::warn!(
                        "Invalid BRIDGE_MODE value: {} (expected rest or mock), using mock",
                        other
                    );
                }
            }
        }

        if let Ok(url) = std::env::var("BRIDGE_BASE_URL") {
            if !url.trim().is_empty() {
                config.bridge_base_url = url.trim().to_string();
            }
        }

        if let Ok(token) = std::env::var("BRIDGE_API_TOKEN") {
            if !token.trim().is_empty() {
                config.bridge_api_token = Some(token.trim().to_string());
            }
        }

        if let Ok(bind) = std::env::var("HTTP_BIND") {
            if !bind.trim().is_empty() {
                config.http_bind = bind.trim().to_string();
            }
        }

        if let Ok(tick) = std::env::var("SCAN_TICK_SECS") {
            if let Ok(value) = tick.parse::<u64>() {
                if (1..=60).contains(&value) {
                    config.scan_tick_seconds = value;
                }
            }
        }

        if let Ok(delay) = std::env::var("RESCAN_DELAY_SECS") {
            if let Ok(value) = delay.parse::<u64>() {
                if value <= 300 {
                    config.rescan_delay_seconds = value;
                }
            }
        }

        if let Ok(workers) = std::env::var("SCAN_WORKERS") {
            if let Ok(value) = workers.parse::<usize>() {
                if (1..=64).contains(&value) {
                    config.scan_workers = value;
                }
            }
        }

        if let Ok(timeout) = std::env::var("FETCH_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                if (500..=60_000).contains(&value) {
                    config.fetch_timeout_ms = value;
                }
            }
        }

        if let Ok(start) = std::env::var("RANGE_SCAN_START") {
            if let Ok(value) = start.parse::<u64>() {
                if value >= 1 {
                    config.range_scan_start = value;
                }
            }
        }

        if let Ok(end) = std::env::var("RANGE_SCAN_END") {
            if let Ok(value) = end.parse::<u64>() {
                config.range_scan_end = value;
            }
        }

        if config.range_scan_end < config.range_scan_start {
            tracing::warn!(
                "RANGE_SCAN_END {} below RANGE_SCAN_START {}, swapping",
                config.range_scan_end,
                config.range_scan_start
            );
            std::mem::swap(&mut config.range_scan_start, &mut config.range_scan_end);
        }

        if let Ok(refresh) = std::env::var("ROSTER_REFRESH_SECS") {
            if let Ok(value) = refresh.parse::<u64>() {
                if (30..=3600).contains(&value) {
                    config.roster_refresh_seconds = value;
                }
            }
        }

        if let Ok(on_start) = std::env::var("SCAN_ON_START") {
            config.scan_on_start = on_start.to_lowercase() == "true" || on_start == "1";
        }

        if let Ok(side) = std::env::var("UNKNOWN_SIDE") {
            match parse_side(&side) {
                Some(value) => config.unknown_side = value,
                None => {
                    tracing::warn!(
                        "Invalid UNKNOWN_SIDE value: {} (expected buy or sell), using buy",
                        side
                    );
                }
            }
        }

        if let Ok(dir) = std::env::var("SNAPSHOT_DIR") {
            if !dir.trim().is_empty() {
                config.snapshot_dir = Some(PathBuf::from(dir.trim()));
            }
        }

        if let Ok(ttl) = std::env::var("DEALS_CACHE_TTL_SECS") {
            if let Ok(value) = ttl.parse::<u64>() {
                if (10..=3600).contains(&value) {
                    config.deals_cache_ttl_seconds = value;
                }
            }
        }

        if let Ok(count) = std::env::var("MOCK_ACCOUNTS") {
            if let Ok(value) = count.parse::<usize>() {
                if (1..=10_000).contains(&value) {
                    config.mock_accounts = value;
                }
            }
        }

        config
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    pub fn deals_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.deals_cache_ttl_seconds)
    }

    pub fn scanner_config(&self) -> ScannerConfig {
        ScannerConfig {
            tick: Duration::from_secs(self.scan_tick_seconds),
            rescan_delay: Duration::from_secs(self.rescan_delay_seconds),
            worker_cap: self.scan_workers,
            fetch_timeout: self.fetch_timeout(),
            range: (self.range_scan_start, self.range_scan_end),
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }

    pub fn roster_config(&self) -> RosterConfig {
        RosterConfig {
            refresh: Duration::from_secs(self.roster_refresh_seconds),
            fetch_timeout: self.fetch_timeout(),
            range: (self.range_scan_start, self.range_scan_end),
            snapshot_dir: self.snapshot_dir.clone(),
        }
    }
}
