//! In-memory account directory.
//!
//! Serves two jobs: `BRIDGE_MODE=mock` runs the whole daemon against a
//! seeded fixture when no bridge is reachable, and the test suites script
//! it per login (payload rows, failures, latency) to drive the scanner.
//! Payload rows are stored as raw JSON on purpose, so the normalization
//! path runs exactly as it does against the real bridge.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::domain::entities::account::Account;
use crate::domain::errors::DirectoryError;
use crate::infrastructure::directory::AccountDirectory;

const MOCK_SYMBOLS: &[&str] = &["EURUSD", "XAUUSD", "GBPUSD", "USDJPY", "BTCUSD", "US30"];

#[derive(Default)]
pub struct InMemoryDirectory {
    accounts: RwLock<Vec<Account>>,
    positions: RwLock<HashMap<String, Vec<Value>>>,
    deals: RwLock<HashMap<String, Vec<Value>>>,
    failing_logins: RwLock<HashSet<String>>,
    fail_group_listing: AtomicBool,
    latency: Option<Duration>,
    group_calls: AtomicUsize,
    range_calls: AtomicUsize,
    position_calls: AtomicUsize,
    deal_calls: AtomicUsize,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Random but well-formed fixture for mock mode: `count` accounts with
    /// a mix of payload vintages, so normalization sees all of them.
    pub fn seeded(count: usize) -> Self {
        let mut rng = rand::thread_rng();
        let mut directory = InMemoryDirectory::new();
        let mut ticket = 1u64;

        let mut accounts = Vec::with_capacity(count);
        let mut positions: HashMap<String, Vec<Value>> = HashMap::new();
        let mut deals: HashMap<String, Vec<Value>> = HashMap::new();

        for i in 0..count {
            let login = (1001 + i as u64).to_string();
            let group = if i % 4 == 0 {
                "demo\\forex-usd"
            } else {
                "real\\forex-usd"
            };
            let balance: f64 = rng.gen_range(500.0..50_000.0);
            let profit: f64 = rng.gen_range(-800.0..800.0);
            accounts.push(Account {
                login: login.clone(),
                name: format!("Account {}", login),
                group: group.to_string(),
                email: format!("{}@example.test", login),
                leverage: *[100, 200, 500].get(i % 3).unwrap_or(&100),
                balance,
                equity: balance + profit,
                profit,
            });

            let open = rng.gen_range(0..5);
            let mut rows = Vec::with_capacity(open);
            for _ in 0..open {
                let symbol = MOCK_SYMBOLS[rng.gen_range(0..MOCK_SYMBOLS.len())];
                let volume: f64 = rng.gen_range(0.01..5.0);
                let sell = rng.gen_bool(0.5);
                let price: f64 = rng.gen_range(0.5..2500.0);
                let row_profit: f64 = rng.gen_range(-300.0..300.0);
                // Rotate through the payload vintages the bridge has shipped.
                let row = match ticket % 3 {
                    0 => json!({
                        "symbol": symbol,
                        "volume": volume,
                        "type": if sell { 1 } else { 0 },
                        "price": price,
                        "profit": row_profit,
                        "ticket": ticket,
                        "time": 1_700_000_000 + ticket,
                    }),
                    1 => json!({
                        "Symbol": symbol,
                        "Vol": format!("{:.2}", volume),
                        "Type": if sell { "Sell" } else { "Buy" },
                        "PriceOpen": price,
                        "Profit": row_profit,
                        "ID": ticket,
                        "date": "2024.01.15 10:30:00",
                    }),
                    _ => json!({
                        "Symbol": symbol,
                        "Lots": if sell { -volume } else { volume },
                        "Price": price,
                        "pnl": row_profit,
                        "Position": ticket,
                    }),
                };
                rows.push(row);
                ticket += 1;
            }
            positions.insert(login.clone(), rows);

            let closed = rng.gen_range(0..3);
            let mut deal_rows = Vec::with_capacity(closed);
            for _ in 0..closed {
                let symbol = MOCK_SYMBOLS[rng.gen_range(0..MOCK_SYMBOLS.len())];
                deal_rows.push(json!({
                    "Deal": ticket,
                    "Symbol": symbol,
                    "Volume": rng.gen_range(0.01..2.0),
                    "type": if rng.gen_bool(0.5) { 1 } else { 0 },
                    "Profit": rng.gen_range(-200.0..200.0),
                }));
                ticket += 1;
            }
            deals.insert(login, deal_rows);
        }

        *directory.accounts.get_mut() = accounts;
        *directory.positions.get_mut() = positions;
        *directory.deals.get_mut() = deals;
        directory
    }

    pub fn with_account(mut self, account: Account) -> Self {
        self.accounts.get_mut().push(account);
        self
    }

    pub fn with_positions(mut self, login: &str, rows: Vec<Value>) -> Self {
        self.positions.get_mut().insert(login.to_string(), rows);
        self
    }

    pub fn with_deals(mut self, login: &str, rows: Vec<Value>) -> Self {
        self.deals.get_mut().insert(login.to_string(), rows);
        self
    }

    /// Scripts `open_positions` (and `deals_by_login`) for this login to
    /// fail with a remote error.
    pub fn with_failing_login(mut self, login: &str) -> Self {
        self.failing_logins.get_mut().insert(login.to_string());
        self
    }

    pub fn with_group_listing_failure(self) -> Self {
        self.fail_group_listing.store(true, Ordering::Relaxed);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub async fn set_positions(&self, login: &str, rows: Vec<Value>) {
        self.positions.write().await.insert(login.to_string(), rows);
    }

    pub async fn set_accounts(&self, accounts: Vec<Account>) {
        *self.accounts.write().await = accounts;
    }

    pub async fn clear_failures(&self) {
        self.failing_logins.write().await.clear();
    }

    pub fn group_list_calls(&self) -> usize {
        self.group_calls.load(Ordering::Relaxed)
    }

    pub fn range_list_calls(&self) -> usize {
        self.range_calls.load(Ordering::Relaxed)
    }

    pub fn position_fetches(&self) -> usize {
        self.position_calls.load(Ordering::Relaxed)
    }

    pub fn deal_fetches(&self) -> usize {
        self.deal_calls.load(Ordering::Relaxed)
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl AccountDirectory for InMemoryDirectory {
    async fn list_accounts_by_group(&self) -> Result<Vec<Account>, DirectoryError> {
        self.group_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        if self.fail_group_listing.load(Ordering::Relaxed) {
            return Err(DirectoryError::Request(
                "group listing unavailable".to_string(),
            ));
        }
        Ok(self.accounts.read().await.clone())
    }

    async fn list_accounts_by_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<Account>, DirectoryError> {
        self.range_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        Ok(self
            .accounts
            .read()
            .await
            .iter()
            .filter(|account| {
                account
                    .login
                    .parse::<u64>()
                    .map(|login| login >= start && login <= end)
                    .unwrap_or(false)
            })
            .cloned()
            .collect())
    }

    async fn open_positions(&self, login: &str) -> Result<Vec<Value>, DirectoryError> {
        self.position_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        if self.failing_logins.read().await.contains(login) {
            return Err(DirectoryError::Request(format!(
                "scripted failure for login {}",
                login
            )));
        }
        Ok(self
            .positions
            .read()
            .await
            .get(login)
            .cloned()
            .unwrap_or_default())
    }

    async fn deals_by_login(&self, login: &str) -> Result<Vec<Value>, DirectoryError> {
        self.deal_calls.fetch_add(1, Ordering::Relaxed);
        self.simulate_latency().await;
        if self.failing_logins.read().await.contains(login) {
            return Err(DirectoryError::Request(format!(
                "scripted failure for login {}",
                login
            )));
        }
        Ok(self
            .deals
            .read()
            .await
            .get(login)
            .cloned()
            .unwrap_or_default())
    }

    async fn account_details(&self, login: &str) -> Result<Value, DirectoryError> {
        self.simulate_latency().await;
        let accounts = self.accounts.read().await;
        let account = accounts
            .iter()
            .find(|account| account.login == login)
            .ok_or_else(|| DirectoryError::UnknownLogin(login.to_string()))?;
        serde_json::to_value(account).map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(login: &str) -> Account {
        Account {
            login: login.to_string(),
            name: String::new(),
            group: "real\\forex".to_string(),
            email: String::new(),
            leverage: 100,
            balance: 0.0,
            equity: 0.0,
            profit: 0.0,
        }
    }

    #[tokio::test]
    async fn test_range_listing_filters_numeric_logins() {
        let directory = InMemoryDirectory::new()
            .with_account(account("1001"))
            .with_account(account("1002"))
            .with_account(account("5000"));

        let in_range = directory.list_accounts_by_range(1000, 2000).await.unwrap();
        assert_eq!(in_range.len(), 2);
        assert_eq!(directory.range_list_calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_failure() {
        let directory = InMemoryDirectory::new().with_failing_login("1001");
        assert!(directory.open_positions("1001").await.is_err());
        assert!(directory.open_positions("1002").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_group_listing_failure() {
        let directory = InMemoryDirectory::new()
            .with_account(account("1001"))
            .with_group_listing_failure();
        assert!(directory.list_accounts_by_group().await.is_err());
        assert_eq!(directory.group_list_calls(), 1);
    }

    #[tokio::test]
    async fn test_seeded_fixture_is_consistent() {
        let directory = InMemoryDirectory::seeded(8);
        let accounts = directory.list_accounts_by_group().await.unwrap();
        assert_eq!(accounts.len(), 8);
        for account in &accounts {
            // Every seeded login resolves for positions and details.
            assert!(directory.open_positions(&account.login).await.is_ok());
            assert!(directory.account_details(&account.login).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_unknown_login_details() {
        let directory = InMemoryDirectory::new();
        assert!(matches!(
            directory.account_details("404").await,
            Err(DirectoryError::UnknownLogin(_))
        ));
    }
}
