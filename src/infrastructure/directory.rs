//! The account directory seam.
//!
//! Everything the watcher knows about the outside world comes through
//! [`AccountDirectory`]: the roster of accounts, each login's open
//! positions, and its closed deals. Production talks to the manager HTTP
//! bridge; tests and mock mode use the in-memory implementation.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use crate::domain::entities::account::Account;
use crate::domain::errors::DirectoryError;

#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// All accounts, enumerated through the configured manager groups.
    async fn list_accounts_by_group(&self) -> Result<Vec<Account>, DirectoryError>;

    /// All accounts whose numeric login falls in `[start, end]`. Fallback
    /// path for bridges without group enumeration.
    async fn list_accounts_by_range(&self, start: u64, end: u64)
        -> Result<Vec<Account>, DirectoryError>;

    /// Raw open positions for one login. Payload rows are bridge-shaped
    /// JSON; normalization happens in the caller.
    async fn open_positions(&self, login: &str) -> Result<Vec<Value>, DirectoryError>;

    /// Raw closed deals for one login.
    async fn deals_by_login(&self, login: &str) -> Result<Vec<Value>, DirectoryError>;

    /// Full raw detail blob for one login, passed through for drill-down
    /// views.
    async fn account_details(&self, login: &str) -> Result<Value, DirectoryError>;
}

/// Enumerates the account universe: group listing first, then the numeric
/// range sweep when groups come back empty or failing. Returns whatever
/// the surviving strategy produced, which may legitimately be empty.
pub async fn enumerate_accounts(
    directory: &dyn AccountDirectory,
    range: (u64, u64),
    per_call_timeout: Duration,
) -> Result<Vec<Account>, DirectoryError> {
    match tokio::time::timeout(per_call_timeout, directory.list_accounts_by_group()).await {
        Ok(Ok(accounts)) if !accounts.is_empty() => return Ok(accounts),
        Ok(Ok(_)) => {
            info!("group enumeration returned no accounts, falling back to range scan");
        }
        Ok(Err(e)) => {
            warn!("group enumeration failed ({}), falling back to range scan", e);
        }
        Err(_) => {
            warn!("group enumeration timed out, falling back to range scan");
        }
    }

    match tokio::time::timeout(
        per_call_timeout,
        directory.list_accounts_by_range(range.0, range.1),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(DirectoryError::Timeout),
    }
}
