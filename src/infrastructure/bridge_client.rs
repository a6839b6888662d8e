//! HTTP client for the manager bridge.
//!
//! The MT5 manager API is only reachable through a small sidecar that
//! republishes it as JSON over HTTP. The sidecar's responses are passed
//! through as raw `serde_json::Value` rows wherever the scanner or the
//! drill-down views normalize them; account enumeration is normalized here
//! because every caller wants canonical `Account`s.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::domain::entities::account::Account;
use crate::domain::errors::DirectoryError;
use crate::domain::services::normalize::Normalizer;
use crate::infrastructure::directory::AccountDirectory;

pub struct ManagerBridgeClient {
    client: Client,
    base_url: String,
    api_token: Option<String>,
    normalizer: Normalizer,
}

impl ManagerBridgeClient {
    pub fn new(
        base_url: &str,
        api_token: Option<String>,
        timeout: Duration,
        normalizer: Normalizer,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DirectoryError::Request(e.to_string()))?;
        Ok(ManagerBridgeClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            normalizer,
        })
    }

    async fn get_json(&self, path: &str) -> Result<Value, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("bridge GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Status { status, body });
        }

        Ok(response.json().await?)
    }

    async fn get_rows(&self, path: &str) -> Result<Vec<Value>, DirectoryError> {
        Ok(rows_of(self.get_json(path).await?))
    }

    async fn get_accounts(&self, path: &str) -> Result<Vec<Account>, DirectoryError> {
        let rows = self.get_rows(path).await?;
        Ok(rows
            .iter()
            .filter_map(|raw| self.normalizer.account(raw))
            .collect())
    }
}

/// Accepts both payload shapes the bridge has shipped: a bare array, or an
/// envelope with the array under "data". Anything else reads as no rows.
fn rows_of(payload: Value) -> Vec<Value> {
    match payload {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

#[async_trait]
impl AccountDirectory for ManagerBridgeClient {
    async fn list_accounts_by_group(&self) -> Result<Vec<Account>, DirectoryError> {
        self.get_accounts("/api/accounts?by=groups").await
    }

    async fn list_accounts_by_range(
        &self,
        start: u64,
        end: u64,
    ) -> Result<Vec<Account>, DirectoryError> {
        self.get_accounts(&format!("/api/accounts/range?start={}&end={}", start, end))
            .await
    }

    async fn open_positions(&self, login: &str) -> Result<Vec<Value>, DirectoryError> {
        self.get_rows(&format!("/api/positions/{}", login)).await
    }

    async fn deals_by_login(&self, login: &str) -> Result<Vec<Value>, DirectoryError> {
        self.get_rows(&format!("/api/deals/{}", login)).await
    }

    async fn account_details(&self, login: &str) -> Result<Value, DirectoryError> {
        self.get_json(&format!("/api/accounts/{}", login)).await
    }
}
