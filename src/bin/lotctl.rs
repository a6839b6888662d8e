//! Operator CLI for the LOTWATCH bridge: one-shot lookups and sweeps
//! against the same account directory the daemon polls.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use futures_util::stream::{self, StreamExt};
use tokio::time::{timeout, Instant};

use lotwatch::config::{BridgeMode, WatchConfig};
use lotwatch::domain::services::exposure::ExposureMatrix;
use lotwatch::domain::services::normalize::Normalizer;
use lotwatch::infrastructure::bridge_client::ManagerBridgeClient;
use lotwatch::infrastructure::directory::{enumerate_accounts, AccountDirectory};
use lotwatch::infrastructure::memory_directory::InMemoryDirectory;

#[derive(Parser)]
#[command(name = "lotctl")]
#[command(about = "LOTWATCH bridge utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate the account universe and print it as JSON
    Accounts,

    /// Print the raw detail blob for one login
    Detail {
        /// Account login
        login: String,
    },

    /// Print normalized open positions for one login
    Positions {
        /// Account login
        login: String,
    },

    /// Print normalized closed deals for one login
    Deals {
        /// Account login
        login: String,
    },

    /// Sweep a login range through the fetch pool and print the net-lot pivot as JSON
    ScanRange {
        /// First login of the range, inclusive
        #[arg(long)]
        start: u64,

        /// Last login of the range, inclusive
        #[arg(long)]
        end: u64,

        /// Concurrent fetches (defaults to the configured pool size)
        #[arg(long)]
        workers: Option<usize>,
    },

    /// Probe the bridge endpoints and report reachability
    Diag,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lotwatch=warn".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = WatchConfig::from_env();
    let normalizer = Normalizer::new(config.unknown_side);

    let directory: Arc<dyn AccountDirectory> = match config.bridge_mode {
        BridgeMode::Rest => Arc::new(ManagerBridgeClient::new(
            &config.bridge_base_url,
            config.bridge_api_token.clone(),
            config.fetch_timeout(),
            normalizer,
        )?),
        BridgeMode::Mock => Arc::new(InMemoryDirectory::seeded(config.mock_accounts)),
    };

    match cli.cmd {
        Commands::Accounts => {
            let accounts = enumerate_accounts(
                directory.as_ref(),
                (config.range_scan_start, config.range_scan_end),
                config.fetch_timeout(),
            )
            .await?;
            println!("count={}", accounts.len());
            println!("{}", serde_json::to_string_pretty(&accounts)?);
        }

        Commands::Detail { login } => {
            let details = directory.account_details(&login).await?;
            println!("{}", serde_json::to_string_pretty(&details)?);
        }

        Commands::Positions { login } => {
            let rows = directory.open_positions(&login).await?;
            let records: Vec<_> = rows
                .iter()
                .filter_map(|raw| normalizer.position(&login, raw))
                .collect();
            println!("login={} positions={}", login, records.len());
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::Deals { login } => {
            let rows = directory.deals_by_login(&login).await?;
            let records: Vec<_> = rows
                .iter()
                .filter_map(|raw| normalizer.deal(&login, raw))
                .collect();
            println!("login={} deals={}", login, records.len());
            println!("{}", serde_json::to_string_pretty(&records)?);
        }

        Commands::ScanRange { start, end, workers } => {
            let workers = workers.unwrap_or(config.scan_workers);
            scan_range(
                directory,
                normalizer,
                start,
                end,
                workers,
                config.fetch_timeout(),
            )
            .await?;
        }

        Commands::Diag => {
            diag(directory, config.fetch_timeout()).await;
        }
    }

    Ok(())
}

/// One-shot range sweep through the same pool discipline the daemon uses.
/// Per-login counts stream to stderr as they complete; the final net-lot
/// pivot lands on stdout as JSON.
async fn scan_range(
    directory: Arc<dyn AccountDirectory>,
    normalizer: Normalizer,
    start: u64,
    end: u64,
    workers: usize,
    fetch_timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let accounts = match timeout(fetch_timeout, directory.list_accounts_by_range(start, end)).await
    {
        Ok(Ok(accounts)) => accounts,
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => return Err("range listing timed out".into()),
    };
    println!("range={}..={} accounts={}", start, end, accounts.len());

    let worker_count = workers.min(accounts.len()).max(1);
    let mut results = stream::iter(accounts.into_iter().map(|a| a.login))
        .map(|login| {
            let directory = directory.clone();
            async move {
                let outcome = timeout(fetch_timeout, directory.open_positions(&login)).await;
                (login, outcome)
            }
        })
        .buffer_unordered(worker_count);

    let mut records = Vec::new();
    while let Some((login, outcome)) = results.next().await {
        match outcome {
            Ok(Ok(rows)) => {
                let normalized: Vec<_> = rows
                    .iter()
                    .filter_map(|raw| normalizer.position(&login, raw))
                    .collect();
                eprintln!("login={} positions={}", login, normalized.len());
                records.extend(normalized);
            }
            Ok(Err(e)) => eprintln!("login={} error={}", login, e),
            Err(_) => eprintln!("login={} error=timeout", login),
        }
    }

    let matrix = ExposureMatrix::net_lot(&records);
    println!("{}", serde_json::to_string_pretty(&matrix)?);
    Ok(())
}

/// Probes each endpoint family once and reports status with timings.
async fn diag(directory: Arc<dyn AccountDirectory>, fetch_timeout: Duration) {
    let started = Instant::now();
    match timeout(fetch_timeout, directory.list_accounts_by_group()).await {
        Ok(Ok(accounts)) => println!(
            "group_listing=ok accounts={} elapsed_ms={}",
            accounts.len(),
            started.elapsed().as_millis()
        ),
        Ok(Err(e)) => println!("group_listing=failed error={}", e),
        Err(_) => println!("group_listing=timeout after_ms={}", fetch_timeout.as_millis()),
    }

    let started = Instant::now();
    match timeout(fetch_timeout, directory.list_accounts_by_range(1, 10)).await {
        Ok(Ok(accounts)) => {
            println!(
                "range_listing=ok accounts={} elapsed_ms={}",
                accounts.len(),
                started.elapsed().as_millis()
            );
            if let Some(first) = accounts.first() {
                let started = Instant::now();
                match timeout(fetch_timeout, directory.open_positions(&first.login)).await {
                    Ok(Ok(rows)) => println!(
                        "position_fetch=ok login={} rows={} elapsed_ms={}",
                        first.login,
                        rows.len(),
                        started.elapsed().as_millis()
                    ),
                    Ok(Err(e)) => println!("position_fetch=failed login={} error={}", first.login, e),
                    Err(_) => println!("position_fetch=timeout login={}", first.login),
                }
            }
        }
        Ok(Err(e)) => println!("range_listing=failed error={}", e),
        Err(_) => println!("range_listing=timeout after_ms={}", fetch_timeout.as_millis()),
    }
}
