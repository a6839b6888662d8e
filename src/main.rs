use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lotwatch::application::services::WatchService;
use lotwatch::config::{BridgeMode, WatchConfig};
use lotwatch::domain::errors::DirectoryError;
use lotwatch::domain::services::normalize::Normalizer;
use lotwatch::infrastructure::bridge_client::ManagerBridgeClient;
use lotwatch::infrastructure::directory::AccountDirectory;
use lotwatch::infrastructure::memory_directory::InMemoryDirectory;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lotwatch=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WatchConfig::from_env();
    info!("LOTWATCH back-office monitor starting...");
    info!(
        "Bridge mode: {:?}, scan workers: {}, rescan delay: {}s",
        config.bridge_mode, config.scan_workers, config.rescan_delay_seconds
    );

    let directory: Arc<dyn AccountDirectory> = match config.bridge_mode {
        BridgeMode::Rest => {
            info!("Using manager bridge at {}", config.bridge_base_url);
            Arc::new(ManagerBridgeClient::new(
                &config.bridge_base_url,
                config.bridge_api_token.clone(),
                config.fetch_timeout(),
                Normalizer::new(config.unknown_side),
            )?)
        }
        BridgeMode::Mock => {
            info!(
                "Using in-memory directory with {} seeded accounts",
                config.mock_accounts
            );
            Arc::new(InMemoryDirectory::seeded(config.mock_accounts))
        }
    };

    let scan_on_start = config.scan_on_start;
    let http_bind = config.http_bind.clone();
    let service = Arc::new(WatchService::new(config, directory));
    let service_shutdown = service.clone();

    service.warm_start().await;
    service.start_actors().await;
    if scan_on_start {
        service.start_scanning().await;
    }

    let app = Router::new()
        .route("/", get(|| async { "LOTWATCH back-office monitor is running!" }))
        .route("/health", get(health_check))
        .route("/scan/status", get(get_scan_status))
        .route("/scan/start", post(start_scan))
        .route("/scan/stop", post(stop_scan))
        .route("/scan/rescan", post(request_rescan))
        .route("/positions", get(get_positions))
        .route("/matrix/net-lot", get(get_net_lot_matrix))
        .route("/matrix/net-lot.csv", get(get_net_lot_csv))
        .route("/matrix/pnl", get(get_pnl_matrix))
        .route("/matrix/pnl.csv", get(get_pnl_csv))
        .route("/matrix/realized", get(get_realized_matrix))
        .route("/symbols/rollup", get(get_symbol_rollup))
        .route("/symbols/:symbol", get(get_symbol_breakdown))
        .route("/accounts", get(get_accounts))
        .route("/accounts/summary", get(get_roster_summary))
        .route("/accounts/refresh", post(refresh_roster))
        .route("/accounts/:login", get(get_account_details))
        .layer(TraceLayer::new_for_http())
        .with_state(service.clone());

    info!("Listening on {}", http_bind);
    let listener = tokio::net::TcpListener::bind(&http_bind).await?;
    let server = axum::serve(listener, app);

    // Set up graceful shutdown with actor shutdown
    let shutdown_signal = async move {
        let ctrl_c = async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("Received Ctrl+C signal"),
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                    info!("Received SIGTERM signal");
                }
                Err(e) => error!("Failed to install SIGTERM handler: {}", e),
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    };

    info!("Server started successfully. Press Ctrl+C to stop.");
    server.with_graceful_shutdown(shutdown_signal).await?;

    info!("Server shutting down gracefully...");
    service_shutdown.shutdown().await;

    info!("Shutdown complete");
    Ok(())
}

/// Comma-separated symbol filter, e.g. `?symbols=EURUSD,XAUUSD`
#[derive(Debug, Deserialize)]
struct MatrixQuery {
    symbols: Option<String>,
}

impl MatrixQuery {
    fn symbol_list(&self) -> Option<Vec<String>> {
        let raw = self.symbols.as_deref()?;
        let list: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if list.is_empty() {
            None
        } else {
            Some(list)
        }
    }
}

/// Health check endpoint
async fn health_check(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    let status = service.scan_status().await;
    let (accounts, refreshed_at) = service.accounts().await;

    Json(json!({
        "status": "running",
        "scanning": status.scanning,
        "position_count": status.positions.len(),
        "account_count": accounts.len(),
        "last_scan": status.timestamp,
        "roster_refreshed": refreshed_at,
    }))
}

async fn get_scan_status(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    let status = service.scan_status().await;
    Json(json!({
        "scanning": status.scanning,
        "full_scan_done": status.full_scan_done,
        "progress": status.progress,
        "position_count": status.positions.len(),
        "login_count": status.logins.len(),
        "stored_tickets": status.stored_tickets.len(),
        "timestamp": status.timestamp,
    }))
}

async fn start_scan(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    service.start_scanning().await;
    Json(json!({"scanning": true}))
}

async fn stop_scan(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    service.stop_scanning().await;
    Json(json!({"scanning": false}))
}

/// Clears the enumeration so the next pass rebuilds the login universe.
async fn request_rescan(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    service.rescan().await;
    Json(json!({"scanning": true, "full_scan_done": false}))
}

async fn get_positions(
    State(service): State<Arc<WatchService>>,
    Query(query): Query<MatrixQuery>,
) -> Json<serde_json::Value> {
    let positions = service.positions().await;
    match query.symbol_list() {
        Some(filter) => {
            let filtered: Vec<_> = positions
                .iter()
                .filter(|p| filter.iter().any(|s| s == &p.symbol))
                .collect();
            Json(json!({"count": filtered.len(), "positions": filtered}))
        }
        None => Json(json!({"count": positions.len(), "positions": positions.as_ref()})),
    }
}

async fn get_net_lot_matrix(
    State(service): State<Arc<WatchService>>,
    Query(query): Query<MatrixQuery>,
) -> Json<serde_json::Value> {
    let matrix = service.net_lot_matrix(query.symbol_list().as_deref()).await;
    Json(json!(matrix))
}

async fn get_net_lot_csv(
    State(service): State<Arc<WatchService>>,
    Query(query): Query<MatrixQuery>,
) -> impl IntoResponse {
    let matrix = service.net_lot_matrix(query.symbol_list().as_deref()).await;
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], matrix.to_csv())
}

async fn get_pnl_matrix(
    State(service): State<Arc<WatchService>>,
    Query(query): Query<MatrixQuery>,
) -> Json<serde_json::Value> {
    let matrix = service.open_pnl_matrix(query.symbol_list().as_deref()).await;
    Json(json!(matrix))
}

async fn get_pnl_csv(
    State(service): State<Arc<WatchService>>,
    Query(query): Query<MatrixQuery>,
) -> impl IntoResponse {
    let matrix = service.open_pnl_matrix(query.symbol_list().as_deref()).await;
    ([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], matrix.to_csv())
}

async fn get_realized_matrix(
    State(service): State<Arc<WatchService>>,
    Query(query): Query<MatrixQuery>,
) -> Json<serde_json::Value> {
    let matrix = service.realized_matrix(query.symbol_list().as_deref()).await;
    Json(json!(matrix))
}

async fn get_symbol_rollup(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    let rollup = service.symbol_rollup().await;
    Json(json!({"count": rollup.len(), "symbols": rollup}))
}

async fn get_symbol_breakdown(
    State(service): State<Arc<WatchService>>,
    Path(symbol): Path<String>,
) -> Json<serde_json::Value> {
    let breakdown = service.symbol_breakdown(&symbol).await;
    Json(json!({"symbol": symbol, "count": breakdown.len(), "logins": breakdown}))
}

async fn get_accounts(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    let (accounts, refreshed_at) = service.accounts().await;
    Json(json!({
        "count": accounts.len(),
        "refreshed_at": refreshed_at,
        "accounts": accounts.as_ref(),
    }))
}

async fn get_roster_summary(State(service): State<Arc<WatchService>>) -> Json<serde_json::Value> {
    Json(json!(service.roster_summary().await))
}

async fn refresh_roster(
    State(service): State<Arc<WatchService>>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match service.refresh_roster().await {
        Ok(()) => Ok(Json(json!({"refresh": "requested"}))),
        Err(e) => Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": e.to_string()})),
        )),
    }
}

async fn get_account_details(
    State(service): State<Arc<WatchService>>,
    Path(login): Path<String>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<serde_json::Value>)> {
    match service.account_details(&login).await {
        Ok(details) => Ok(Json(json!({"login": login, "details": details}))),
        Err(DirectoryError::UnknownLogin(login)) => Err((
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("unknown login {}", login)})),
        )),
        Err(e) => Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": e.to_string()})),
        )),
    }
}
