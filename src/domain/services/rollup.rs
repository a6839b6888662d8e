//! Per-symbol rollups derived from the exposure matrices.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::domain::entities::position::PositionRecord;
use crate::domain::services::exposure::{compare_logins, ExposureMatrix};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolExposure {
    pub symbol: String,
    pub net_lot: f64,
    pub usd_pnl: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginExposure {
    pub login: String,
    pub net_lot: f64,
    pub usd_pnl: f64,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Per-symbol totals across all logins, heaviest absolute net exposure
/// first (ties broken by symbol). Sums run over real rows only, so the
/// margin row is never double counted.
pub fn symbol_rollup(net: &ExposureMatrix, pnl: &ExposureMatrix) -> Vec<SymbolExposure> {
    let mut symbols: BTreeSet<&str> = net.symbols.iter().map(String::as_str).collect();
    symbols.extend(pnl.symbols.iter().map(String::as_str));

    let mut rollup: Vec<SymbolExposure> = symbols
        .into_iter()
        .map(|symbol| SymbolExposure {
            symbol: symbol.to_string(),
            net_lot: round2(net.column_total(symbol)),
            usd_pnl: round2(pnl.column_total(symbol)),
        })
        .collect();
    rollup.sort_by(|a, b| {
        b.net_lot
            .abs()
            .partial_cmp(&a.net_lot.abs())
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    rollup
}

/// Per-login exposure in a single symbol, logins ascending.
pub fn symbol_breakdown(positions: &[PositionRecord], symbol: &str) -> Vec<LoginExposure> {
    let mut by_login: HashMap<&str, (f64, f64)> = HashMap::new();
    for position in positions.iter().filter(|p| p.symbol == symbol) {
        let entry = by_login.entry(position.login.as_str()).or_insert((0.0, 0.0));
        entry.0 += position.signed_volume();
        entry.1 += position.profit;
    }

    let mut breakdown: Vec<LoginExposure> = by_login
        .into_iter()
        .map(|(login, (net_lot, usd_pnl))| LoginExposure {
            login: login.to_string(),
            net_lot: round2(net_lot),
            usd_pnl: round2(usd_pnl),
        })
        .collect();
    breakdown.sort_by(|a, b| compare_logins(&a.login, &b.login));
    breakdown
}
