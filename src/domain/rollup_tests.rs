//! Per-symbol rollup tests: ordering, rounding, margin-row exclusion.

use crate::domain::entities::position::{PositionRecord, Side};
use crate::domain::services::exposure::ExposureMatrix;
use crate::domain::services::rollup::{symbol_breakdown, symbol_rollup};

fn position(login: &str, symbol: &str, volume: f64, side: Side, profit: f64) -> PositionRecord {
    PositionRecord {
        login: login.to_string(),
        ticket: None,
        symbol: symbol.to_string(),
        volume,
        side,
        price: 0.0,
        profit,
        open_time: None,
    }
}

#[test]
fn test_rollup_sorted_by_absolute_net_lot() {
    let book = vec![
        position("1", "EURUSD", 0.2, Side::Buy, 1.0),
        position("1", "XAUUSD", 3.0, Side::Sell, -20.0),
        position("2", "BTCUSD", 1.0, Side::Buy, 4.0),
    ];
    let net = ExposureMatrix::net_lot(&book);
    let pnl = ExposureMatrix::open_pnl(&book);

    let rollup = symbol_rollup(&net, &pnl);
    let symbols: Vec<&str> = rollup.iter().map(|entry| entry.symbol.as_str()).collect();
    // XAUUSD has |net| 3.0, BTCUSD 1.0, EURUSD 0.2.
    assert_eq!(symbols, vec!["XAUUSD", "BTCUSD", "EURUSD"]);
    assert_eq!(rollup[0].net_lot, -3.0);
    assert_eq!(rollup[0].usd_pnl, -20.0);
}

#[test]
fn test_rollup_excludes_margin_row_from_totals() {
    // If the margin row leaked into the sums every total would double.
    let book = vec![
        position("1", "EURUSD", 1.0, Side::Buy, 10.0),
        position("2", "EURUSD", 0.5, Side::Buy, 5.0),
    ];
    let net = ExposureMatrix::net_lot(&book);
    let pnl = ExposureMatrix::open_pnl(&book);

    let rollup = symbol_rollup(&net, &pnl);
    assert_eq!(rollup.len(), 1);
    assert_eq!(rollup[0].net_lot, 1.5);
    assert_eq!(rollup[0].usd_pnl, 15.0);
}

#[test]
fn test_rollup_rounds_to_two_decimals() {
    let book = vec![
        position("1", "EURUSD", 0.333, Side::Buy, 1.005),
        position("2", "EURUSD", 0.333, Side::Buy, 1.004),
    ];
    let net = ExposureMatrix::net_lot(&book);
    let pnl = ExposureMatrix::open_pnl(&book);

    let rollup = symbol_rollup(&net, &pnl);
    assert_eq!(rollup[0].net_lot, 0.67);
    assert_eq!(rollup[0].usd_pnl, 2.01);
}

#[test]
fn test_rollup_of_empty_matrices() {
    let empty = ExposureMatrix::net_lot(&[]);
    assert!(symbol_rollup(&empty, &empty).is_empty());
}

#[test]
fn test_breakdown_filters_exact_symbol() {
    let book = vec![
        position("2", "XAUUSD", 1.0, Side::Buy, 3.0),
        position("1", "XAUUSD", 0.5, Side::Sell, -1.0),
        position("1", "XAUUSD.m", 9.0, Side::Buy, 0.0),
        position("3", "EURUSD", 2.0, Side::Buy, 0.0),
    ];
    let breakdown = symbol_breakdown(&book, "XAUUSD");
    assert_eq!(breakdown.len(), 2);
    assert_eq!(breakdown[0].login, "1");
    assert_eq!(breakdown[0].net_lot, -0.5);
    assert_eq!(breakdown[1].login, "2");
    assert_eq!(breakdown[1].usd_pnl, 3.0);
}

#[test]
fn test_breakdown_unknown_symbol_is_empty() {
    let book = vec![position("1", "EURUSD", 1.0, Side::Buy, 0.0)];
    assert!(symbol_breakdown(&book, "GBPUSD").is_empty());
}
