//! Matrix construction tests: density, margin-row arithmetic, ordering,
//! and the empty-input case.

use crate::domain::entities::position::{PositionRecord, Side};
use crate::domain::services::exposure::{ExposureMatrix, ALL_LOGIN};

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

/// The worked scenario: login 1 holds 0.5 buy + 0.1 buy, login 2 holds
/// 2.0 buy, all in the same symbol.
fn two_login_book() -> Vec<PositionRecord> {
    vec![
        position("1", "EURUSD", 0.5, Side::Buy, 10.0),
        position("1", "EURUSD", 0.1, Side::Buy, -2.0),
        position("2", "EURUSD", 2.0, Side::Buy, 5.0),
    ]
}

#[test]
fn test_net_lot_sums_per_login() {
    let matrix = ExposureMatrix::net_lot(&two_login_book());
    assert!((matrix.cell("1", "EURUSD").unwrap() - 0.6).abs() < 1e-9);
    assert!((matrix.cell("2", "EURUSD").unwrap() - 2.0).abs() < 1e-9);
    assert!((matrix.cell(ALL_LOGIN, "EURUSD").unwrap() - 2.6).abs() < 1e-9);
}

#[test]
fn test_margin_row_is_first_and_equals_column_sums() {
    let mut book = two_login_book();
    book.push(position("1", "XAUUSD", 1.0, Side::Sell, 7.0));
    book.push(position("3", "XAUUSD", 0.25, Side::Buy, -1.0));

    let matrix = ExposureMatrix::net_lot(&book);
    assert_eq!(matrix.rows[0].login, ALL_LOGIN);
    for (col, symbol) in matrix.symbols.iter().enumerate() {
        let total: f64 = matrix.real_rows().map(|row| row.cells[col]).sum();
        let margin = matrix.rows[0].cells[col];
        assert!((margin - total).abs() < 1e-9, "column {}", symbol);
    }
}

#[test]
fn test_matrix_is_dense() {
    // Login 1 never traded XAUUSD and login 3 never traded EURUSD; both
    // cells must still exist, as zero.
    let book = vec![
        position("1", "EURUSD", 0.5, Side::Buy, 0.0),
        position("3", "XAUUSD", 1.0, Side::Sell, 0.0),
    ];
    let matrix = ExposureMatrix::net_lot(&book);
    assert_eq!(matrix.cell("1", "XAUUSD"), Some(0.0));
    assert_eq!(matrix.cell("3", "EURUSD"), Some(0.0));
    for row in &matrix.rows {
        assert_eq!(row.cells.len(), matrix.symbols.len());
    }
}

#[test]
fn test_symbols_sorted_ascending() {
    let book = vec![
        position("1", "XAUUSD", 1.0, Side::Buy, 0.0),
        position("1", "BTCUSD", 1.0, Side::Buy, 0.0),
        position("1", "EURUSD", 1.0, Side::Buy, 0.0),
    ];
    let matrix = ExposureMatrix::net_lot(&book);
    assert_eq!(matrix.symbols, vec!["BTCUSD", "EURUSD", "XAUUSD"]);
}

#[test]
fn test_logins_sorted_numerically() {
    let book = vec![
        position("10", "EURUSD", 1.0, Side::Buy, 0.0),
        position("9", "EURUSD", 1.0, Side::Buy, 0.0),
        position("100", "EURUSD", 1.0, Side::Buy, 0.0),
    ];
    let matrix = ExposureMatrix::net_lot(&book);
    let logins: Vec<&str> = matrix.real_rows().map(|row| row.login.as_str()).collect();
    assert_eq!(logins, vec!["9", "10", "100"]);
}

#[test]
fn test_empty_input_yields_empty_matrix() {
    let matrix = ExposureMatrix::net_lot(&[]);
    assert!(matrix.is_empty());
    assert!(matrix.symbols.is_empty());
    assert!(matrix.rows.is_empty());
}

#[test]
fn test_buys_and_sells_offset() {
    let book = vec![
        position("1", "EURUSD", 1.5, Side::Buy, 0.0),
        position("1", "EURUSD", 0.5, Side::Sell, 0.0),
        position("2", "EURUSD", 1.0, Side::Sell, 0.0),
    ];
    let matrix = ExposureMatrix::net_lot(&book);
    assert!((matrix.cell("1", "EURUSD").unwrap() - 1.0).abs() < 1e-9);
    assert!((matrix.cell("2", "EURUSD").unwrap() + 1.0).abs() < 1e-9);
    assert!(matrix.cell(ALL_LOGIN, "EURUSD").unwrap().abs() < 1e-9);
}

#[test]
fn test_open_pnl_matrix_uses_profit() {
    let matrix = ExposureMatrix::open_pnl(&two_login_book());
    assert!((matrix.cell("1", "EURUSD").unwrap() - 8.0).abs() < 1e-9);
    assert!((matrix.cell(ALL_LOGIN, "EURUSD").unwrap() - 13.0).abs() < 1e-9);
}

#[test]
fn test_csv_rendering() {
    let matrix = ExposureMatrix::net_lot(&two_login_book());
    let csv = matrix.to_csv();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Login,EURUSD"));
    assert_eq!(lines.next(), Some("All Login,2.60"));
    assert_eq!(lines.next(), Some("1,0.60"));
    assert_eq!(lines.next(), Some("2,2.00"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_json_shape_keeps_margin_row_first() {
    // The API handlers and the CLI both serialize the matrix as-is, so
    // the field names and row order are a wire contract.
    let matrix = ExposureMatrix::net_lot(&two_login_book());
    let value = serde_json::to_value(&matrix).unwrap();
    assert_eq!(value["symbols"][0], "EURUSD");
    let rows = value["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["login"], ALL_LOGIN);
    assert!((rows[0]["cells"][0].as_f64().unwrap() - 2.6).abs() < 1e-9);
    assert_eq!(rows[1]["login"], "1");
    assert_eq!(rows[2]["login"], "2");
}

#[test]
fn test_column_total_unknown_symbol_is_zero() {
    let matrix = ExposureMatrix::net_lot(&two_login_book());
    assert_eq!(matrix.column_total("GBPUSD"), 0.0);
}
