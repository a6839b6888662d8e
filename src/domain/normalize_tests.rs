//! Normalization tests: alias resolution, numeric coercion, side inference
//! precedence, and the symbol drop rule across bridge payload vintages.

use serde_json::json;

use crate::domain::entities::position::Side;
use crate::domain::services::normalize::Normalizer;

fn normalizer() -> Normalizer {
    Normalizer::default()
}

#[test]
fn test_numeric_type_code_zero_is_buy() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "type": 0}))
        .unwrap();
    assert_eq!(record.side, Side::Buy);
}

#[test]
fn test_numeric_type_code_nonzero_is_sell() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "type": 1}))
        .unwrap();
    assert_eq!(record.side, Side::Sell);
}

#[test]
fn test_string_label_sell() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "type": "sell"}))
        .unwrap();
    assert_eq!(record.side, Side::Sell);
}

#[test]
fn test_string_label_sell_stop() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "type": "SELL_STOP"}))
        .unwrap();
    assert_eq!(record.side, Side::Sell);
}

#[test]
fn test_string_label_buy_limit() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "type": "buy_limit"}))
        .unwrap();
    assert_eq!(record.side, Side::Buy);
}

#[test]
fn test_numeric_string_type_code() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "type": "0"}))
        .unwrap();
    assert_eq!(record.side, Side::Buy);
}

#[test]
fn test_signed_volume_negative_forces_sell() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "EURUSD", "volume": -2.5}))
        .unwrap();
    assert_eq!(record.side, Side::Sell);
    assert_eq!(record.volume, 2.5);
    assert_eq!(record.signed_volume(), -2.5);
}

#[test]
fn test_unsigned_volume_defaults_to_buy() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "EURUSD", "volume": 2.5}))
        .unwrap();
    assert_eq!(record.side, Side::Buy);
    assert_eq!(record.volume, 2.5);
}

#[test]
fn test_unknown_side_default_is_configurable() {
    let record = Normalizer::new(Side::Sell)
        .position("1001", &json!({"symbol": "EURUSD", "volume": 2.5}))
        .unwrap();
    assert_eq!(record.side, Side::Sell);
}

#[test]
fn test_type_code_takes_precedence_over_signed_volume() {
    // An explicit buy code wins even when the volume arrives negative.
    let record = normalizer()
        .position("1001", &json!({"symbol": "EURUSD", "volume": -1.0, "type": 0}))
        .unwrap();
    assert_eq!(record.side, Side::Buy);
    assert_eq!(record.volume, 1.0);
}

#[test]
fn test_empty_label_falls_through_to_volume_sign() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "EURUSD", "volume": -1.0, "type": ""}))
        .unwrap();
    assert_eq!(record.side, Side::Sell);
}

#[test]
fn test_volume_alias_first_present_wins() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "Vol": 9.0}))
        .unwrap();
    assert_eq!(record.volume, 1.0);
}

#[test]
fn test_volume_aliases() {
    for key in ["volume", "Volume", "vol", "Vol", "lots", "Lots"] {
        let record = normalizer()
            .position("1001", &json!({"symbol": "XAUUSD", key: 0.7}))
            .unwrap();
        assert_eq!(record.volume, 0.7, "alias {}", key);
    }
}

#[test]
fn test_null_alias_falls_through() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": null, "Vol": 0.3}))
        .unwrap();
    assert_eq!(record.volume, 0.3);
}

#[test]
fn test_price_open_alias() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "PriceOpen": 2400.5}))
        .unwrap();
    assert_eq!(record.price, 2400.5);
}

#[test]
fn test_numeric_strings_are_parsed() {
    let record = normalizer()
        .position(
            "1001",
            &json!({"symbol": "XAUUSD", "volume": "0.50", "profit": "-12.75", "price": "2400"}),
        )
        .unwrap();
    assert_eq!(record.volume, 0.5);
    assert_eq!(record.profit, -12.75);
    assert_eq!(record.price, 2400.0);
}

#[test]
fn test_garbage_numbers_degrade_to_zero() {
    let record = normalizer()
        .position(
            "1001",
            &json!({"symbol": "XAUUSD", "volume": "n/a", "profit": {"nested": true}}),
        )
        .unwrap();
    assert_eq!(record.volume, 0.0);
    assert_eq!(record.profit, 0.0);
}

#[test]
fn test_missing_symbol_drops_record() {
    assert!(normalizer()
        .position("1001", &json!({"volume": 1.0, "type": 0}))
        .is_none());
}

#[test]
fn test_empty_symbol_drops_record() {
    assert!(normalizer()
        .position("1001", &json!({"symbol": "", "volume": 1.0}))
        .is_none());
    assert!(normalizer()
        .position("1001", &json!({"symbol": "   ", "volume": 1.0}))
        .is_none());
}

#[test]
fn test_login_comes_from_scan_context() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "login": 9999}))
        .unwrap();
    assert_eq!(record.login, "1001");
}

#[test]
fn test_zero_ticket_treated_as_absent() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "ticket": 0}))
        .unwrap();
    assert_eq!(record.ticket, None);
}

#[test]
fn test_ticket_from_string() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "ID": "777"}))
        .unwrap();
    assert_eq!(record.ticket, Some(777));
}

#[test]
fn test_open_time_from_unix_seconds() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "time": 1700000000}))
        .unwrap();
    assert_eq!(record.open_time.unwrap().timestamp(), 1700000000);
}

#[test]
fn test_open_time_from_datetime_strings() {
    for time in ["2024-01-15 10:30:00", "2024.01.15 10:30:00"] {
        let record = normalizer()
            .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "date": time}))
            .unwrap();
        assert!(record.open_time.is_some(), "format {}", time);
    }
}

#[test]
fn test_unparseable_time_degrades_to_none() {
    let record = normalizer()
        .position("1001", &json!({"symbol": "XAUUSD", "volume": 1.0, "time": "yesterday"}))
        .unwrap();
    assert_eq!(record.open_time, None);
}

#[test]
fn test_normalization_is_idempotent() {
    let canonical = normalizer()
        .position(
            "1001",
            &json!({
                "Symbol": "XAUUSD",
                "Vol": "-1.25",
                "PriceOpen": "2400.5",
                "Profit": 33,
                "ID": 42,
                "time": 1700000000
            }),
        )
        .unwrap();

    let reencoded = serde_json::to_value(&canonical).unwrap();
    let again = normalizer()
        .position(&canonical.login, &reencoded)
        .unwrap();
    assert_eq!(again, canonical);
}

#[test]
fn test_deal_normalization() {
    let deal = normalizer()
        .deal(
            "2002",
            &json!({"Symbol": "BTCUSD", "Volume": 0.1, "Profit": -5.5, "Deal": 31337, "type": 1}),
        )
        .unwrap();
    assert_eq!(deal.login, "2002");
    assert_eq!(deal.symbol, "BTCUSD");
    assert_eq!(deal.side, Side::Sell);
    assert_eq!(deal.ticket, Some(31337));
    assert_eq!(deal.profit, -5.5);
}

#[test]
fn test_deal_without_symbol_dropped() {
    assert!(normalizer().deal("2002", &json!({"Profit": 10.0})).is_none());
}

#[test]
fn test_account_numeric_login_becomes_string() {
    let account = normalizer()
        .account(&json!({"Login": 1001, "Name": "Alice", "Group": "real\\forex", "Balance": "250.5"}))
        .unwrap();
    assert_eq!(account.login, "1001");
    assert_eq!(account.name, "Alice");
    assert_eq!(account.balance, 250.5);
}

#[test]
fn test_account_without_login_dropped() {
    assert!(normalizer().account(&json!({"Name": "ghost"})).is_none());
}

#[test]
fn test_account_field_defaults() {
    let account = normalizer().account(&json!({"login": "7"})).unwrap();
    assert_eq!(account.group, "");
    assert_eq!(account.leverage, 0);
    assert_eq!(account.balance, 0.0);
    assert_eq!(account.equity, 0.0);
}
