//! Normalization of raw bridge payloads into canonical records.
//!
//! The manager bridge exposes several vintages of the upstream API at once:
//! field names vary (`volume` / `Vol` / `Lots`), numbers arrive as numbers
//! or strings, and the position side is encoded as a numeric action code, a
//! textual label, or a signed volume. Normalization is total: a malformed
//! field degrades to a neutral value, and only a missing or empty symbol
//! drops a record, because a record without a symbol cannot land in any
//! matrix column.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::domain::entities::account::Account;
use crate::domain::entities::position::{DealRecord, PositionRecord, Side};

/// Alias tables, ordered. The first non-null alias present in a payload wins.
const LOGIN_KEYS: &[&str] = &["login", "Login", "LOGIN", "user", "User"];
const TICKET_KEYS: &[&str] = &["ticket", "Ticket", "id", "ID", "position", "Position"];
const DEAL_TICKET_KEYS: &[&str] = &["deal", "Deal", "ticket", "Ticket", "id", "ID"];
const SYMBOL_KEYS: &[&str] = &["symbol", "Symbol", "SYMBOL"];
const VOLUME_KEYS: &[&str] = &["volume", "Volume", "vol", "Vol", "lots", "Lots"];
const PRICE_KEYS: &[&str] = &["price", "Price", "price_open", "PriceOpen", "open_price"];
const PROFIT_KEYS: &[&str] = &["profit", "Profit", "pnl", "PnL", "pl"];
const SIDE_KEYS: &[&str] = &["type", "Type", "action", "Action", "side", "Side"];
const TIME_KEYS: &[&str] = &["time", "Time", "date", "Date", "time_create", "TimeCreate", "open_time"];
const NAME_KEYS: &[&str] = &["name", "Name"];
const GROUP_KEYS: &[&str] = &["group", "Group"];
const EMAIL_KEYS: &[&str] = &["email", "Email", "EMail"];
const LEVERAGE_KEYS: &[&str] = &["leverage", "Leverage"];
const BALANCE_KEYS: &[&str] = &["balance", "Balance"];
const EQUITY_KEYS: &[&str] = &["equity", "Equity"];

fn field<'a>(raw: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| raw.get(key))
        .find(|value| !value.is_null())
}

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else if let Some(u) = n.as_u64() {
                Some(u.to_string())
            } else {
                Some(n.to_string())
            }
        }
        _ => None,
    }
}

/// Total numeric coercion: numbers pass through, numeric strings parse,
/// anything else is 0.0. The sign is preserved for side inference.
fn coerce_f64(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn coerce_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    }
}

fn coerce_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(|secs| DateTime::from_timestamp(secs, 0)),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            // Manager exports also use "2024-01-15 10:30:00" and the
            // dotted MT5 variant "2024.01.15 10:30:00".
            for format in ["%Y-%m-%d %H:%M:%S", "%Y.%m.%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            None
        }
        _ => None,
    }
}

/// Stateless mapper from raw bridge JSON to canonical records.
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    unknown_side: Side,
}

impl Default for Normalizer {
    fn default() -> Self {
        Normalizer {
            unknown_side: Side::Buy,
        }
    }
}

impl Normalizer {
    pub fn new(unknown_side: Side) -> Self {
        Normalizer { unknown_side }
    }

    /// Normalizes one raw open position for `login`. The login comes from
    /// the scan context, not the payload: the bridge fetch is already
    /// per-login and some API vintages omit the field entirely.
    ///
    /// Returns `None` only when the payload carries no symbol.
    pub fn position(&self, login: &str, raw: &Value) -> Option<PositionRecord> {
        let symbol = field(raw, SYMBOL_KEYS).and_then(coerce_string)?;
        if symbol.is_empty() {
            return None;
        }
        let (side, volume) = self.side_and_volume(raw);
        Some(PositionRecord {
            login: login.to_string(),
            ticket: field(raw, TICKET_KEYS)
                .and_then(coerce_u64)
                .filter(|ticket| *ticket != 0),
            symbol,
            volume,
            side,
            price: field(raw, PRICE_KEYS).map(coerce_f64).unwrap_or(0.0),
            profit: field(raw, PROFIT_KEYS).map(coerce_f64).unwrap_or(0.0),
            open_time: field(raw, TIME_KEYS).and_then(coerce_time),
        })
    }

    /// Normalizes one raw closed deal for `login`. Same drop rule as
    /// [`Normalizer::position`]: no symbol, no record.
    pub fn deal(&self, login: &str, raw: &Value) -> Option<DealRecord> {
        let symbol = field(raw, SYMBOL_KEYS).and_then(coerce_string)?;
        if symbol.is_empty() {
            return None;
        }
        let (side, volume) = self.side_and_volume(raw);
        Some(DealRecord {
            login: login.to_string(),
            ticket: field(raw, DEAL_TICKET_KEYS)
                .and_then(coerce_u64)
                .filter(|ticket| *ticket != 0),
            symbol,
            volume,
            side,
            profit: field(raw, PROFIT_KEYS).map(coerce_f64).unwrap_or(0.0),
        })
    }

    /// Normalizes one raw account row. Dropped when no login can be read;
    /// every other field degrades to a neutral value.
    pub fn account(&self, raw: &Value) -> Option<Account> {
        let login = field(raw, LOGIN_KEYS).and_then(coerce_string)?;
        if login.is_empty() {
            return None;
        }
        Some(Account {
            login,
            name: field(raw, NAME_KEYS).and_then(coerce_string).unwrap_or_default(),
            group: field(raw, GROUP_KEYS).and_then(coerce_string).unwrap_or_default(),
            email: field(raw, EMAIL_KEYS).and_then(coerce_string).unwrap_or_default(),
            leverage: field(raw, LEVERAGE_KEYS).map(coerce_f64).unwrap_or(0.0).max(0.0) as u32,
            balance: field(raw, BALANCE_KEYS).map(coerce_f64).unwrap_or(0.0),
            equity: field(raw, EQUITY_KEYS).map(coerce_f64).unwrap_or(0.0),
            profit: field(raw, PROFIT_KEYS).map(coerce_f64).unwrap_or(0.0),
        })
    }

    /// Resolves side and volume magnitude together, in precedence order:
    /// numeric action code, then textual label prefix, then the sign of an
    /// already-signed volume, then the configured default.
    ///
    /// A positive volume with no side field is indistinguishable from an
    /// unsigned magnitude, so only a negative volume forces a side (Sell).
    fn side_and_volume(&self, raw: &Value) -> (Side, f64) {
        let raw_volume = field(raw, VOLUME_KEYS).map(coerce_f64).unwrap_or(0.0);
        if let Some(value) = field(raw, SIDE_KEYS) {
            if let Some(code) = value.as_i64() {
                return (Side::from_type_code(code), raw_volume.abs());
            }
            if let Some(code) = value.as_f64() {
                return (Side::from_type_code(code as i64), raw_volume.abs());
            }
            if let Some(label) = value.as_str() {
                if let Ok(code) = label.trim().parse::<i64>() {
                    return (Side::from_type_code(code), raw_volume.abs());
                }
                if let Some(side) = Side::from_label(label) {
                    return (side, raw_volume.abs());
                }
            }
        }
        if raw_volume < 0.0 {
            (Side::Sell, raw_volume.abs())
        } else {
            (self.unknown_side, raw_volume)
        }
    }
}
