use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Direction of an open position or executed deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Maps an MT5-style numeric action code: 0 is a buy, everything else a sell.
    pub fn from_type_code(code: i64) -> Self {
        if code == 0 {
            Side::Buy
        } else {
            Side::Sell
        }
    }

    /// Maps a textual action label by prefix, case-insensitive: "Buy",
    /// "buy_limit", "B" are buys; any other non-empty label ("Sell",
    /// "SELL_STOP", ...) is a sell. Empty labels carry no information.
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        if label.is_empty() {
            return None;
        }
        if label.chars().next().is_some_and(|c| c.eq_ignore_ascii_case(&'b')) {
            Some(Side::Buy)
        } else {
            Some(Side::Sell)
        }
    }

    pub fn sign(&self) -> f64 {
        match self {
            Side::Buy => 1.0,
            Side::Sell => -1.0,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => write!(f, "Buy"),
            Side::Sell => write!(f, "Sell"),
        }
    }
}

/// Canonical open position, normalized from whatever the manager bridge
/// returned for one login.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    pub login: String,
    /// Position ticket; absent when the source row carried none (or zero).
    pub ticket: Option<u64>,
    pub symbol: String,
    /// Volume magnitude in lots, always non-negative. Direction lives in `side`.
    pub volume: f64,
    pub side: Side,
    pub price: f64,
    pub profit: f64,
    pub open_time: Option<DateTime<Utc>>,
}

impl PositionRecord {
    /// Volume with the side folded in: buys positive, sells negative.
    pub fn signed_volume(&self) -> f64 {
        self.side.sign() * self.volume
    }
}

/// Canonical closed deal used for realized P&L aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealRecord {
    pub login: String,
    pub ticket: Option<u64>,
    pub symbol: String,
    pub volume: f64,
    pub side: Side,
    pub profit: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_from_type_code() {
        assert_eq!(Side::from_type_code(0), Side::Buy);
        assert_eq!(Side::from_type_code(1), Side::Sell);
        assert_eq!(Side::from_type_code(5), Side::Sell);
        assert_eq!(Side::from_type_code(-1), Side::Sell);
    }

    #[test]
    fn test_side_from_label_prefix() {
        assert_eq!(Side::from_label("Buy"), Some(Side::Buy));
        assert_eq!(Side::from_label("buy_limit"), Some(Side::Buy));
        assert_eq!(Side::from_label("B"), Some(Side::Buy));
        assert_eq!(Side::from_label("Sell"), Some(Side::Sell));
        assert_eq!(Side::from_label("SELL_STOP"), Some(Side::Sell));
        assert_eq!(Side::from_label("short"), Some(Side::Sell));
    }

    #[test]
    fn test_side_from_label_empty() {
        assert_eq!(Side::from_label(""), None);
        assert_eq!(Side::from_label("   "), None);
    }

    #[test]
    fn test_side_display_and_sign() {
        assert_eq!(Side::Buy.to_string(), "Buy");
        assert_eq!(Side::Sell.to_string(), "Sell");
        assert_eq!(Side::Buy.sign(), 1.0);
        assert_eq!(Side::Sell.sign(), -1.0);
    }

    #[test]
    fn test_signed_volume() {
        let mut record = PositionRecord {
            login: "1001".to_string(),
            ticket: Some(42),
            symbol: "XAUUSD".to_string(),
            volume: 0.5,
            side: Side::Buy,
            price: 2400.0,
            profit: 12.5,
            open_time: None,
        };
        assert_eq!(record.signed_volume(), 0.5);

        record.side = Side::Sell;
        assert_eq!(record.signed_volume(), -0.5);
    }
}
