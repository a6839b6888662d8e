//! Login × symbol exposure matrices.
//!
//! The matrix is the dashboard's central artifact: one row per login, one
//! column per symbol, with a synthetic `All Login` margin row on top that
//! carries the column totals. Matrices are dense so that downstream
//! consumers never have to distinguish "no position" from 0.0.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::domain::entities::position::{DealRecord, PositionRecord};

/// Reserved login of the margin (column totals) row.
pub const ALL_LOGIN: &str = "All Login";

/// Orders logins numerically when both sides are numerals, which they
/// almost always are, and lexicographically otherwise.
pub fn compare_logins(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub login: String,
    /// One value per matrix symbol, in column order.
    pub cells: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExposureMatrix {
    /// Column symbols, ascending.
    pub symbols: Vec<String>,
    /// `All Login` margin row first, then real logins ascending.
    pub rows: Vec<MatrixRow>,
}

impl ExposureMatrix {
    /// Net lots per login and symbol: buys count positive, sells negative.
    pub fn net_lot(positions: &[PositionRecord]) -> Self {
        Self::from_triples(
            positions
                .iter()
                .map(|p| (p.login.as_str(), p.symbol.as_str(), p.signed_volume())),
        )
    }

    /// Floating P&L per login and symbol.
    pub fn open_pnl(positions: &[PositionRecord]) -> Self {
        Self::from_triples(
            positions
                .iter()
                .map(|p| (p.login.as_str(), p.symbol.as_str(), p.profit)),
        )
    }

    /// Realized P&L per login and symbol, from closed deals.
    pub fn realized_pnl(deals: &[DealRecord]) -> Self {
        Self::from_triples(
            deals
                .iter()
                .map(|d| (d.login.as_str(), d.symbol.as_str(), d.profit)),
        )
    }

    fn from_triples<'a>(triples: impl Iterator<Item = (&'a str, &'a str, f64)>) -> Self {
        let mut symbols: BTreeSet<String> = BTreeSet::new();
        let mut by_login: HashMap<String, HashMap<String, f64>> = HashMap::new();
        for (login, symbol, value) in triples {
            symbols.insert(symbol.to_string());
            *by_login
                .entry(login.to_string())
                .or_default()
                .entry(symbol.to_string())
                .or_insert(0.0) += value;
        }

        // Empty input stays visibly empty: no phantom margin row.
        if by_login.is_empty() {
            return ExposureMatrix {
                symbols: Vec::new(),
                rows: Vec::new(),
            };
        }

        let symbols: Vec<String> = symbols.into_iter().collect();
        let mut logins: Vec<String> = by_login.keys().cloned().collect();
        logins.sort_by(|a, b| compare_logins(a, b));

        let mut margin = vec![0.0; symbols.len()];
        let mut rows = Vec::with_capacity(logins.len() + 1);
        for login in logins {
            let per_symbol = &by_login[&login];
            let cells: Vec<f64> = symbols
                .iter()
                .map(|symbol| per_symbol.get(symbol).copied().unwrap_or(0.0))
                .collect();
            for (total, cell) in margin.iter_mut().zip(&cells) {
                *total += cell;
            }
            rows.push(MatrixRow { login, cells });
        }
        rows.insert(
            0,
            MatrixRow {
                login: ALL_LOGIN.to_string(),
                cells: margin,
            },
        );

        ExposureMatrix { symbols, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, login: &str, symbol: &str) -> Option<f64> {
        let col = self.symbols.iter().position(|s| s == symbol)?;
        self.rows
            .iter()
            .find(|row| row.login == login)
            .map(|row| row.cells[col])
    }

    /// Rows without the `All Login` margin row.
    pub fn real_rows(&self) -> impl Iterator<Item = &MatrixRow> {
        self.rows.iter().filter(|row| row.login != ALL_LOGIN)
    }

    /// Column total over real rows; 0.0 for symbols the matrix never saw.
    pub fn column_total(&self, symbol: &str) -> f64 {
        match self.symbols.iter().position(|s| s == symbol) {
            Some(col) => self.real_rows().map(|row| row.cells[col]).sum(),
            None => 0.0,
        }
    }

    /// CSV rendering with two-decimal cells, margin row first.
    pub fn to_csv(&self) -> String {
        use std::fmt::Write as _;

        let mut out = String::new();
        out.push_str("Login");
        for symbol in &self.symbols {
            out.push(',');
            out.push_str(symbol);
        }
        out.push('\n');
        for row in &self.rows {
            out.push_str(&row.login);
            for cell in &row.cells {
                let _ = write!(out, ",{:.2}", cell);
            }
            out.push('\n');
        }
        out
    }
}
