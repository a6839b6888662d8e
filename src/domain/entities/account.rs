use serde::{Deserialize, Serialize};

/// One trading account as reported by the manager bridge.
///
/// Logins are kept as strings end to end: the bridge is inconsistent about
/// numeric vs. string logins and the aggregation layer only ever compares
/// and sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub login: String,
    pub name: String,
    pub group: String,
    pub email: String,
    pub leverage: u32,
    pub balance: f64,
    pub equity: f64,
    pub profit: f64,
}

impl Account {
    /// Demo accounts are recognized by their group path, e.g. "demo\\forex-usd".
    pub fn is_demo(&self) -> bool {
        self.group.to_lowercase().contains("demo")
    }
}

/// Headline figures for the whole roster, split real/demo where it matters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RosterSummary {
    pub total_accounts: usize,
    pub real_accounts: usize,
    pub demo_accounts: usize,
    pub total_balance: f64,
    pub total_equity: f64,
    pub total_profit: f64,
    pub top_profit_real: Option<TopAccount>,
    pub top_profit_demo: Option<TopAccount>,
}

/// The single best-performing account of a roster slice.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopAccount {
    pub login: String,
    pub name: String,
    pub profit: f64,
}

impl TopAccount {
    fn of(account: &Account) -> Self {
        TopAccount {
            login: account.login.clone(),
            name: account.name.clone(),
            profit: account.profit,
        }
    }
}

/// Rolls a roster up into its dashboard summary.
pub fn summarize(accounts: &[Account]) -> RosterSummary {
    let mut summary = RosterSummary {
        total_accounts: accounts.len(),
        real_accounts: 0,
        demo_accounts: 0,
        total_balance: 0.0,
        total_equity: 0.0,
        total_profit: 0.0,
        top_profit_real: None,
        top_profit_demo: None,
    };

    for account in accounts {
        summary.total_balance += account.balance;
        summary.total_equity += account.equity;
        summary.total_profit += account.profit;

        let slot = if account.is_demo() {
            summary.demo_accounts += 1;
            &mut summary.top_profit_demo
        } else {
            summary.real_accounts += 1;
            &mut summary.top_profit_real
        };
        let beats = slot.as_ref().map_or(true, |top| account.profit > top.profit);
        if beats {
            *slot = Some(TopAccount::of(account));
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(login: &str, group: &str, balance: f64, profit: f64) -> Account {
        Account {
            login: login.to_string(),
            name: format!("Account {}", login),
            group: group.to_string(),
            email: String::new(),
            leverage: 100,
            balance,
            equity: balance + profit,
            profit,
        }
    }

    #[test]
    fn test_is_demo_case_insensitive() {
        assert!(account("1", "Demo\\forex", 0.0, 0.0).is_demo());
        assert!(account("2", "managers\\DEMO-usd", 0.0, 0.0).is_demo());
        assert!(!account("3", "real\\forex-usd", 0.0, 0.0).is_demo());
    }

    #[test]
    fn test_summarize_totals_and_tops() {
        let roster = vec![
            account("1001", "real\\forex", 1000.0, 50.0),
            account("1002", "real\\forex", 2000.0, 125.0),
            account("9001", "demo\\forex", 500.0, 300.0),
        ];

        let summary = summarize(&roster);
        assert_eq!(summary.total_accounts, 3);
        assert_eq!(summary.real_accounts, 2);
        assert_eq!(summary.demo_accounts, 1);
        assert_eq!(summary.total_balance, 3500.0);
        assert_eq!(summary.total_profit, 475.0);

        let top_real = summary.top_profit_real.unwrap();
        assert_eq!(top_real.login, "1002");
        assert_eq!(top_real.profit, 125.0);

        let top_demo = summary.top_profit_demo.unwrap();
        assert_eq!(top_demo.login, "9001");
    }

    #[test]
    fn test_summarize_empty_roster() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_accounts, 0);
        assert!(summary.top_profit_real.is_none());
        assert!(summary.top_profit_demo.is_none());
        assert_eq!(summary.total_balance, 0.0);
    }
}
