use serde::{Deserialize, Serialize};

/// A standardized report of a strategy's performance.
///
/// Percentages are expressed in percent (`12.5` means 12.5%). Ratios that are
/// undefined for the input (no losses, no variance, no trades) are `None`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PerformanceReport {
    // I. Core Profitability Metrics
    pub total_net_profit: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub profit_factor: Option<f64>,
    pub total_return_pct: f64,
    pub cagr_pct: Option<f64>,

    // II. Risk and Drawdown
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    pub sharpe_ratio: Option<f64>,
    pub calmar_ratio: Option<f64>,

    // III. Trade-Level Statistics
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: Option<f64>,
    pub average_win: f64,
    pub average_loss: f64,
    pub payoff_ratio: Option<f64>,

    // IV. Time-Based Metrics
    /// Mean calendar days between entry and exit date.
    pub average_holding_days: f64,
}

impl PerformanceReport {
    /// Creates a zeroed-out report, the result for a run without trades or equity samples.
    pub fn new() -> Self {
        Self::default()
    }
}
