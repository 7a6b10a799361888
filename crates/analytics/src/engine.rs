use crate::error::AnalyticsError;
use crate::report::PerformanceReport;
use chrono::NaiveDate;
use core_types::TradeRecord;

/// Trading days per year used to annualise daily statistics.
const TRADING_DAYS: f64 = 252.0;
/// Annual risk-free rate subtracted from daily returns for the Sharpe ratio.
const RISK_FREE_RATE: f64 = 0.02;

/// A stateless calculator for deriving performance metrics from trading activity.
#[derive(Debug, Default)]
pub struct AnalyticsEngine {}

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// The main entry point for calculating performance metrics.
    ///
    /// # Arguments
    ///
    /// * `trades` - All trades closed during the run, in ledger order.
    /// * `equity_curve` - One `(date, equity)` sample per session, in date order.
    /// * `initial_capital` - The starting capital of the run.
    pub fn calculate(
        &self,
        trades: &[TradeRecord],
        equity_curve: &[(NaiveDate, f64)],
        initial_capital: f64,
    ) -> Result<PerformanceReport, AnalyticsError> {
        if !(initial_capital.is_finite() && initial_capital > 0.0) {
            return Err(AnalyticsError::InvalidCapital(initial_capital));
        }
        Self::validate_curve(equity_curve)?;

        let mut report = PerformanceReport::new();
        self.calculate_profitability(trades, initial_capital, &mut report)?;
        self.calculate_time_metrics(trades, &mut report);
        self.calculate_drawdown(equity_curve, &mut report);
        self.calculate_ratios(equity_curve, &mut report);

        tracing::debug!(
            trades = report.total_trades,
            net = report.total_net_profit,
            "Performance report calculated"
        );
        Ok(report)
    }

    fn validate_curve(equity_curve: &[(NaiveDate, f64)]) -> Result<(), AnalyticsError> {
        if let Some((date, _)) = equity_curve.iter().find(|(_, e)| !e.is_finite()) {
            return Err(AnalyticsError::NonFinite(format!("equity on {date}")));
        }
        match equity_curve.windows(2).find(|w| w[1].0 <= w[0].0) {
            Some(w) => Err(AnalyticsError::UnorderedCurve(w[1].0)),
            None => Ok(()),
        }
    }

    /// Calculates all profitability-related metrics.
    fn calculate_profitability(
        &self,
        trades: &[TradeRecord],
        initial_capital: f64,
        report: &mut PerformanceReport,
    ) -> Result<(), AnalyticsError> {
        report.total_trades = trades.len();

        for trade in trades {
            if !trade.pnl.is_finite() {
                return Err(AnalyticsError::NonFinite(format!(
                    "pnl of trade closed {}",
                    trade.date_out
                )));
            }
            report.total_net_profit += trade.pnl;

            // A scratch trade counts against the win rate.
            if trade.pnl > 0.0 {
                report.gross_profit += trade.pnl;
                report.winning_trades += 1;
            } else {
                report.gross_loss += trade.pnl.abs();
                report.losing_trades += 1;
            }
        }

        // --- Ratios ---
        if report.gross_loss > 0.0 {
            report.profit_factor = Some(report.gross_profit / report.gross_loss);
        }

        if report.total_trades > 0 {
            report.win_rate_pct =
                Some(report.winning_trades as f64 / report.total_trades as f64 * 100.0);
        }

        if report.winning_trades > 0 {
            report.average_win = report.gross_profit / report.winning_trades as f64;
        }

        if report.losing_trades > 0 {
            report.average_loss = report.gross_loss / report.losing_trades as f64;
            if report.average_loss > 0.0 {
                report.payoff_ratio = Some(report.average_win / report.average_loss);
            }
        }

        report.total_return_pct = report.total_net_profit / initial_capital * 100.0;
        Ok(())
    }

    /// Calculates maximum drawdown from the equity curve, measured against the
    /// running peak.
    fn calculate_drawdown(&self, equity_curve: &[(NaiveDate, f64)], report: &mut PerformanceReport) {
        let Some(&(_, first)) = equity_curve.first() else {
            return;
        };

        let mut peak = first;
        for &(_date, equity) in equity_curve {
            peak = peak.max(equity);
            let drawdown = peak - equity;
            report.max_drawdown = report.max_drawdown.max(drawdown);
            if peak > 0.0 {
                report.max_drawdown_pct = report.max_drawdown_pct.max(drawdown / peak * 100.0);
            }
        }
    }

    /// Calculates CAGR, Sharpe and Calmar.
    fn calculate_ratios(&self, equity_curve: &[(NaiveDate, f64)], report: &mut PerformanceReport) {
        // --- CAGR ---
        if let (Some(&(start_date, start)), Some(&(end_date, end))) =
            (equity_curve.first(), equity_curve.last())
        {
            let days = (end_date - start_date).num_days();
            let years = if days > 0 { days as f64 / 365.25 } else { 1.0 };
            if start > 0.0 && end >= 0.0 {
                report.cagr_pct = Some(((end / start).powf(1.0 / years) - 1.0) * 100.0);
            }
        }

        // --- Calmar Ratio ---
        if report.max_drawdown_pct > 0.0 {
            report.calmar_ratio = Some(report.total_return_pct / report.max_drawdown_pct);
        }

        // --- Sharpe Ratio ---
        let rf_daily = RISK_FREE_RATE / TRADING_DAYS;
        let excess: Vec<f64> = equity_curve
            .windows(2)
            .filter(|w| w[0].1 > 0.0)
            .map(|w| (w[1].1 - w[0].1) / w[0].1 - rf_daily)
            .collect();

        if excess.len() < 2 {
            return;
        }

        let n = excess.len() as f64;
        let mean = excess.iter().sum::<f64>() / n;
        let variance = excess.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let std_dev = variance.sqrt();

        if std_dev > f64::EPSILON {
            report.sharpe_ratio = Some(mean / std_dev * TRADING_DAYS.sqrt());
        }
    }

    /// Calculates time-based metrics.
    fn calculate_time_metrics(&self, trades: &[TradeRecord], report: &mut PerformanceReport) {
        if trades.is_empty() {
            return;
        }
        let total_days: i64 = trades
            .iter()
            .map(|t| (t.date_out - t.date_in).num_days())
            .sum();
        report.average_holding_days = total_days as f64 / trades.len() as f64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn trade(d_in: u32, d_out: u32, pnl: f64) -> TradeRecord {
        TradeRecord {
            date_in: day(d_in),
            date_out: day(d_out),
            shares: 10.0,
            entry_price: 100.0,
            exit_price: 100.0 + pnl / 10.0,
            pnl,
            return_pct: Some(pnl / 1_000.0),
        }
    }

    #[test]
    fn profitability_metrics_from_mixed_trades() {
        let trades = [trade(1, 3, 300.0), trade(4, 5, -100.0), trade(6, 10, 100.0)];
        let report = AnalyticsEngine::new()
            .calculate(&trades, &[], 10_000.0)
            .unwrap();

        assert_eq!(report.total_trades, 3);
        assert_eq!(report.winning_trades, 2);
        assert_eq!(report.losing_trades, 1);
        assert_relative_eq!(report.total_net_profit, 300.0);
        assert_relative_eq!(report.gross_profit, 400.0);
        assert_relative_eq!(report.gross_loss, 100.0);
        assert_relative_eq!(report.profit_factor.unwrap(), 4.0);
        assert_relative_eq!(report.win_rate_pct.unwrap(), 200.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(report.average_win, 200.0);
        assert_relative_eq!(report.average_loss, 100.0);
        assert_relative_eq!(report.payoff_ratio.unwrap(), 2.0);
        assert_relative_eq!(report.total_return_pct, 3.0);
        assert_relative_eq!(report.average_holding_days, 7.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn profit_factor_is_undefined_without_losses() {
        let report = AnalyticsEngine::new()
            .calculate(&[trade(1, 2, 50.0)], &[], 1_000.0)
            .unwrap();
        assert_eq!(report.profit_factor, None);
        assert_eq!(report.payoff_ratio, None);
        assert_relative_eq!(report.win_rate_pct.unwrap(), 100.0);
    }

    #[test]
    fn drawdown_is_measured_from_running_peak() {
        let curve = [
            (day(1), 100.0),
            (day(2), 120.0),
            (day(3), 90.0),
            (day(4), 200.0),
            (day(5), 180.0),
        ];
        let report = AnalyticsEngine::new().calculate(&[], &curve, 100.0).unwrap();
        assert_relative_eq!(report.max_drawdown, 30.0);
        assert_relative_eq!(report.max_drawdown_pct, 25.0);
    }

    #[test]
    fn cagr_over_one_year_equals_total_growth() {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let end = start + chrono::Duration::days(365);
        let curve = [(start, 1_000.0), (end, 1_100.0)];
        let report = AnalyticsEngine::new().calculate(&[], &curve, 1_000.0).unwrap();
        let years = 365.0 / 365.25;
        let expected = (1.1_f64.powf(1.0 / years) - 1.0) * 100.0;
        assert_relative_eq!(report.cagr_pct.unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_uses_sample_std_of_excess_returns() {
        let curve = [
            (day(1), 100.0),
            (day(2), 101.0),
            (day(3), 100.0),
            (day(4), 102.0),
        ];
        let report = AnalyticsEngine::new().calculate(&[], &curve, 100.0).unwrap();

        let rf = 0.02 / 252.0;
        let rets = [0.01 - rf, -1.0 / 101.0 - rf, 0.02 - rf];
        let mean = rets.iter().sum::<f64>() / 3.0;
        let var = rets.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 2.0;
        let expected = mean / var.sqrt() * 252.0_f64.sqrt();
        assert_relative_eq!(report.sharpe_ratio.unwrap(), expected, epsilon = 1e-9);
    }

    #[test]
    fn sharpe_is_undefined_for_flat_or_short_curves() {
        let flat = [(day(1), 100.0), (day(2), 100.0), (day(3), 100.0)];
        let report = AnalyticsEngine::new().calculate(&[], &flat, 100.0).unwrap();
        assert_eq!(report.sharpe_ratio, None);

        let short = [(day(1), 100.0), (day(2), 110.0)];
        let report = AnalyticsEngine::new().calculate(&[], &short, 100.0).unwrap();
        assert_eq!(report.sharpe_ratio, None);
    }

    #[test]
    fn empty_input_is_a_zeroed_report() {
        let report = AnalyticsEngine::new().calculate(&[], &[], 1.0).unwrap();
        assert_eq!(report, PerformanceReport::new());
    }

    #[test]
    fn rejects_bad_inputs() {
        let engine = AnalyticsEngine::new();
        assert_eq!(
            engine.calculate(&[], &[], 0.0),
            Err(AnalyticsError::InvalidCapital(0.0))
        );
        let unordered = [(day(2), 100.0), (day(1), 100.0)];
        assert_eq!(
            engine.calculate(&[], &unordered, 100.0),
            Err(AnalyticsError::UnorderedCurve(day(1)))
        );
        let nan = [(day(1), f64::NAN)];
        assert!(matches!(
            engine.calculate(&[], &nan, 100.0),
            Err(AnalyticsError::NonFinite(_))
        ));
    }
}
