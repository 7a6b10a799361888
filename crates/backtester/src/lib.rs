//! # Trendguard Backtester
//!
//! Replays a bar file through the same decision engine the live host runs,
//! with the simulated gateway standing in for the broker. Fills for orders
//! submitted on bar N are applied at the open of bar N+1, before the engine
//! sees that bar.

use crate::error::BacktestError;
use alerter::AlertQueue;
use analytics::{AnalyticsEngine, PerformanceReport};
use chrono::NaiveDate;
use configuration::Config;
use core_types::{Bar, TradeRecord};
use engine::{BarGate, FillOutcome, TrendEngine};
use executor::{OrderUpdate, SimulatedGateway};
use indicatif::{ProgressBar, ProgressStyle};
use indicators::IndicatorEngine;
use persistence::{SessionStore, TradeLedger};

pub mod data;
pub mod error;

pub use data::load_bars;

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct BacktestResult {
    /// Trades closed during this run, in close order.
    pub trades: Vec<TradeRecord>,
    /// Equity at the last admitted bar of each session.
    pub equity_curve: Vec<(NaiveDate, f64)>,
    pub report: PerformanceReport,
    pub bars_processed: usize,
    pub bars_skipped: usize,
}

/// The main backtesting engine.
pub struct Backtester {
    indicators: IndicatorEngine,
    engine: TrendEngine<SimulatedGateway>,
    analytics_engine: AnalyticsEngine,
    initial_capital: f64,
    show_progress: bool,
}

impl Backtester {
    pub fn new(
        config: &Config,
        store: Box<dyn SessionStore>,
        ledger: Box<dyn TradeLedger>,
        alerts: AlertQueue,
    ) -> Result<Self, BacktestError> {
        let initial_capital = config.instrument.initial_capital;
        let gateway = SimulatedGateway::new(initial_capital, config.simulation.clone());
        Ok(Self {
            indicators: IndicatorEngine::new(&config.strategy)?,
            engine: TrendEngine::new(config, gateway, store, ledger, alerts)?,
            analytics_engine: AnalyticsEngine::new(),
            initial_capital,
            show_progress: false,
        })
    }

    /// Shows a terminal progress bar while running.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn engine(&self) -> &TrendEngine<SimulatedGateway> {
        &self.engine
    }

    /// Consumes the backtester. Dropping the returned engine closes its alert queue.
    pub fn into_engine(self) -> TrendEngine<SimulatedGateway> {
        self.engine
    }

    fn progress_bar(&self, len: usize) -> Result<ProgressBar, BacktestError> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }
        let progress_bar = ProgressBar::new(len as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
                .progress_chars("=>-"),
        );
        Ok(progress_bar)
    }

    /// Runs the simulation over `bars` and analyses the outcome.
    pub fn run(&mut self, bars: &[Bar]) -> Result<BacktestResult, BacktestError> {
        if bars.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }

        let progress_bar = self.progress_bar(bars.len())?;
        let mut gate = BarGate::new();
        let mut trades = Vec::new();
        let mut equity_curve: Vec<(NaiveDate, f64)> = Vec::new();
        let mut bars_skipped = 0;

        for bar in bars {
            progress_bar.inc(1);
            if !gate.admit(bar) {
                bars_skipped += 1;
                continue;
            }

            // --- 1. FILLS FROM THE PREVIOUS BAR'S ORDERS ---
            if let Some(update) = self.engine.gateway_mut().fill_pending(bar) {
                match update {
                    OrderUpdate::Filled(fill) => {
                        if let FillOutcome::Closed(record) = self.engine.on_fill(&fill) {
                            trades.push(record);
                        }
                    }
                    OrderUpdate::Rejected { handle, reason } => {
                        self.engine.on_reject(handle, &reason);
                    }
                }
            }

            // --- 2. INDICATORS AND DECISION ---
            let equity = self.engine.gateway().portfolio().equity(bar.close);
            if let Some(snapshot) = self.indicators.next(bar) {
                let decision = self.engine.on_bar(bar, &snapshot, equity);
                tracing::trace!(?decision, timestamp = %bar.timestamp, "Bar evaluated");
            }

            // --- 3. RECORD EQUITY ---
            let date = bar.session_date();
            match equity_curve.last_mut() {
                Some((last, value)) if *last == date => *value = equity,
                _ => equity_curve.push((date, equity)),
            }
        }

        progress_bar.finish_with_message("Simulation complete.");

        if equity_curve.is_empty() {
            return Err(BacktestError::DataUnavailable);
        }
        if let Some(position) = self.engine.position() {
            tracing::info!(
                size = position.size,
                entry = position.entry_price,
                "Run ended with an open position, marked at the last close"
            );
        }

        let report = self
            .analytics_engine
            .calculate(&trades, &equity_curve, self.initial_capital)?;

        tracing::info!(
            trades = trades.len(),
            skipped = bars_skipped,
            net = report.total_net_profit,
            "Backtest finished"
        );

        Ok(BacktestResult {
            trades,
            bars_processed: bars.len() - bars_skipped,
            bars_skipped,
            equity_curve,
            report,
        })
    }
}
