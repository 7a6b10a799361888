use crate::error::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub instrument: Instrument,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub risk_management: RiskManagement,
    #[serde(default)]
    pub session: SessionRules,
    #[serde(default)]
    pub simulation: Simulation,
    #[serde(default)]
    pub persistence: Persistence,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The single instrument the engine trades.
#[derive(Debug, Clone, Deserialize)]
pub struct Instrument {
    /// The symbol used in alerts and logs (e.g., "SPXL").
    pub symbol: String,
    /// Starting cash for simulated runs.
    pub initial_capital: f64,
}

/// Indicator periods and the trend-strength filter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub adx_period: usize,
    pub atr_period: usize,
    pub ema_fast_period: usize,
    pub ema_slow_period: usize,
    /// Entries require ADX strictly above this value.
    pub adx_threshold: f64,
}

/// How the protective stop evolves once a position is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// The stop computed at entry never moves.
    Fixed,
    /// The stop ratchets up to `highest_close - trailing_multiple * ATR`.
    Trailing,
}

/// Whether position sizes are truncated to whole units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMode {
    WholeUnits,
    Fractional,
}

/// Contains parameters for trade-level risk management.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RiskManagement {
    /// The fraction of total equity to risk on a single trade (e.g., 0.01 for 1%).
    pub risk_fraction: f64,
    /// Initial stop distance in ATRs below the entry close.
    pub stop_multiple: f64,
    pub stop_mode: StopMode,
    /// Trailing distance in ATRs below the highest close since entry.
    pub trailing_multiple: f64,
    /// Optional profit target in ATRs above the entry close.
    pub target_multiple: Option<f64>,
    pub sizing: SizingMode,
}

/// Which equity the session cap is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapBaseline {
    SessionStart,
    PreviousClose,
}

/// Session-level guards: profit cap, equity floor and entry limit.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionRules {
    /// Flatten and lock once session gains reach this fraction of the baseline.
    pub cap_fraction: Option<f64>,
    pub cap_baseline: CapBaseline,
    /// Flatten and lock once equity is at or below this absolute value.
    pub equity_floor: Option<f64>,
    pub max_entries_per_session: Option<u32>,
}

/// Contains parameters for the simulated execution venue.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Simulation {
    /// The commission charged on fill notional. 0.0004 corresponds to 0.04%.
    pub taker_fee_pct: f64,
    /// The assumed adverse price slippage for market orders, as a fraction of price.
    pub slippage_pct: f64,
}

/// Where durable session state and the trade ledger live.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Persistence {
    pub state_path: PathBuf,
    pub trades_path: PathBuf,
    /// Adds the `return_pct` column to the trade ledger.
    pub record_return_pct: bool,
}

/// Telegram alerting and the alert queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    pub enabled: bool,
    pub token: String,
    pub chat_id: String,
    pub queue_capacity: usize,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    pub level: String,
    /// When set, logs go to a daily-rolling file in this directory instead of stdout.
    pub directory: Option<PathBuf>,
}

// --- Default Implementations ---
// These allow a user to omit whole sections from their toml.

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            adx_period: 14,
            atr_period: 14,
            ema_fast_period: 20,
            ema_slow_period: 50,
            adx_threshold: 20.0,
        }
    }
}

impl Default for RiskManagement {
    fn default() -> Self {
        Self {
            risk_fraction: 0.01,
            stop_multiple: 1.5,
            stop_mode: StopMode::Fixed,
            trailing_multiple: 1.0,
            target_multiple: None,
            sizing: SizingMode::WholeUnits,
        }
    }
}

impl Default for SessionRules {
    fn default() -> Self {
        Self {
            cap_fraction: None,
            cap_baseline: CapBaseline::SessionStart,
            equity_floor: None,
            max_entries_per_session: None,
        }
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self {
            taker_fee_pct: 0.0,
            slippage_pct: 0.0,
        }
    }
}

impl Default for Persistence {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("trendguard_state.json"),
            trades_path: PathBuf::from("trendguard_trades.csv"),
            record_return_pct: true,
        }
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            chat_id: String::new(),
            queue_capacity: 64,
            timeout_secs: 4,
            max_attempts: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: None,
        }
    }
}

impl Config {
    /// Checks cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

        if self.instrument.symbol.trim().is_empty() {
            return invalid("instrument.symbol must not be empty");
        }
        if !(self.instrument.initial_capital.is_finite() && self.instrument.initial_capital > 0.0) {
            return invalid("instrument.initial_capital must be positive");
        }

        let s = &self.strategy;
        if s.adx_period == 0 || s.atr_period == 0 || s.ema_fast_period == 0 || s.ema_slow_period == 0 {
            return invalid("indicator periods must be greater than zero");
        }
        if s.ema_fast_period >= s.ema_slow_period {
            return invalid("ema_fast_period must be less than ema_slow_period");
        }
        if !(s.adx_threshold.is_finite() && s.adx_threshold >= 0.0) {
            return invalid("adx_threshold must be a non-negative number");
        }

        let r = &self.risk_management;
        if !(r.risk_fraction > 0.0 && r.risk_fraction <= 1.0) {
            return invalid("risk_fraction must be in (0, 1]");
        }
        if !(r.stop_multiple.is_finite() && r.stop_multiple > 0.0) {
            return invalid("stop_multiple must be positive");
        }
        if r.stop_mode == StopMode::Trailing
            && !(r.trailing_multiple.is_finite() && r.trailing_multiple > 0.0)
        {
            return invalid("trailing_multiple must be positive when stop_mode is trailing");
        }
        if let Some(target) = r.target_multiple {
            if !(target.is_finite() && target > 0.0) {
                return invalid("target_multiple must be positive when set");
            }
        }

        let session = &self.session;
        if let Some(cap) = session.cap_fraction {
            if !(cap.is_finite() && cap > 0.0) {
                return invalid("session.cap_fraction must be positive when set");
            }
        }
        if let Some(floor) = session.equity_floor {
            if !(floor.is_finite() && floor >= 0.0) {
                return invalid("session.equity_floor must be a non-negative number");
            }
        }
        if session.max_entries_per_session == Some(0) {
            return invalid("session.max_entries_per_session must be at least 1 when set");
        }

        let sim = &self.simulation;
        if !(0.0..1.0).contains(&sim.taker_fee_pct) || !(0.0..1.0).contains(&sim.slippage_pct) {
            return invalid("simulation fees and slippage must be in [0, 1)");
        }

        if self.alerts.queue_capacity == 0 {
            return invalid("alerts.queue_capacity must be at least 1");
        }
        if self.alerts.max_attempts == 0 {
            return invalid("alerts.max_attempts must be at least 1");
        }

        Ok(())
    }

    /// The number of bars required before every indicator is defined.
    pub fn warmup_bars(&self) -> usize {
        let s = &self.strategy;
        (2 * s.adx_period).max(s.atr_period).max(s.ema_slow_period)
    }
}
