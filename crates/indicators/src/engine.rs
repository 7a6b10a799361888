use crate::error::IndicatorError;
use crate::wilder::{Adx, Atr};
use configuration::StrategyParams;
use core_types::Bar;
use serde::Serialize;
use ta::indicators::ExponentialMovingAverage;
use ta::{Next, Reset};

/// The sign of a fast/slow EMA crossover on the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Cross {
    Up,
    Down,
    None,
}

impl Cross {
    /// `+1`, `-1` or `0`.
    pub fn sign(&self) -> i8 {
        match self {
            Cross::Up => 1,
            Cross::Down => -1,
            Cross::None => 0,
        }
    }
}

/// Indicator values computed from all bars up to and including the latest one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub adx: f64,
    pub atr: f64,
    pub ema_fast: f64,
    pub ema_slow: f64,
    pub cross: Cross,
}

/// Streams bars through ADX, ATR and the two EMAs and emits a snapshot once
/// every indicator is defined.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    adx: Adx,
    atr: Atr,
    ema_fast: ExponentialMovingAverage,
    ema_slow: ExponentialMovingAverage,
    ema_slow_period: usize,
    prev_diff: Option<f64>,
    bars_seen: usize,
}

impl IndicatorEngine {
    pub fn new(params: &StrategyParams) -> Result<Self, IndicatorError> {
        if params.ema_fast_period == 0 || params.ema_slow_period == 0 {
            return Err(IndicatorError::InvalidParameters(
                "EMA periods must be greater than zero".to_string(),
            ));
        }
        if params.ema_fast_period >= params.ema_slow_period {
            return Err(IndicatorError::InvalidParameters(format!(
                "fast EMA period ({}) must be less than slow EMA period ({})",
                params.ema_fast_period, params.ema_slow_period
            )));
        }

        let ema = |period: usize| {
            ExponentialMovingAverage::new(period)
                .map_err(|e| IndicatorError::Initialisation(format!("{:?}", e)))
        };

        Ok(Self {
            adx: Adx::new(params.adx_period)?,
            atr: Atr::new(params.atr_period)?,
            ema_fast: ema(params.ema_fast_period)?,
            ema_slow: ema(params.ema_slow_period)?,
            ema_slow_period: params.ema_slow_period,
            prev_diff: None,
            bars_seen: 0,
        })
    }

    /// Advances every indicator by one bar.
    ///
    /// Returns `None` during warm-up. The EMAs and the crossover history are
    /// updated on every bar, so the first snapshot may already carry a cross.
    pub fn next(&mut self, bar: &Bar) -> Option<IndicatorSnapshot> {
        self.bars_seen += 1;

        let adx = self.adx.next(bar);
        let atr = self.atr.next(bar);
        let ema_fast = self.ema_fast.next(bar.close);
        let ema_slow = self.ema_slow.next(bar.close);

        let diff = ema_fast - ema_slow;
        let cross = match self.prev_diff {
            Some(prev) if prev <= 0.0 && diff > 0.0 => Cross::Up,
            Some(prev) if prev >= 0.0 && diff < 0.0 => Cross::Down,
            _ => Cross::None,
        };
        self.prev_diff = Some(diff);

        if self.bars_seen < self.ema_slow_period {
            return None;
        }
        let snapshot = IndicatorSnapshot {
            adx: adx?,
            atr: atr?,
            ema_fast,
            ema_slow,
            cross,
        };
        tracing::trace!(?snapshot, "Indicators updated");
        Some(snapshot)
    }

    pub fn bars_seen(&self) -> usize {
        self.bars_seen
    }

    pub fn reset(&mut self) {
        self.adx.reset();
        self.atr.reset();
        self.ema_fast.reset();
        self.ema_slow.reset();
        self.prev_diff = None;
        self.bars_seen = 0;
    }
}
