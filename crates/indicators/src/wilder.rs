//! Wilder-smoothed indicators.
//!
//! `ta` ships an ATR built on its EMA, which weights recent bars more heavily
//! than Wilder's original formulation. These implementations follow Wilder:
//! the first value is the simple mean of the first `period` inputs, after which
//! `avg = (avg * (period - 1) + x) / period`.

use crate::error::IndicatorError;
use ta::{Close, High, Low, Next, Reset};

/// Wilder's running average. Undefined until `period` inputs have been seen.
#[derive(Debug, Clone)]
pub struct WilderAverage {
    period: usize,
    count: usize,
    sum: f64,
    value: Option<f64>,
}

impl WilderAverage {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        if period == 0 {
            return Err(IndicatorError::InvalidParameters(
                "Wilder period must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            period,
            count: 0,
            sum: 0.0,
            value: None,
        })
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

impl Next<f64> for WilderAverage {
    type Output = Option<f64>;

    fn next(&mut self, input: f64) -> Self::Output {
        let n = self.period as f64;
        match self.value {
            Some(prev) => self.value = Some((prev * (n - 1.0) + input) / n),
            None => {
                self.count += 1;
                self.sum += input;
                if self.count == self.period {
                    self.value = Some(self.sum / n);
                }
            }
        }
        self.value
    }
}

impl Reset for WilderAverage {
    fn reset(&mut self) {
        self.count = 0;
        self.sum = 0.0;
        self.value = None;
    }
}

fn true_range<T: High + Low>(bar: &T, prev_close: Option<f64>) -> f64 {
    let range = bar.high() - bar.low();
    match prev_close {
        Some(pc) => range
            .max((bar.high() - pc).abs())
            .max((bar.low() - pc).abs()),
        None => range,
    }
}

/// Average True Range with Wilder smoothing.
#[derive(Debug, Clone)]
pub struct Atr {
    average: WilderAverage,
    prev_close: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            average: WilderAverage::new(period)?,
            prev_close: None,
        })
    }
}

impl<T: High + Low + Close> Next<&T> for Atr {
    type Output = Option<f64>;

    fn next(&mut self, bar: &T) -> Self::Output {
        let tr = true_range(bar, self.prev_close);
        self.prev_close = Some(bar.close());
        self.average.next(tr)
    }
}

impl Reset for Atr {
    fn reset(&mut self) {
        self.average.reset();
        self.prev_close = None;
    }
}

#[derive(Debug, Clone, Copy)]
struct PrevBar {
    high: f64,
    low: f64,
    close: f64,
}

/// Average Directional Index.
///
/// Directional movement starts on the second bar, so the smoothed DI values are
/// defined after `period + 1` bars and the ADX itself after `2 * period` bars.
#[derive(Debug, Clone)]
pub struct Adx {
    plus_dm: WilderAverage,
    minus_dm: WilderAverage,
    tr: WilderAverage,
    dx: WilderAverage,
    prev: Option<PrevBar>,
}

impl Adx {
    pub fn new(period: usize) -> Result<Self, IndicatorError> {
        Ok(Self {
            plus_dm: WilderAverage::new(period)?,
            minus_dm: WilderAverage::new(period)?,
            tr: WilderAverage::new(period)?,
            dx: WilderAverage::new(period)?,
            prev: None,
        })
    }

    fn directional_index(plus_dm: f64, minus_dm: f64, tr: f64) -> f64 {
        if tr <= 0.0 {
            return 0.0;
        }
        let plus_di = 100.0 * plus_dm / tr;
        let minus_di = 100.0 * minus_dm / tr;
        let sum = plus_di + minus_di;
        if sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di - minus_di).abs() / sum
        }
    }
}

impl<T: High + Low + Close> Next<&T> for Adx {
    type Output = Option<f64>;

    fn next(&mut self, bar: &T) -> Self::Output {
        let current = PrevBar {
            high: bar.high(),
            low: bar.low(),
            close: bar.close(),
        };
        let Some(prev) = self.prev.replace(current) else {
            return None;
        };

        let up_move = current.high - prev.high;
        let down_move = prev.low - current.low;
        let plus = if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 };
        let minus = if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 };
        let tr = true_range(bar, Some(prev.close));

        let smoothed = (
            self.plus_dm.next(plus),
            self.minus_dm.next(minus),
            self.tr.next(tr),
        );
        match smoothed {
            (Some(p), Some(m), Some(t)) => self.dx.next(Self::directional_index(p, m, t)),
            _ => None,
        }
    }
}

impl Reset for Adx {
    fn reset(&mut self) {
        self.plus_dm.reset();
        self.minus_dm.reset();
        self.tr.reset();
        self.dx.reset();
        self.prev = None;
    }
}
