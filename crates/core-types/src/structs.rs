use crate::enums::OrderSide;
use crate::error::CoreError;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A single OHLCV price bar. Bars are immutable once received from the feed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(
        timestamp: NaiveDateTime,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// The trading day this bar belongs to. All session bookkeeping keys off this date.
    pub fn session_date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Checks that the bar is internally consistent.
    ///
    /// Prices must be finite and positive, `low <= open, close <= high`, and the
    /// volume must be finite and non-negative.
    pub fn validate(&self) -> Result<(), CoreError> {
        let malformed = |reason: &str| CoreError::MalformedBar {
            timestamp: self.timestamp.to_string(),
            reason: reason.to_string(),
        };

        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(malformed("prices must be finite and positive"));
        }
        if self.high < self.low {
            return Err(malformed("high is below low"));
        }
        if self.open < self.low || self.open > self.high {
            return Err(malformed("open outside the high/low range"));
        }
        if self.close < self.low || self.close > self.high {
            return Err(malformed("close outside the high/low range"));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(malformed("volume must be finite and non-negative"));
        }
        Ok(())
    }
}

impl ta::Open for Bar {
    fn open(&self) -> f64 {
        self.open
    }
}

impl ta::High for Bar {
    fn high(&self) -> f64 {
        self.high
    }
}

impl ta::Low for Bar {
    fn low(&self) -> f64 {
        self.low
    }
}

impl ta::Close for Bar {
    fn close(&self) -> f64 {
        self.close
    }
}

impl ta::Volume for Bar {
    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Opaque identifier returned by the order gateway for a submitted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderHandle(pub Uuid);

impl OrderHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A confirmed execution reported back by the order gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub handle: OrderHandle,
    pub side: OrderSide,
    pub filled_price: f64,
    pub filled_size: f64,
    /// Realized PnL reported by the venue when this fill closes a position.
    pub position_pnl_on_close: Option<f64>,
    pub timestamp: NaiveDateTime,
}

/// The single open position held by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub side: OrderSide,
    pub entry_price: f64,
    pub size: f64,
    pub stop_price: f64,
    pub target_price: Option<f64>,
    pub highest_close: f64,
    pub opened_at: NaiveDateTime,
}

impl Position {
    /// PnL of closing the whole position at `exit_price`, before fees.
    pub fn pnl_at(&self, exit_price: f64) -> f64 {
        match self.side {
            OrderSide::Buy => (exit_price - self.entry_price) * self.size,
            OrderSide::Sell => (self.entry_price - exit_price) * self.size,
        }
    }

    pub fn notional(&self) -> f64 {
        self.entry_price * self.size
    }
}

/// One closed round trip, as appended to the trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date_in: NaiveDate,
    pub date_out: NaiveDate,
    pub shares: f64,
    #[serde(rename = "entry")]
    pub entry_price: f64,
    #[serde(rename = "exit")]
    pub exit_price: f64,
    pub pnl: f64,
    /// PnL as a fraction of the entry notional.
    #[serde(default)]
    pub return_pct: Option<f64>,
}

impl TradeRecord {
    /// Builds the ledger record for `position` closed at `exit_price` with a known realized PnL.
    pub fn from_close(position: &Position, exit_price: f64, pnl: f64, date_out: NaiveDate) -> Self {
        let notional = position.notional();
        let return_pct = if notional > 0.0 { Some(pnl / notional) } else { None };
        Self {
            date_in: position.opened_at.date(),
            date_out,
            shares: position.size,
            entry_price: position.entry_price,
            exit_price,
            pnl,
            return_pct,
        }
    }

    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(16, 0, 0)
            .unwrap()
    }

    #[test]
    fn valid_bar_passes_validation() {
        let bar = Bar::new(at(2024, 3, 1), 10.0, 11.0, 9.5, 10.5, 1_000.0);
        assert!(bar.validate().is_ok());
        assert_eq!(bar.session_date(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    }

    #[test]
    fn inverted_range_is_malformed() {
        let bar = Bar::new(at(2024, 3, 1), 10.0, 9.0, 11.0, 10.0, 1_000.0);
        assert!(matches!(bar.validate(), Err(CoreError::MalformedBar { .. })));
    }

    #[test]
    fn nan_close_is_malformed() {
        let bar = Bar::new(at(2024, 3, 1), 10.0, 11.0, 9.0, f64::NAN, 1_000.0);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn close_outside_range_is_malformed() {
        let bar = Bar::new(at(2024, 3, 1), 10.0, 11.0, 9.0, 12.0, 1_000.0);
        assert!(bar.validate().is_err());
    }

    #[test]
    fn trade_record_from_close_computes_return_fraction() {
        let position = Position {
            side: OrderSide::Buy,
            entry_price: 400.0,
            size: 10.0,
            stop_price: 394.0,
            target_price: None,
            highest_close: 400.0,
            opened_at: at(2024, 3, 1),
        };
        let record = TradeRecord::from_close(&position, 410.0, 100.0, at(2024, 3, 4).date());
        assert_eq!(record.date_in, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(record.shares, 10.0);
        assert_eq!(record.return_pct, Some(100.0 / 4_000.0));
        assert!(record.is_win());
        assert_eq!(position.pnl_at(410.0), 100.0);
    }
}
