use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Session-scoped counters and lock flags.
///
/// This is the record that must survive restarts. Every field defaults
/// individually so older or partial records still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub session_start_equity: Option<f64>,
    pub session_locked: bool,
    pub session_trades: u32,
    pub session_pnl: f64,
    pub last_date: Option<NaiveDate>,
    pub daily_cap_hit: bool,
    pub last_cap_date: Option<NaiveDate>,
    /// Entries filled during the current session.
    pub session_entries: u32,
    /// Equity observed on the last bar of the previous session.
    pub previous_close_equity: Option<f64>,
}

impl SessionState {
    /// True when `date` belongs to a different session than the last bar seen.
    pub fn is_new_session(&self, date: NaiveDate) -> bool {
        self.last_date != Some(date)
    }

    /// Starts a fresh session on `date` with `equity` as its baseline.
    pub fn roll_over(&mut self, date: NaiveDate, equity: f64, previous_close: Option<f64>) {
        *self = Self {
            session_start_equity: Some(equity),
            last_date: Some(date),
            previous_close_equity: previous_close.or(self.previous_close_equity),
            ..Self::default()
        };
    }

    /// A session is closed for new risk once locked, or once the cap was hit today.
    pub fn is_locked_for(&self, date: NaiveDate) -> bool {
        self.session_locked || (self.daily_cap_hit && self.last_cap_date == Some(date))
    }

    pub fn lock(&mut self) {
        self.session_locked = true;
    }

    pub fn record_cap_hit(&mut self, date: NaiveDate, equity: f64) {
        self.session_locked = true;
        self.daily_cap_hit = true;
        self.last_cap_date = Some(date);
        if let Some(start) = self.session_start_equity {
            self.session_pnl = equity - start;
        }
    }

    pub fn record_entry(&mut self) {
        self.session_entries = self.session_entries.saturating_add(1);
    }

    /// Counts a closed trade. Once the cap is booked, `session_pnl` already holds
    /// the marked-to-market result and the flatten trade does not add to it again.
    pub fn record_trade(&mut self, pnl: f64) {
        self.session_trades = self.session_trades.saturating_add(1);
        if !self.daily_cap_hit {
            self.session_pnl += pnl;
        }
    }

    /// Percentage change of `equity` against the session start, 0 when unknown.
    pub fn session_change_pct(&self, equity: f64) -> f64 {
        match self.session_start_equity {
            Some(start) if start > 0.0 => (equity - start) / start * 100.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn roll_over_resets_counters_and_sets_baseline() {
        let mut state = SessionState {
            session_start_equity: Some(900.0),
            session_locked: true,
            session_trades: 4,
            session_pnl: 12.5,
            last_date: Some(day(1)),
            daily_cap_hit: true,
            last_cap_date: Some(day(1)),
            session_entries: 4,
            previous_close_equity: None,
        };

        state.roll_over(day(2), 1_000.0, Some(950.0));

        assert_eq!(state.session_start_equity, Some(1_000.0));
        assert!(!state.session_locked);
        assert_eq!(state.session_trades, 0);
        assert_eq!(state.session_entries, 0);
        assert_eq!(state.session_pnl, 0.0);
        assert_eq!(state.last_date, Some(day(2)));
        assert!(!state.daily_cap_hit);
        assert_eq!(state.last_cap_date, None);
        assert_eq!(state.previous_close_equity, Some(950.0));
    }

    #[test]
    fn cap_hit_only_locks_its_own_date() {
        let state = SessionState {
            daily_cap_hit: true,
            last_cap_date: Some(day(3)),
            ..SessionState::default()
        };
        assert!(state.is_locked_for(day(3)));
        assert!(!state.is_locked_for(day(4)));
    }

    #[test]
    fn missing_fields_default_when_deserializing() {
        let json = r#"{"session_locked": true, "last_date": "2024-05-03"}"#;
        let state: SessionState = serde_json::from_str(json).unwrap();
        assert!(state.session_locked);
        assert_eq!(state.last_date, Some(day(3)));
        assert_eq!(state.session_start_equity, None);
        assert_eq!(state.session_trades, 0);
        assert!(!state.daily_cap_hit);
    }

    #[test]
    fn trades_after_cap_are_counted_but_not_double_booked() {
        let mut state = SessionState::default();
        state.roll_over(day(3), 1_000.0, None);
        state.record_trade(50.0);
        state.record_cap_hit(day(3), 1_300.0);
        assert_eq!(state.session_pnl, 300.0);

        state.record_trade(250.0);
        assert_eq!(state.session_trades, 2);
        assert_eq!(state.session_pnl, 300.0);
    }

    #[test]
    fn change_pct_is_zero_without_baseline() {
        let state = SessionState::default();
        assert_eq!(state.session_change_pct(120.0), 0.0);
    }
}
