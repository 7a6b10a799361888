use configuration::{CapBaseline, SessionRules};
use core_types::SessionState;

/// Session-wide limits that flatten and lock the engine for the rest of the day.
///
/// Both checks are pure: the engine decides what to do with the answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionGuard {
    cap_fraction: Option<f64>,
    cap_baseline: CapBaseline,
    equity_floor: Option<f64>,
}

impl SessionGuard {
    pub fn new(rules: &SessionRules) -> Self {
        Self {
            cap_fraction: rules.cap_fraction,
            cap_baseline: rules.cap_baseline,
            equity_floor: rules.equity_floor,
        }
    }

    pub fn equity_floor(&self) -> Option<f64> {
        self.equity_floor
    }

    /// True when a floor is configured and `equity` is at or below it.
    pub fn floor_breached(&self, equity: f64) -> bool {
        self.equity_floor.is_some_and(|floor| equity <= floor)
    }

    /// The equity the cap is measured against. Falls back to the session start
    /// when no previous close is known.
    pub fn cap_baseline(&self, state: &SessionState) -> Option<f64> {
        match self.cap_baseline {
            CapBaseline::SessionStart => state.session_start_equity,
            CapBaseline::PreviousClose => state
                .previous_close_equity
                .or(state.session_start_equity),
        }
    }

    /// True when session gains have reached `cap_fraction` of the baseline.
    pub fn cap_reached(&self, state: &SessionState, equity: f64) -> bool {
        let (Some(cap), Some(baseline)) = (self.cap_fraction, self.cap_baseline(state)) else {
            return false;
        };
        if baseline <= 0.0 {
            return false;
        }
        equity - baseline >= cap * baseline
    }
}
