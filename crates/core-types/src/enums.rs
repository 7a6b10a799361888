use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side of the order
    pub fn opposite(&self) -> Self {
        match self {
            OrderSide::Buy => OrderSide::Sell,
            OrderSide::Sell => OrderSide::Buy,
        }
    }
}

/// Why an open position was (or is being) closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    Target,
    CrossDown,
    EquityFloor,
    SessionCap,
    /// A close issued for a position found open while the session was already locked.
    SessionLocked,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ExitReason::StopLoss => "stop",
            ExitReason::Target => "target",
            ExitReason::CrossDown => "ema cross-down",
            ExitReason::EquityFloor => "equity floor",
            ExitReason::SessionCap => "session cap",
            ExitReason::SessionLocked => "session locked",
        };
        f.write_str(label)
    }
}
