use chrono::NaiveDateTime;
use core_types::Bar;

/// Admits bars into the indicator pipeline only if they are well formed and
/// not earlier than the last admitted bar. Date-only feeds repeat timestamps
/// within a session, so equal timestamps pass.
#[derive(Debug, Clone, Default)]
pub struct BarGate {
    last_timestamp: Option<NaiveDateTime>,
}

impl BarGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admit(&mut self, bar: &Bar) -> bool {
        if let Err(e) = bar.validate() {
            tracing::warn!(error = %e, "Skipping malformed bar");
            return false;
        }
        if let Some(last) = self.last_timestamp {
            if bar.timestamp < last {
                tracing::warn!(timestamp = %bar.timestamp, last = %last, "Skipping out-of-order bar");
                return false;
            }
        }
        self.last_timestamp = Some(bar.timestamp);
        true
    }
}
