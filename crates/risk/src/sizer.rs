use crate::error::RiskError;
use configuration::{RiskManagement, SizingMode};

/// Fixed-fractional position sizing.
///
/// The amount put at risk is a fixed fraction of equity, and the size is that
/// amount divided by the distance from entry to stop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionSizer {
    risk_fraction: f64,
    mode: SizingMode,
}

impl PositionSizer {
    pub fn new(risk_fraction: f64, mode: SizingMode) -> Result<Self, RiskError> {
        if !(risk_fraction.is_finite() && risk_fraction > 0.0 && risk_fraction <= 1.0) {
            return Err(RiskError::InvalidParameters(format!(
                "risk_fraction must be in (0, 1], got {}",
                risk_fraction
            )));
        }
        Ok(Self {
            risk_fraction,
            mode,
        })
    }

    pub fn from_params(params: &RiskManagement) -> Result<Self, RiskError> {
        Self::new(params.risk_fraction, params.sizing)
    }

    pub fn risk_fraction(&self) -> f64 {
        self.risk_fraction
    }

    /// Returns the number of units to buy, or `0.0` when the trade should be skipped.
    ///
    /// Zero is returned for non-finite inputs, non-positive equity, a stop at or
    /// above the entry, and whole-unit sizes that truncate to nothing.
    pub fn size(&self, equity: f64, entry_price: f64, stop_price: f64) -> f64 {
        if !(equity.is_finite() && entry_price.is_finite() && stop_price.is_finite()) {
            return 0.0;
        }
        if equity <= 0.0 {
            return 0.0;
        }
        let risk_per_unit = entry_price - stop_price;
        if risk_per_unit <= 0.0 {
            return 0.0;
        }

        let risk_amount = equity * self.risk_fraction;
        let raw = risk_amount / risk_per_unit;
        let size = match self.mode {
            SizingMode::WholeUnits => raw.floor(),
            SizingMode::Fractional => raw,
        };

        if size.is_finite() && size > 0.0 {
            tracing::debug!(equity, entry_price, stop_price, risk_amount, size, "Position sized");
            size
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn whole(fraction: f64) -> PositionSizer {
        PositionSizer::new(fraction, SizingMode::WholeUnits).unwrap()
    }

    #[test]
    fn worked_example() {
        // $100k equity, 1% risk, entry 400, stop 400 - 1.5 * 4.
        let sizer = whole(0.01);
        assert_eq!(sizer.size(100_000.0, 400.0, 394.0), 166.0);
    }

    #[test]
    fn fractional_mode_keeps_the_remainder() {
        let sizer = PositionSizer::new(0.30, SizingMode::Fractional).unwrap();
        let size = sizer.size(100.0, 50.0, 48.0);
        assert!((size - 15.0).abs() < 1e-12);
        let size = sizer.size(100.0, 50.0, 47.0);
        assert!((size - 10.0).abs() < 1e-12);
        assert!(sizer.size(10.0, 50.0, 46.0) > 0.0);
    }

    #[test]
    fn whole_units_truncating_to_zero_means_no_trade() {
        let sizer = whole(0.01);
        assert_eq!(sizer.size(100.0, 50.0, 45.0), 0.0);
    }

    #[test]
    fn stop_at_or_above_entry_is_no_trade() {
        let sizer = whole(0.01);
        assert_eq!(sizer.size(100_000.0, 400.0, 400.0), 0.0);
        assert_eq!(sizer.size(100_000.0, 400.0, 401.0), 0.0);
    }

    #[test]
    fn bad_inputs_are_no_trade() {
        let sizer = whole(0.01);
        assert_eq!(sizer.size(0.0, 400.0, 394.0), 0.0);
        assert_eq!(sizer.size(-5.0, 400.0, 394.0), 0.0);
        assert_eq!(sizer.size(f64::NAN, 400.0, 394.0), 0.0);
        assert_eq!(sizer.size(100_000.0, f64::INFINITY, 394.0), 0.0);
    }

    #[test]
    fn rejects_out_of_range_fraction() {
        assert!(PositionSizer::new(0.0, SizingMode::WholeUnits).is_err());
        assert!(PositionSizer::new(1.5, SizingMode::WholeUnits).is_err());
        assert!(PositionSizer::new(f64::NAN, SizingMode::WholeUnits).is_err());
        assert!(PositionSizer::new(1.0, SizingMode::WholeUnits).is_ok());
    }

    #[test]
    fn builds_from_config_section() {
        let params = RiskManagement::default();
        let sizer = PositionSizer::from_params(&params).unwrap();
        assert_eq!(sizer.risk_fraction(), 0.01);
    }

    proptest! {
        #[test]
        fn size_is_never_negative_and_never_risks_more_than_budget(
            equity in -1_000.0f64..1_000_000.0,
            entry in 0.01f64..5_000.0,
            stop in 0.0f64..5_000.0,
            fraction in 0.001f64..1.0,
        ) {
            for mode in [SizingMode::WholeUnits, SizingMode::Fractional] {
                let sizer = PositionSizer::new(fraction, mode).unwrap();
                let size = sizer.size(equity, entry, stop);
                prop_assert!(size >= 0.0);
                if mode == SizingMode::WholeUnits {
                    prop_assert_eq!(size, size.floor());
                }
                if stop >= entry {
                    prop_assert_eq!(size, 0.0);
                }
                if size > 0.0 {
                    let risked = size * (entry - stop);
                    prop_assert!(risked <= equity * fraction * (1.0 + 1e-9) + 1e-6);
                }
            }
        }
    }
}
