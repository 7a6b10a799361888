use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum AnalyticsError {
    #[error("Initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("Equity curve is not in date order at {0}")]
    UnorderedCurve(chrono::NaiveDate),

    #[error("Non-finite value in input: {0}")]
    NonFinite(String),
}
