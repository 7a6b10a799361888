use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Risk management error: {0}")]
    Risk(#[from] risk::RiskError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] indicators::IndicatorError),
}
