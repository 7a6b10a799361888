use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndicatorError {
    #[error("Indicator received invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Failed to initialise indicator: {0}")]
    Initialisation(String),
}
