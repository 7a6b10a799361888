use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Failed to read bar file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bar file is not valid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Decision engine error: {0}")]
    Engine(#[from] engine::EngineError),

    #[error("Indicator setup error: {0}")]
    Indicator(#[from] indicators::IndicatorError),

    #[error("Analytics calculation error: {0}")]
    Analytics(#[from] analytics::AnalyticsError),

    #[error("Progress bar template error: {0}")]
    ProgressBarTemplate(String),

    #[error("No usable bars were found in the input.")]
    DataUnavailable,
}

impl From<indicatif::style::TemplateError> for BacktestError {
    fn from(error: indicatif::style::TemplateError) -> Self {
        BacktestError::ProgressBarTemplate(error.to_string())
    }
}
