use thiserror::Error;

#[derive(Error, Debug)]
pub enum AlerterError {
    #[error("Telegram API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Telegram API returned an error: {0}")]
    ApiError(String),

    #[error("Alert delivery timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Alert sink failed: {0}")]
    Sink(String),
}
