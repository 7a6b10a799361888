use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Malformed bar at {timestamp}: {reason}")]
    MalformedBar { timestamp: String, reason: String },
}
