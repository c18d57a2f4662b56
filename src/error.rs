//! Error types for robotask

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RobotaskError {
    /// The task store could not be reached, answered with an unexpected
    /// status, or returned a body we could not decode.
    #[error("Task store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to launch execution context `{program}`")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Virtual display error: {0}")]
    Display(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("URL parse error: {0}")]
    UrlParseError(#[from] url::ParseError),
}

impl From<chromiumoxide::error::CdpError> for RobotaskError {
    fn from(e: chromiumoxide::error::CdpError) -> Self {
        RobotaskError::Browser(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RobotaskError>;
