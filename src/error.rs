//! Error types for the live news player

/// Result type alias for catalog, backend and config operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur outside the playback core
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] ureq::Error),

    /// Backend answered with a non-success status
    #[error("HTTP error: {0}")]
    Status(u16),

    /// JSON parsing failed
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A channel row violates the catalog invariants
    #[error("Invalid channel {id}: {reason}")]
    InvalidChannel { id: String, reason: String },

    /// Configuration is missing or unusable
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn invalid_channel(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidChannel {
            id: id.into(),
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
