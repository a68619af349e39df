//! Error types shared across the Propscope crates.

/// Errors that can occur while answering an analytics query
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Dataset not found: {0}")]
    DatasetNotFound(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Query exceeded budget")]
    QueryTimeout,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;

impl AnalyticsError {
    /// Shorthand for an invalid-argument error
    pub fn invalid(message: impl Into<String>) -> Self {
        AnalyticsError::InvalidArgument(message.into())
    }
}

impl From<serde_json::Error> for AnalyticsError {
    fn from(e: serde_json::Error) -> Self {
        AnalyticsError::Serialization(e.to_string())
    }
}
