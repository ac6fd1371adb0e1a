//! Error types for the index advisor

use thiserror::Error;

/// Errors raised at the advisor's API boundary.
///
/// Malformed query text is never an error: extraction is best effort and
/// simply yields fewer usage signals. These variants cover caller misuse and
/// unreadable inputs.
#[derive(Debug, Error)]
pub enum AdvisorError {
    /// Index candidate with an empty table or column list
    #[error("invalid index candidate: {0}")]
    InvalidCandidate(String),
    /// Negative or NaN score threshold
    #[error("invalid score threshold: {0}")]
    InvalidThreshold(f64),
    /// Configuration values that contradict each other
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Schema statistics document could not be parsed
    #[error("schema statistics error: {0}")]
    SchemaStats(#[from] serde_json::Error),
    /// Configuration file could not be parsed
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for advisor operations
pub type AdvisorResult<T> = Result<T, AdvisorError>;
