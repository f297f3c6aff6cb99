//! Custom error types for nutriplan

use thiserror::Error;

/// Main error type for nutriplan operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Document requires OCR: {0}")]
    OcrRequired(String),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("No results: {0}")]
    EmptyResult(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Qdrant error: {0}")]
    Qdrant(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Error {
    /// Message suitable for end users.
    ///
    /// Precise failures (validation, duplicates, missing records) keep their
    /// detail; infrastructure failures collapse to a generic retry hint unless
    /// verbose output was requested.
    pub fn user_message(&self, verbose: bool) -> String {
        match self {
            Error::Validation(_)
            | Error::NotFound(_)
            | Error::Duplicate(_)
            | Error::UnsupportedFormat(_)
            | Error::OcrRequired(_)
            | Error::EmptyResult(_) => self.to_string(),
            Error::Connectivity(_) | Error::Timeout(_) | Error::Parse(_) => {
                if verbose {
                    self.to_string()
                } else {
                    "Plan generation service is unavailable right now. Please try again."
                        .to_string()
                }
            }
            other => {
                if verbose {
                    other.to_string()
                } else {
                    "An internal error occurred. Please try again.".to_string()
                }
            }
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Connectivity(_) | Error::Timeout(_) | Error::Parse(_)
        )
    }
}

/// Result type alias for nutriplan
pub type Result<T> = std::result::Result<T, Error>;

/// Convert qdrant errors
impl From<qdrant_client::QdrantError> for Error {
    fn from(err: qdrant_client::QdrantError) -> Self {
        Error::Qdrant(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precise_errors_keep_detail() {
        let err = Error::Duplicate("document abc already ingested".to_string());
        assert!(err.user_message(false).contains("abc"));
    }

    #[test]
    fn test_infrastructure_errors_are_generic() {
        let err = Error::Timeout("LLM request exceeded 90s".to_string());
        let msg = err.user_message(false);
        assert!(!msg.contains("90s"));
        assert!(err.user_message(true).contains("90s"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(Error::Connectivity("down".into()).is_retryable());
        assert!(!Error::Duplicate("exists".into()).is_retryable());
    }
}
