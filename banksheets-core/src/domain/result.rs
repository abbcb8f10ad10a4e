//! Result and error types for the core library

use thiserror::Error;

/// Core library error type
///
/// File-level (`NoHeaderFound`, `UnknownLayout`) and row-level
/// (`MalformedRecord`) variants are recovered by the import service and
/// reported as diagnostics. The remaining variants surface to the caller.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No header found: {0}")]
    NoHeaderFound(String),

    #[error("Unknown layout: {0}")]
    UnknownLayout(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid response: {0}")]
    InvalidUserResponse(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a database error
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }

    /// Create a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Create an invalid state error
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Short machine-readable name of the error kind, used in diagnostics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoHeaderFound(_) => "no_header_found",
            Self::UnknownLayout(_) => "unknown_layout",
            Self::MalformedRecord(_) => "malformed_record",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidUserResponse(_) => "invalid_user_response",
            Self::InvalidState(_) => "invalid_state",
            Self::Cancelled(_) => "cancelled",
            Self::NotFound(_) => "not_found",
            Self::Database(_) => "database",
            Self::Config(_) => "config",
            Self::Csv(_) => "csv",
            Self::Io(_) => "io",
            Self::Json(_) => "json",
        }
    }
}

impl From<duckdb::Error> for Error {
    fn from(e: duckdb::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::NoHeaderFound("a.csv".into()).kind(), "no_header_found");
        assert_eq!(Error::malformed("bad date").kind(), "malformed_record");
        assert_eq!(Error::invalid_argument("no batch").kind(), "invalid_argument");
    }

    #[test]
    fn test_error_display() {
        let err = Error::UnknownLayout("(\"P Date\", \"Amount\")".into());
        assert!(err.to_string().starts_with("Unknown layout"));

        let err = Error::invalid_state("commit before grouping");
        assert_eq!(err.to_string(), "Invalid state: commit before grouping");
    }
}
