/// Error types for configuration, ingestion, storage and queries.
///
/// Acquisition and parse errors are local to one source; the ingestion run
/// logs them and moves on. Store errors abort whatever operation hit them.
/// `QueryError::NoData` is an expected outcome, not a fault.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration could not be loaded or failed validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("environment variable {0} must be set")]
    MissingEnv(&'static str),
}

/// A source's raw bytes could not be obtained.
#[derive(Error, Debug)]
pub enum AcquireError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error: {0}")]
    Status(u16),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("source {0} has neither a URL nor a local file")]
    NoLocation(i32),
}

/// A source's bytes could not be read as a table at all.
///
/// Individual bad lines never produce this; they are recorded as row errors.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read header row: {0}")]
    Header(#[from] csv::Error),

    #[error("no header row found")]
    Empty,

    #[error("missing required column `{column}` (headers: {headers:?})")]
    MissingColumn {
        column: &'static str,
        headers: Vec<String>,
    },
}

/// Why a parsed row did not become a `Reading`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RejectReason {
    #[error("unrecognised timestamp '{0}'")]
    Timestamp(String),

    #[error("`{column}` is not a number: '{value}'")]
    NotANumber { column: &'static str, value: String },

    #[error("`{column}` must be finite and non-negative, got {value}")]
    OutOfRange { column: &'static str, value: f64 },
}

/// The persisted store failed. Always worth retrying once the store is back.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database connection failed: {0}")]
    Connect(#[source] postgres::Error),

    #[error("database operation failed: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Outcome of a read query that did not produce a result.
#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("No data found for turbine {source_id}")]
    NoData { source_id: i32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    /// `true` for the no-data signal, which callers map to "not found".
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueryError::NoData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_data_is_not_found_but_store_error_is_not() {
        let no_data = QueryError::NoData { source_id: 3 };
        assert!(no_data.is_not_found());
        assert_eq!(no_data.to_string(), "No data found for turbine 3");

        let store: QueryError = StoreError::Unavailable("down".to_string()).into();
        assert!(!store.is_not_found(), "store failures must stay distinguishable from no-data");
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = QueryError::InvalidParameter("interval must be positive".to_string());
        assert_eq!(err.to_string(), "invalid parameter: interval must be positive");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_acquire_status_display() {
        assert_eq!(AcquireError::Status(503).to_string(), "HTTP error: 503");
    }

    #[test]
    fn test_reject_reason_display() {
        let reason = RejectReason::NotANumber { column: "wind_speed", value: "abc".to_string() };
        assert_eq!(reason.to_string(), "`wind_speed` is not a number: 'abc'");
    }
}
