//! Structured error types for the pipeline.
//!
//! These are designed to be displayable in CLI output and log lines alike.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{} could not be found", path.display())]
    NotFound { path: PathBuf },

    #[error("malformed record at {}:{line}: {source}", path.display())]
    MalformedRecord {
        path: PathBuf,
        line: u64,
        #[source]
        source: RecordError,
    },

    #[error("contract violation: {0}")]
    ContractViolation(String),

    #[error("no records to {what}")]
    EmptyResult { what: String },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub(crate) fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn empty(what: impl Into<String>) -> Self {
        Self::EmptyResult { what: what.into() }
    }
}

/// Why a single raw record could not be converted into a typed one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("invalid date '{value}': {reason}")]
    InvalidDate { value: String, reason: &'static str },

    #[error("invalid {field} '{value}'")]
    InvalidNumber { field: &'static str, value: String },
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_names_the_path() {
        let err = PipelineError::not_found("/no/such/dir");
        assert_eq!(err.to_string(), "/no/such/dir could not be found");
    }

    #[test]
    fn malformed_record_carries_location_and_reason() {
        let err = PipelineError::MalformedRecord {
            path: PathBuf::from("data/nyse/prices.csv"),
            line: 7,
            source: RecordError::InvalidNumber {
                field: "open",
                value: "abc".into(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("data/nyse/prices.csv:7"));
        assert!(msg.contains("invalid open 'abc'"));
    }
}
