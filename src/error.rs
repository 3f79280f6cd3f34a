//! # Error Types
//!
//! Typed failures raised by the ingestion and rendering stages. Ingestion
//! errors are fatal for the whole run: a single bad line aborts the pass and
//! no partial series are returned. Empty or degenerate data is not an error
//! and never shows up here; statistics return `None` and charts return a
//! placeholder instead.

use thiserror::Error;

/// Failure while reading the NDJSON record stream.
#[derive(Debug, Error)]
pub enum IngestError {
    /// A non-blank line is not a valid JSON value.
    #[error("line {line_number}: invalid JSON ({source}): {line}")]
    InvalidJson {
        line_number: usize,
        line: String,
        #[source]
        source: serde_json::Error,
    },

    /// A recognized metric point lacks one of its required nested fields.
    #[error("line {line_number}: missing required field `{field}`: {line}")]
    MissingField {
        line_number: usize,
        field: &'static str,
        line: String,
    },

    /// A required field is present but cannot be used.
    #[error("line {line_number}: invalid field `{field}` ({reason}): {line}")]
    InvalidField {
        line_number: usize,
        field: &'static str,
        reason: String,
        line: String,
    },
}

impl IngestError {
    /// 1-based line number of the offending record.
    pub fn line_number(&self) -> usize {
        match self {
            IngestError::InvalidJson { line_number, .. }
            | IngestError::MissingField { line_number, .. }
            | IngestError::InvalidField { line_number, .. } => *line_number,
        }
    }

    /// Raw content of the offending line.
    pub fn line(&self) -> &str {
        match self {
            IngestError::InvalidJson { line, .. }
            | IngestError::MissingField { line, .. }
            | IngestError::InvalidField { line, .. } => line,
        }
    }
}

/// Chart inputs that cannot be rasterized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChartError {
    #[error("chart dimensions must be at least 1x1, got {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("values and timestamps must have the same length ({values} != {timestamps})")]
    LengthMismatch { values: usize, timestamps: usize },
}
