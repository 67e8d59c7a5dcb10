//! Common error types for the fuzzy melodic query core

use thiserror::Error;

/// Common result type for mfq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types across parsing, compilation, ranking and configuration
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed pattern-description text
    ///
    /// Extraction aborts on the first bad fragment; no partial pattern is returned.
    #[error("Parse error at `{fragment}`: {reason}")]
    Parse { fragment: String, reason: String },

    /// Query compilation aborted before any text was emitted
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// A result row does not follow the projection's column contract
    #[error("Schema mismatch in row {row}, column `{column}`: {reason}")]
    SchemaMismatch {
        row: usize,
        column: String,
        reason: String,
    },

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML configuration syntax error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Reasons a parsed query cannot be compiled (or ranked against)
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("pattern contains no notes")]
    EmptyPattern,

    #[error("membership function `{0}` is not declared")]
    UndeclaredFunction(String),

    #[error("step {step} is out of range for a pattern with {steps} steps")]
    PositionOutOfRange { step: usize, steps: usize },
}

impl Error {
    pub(crate) fn parse(fragment: &str, reason: impl Into<String>) -> Self {
        Error::Parse {
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn schema(row: usize, column: &str, reason: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            row,
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}
