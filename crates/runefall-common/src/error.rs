//! Error types for Runefall.
//!
//! The simulation itself never fails: invalid inputs degrade to no-ops.
//! These errors only surface at the edges, when tuning data or engine
//! configuration is loaded.

use thiserror::Error;

/// Top-level error type for Runefall operations.
#[derive(Debug, Error)]
pub enum RunefallError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A tuning value is outside its allowed range
    #[error("Invalid tuning value for `{field}`: {reason}")]
    InvalidTuning {
        /// Dotted path of the offending field
        field: String,
        /// What is wrong with it
        reason: String,
    },
}

impl RunefallError {
    /// Shorthand for an [`RunefallError::InvalidTuning`] error.
    #[must_use]
    pub fn invalid_tuning(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTuning {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for Runefall operations.
pub type RunefallResult<T> = Result<T, RunefallError>;
