//! Core error types for mailmerge.
//!
//! This module provides the [`MergeError`] enum, which covers every condition
//! a caller can observe from a render: template problems, dataset shape
//! problems, configuration problems, serialization failures, and I/O.
//!
//! Missing data (an unbound selection, an absent field, an attribute that is
//! not there) is never an error. Those conditions degrade to empty output.

use thiserror::Error;

/// The primary error type for mailmerge.
///
/// Each variant maps to a process exit code via [`MergeError::exit_code`], so
/// command-line front ends can report failures consistently.
#[derive(Error, Debug)]
pub enum MergeError {
    // ── Templates ────────────────────────────────────────────────────

    /// The template could not be parsed as a document.
    #[error("Template syntax error: {0}")]
    TemplateSyntaxError(String),

    /// The template exceeds the configured size limit.
    #[error("Template too large: {size} bytes (limit {limit})")]
    TemplateTooLarge {
        /// Size of the rejected template in bytes.
        size: usize,
        /// The configured limit in bytes.
        limit: usize,
    },

    // ── Data ─────────────────────────────────────────────────────────

    /// The dataset does not have the expected shape
    /// (selection name → array of row objects).
    #[error("Dataset error: {0}")]
    DatasetError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── Serialization ────────────────────────────────────────────────

    /// The rendered document could not be serialized.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl MergeError {
    /// Returns the process exit code associated with this error.
    ///
    /// - `TemplateSyntaxError`, `TemplateTooLarge` -> 65 (data format error)
    /// - `DatasetError` -> 65
    /// - `ConfigurationError` -> 78 (configuration error)
    /// - `SerializationError` -> 70 (internal software error)
    /// - `IoError` -> 74 (I/O error)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::TemplateSyntaxError(_) | Self::TemplateTooLarge { .. } | Self::DatasetError(_) => {
                65
            }
            Self::ConfigurationError(_) => 78,
            Self::SerializationError(_) => 70,
            Self::IoError(_) => 74,
        }
    }

    /// Returns `true` if this error was caused by the template itself.
    pub const fn is_template_error(&self) -> bool {
        matches!(
            self,
            Self::TemplateSyntaxError(_) | Self::TemplateTooLarge { .. }
        )
    }
}

impl From<serde_json::Error> for MergeError {
    fn from(err: serde_json::Error) -> Self {
        Self::DatasetError(err.to_string())
    }
}

/// A convenience type alias for `Result<T, MergeError>`.
pub type MergeResult<T> = Result<T, MergeError>;
