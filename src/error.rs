//! Error taxonomy for dataset loading.
//!
//! Fallible functions in this crate return [`anyhow::Result`]. Failures that
//! callers need to tell apart are raised as a [`LoadError`] inside the
//! `anyhow::Error`, so they survive added context and can be recovered with
//! `err.downcast_ref::<LoadError>()`.

use std::path::PathBuf;

/// Classified loading failures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The requested combination of options cannot be honoured.
    ///
    /// Always raised before any file is opened.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A designated nested column held text that is not a JSON object.
    #[error("malformed payload in column '{column}' at row {row} of {}: {source}", .file.display())]
    MalformedPayload {
        /// Source file.
        file: PathBuf,
        /// Nested column name.
        column: String,
        /// 0-based physical data row (header excluded).
        row: u64,
        /// Underlying parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// A designated nested column does not exist in the file header.
    #[error("column '{column}' not found in header of {}", .file.display())]
    MissingColumn {
        /// Source file.
        file: PathBuf,
        /// The absent column.
        column: String,
    },

    /// A field could not be parsed as its declared column type.
    #[error("column '{column}' at row {row}: cannot parse {value:?} as {expected}")]
    TypeMismatch {
        /// Column name.
        column: String,
        /// 0-based physical data row.
        row: u64,
        /// Raw field text.
        value: String,
        /// Declared type name.
        expected: &'static str,
    },

    /// The number of loaded rows differs from what the sampling mode promises.
    #[error("{file}: expected {expected} rows, found {actual}")]
    RowCountMismatch {
        /// Label of the file (e.g. `train`).
        file: String,
        /// Row count implied by the configuration.
        expected: u64,
        /// Row count actually loaded.
        actual: u64,
    },
}

impl LoadError {
    /// Shorthand for [`LoadError::InvalidConfiguration`].
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }
}

/// Find the [`LoadError`] carried by an `anyhow::Error`, if any.
#[must_use]
pub fn classify(err: &anyhow::Error) -> Option<&LoadError> {
    err.downcast_ref::<LoadError>()
}
