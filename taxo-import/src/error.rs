//! Error types for taxo-import
//!
//! Only input-layer and setup failures are errors. Anything that goes wrong
//! while reconciling a single row is reported through
//! [`crate::engine::RowOutcome`] instead and never aborts the batch.

use thiserror::Error;

/// Fatal import error
#[derive(Debug, Error)]
pub enum ImportError {
    /// Source produced no rows
    #[error("No rows to import")]
    EmptyInput,

    /// A required column or element is absent
    #[error("Missing required header '{0}'")]
    MissingHeader(String),

    /// Source could not be decoded at a given line
    #[error("Decode error at line {line}: {message}")]
    Decode { line: usize, message: String },

    /// Format could not be determined or is not supported
    #[error("Unsupported source format: {0}")]
    UnsupportedFormat(String),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// XML parser error
    #[error("XML error: {0}")]
    Xml(#[from] roxmltree::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// taxo-common error (database, config)
    #[error(transparent)]
    Common(#[from] taxo_common::Error),
}

impl From<sqlx::Error> for ImportError {
    fn from(err: sqlx::Error) -> Self {
        ImportError::Common(taxo_common::Error::Database(err))
    }
}

/// Result type for fatal import operations
pub type ImportResult<T> = Result<T, ImportError>;
