//! Error taxonomy for splitting, delivery and sink ingestion

use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, SplitShareError>;

#[derive(Error, Debug)]
pub enum SplitShareError {
    /// Bad bound, malformed numeric input or bad configuration
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A record in a batch does not have the batch's arity
    #[error("Schema mismatch at record {index}: expected {expected} fields, got {got}")]
    SchemaMismatch {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("Connection refused by {endpoint}")]
    ConnectionRefused { endpoint: String },

    #[error("Timed out talking to {endpoint}")]
    Timeout { endpoint: String },

    /// The transport accepted fewer bytes than requested
    #[error("Partial write to {endpoint}: {written} of {expected} bytes")]
    PartialWrite {
        endpoint: String,
        written: usize,
        expected: usize,
    },

    #[error("Sink write failed for {path}: {source}")]
    SinkWriteFailure {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SplitShareError {
    /// Stable name of the failing kind, for user-facing reports
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "InvalidArgument",
            Self::SchemaMismatch { .. } => "SchemaMismatch",
            Self::ConnectionRefused { .. } => "ConnectionRefused",
            Self::Timeout { .. } => "Timeout",
            Self::PartialWrite { .. } => "PartialWrite",
            Self::SinkWriteFailure { .. } => "SinkWriteFailure",
            Self::Io(_) => "Io",
        }
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
