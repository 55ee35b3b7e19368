use thiserror::Error;

/// Result type for report operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Error types for report rendering and read-back.
///
/// Only the I/O boundary produces these; malformed or missing step data
/// is rendered as-is and never turns into an error.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Directory creation, temp file or write failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure building or reading the zip container
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// Manifest or document serialization failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The artifact opened for read-back is not a report this crate understands
    #[error("Invalid report: {0}")]
    InvalidReport(String),

    /// A finished temp file could not be moved to its final name
    #[error("Could not move report into place at {path}: {source}")]
    Persist {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
