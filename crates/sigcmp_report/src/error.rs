//! Report errors.

/// Result type for report writers
pub type ReportResult<T> = Result<T, ReportError>;

/// Failure while producing a report artifact
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// Writing the artifact failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV encoding failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
