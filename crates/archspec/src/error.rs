//! Error types for descriptor ingestion.

use std::path::PathBuf;

/// Errors that can occur while loading microarchitecture descriptor documents.
///
/// Lookups never fail with an error: an unknown name is reported as `None`.
#[derive(Debug, thiserror::Error)]
pub enum ArchspecError {
    /// JSON deserialization error.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error reading a descriptor document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor document not found.
    #[error("descriptor document not found: {}", path.display())]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// The document parsed but failed the presence checks.
    #[error("validation error: {detail}")]
    Validation {
        /// Description of the validation failure.
        detail: String,
    },
}

/// Result type for descriptor ingestion.
pub type Result<T> = std::result::Result<T, ArchspecError>;
