//! Document-related error definitions

use thiserror::Error;

/// Errors that can occur when storing or retrieving documents
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
