use thiserror::Error;

use crate::vector::{VectorError, VectorStorageError};

/// Errors raised while building, persisting or loading the corpus.
#[derive(Error, Debug)]
pub enum SemanticError {
    #[error("No persisted index found")]
    NotFound,

    #[error(
        "Persisted corpus is inconsistent: {detail}\nSuggestion: Run 'tickrag index --force' to rebuild the index"
    )]
    CorpusInconsistency { detail: String },

    #[error(
        "Persisted index was built with model '{found}' but '{expected}' is configured\nSuggestion: The index will be rebuilt with the configured model"
    )]
    ModelMismatch { expected: String, found: String },

    #[error(
        "documents.json does not match the checksum recorded in metadata.json\nSuggestion: Run 'tickrag index --force' to rebuild the index"
    )]
    ChecksumMismatch,

    #[error("Storage error: {message}\nSuggestion: {suggestion}")]
    Storage { message: String, suggestion: String },

    #[error(transparent)]
    Vector(#[from] VectorError),
}

impl SemanticError {
    pub(crate) fn storage(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    pub(crate) fn inconsistent(detail: impl Into<String>) -> Self {
        Self::CorpusInconsistency {
            detail: detail.into(),
        }
    }
}

impl From<VectorStorageError> for SemanticError {
    fn from(e: VectorStorageError) -> Self {
        match e {
            VectorStorageError::Vector(e) => Self::Vector(e),
            VectorStorageError::Io(e) => Self::storage(
                format!("Vector matrix I/O failed: {e}"),
                "Check disk space and file permissions in the index directory",
            ),
            other => Self::inconsistent(other.to_string()),
        }
    }
}
