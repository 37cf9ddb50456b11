//! Errors recorded when the retrieval service fails to initialize.
//!
//! These never reach query paths: the service stores the error, reports it
//! through its status, and answers queries with empty context.

use thiserror::Error;

use crate::semantic::SemanticError;
use crate::vector::VectorError;

/// Why initialization ended in the `Failed` state.
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Embedding model unavailable: {0}")]
    ModelUnavailable(#[source] VectorError),

    #[error("Failed to build the index: {0}")]
    Build(#[source] SemanticError),

    #[error("Failed to persist the index: {0}")]
    Persist(#[source] SemanticError),

    #[error("Initialization task did not complete: {0}")]
    Aborted(String),
}

impl InitError {
    /// Get a status code for this error type
    pub fn status_code(&self) -> String {
        match self {
            Self::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            Self::Build(_) => "INDEX_BUILD_FAILED",
            Self::Persist(_) => "INDEX_PERSIST_FAILED",
            Self::Aborted(_) => "INIT_ABORTED",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::ModelUnavailable(_) => vec![
                "Check that semantic.model names a supported fastembed model",
                "The first run downloads the model; check network access and the model cache directory",
            ],
            Self::Build(_) => vec![
                "Run 'tickrag index --force' to rebuild from scratch",
                "Run with RUST_LOG=debug to see which batch failed",
            ],
            Self::Persist(_) => vec![
                "Check disk space and permissions for the configured index_path",
                "Run 'tickrag index --force' once the directory is writable",
            ],
            Self::Aborted(_) => vec!["Restart the process to retry initialization"],
        }
    }
}
