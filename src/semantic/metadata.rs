//! Metadata tracking for index persistence.
//!
//! `metadata.json` records which model produced the vectors, how many rows
//! were written and a checksum of the document list. It is written after the
//! other artifacts, so its presence marks a complete save.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::semantic::SemanticError;
use crate::semantic::persistence::write_atomic;

pub const METADATA_FILE: &str = "metadata.json";

/// Metadata for index persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Name of the embedding model used
    pub model_name: String,

    /// Dimension of embeddings
    pub dimension: usize,

    /// Number of documents, equal to the number of vector rows
    pub document_count: usize,

    /// Hex SHA-256 of the exact bytes of documents.json
    pub documents_sha256: String,

    /// Unix timestamp when created
    pub created_at: u64,

    /// Version of the metadata format
    pub version: u32,
}

impl IndexMetadata {
    /// Current metadata version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create new metadata with current timestamp
    pub fn new(
        model_name: impl Into<String>,
        dimension: usize,
        document_count: usize,
        documents_json: &[u8],
    ) -> Self {
        Self {
            model_name: model_name.into(),
            dimension,
            document_count,
            documents_sha256: checksum(documents_json),
            created_at: get_utc_timestamp(),
            version: Self::CURRENT_VERSION,
        }
    }

    /// Whether `documents_json` is the document list this metadata was written for.
    #[must_use]
    pub fn matches_documents(&self, documents_json: &[u8]) -> bool {
        self.documents_sha256 == checksum(documents_json)
    }

    /// Save metadata to a JSON file
    pub fn save(&self, dir: &Path) -> Result<(), SemanticError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| {
            SemanticError::storage(
                format!("Failed to serialize metadata: {e}"),
                "This is likely a bug in the code",
            )
        })?;
        write_atomic(&dir.join(METADATA_FILE), &json)
    }

    /// Load metadata from a JSON file
    pub fn load(dir: &Path) -> Result<Self, SemanticError> {
        let json = std::fs::read_to_string(dir.join(METADATA_FILE)).map_err(|e| {
            SemanticError::storage(
                format!("Failed to read metadata: {e}"),
                "Check if the index exists at the configured index_path",
            )
        })?;

        let metadata: Self = serde_json::from_str(&json).map_err(|e| {
            SemanticError::inconsistent(format!("metadata.json is unreadable: {e}"))
        })?;

        if metadata.version > Self::CURRENT_VERSION {
            return Err(SemanticError::storage(
                format!(
                    "Metadata version {} is newer than supported version {}",
                    metadata.version,
                    Self::CURRENT_VERSION
                ),
                "Upgrade tickrag or rebuild the index with this version",
            ));
        }

        Ok(metadata)
    }

    /// Check if metadata file exists
    pub fn exists(dir: &Path) -> bool {
        dir.join(METADATA_FILE).exists()
    }
}

fn checksum(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn get_utc_timestamp() -> u64 {
    chrono::Utc::now().timestamp() as u64
}
