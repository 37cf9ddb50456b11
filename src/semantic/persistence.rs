//! On-disk storage for a built corpus.
//!
//! Three co-located artifacts make up a saved corpus:
//! - `vectors.bin`: the normalized vector matrix, row order = document order
//! - `documents.json`: the document list
//! - `metadata.json`: model, row count and a checksum of `documents.json`
//!
//! Each file is written to a temporary sibling and renamed into place.
//! `metadata.json` goes last, so a save interrupted half-way is detected as
//! an incomplete set rather than loaded.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::corpus::Document;
use crate::semantic::{Corpus, IndexMetadata, METADATA_FILE, SemanticError};
use crate::vector::{MmapVectorStorage, VECTORS_FILE, VectorDimension};

pub const DOCUMENTS_FILE: &str = "documents.json";

/// One artifact file and its size on disk, if present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactState {
    pub name: &'static str,
    pub bytes: Option<u64>,
}

/// What is on disk, read without loading the model or the matrix.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexSummary {
    pub path: PathBuf,
    pub complete: bool,
    pub artifacts: Vec<ArtifactState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<IndexMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata_error: Option<String>,
}

/// Saves and loads a [`Corpus`] under one directory.
#[derive(Debug, Clone)]
pub struct CorpusStore {
    dir: PathBuf,
    vectors: MmapVectorStorage,
}

impl CorpusStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let vectors = MmapVectorStorage::new(&dir);
        Self { dir, vectors }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Whether a complete save is present.
    #[must_use]
    pub fn exists(&self) -> bool {
        IndexMetadata::exists(&self.dir)
            && self.vectors.exists()
            && self.dir.join(DOCUMENTS_FILE).exists()
    }

    /// Writes all artifacts for `corpus`, replacing any previous save.
    pub fn save(
        &self,
        corpus: &Corpus,
        model_name: &str,
        dimension: VectorDimension,
    ) -> Result<IndexMetadata, SemanticError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| {
            SemanticError::storage(
                format!("Failed to create index directory {}: {e}", self.dir.display()),
                "Check permissions for the configured index_path",
            )
        })?;

        // Drop the commit marker first so a crash mid-save never pairs old
        // metadata with new vectors.
        remove_if_present(&self.dir.join(METADATA_FILE))?;

        self.vectors.write_index(corpus.index(), dimension)?;

        let documents_json = serde_json::to_vec_pretty(corpus.documents()).map_err(|e| {
            SemanticError::storage(
                format!("Failed to serialize documents: {e}"),
                "This is likely a bug in the code",
            )
        })?;
        write_atomic(&self.dir.join(DOCUMENTS_FILE), &documents_json)?;

        let metadata =
            IndexMetadata::new(model_name, dimension.get(), corpus.len(), &documents_json);
        metadata.save(&self.dir)?;

        tracing::info!(
            path = %self.dir.display(),
            documents = corpus.len(),
            model = model_name,
            "saved index"
        );
        Ok(metadata)
    }

    /// Loads a saved corpus built by `model_name` with vectors of `dimension`.
    ///
    /// # Errors
    /// - [`SemanticError::NotFound`] when no artifact exists
    /// - [`SemanticError::CorpusInconsistency`] for a partial set or mismatched row counts
    /// - [`SemanticError::ModelMismatch`] when a different model built the index
    /// - [`SemanticError::ChecksumMismatch`] when `documents.json` was altered
    pub fn load(
        &self,
        model_name: &str,
        dimension: VectorDimension,
    ) -> Result<(Corpus, IndexMetadata), SemanticError> {
        let documents_path = self.dir.join(DOCUMENTS_FILE);
        let present = [
            (METADATA_FILE, IndexMetadata::exists(&self.dir)),
            (VECTORS_FILE, self.vectors.exists()),
            (DOCUMENTS_FILE, documents_path.exists()),
        ];
        if present.iter().all(|(_, exists)| !exists) {
            return Err(SemanticError::NotFound);
        }
        let missing: Vec<&str> = present
            .iter()
            .filter(|(_, exists)| !exists)
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(SemanticError::inconsistent(format!(
                "missing {}",
                missing.join(", ")
            )));
        }

        let metadata = IndexMetadata::load(&self.dir)?;
        if metadata.model_name != model_name {
            return Err(SemanticError::ModelMismatch {
                expected: model_name.to_string(),
                found: metadata.model_name,
            });
        }
        if metadata.dimension != dimension.get() {
            return Err(SemanticError::ModelMismatch {
                expected: format!("{model_name} ({dimension} dimensions)"),
                found: format!("{} ({} dimensions)", metadata.model_name, metadata.dimension),
            });
        }

        let documents_json = std::fs::read(&documents_path).map_err(|e| {
            SemanticError::storage(
                format!("Failed to read {}: {e}", documents_path.display()),
                "Check file permissions in the index directory",
            )
        })?;
        if !metadata.matches_documents(&documents_json) {
            return Err(SemanticError::ChecksumMismatch);
        }
        let documents: Vec<Document> = serde_json::from_slice(&documents_json)
            .map_err(|e| SemanticError::inconsistent(format!("documents.json is unreadable: {e}")))?;

        let index = self.vectors.read_index()?;
        if index.dimension() != Some(dimension) {
            return Err(SemanticError::inconsistent(format!(
                "vector matrix has dimension {:?}, metadata records {}",
                index.dimension().map(|d| d.get()),
                metadata.dimension
            )));
        }
        if metadata.document_count != documents.len() {
            return Err(SemanticError::inconsistent(format!(
                "metadata records {} documents, documents.json holds {}",
                metadata.document_count,
                documents.len()
            )));
        }

        let corpus = Corpus::from_parts(documents, index)?;
        tracing::info!(
            path = %self.dir.display(),
            documents = corpus.len(),
            "loaded index"
        );
        Ok((corpus, metadata))
    }

    /// Artifact sizes plus the saved metadata. Never touches the vectors.
    #[must_use]
    pub fn summary(&self) -> IndexSummary {
        let file_bytes = |name: &str| std::fs::metadata(self.dir.join(name)).ok().map(|m| m.len());
        let artifacts = vec![
            ArtifactState {
                name: VECTORS_FILE,
                bytes: self.vectors.file_size().ok(),
            },
            ArtifactState {
                name: DOCUMENTS_FILE,
                bytes: file_bytes(DOCUMENTS_FILE),
            },
            ArtifactState {
                name: METADATA_FILE,
                bytes: file_bytes(METADATA_FILE),
            },
        ];

        let (metadata, metadata_error) = if IndexMetadata::exists(&self.dir) {
            match IndexMetadata::load(&self.dir) {
                Ok(metadata) => (Some(metadata), None),
                Err(e) => (None, Some(e.to_string())),
            }
        } else {
            (None, None)
        };

        IndexSummary {
            path: self.dir.clone(),
            complete: artifacts.iter().all(|a| a.bytes.is_some()) && metadata.is_some(),
            artifacts,
            metadata,
            metadata_error,
        }
    }

    /// Removes every artifact. Missing files are not an error.
    pub fn clear(&self) -> Result<(), SemanticError> {
        remove_if_present(&self.dir.join(METADATA_FILE))?;
        remove_if_present(&self.dir.join(DOCUMENTS_FILE))?;
        remove_if_present(self.vectors.path())?;
        Ok(())
    }
}

/// Writes `bytes` to a temp file beside `path`, then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SemanticError> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let write_error = |e: std::io::Error| {
        SemanticError::storage(
            format!("Failed to write {}: {e}", path.display()),
            "Check disk space and file permissions",
        )
    };

    std::fs::create_dir_all(parent).map_err(write_error)?;
    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(write_error)?;
    temp.write_all(bytes).map_err(write_error)?;
    temp.as_file().sync_all().map_err(write_error)?;
    temp.persist(path).map_err(|e| write_error(e.error))?;
    Ok(())
}

fn remove_if_present(path: &Path) -> Result<(), SemanticError> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(SemanticError::storage(
            format!("Failed to remove {}: {e}", path.display()),
            "Check file permissions in the index directory",
        )),
        _ => Ok(()),
    }
}
