//! The document list and vector index, kept row-for-row in step.

use serde::Serialize;

use crate::corpus::Document;
use crate::semantic::SemanticError;
use crate::vector::{EmbeddingGenerator, Score, VectorDimension, VectorError, VectorIndex};

/// A document paired with its similarity to a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(flatten)]
    pub document: Document,
    /// Cosine similarity in `[-1, 1]`, higher is more relevant.
    pub score: f32,
}

/// Documents and their embeddings.
///
/// Document `i` is always described by row `i` of the index. Both halves are
/// only ever set together, through constructors that check their lengths.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    documents: Vec<Document>,
    index: VectorIndex,
}

impl Corpus {
    /// An empty corpus that answers every query with no results.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Pairs `documents` with an already built `index`.
    pub fn from_parts(documents: Vec<Document>, index: VectorIndex) -> Result<Self, SemanticError> {
        if documents.len() != index.row_count() {
            return Err(SemanticError::inconsistent(format!(
                "{} documents but {} vector rows",
                documents.len(),
                index.row_count()
            )));
        }
        Ok(Self { documents, index })
    }

    /// Embeds `documents` in batches of `batch_size` and indexes the vectors.
    pub fn build(
        documents: Vec<Document>,
        embedder: &dyn EmbeddingGenerator,
        batch_size: usize,
    ) -> Result<Self, SemanticError> {
        let mut index = VectorIndex::with_dimension(embedder.dimension());
        let batch_size = batch_size.max(1);
        let batches = documents.len().div_ceil(batch_size);

        for (batch, chunk) in documents.chunks(batch_size).enumerate() {
            let texts: Vec<&str> = chunk.iter().map(|d| d.text.as_str()).collect();
            let vectors = embedder.generate_embeddings(&texts)?;
            if vectors.len() != texts.len() {
                return Err(VectorError::EmbeddingFailed(format!(
                    "model returned {} embeddings for {} texts",
                    vectors.len(),
                    texts.len()
                ))
                .into());
            }
            index.build(&vectors)?;
            tracing::debug!(batch = batch + 1, batches, rows = index.row_count(), "embedded batch");
        }

        Self::from_parts(documents, index)
    }

    /// Ranks documents against a raw query embedding.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>, SemanticError> {
        let hits = self.index.search(query, top_k)?;
        Ok(hits
            .into_iter()
            .filter_map(|(row, score): (usize, Score)| {
                self.documents.get(row).map(|document| SearchResult {
                    document: document.clone(),
                    score: score.get(),
                })
            })
            .collect())
    }

    #[must_use]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[must_use]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.index.dimension()
    }
}
