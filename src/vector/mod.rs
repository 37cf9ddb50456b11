//! Vector search primitives for the retrieval index.
//!
//! This module provides the embedding adapter, the exact inner-product index
//! and the memory-mapped matrix file the index is persisted to.
//!
//! # Architecture
//! Every stored and query vector is L2-normalized, so the inner product the
//! index computes is cosine similarity. Rows are positional: row `i` of the
//! index always belongs to document `i` of the corpus that built it.

mod embedding;
mod index;
mod storage;
mod types;

// Re-export core types for public API
#[cfg(test)]
pub use embedding::MockEmbeddingGenerator;
pub use embedding::{
    EmbeddingGenerator, FastEmbedGenerator, model_to_string, parse_embedding_model,
};
pub use index::VectorIndex;
pub use storage::{MmapVectorStorage, VECTORS_FILE, VectorStorageError};
pub use types::{
    NORM_TOLERANCE, Score, VECTOR_DIMENSION_384, VectorDimension, VectorError, inner_product,
    l2_norm, normalize_l2,
};
