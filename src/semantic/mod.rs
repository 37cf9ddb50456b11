//! Semantic retrieval over the company corpus.
//!
//! [`Corpus`] pairs documents with their vectors, [`CorpusStore`] persists
//! it, and [`RetrievalService`] manages the one-time build-or-load and
//! answers queries.

mod context;
mod corpus;
mod error;
mod metadata;
mod persistence;
mod service;

pub use context::{context_header, dedup_by_symbol, format_context};
pub use corpus::{Corpus, SearchResult};
pub use error::SemanticError;
pub use metadata::{IndexMetadata, METADATA_FILE};
pub use persistence::{ArtifactState, CorpusStore, DOCUMENTS_FILE, IndexSummary};
pub use service::{ModelLoader, RetrievalService, ServiceConfig, ServiceState, Status};
