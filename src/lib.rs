/// The main library module for tickrag
pub mod config;
pub mod corpus;
pub mod display;
pub mod error;
pub mod semantic;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use corpus::{Document, DocumentBuilder, DocumentType, RecordSource, SourceRecord};
pub use error::InitError;
pub use semantic::{
    Corpus, CorpusStore, RetrievalService, SearchResult, SemanticError, ServiceConfig,
    ServiceState, Status,
};
pub use vector::{EmbeddingGenerator, VectorError, VectorIndex};
