#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tempfile::TempDir;
use tickrag::corpus::{RecordSource, SourceError, SourceRecord};
use tickrag::semantic::{RetrievalService, ServiceConfig};
use tickrag::vector::{EmbeddingGenerator, VectorDimension, VectorError};

/// Deterministic embedder: one axis per keyword plus a constant bias axis.
///
/// Texts sharing vocabulary land close together, which is enough to check
/// ranking, deduplication and persistence without a real model.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub const VOCABULARY: [&'static str; 15] = [
        "technology",
        "california",
        "washington",
        "software",
        "hardware",
        "financials",
        "bank",
        "energy",
        "oil",
        "health",
        "pharmaceuticals",
        "retail",
        "company",
        "investors",
        "sector",
    ];

    pub fn new() -> Self {
        Self {
            vocabulary: Self::VOCABULARY.to_vec(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `generate_embeddings` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.vocabulary.len() + 1];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            if let Some(axis) = self.vocabulary.iter().position(|w| *w == token) {
                vector[axis] += 1.0;
            }
        }
        vector[self.vocabulary.len()] = 0.1;
        vector
    }
}

impl EmbeddingGenerator for KeywordEmbedder {
    fn generate_embeddings(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, VectorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> VectorDimension {
        VectorDimension::new(self.vocabulary.len() + 1).unwrap()
    }

    fn model_name(&self) -> &str {
        "KeywordEmbedder"
    }
}

/// Fixed records that count how often they are fetched.
pub struct CountingSource {
    records: Vec<SourceRecord>,
    fetches: AtomicUsize,
}

impl CountingSource {
    pub fn new(records: Vec<SourceRecord>) -> Self {
        Self {
            records,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl RecordSource for CountingSource {
    fn fetch(&self) -> Result<Vec<SourceRecord>, SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("{} fixture records", self.records.len())
    }
}

pub fn apple() -> SourceRecord {
    SourceRecord::new(
        "AAPL",
        "Apple Inc.",
        "Information Technology",
        "Technology Hardware, Storage & Peripherals",
    )
    .with_headquarters("Cupertino, California")
    .with_date_added("1982-11-30")
    .with_founded("1976")
}

pub fn microsoft() -> SourceRecord {
    SourceRecord::new(
        "MSFT",
        "Microsoft Corporation",
        "Information Technology",
        "Systems Software",
    )
    .with_headquarters("Redmond, Washington")
    .with_date_added("1994-06-01")
    .with_founded("1975")
}

pub fn aapl_msft() -> Vec<SourceRecord> {
    vec![apple(), microsoft()]
}

/// Temporary directory holding an index.
pub struct TestWorkspace {
    pub dir: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn index_dir(&self) -> PathBuf {
        self.dir.path().join("index")
    }

    pub fn config(&self) -> ServiceConfig {
        ServiceConfig::new(self.index_dir())
    }

    /// Service over `source` with a fresh keyword embedder.
    pub fn service(&self, source: Arc<dyn RecordSource>) -> Arc<RetrievalService> {
        Arc::new(RetrievalService::with_embedder(
            self.config(),
            Arc::new(KeywordEmbedder::new()),
            source,
        ))
    }
}
