//! End-to-end retrieval with the real sentence-embedding model.

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use tickrag::corpus::EmbeddedSource;
use tickrag::semantic::{RetrievalService, ServiceConfig, ServiceState};
use tickrag::vector::{EmbeddingGenerator, FastEmbedGenerator, VECTOR_DIMENSION_384};

/// Unique model cache per test run to avoid lock contention between tests.
fn get_test_cache_dir(test_name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "tickrag_test_fastembed_{}_{}",
        test_name,
        std::process::id()
    ))
}

#[test]
#[ignore = "Downloads 86MB model - run with --ignored for real model checks"]
fn test_fallback_corpus_with_minilm() -> Result<()> {
    let cache_dir = get_test_cache_dir("fallback_corpus");
    let generator = FastEmbedGenerator::new("AllMiniLML6V2", &cache_dir, false)?;
    assert_eq!(generator.dimension().get(), VECTOR_DIMENSION_384);

    let index = TempDir::new()?;
    let service = Arc::new(RetrievalService::with_embedder(
        ServiceConfig::new(index.path().join("index")),
        Arc::new(generator),
        Arc::new(EmbeddedSource),
    ));
    assert_eq!(service.initialize_blocking(), ServiceState::Ready);
    assert_eq!(service.get_status().total_documents, 40);

    let results = service.search("iPhone maker headquartered in Cupertino", 3);
    assert_eq!(results[0].document.symbol, "AAPL");

    let context = service.get_context("large banks and financial services");
    assert!(context.contains("JPMorgan") || context.contains("Bank of America"));

    let _ = std::fs::remove_dir_all(&cache_dir);
    Ok(())
}
