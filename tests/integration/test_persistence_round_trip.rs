//! Saving and reloading the corpus must not change any search result.

use std::sync::Arc;

use crate::common::{CountingSource, KeywordEmbedder, TestWorkspace, aapl_msft};
use tickrag::corpus::{DocumentBuilder, fallback_records};
use tickrag::semantic::{Corpus, CorpusStore, DOCUMENTS_FILE, METADATA_FILE, ServiceState};
use tickrag::vector::{EmbeddingGenerator, NORM_TOLERANCE, VECTORS_FILE, l2_norm};

const QUERY_TEXTS: [&str; 5] = [
    "technology company in California",
    "banks and financials",
    "oil and energy investors",
    "pharmaceuticals health sector",
    "retail",
];

#[test]
fn test_reloaded_corpus_reproduces_search_results() {
    let workspace = TestWorkspace::new();
    let embedder = KeywordEmbedder::new();
    let documents = DocumentBuilder::default().build(&fallback_records());
    let corpus = Corpus::build(documents, &embedder, 7).unwrap();

    let store = CorpusStore::new(workspace.index_dir());
    store
        .save(&corpus, embedder.model_name(), embedder.dimension())
        .unwrap();
    let (loaded, metadata) = store
        .load(embedder.model_name(), embedder.dimension())
        .unwrap();

    assert_eq!(metadata.document_count, 40);
    assert_eq!(loaded.len(), loaded.index().row_count());

    for text in QUERY_TEXTS {
        let query = embedder.embed(text);
        let before = corpus.search(&query, 10).unwrap();
        let after = loaded.search(&query, 10).unwrap();

        assert_eq!(before.len(), after.len(), "text {text}");
        for (b, a) in before.iter().zip(&after) {
            assert_eq!(b.document, a.document, "text {text}");
            assert!((b.score - a.score).abs() < 1e-6, "text {text}");
        }
    }
}

#[test]
fn test_stored_rows_are_unit_length() {
    let workspace = TestWorkspace::new();
    let embedder = KeywordEmbedder::new();
    let documents = DocumentBuilder::default().build(&aapl_msft());
    let corpus = Corpus::build(documents, &embedder, 64).unwrap();

    let store = CorpusStore::new(workspace.index_dir());
    store
        .save(&corpus, embedder.model_name(), embedder.dimension())
        .unwrap();
    let (loaded, _) = store
        .load(embedder.model_name(), embedder.dimension())
        .unwrap();

    for row in 0..loaded.index().row_count() {
        let norm = l2_norm(loaded.index().row(row).unwrap());
        assert!((norm - 1.0).abs() < NORM_TOLERANCE, "row {row} norm {norm}");
    }
}

#[test]
fn test_documents_json_keeps_row_order_and_shape() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    service.initialize_blocking();

    let json = std::fs::read_to_string(workspace.index_dir().join(DOCUMENTS_FILE)).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let rows = value.as_array().unwrap();

    assert_eq!(rows.len(), 4);
    let shape: Vec<(&str, &str)> = rows
        .iter()
        .map(|r| (r["symbol"].as_str().unwrap(), r["type"].as_str().unwrap()))
        .collect();
    assert_eq!(
        shape,
        vec![
            ("AAPL", "company_profile"),
            ("AAPL", "sector_analysis"),
            ("MSFT", "company_profile"),
            ("MSFT", "sector_analysis"),
        ]
    );
    for key in ["text", "symbol", "name", "sector", "type"] {
        assert!(rows[0].get(key).is_some(), "missing {key}");
    }
}

#[test]
fn test_restart_loads_instead_of_rebuilding() {
    let workspace = TestWorkspace::new();
    let first_source = Arc::new(CountingSource::new(aapl_msft()));
    let first = workspace.service(first_source.clone());
    first.initialize_blocking();
    assert_eq!(first_source.fetches(), 1);

    let second_source = Arc::new(CountingSource::new(aapl_msft()));
    let second = workspace.service(second_source.clone());
    assert_eq!(second.initialize_blocking(), ServiceState::Ready);
    assert_eq!(second_source.fetches(), 0);

    for text in QUERY_TEXTS {
        assert_eq!(first.search(text, 4), second.search(text, 4));
    }
}

#[test]
fn test_inconsistent_artifacts_trigger_rebuild() {
    let workspace = TestWorkspace::new();
    workspace
        .service(Arc::new(CountingSource::new(aapl_msft())))
        .initialize_blocking();

    // Lose the document list: vectors alone must never be served.
    std::fs::remove_file(workspace.index_dir().join(DOCUMENTS_FILE)).unwrap();

    let source = Arc::new(CountingSource::new(aapl_msft()));
    let service = workspace.service(source.clone());
    assert_eq!(service.initialize_blocking(), ServiceState::Ready);
    assert_eq!(source.fetches(), 1);
    assert_eq!(service.get_status().total_documents, 4);

    for file in [DOCUMENTS_FILE, METADATA_FILE, VECTORS_FILE] {
        assert!(workspace.index_dir().join(file).exists(), "missing {file}");
    }
}

#[test]
fn test_changed_model_triggers_rebuild() {
    let workspace = TestWorkspace::new();
    let store = CorpusStore::new(workspace.index_dir());

    let embedder = KeywordEmbedder::new();
    let documents = DocumentBuilder::default().build(&aapl_msft());
    let corpus = Corpus::build(documents, &embedder, 64).unwrap();
    store
        .save(&corpus, "SomeOtherModel", embedder.dimension())
        .unwrap();

    let source = Arc::new(CountingSource::new(aapl_msft()));
    let service = workspace.service(source.clone());
    assert_eq!(service.initialize_blocking(), ServiceState::Ready);
    assert_eq!(source.fetches(), 1);

    let (_, metadata) = store
        .load(embedder.model_name(), embedder.dimension())
        .unwrap();
    assert_eq!(metadata.model_name, "KeywordEmbedder");
}

/// Saves an index, lets `corrupt` rewrite `vectors.bin`, then restarts.
fn restart_after_corrupting(corrupt: impl FnOnce(&mut Vec<u8>)) {
    let workspace = TestWorkspace::new();
    workspace
        .service(Arc::new(CountingSource::new(aapl_msft())))
        .initialize_blocking();

    let vectors_path = workspace.index_dir().join(VECTORS_FILE);
    let mut bytes = std::fs::read(&vectors_path).unwrap();
    corrupt(&mut bytes);
    std::fs::write(&vectors_path, &bytes).unwrap();

    let source = Arc::new(CountingSource::new(aapl_msft()));
    let service = workspace.service(source.clone());
    assert_eq!(service.initialize_blocking(), ServiceState::Ready);
    assert_eq!(source.fetches(), 1, "corrupt matrix must trigger a rebuild");
    assert_eq!(service.search("technology company in California", 4).len(), 4);
    assert!(!service.get_context("technology").is_empty());
}

#[test]
fn test_oversized_vector_header_triggers_rebuild() {
    restart_after_corrupting(|bytes| {
        bytes[8..12].copy_from_slice(&u32::MAX.to_le_bytes());
        bytes[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
    });
}

#[test]
fn test_nan_in_vector_matrix_triggers_rebuild() {
    restart_after_corrupting(|bytes| {
        bytes[16..20].copy_from_slice(&f32::NAN.to_le_bytes());
    });
}
