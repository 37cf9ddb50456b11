//! State machine behavior: one initialization, graceful empty answers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use crate::common::{CountingSource, KeywordEmbedder, TestWorkspace, aapl_msft};
use tickrag::semantic::{RetrievalService, ServiceState};
use tickrag::vector::{EmbeddingGenerator, VectorError};

#[test]
fn test_concurrent_initialize_runs_once() {
    let workspace = TestWorkspace::new();
    let loads = Arc::new(AtomicUsize::new(0));
    let source = Arc::new(CountingSource::new(aapl_msft()));

    let counter = Arc::clone(&loads);
    let service = Arc::new(RetrievalService::new(
        workspace.config(),
        Box::new(move || -> Result<Arc<dyn EmbeddingGenerator>, VectorError> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(KeywordEmbedder::new()))
        }),
        source.clone(),
    ));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let service = Arc::clone(&service);
            thread::spawn(move || {
                if i % 2 == 0 {
                    service.initialize();
                }
                service.initialize_blocking()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), ServiceState::Ready);
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(source.fetches(), 1);
    assert_eq!(service.get_status().total_documents, 4);

    let mut files: Vec<String> = std::fs::read_dir(workspace.index_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    files.sort();
    assert_eq!(files, vec!["documents.json", "metadata.json", "vectors.bin"]);
}

#[test]
fn test_uninitialized_service_answers_empty() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));

    assert_eq!(service.state(), ServiceState::Uninitialized);
    assert_eq!(service.get_context("technology company in California"), "");
    assert!(service.search("technology", 5).is_empty());

    let status = service.get_status();
    assert!(!status.initialized);
    assert_eq!(status.total_documents, 0);
    assert_eq!(status.index_size, 0);
}

#[test]
fn test_failed_service_answers_empty_and_reports_error() {
    let workspace = TestWorkspace::new();
    let source = Arc::new(CountingSource::new(aapl_msft()));
    let service = Arc::new(RetrievalService::new(
        workspace.config(),
        Box::new(|| -> Result<Arc<dyn EmbeddingGenerator>, VectorError> {
            Err(VectorError::ModelUnavailable(
                "all-MiniLM-L6-v2: network unreachable".to_string(),
            ))
        }),
        source.clone(),
    ));

    assert_eq!(service.initialize_blocking(), ServiceState::Failed);
    assert_eq!(service.get_context("technology"), "");
    assert_eq!(source.fetches(), 0);

    // Failed is terminal.
    service.initialize();
    assert_eq!(service.state(), ServiceState::Failed);

    let status = service.get_status();
    assert!(!status.initialized);
    assert!(status.error.unwrap().contains("network unreachable"));

    let json = serde_json::to_value(service.get_status()).unwrap();
    assert_eq!(json["state"], "failed");
    assert_eq!(json["initialized"], false);
    assert_eq!(json["error_code"], "MODEL_UNAVAILABLE");
}

#[test]
fn test_status_json_shape_when_ready() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    service.initialize_blocking();

    let json = serde_json::to_value(service.get_status()).unwrap();
    assert_eq!(json["initialized"], true);
    assert_eq!(json["total_documents"], 4);
    assert_eq!(json["index_size"], 4);
    assert_eq!(json["state"], "ready");
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn test_background_initialize_inside_runtime() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));

    service.initialize();
    service.initialize();
    assert_eq!(service.wait_ready().await, ServiceState::Ready);

    let context = service
        .get_context_async("technology company in California")
        .await;
    assert!(context.starts_with("--- S&P 500 Knowledge Base Results ---\n\n[1] Apple Inc."));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_queries_share_one_corpus() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    service.initialize();
    service.wait_ready().await;

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .get_context_async("software company in Washington")
                    .await
            })
        })
        .collect();

    let mut contexts = Vec::new();
    for task in tasks {
        contexts.push(task.await.unwrap());
    }
    assert!(contexts.iter().all(|c| c == &contexts[0]));
    assert!(contexts[0].contains("[1] Microsoft Corporation"));
}
