//! Two-company corpus: ranking, deduplication and context formatting.

use std::sync::Arc;

use crate::common::{CountingSource, TestWorkspace, aapl_msft};
use tickrag::corpus::DocumentType;
use tickrag::semantic::ServiceState;

#[test]
fn test_aapl_profile_ranks_first_for_california_technology() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    assert_eq!(service.initialize_blocking(), ServiceState::Ready);

    let status = service.get_status();
    assert_eq!(status.total_documents, 4);
    assert_eq!(status.index_size, 4);

    let results = service.search("technology company in California", 4);
    assert_eq!(results.len(), 4);

    let top = &results[0];
    assert_eq!(top.document.symbol, "AAPL");
    assert_eq!(top.document.doc_type, DocumentType::Profile);
    assert!(top.document.text.contains("Cupertino, California"));

    for msft in results.iter().filter(|r| r.document.symbol == "MSFT") {
        assert!(top.score > msft.score);
    }
    assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    assert!(results.iter().all(|r| (-1.0..=1.0).contains(&r.score)));
}

#[test]
fn test_context_has_one_entry_per_symbol() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    service.initialize_blocking();

    let context = service.get_context_with_limit("technology company in California", 4);
    let entries: Vec<&str> = context.split("\n\n").collect();

    assert_eq!(entries[0], "--- S&P 500 Knowledge Base Results ---");
    assert_eq!(entries.len(), 3);
    assert!(entries[1].starts_with("[1] Apple Inc. (Ticker: AAPL)"));
    assert!(entries[2].starts_with("[2] Microsoft Corporation (Ticker: MSFT)"));
    assert_eq!(context.matches("(Ticker: AAPL)").count(), 1);
    assert_eq!(context.matches("Consider AAPL").count(), 0);
}

#[test]
fn test_search_is_deterministic() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    service.initialize_blocking();

    let first = service.search("software company in Washington", 3);
    let second = service.search("software company in Washington", 3);
    assert_eq!(first, second);
    assert_eq!(first[0].document.symbol, "MSFT");
}

#[test]
fn test_limit_larger_than_corpus() {
    let workspace = TestWorkspace::new();
    let service = workspace.service(Arc::new(CountingSource::new(aapl_msft())));
    service.initialize_blocking();

    assert_eq!(service.search("technology", 50).len(), 4);
    assert!(service.search("technology", 0).is_empty());
    assert_eq!(service.get_context_with_limit("technology", 0), "");
}

#[test]
fn test_empty_source_uses_fallback_list() {
    let workspace = TestWorkspace::new();
    let source = Arc::new(CountingSource::new(Vec::new()));
    let service = workspace.service(source.clone());

    assert_eq!(service.initialize_blocking(), ServiceState::Ready);
    assert_eq!(source.fetches(), 1);
    assert_eq!(service.get_status().total_documents, 40);

    let results = service.search("energy oil sector", 2);
    assert!(
        results
            .iter()
            .all(|r| r.document.symbol == "XOM" || r.document.symbol == "CVX")
    );
}
