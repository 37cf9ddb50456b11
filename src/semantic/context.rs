//! Turning ranked results into a context block for a language model.

use std::collections::HashSet;

use crate::semantic::SearchResult;

/// Keeps the first (highest-ranked) result per symbol, preserving order.
#[must_use]
pub fn dedup_by_symbol(results: Vec<SearchResult>) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|r| seen.insert(r.document.symbol.clone()))
        .collect()
}

/// Header line naming the knowledge base the entries come from.
#[must_use]
pub fn context_header(index_name: &str) -> String {
    format!("--- {index_name} Knowledge Base Results ---")
}

/// Formats deduplicated results as a header followed by `[n] text` entries,
/// separated by blank lines. Returns an empty string when there is nothing
/// to report.
#[must_use]
pub fn format_context(index_name: &str, results: Vec<SearchResult>) -> String {
    let entries = dedup_by_symbol(results);
    if entries.is_empty() {
        return String::new();
    }

    let mut parts = Vec::with_capacity(entries.len() + 1);
    parts.push(context_header(index_name));
    parts.extend(
        entries
            .iter()
            .enumerate()
            .map(|(i, r)| format!("[{}] {}", i + 1, r.document.text)),
    );
    parts.join("\n\n")
}
