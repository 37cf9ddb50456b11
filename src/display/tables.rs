//! Table formatting utilities for structured output.

use comfy_table::{
    Attribute, Cell, CellAlignment, ContentArrangement, Table, modifiers::UTF8_ROUND_CORNERS,
    presets::UTF8_FULL,
};

use crate::semantic::{IndexSummary, SearchResult, Status};

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        // Apply rounded corners
        table.apply_modifier(UTF8_ROUND_CORNERS);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Right-align the given columns, e.g. ranks and scores.
    pub fn right_align(&mut self, columns: &[usize]) {
        for &index in columns {
            if let Some(column) = self.table.column_mut(index) {
                column.set_cell_alignment(CellAlignment::Right);
            }
        }
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

/// Ranked search results, one row per document.
pub fn create_results_table(results: &[SearchResult]) -> String {
    let mut builder = TableBuilder::new().set_headers(vec!["#", "Score", "Symbol", "Type", "Text"]);
    builder.right_align(&[0, 1]);

    for (rank, result) in results.iter().enumerate() {
        builder = builder.add_row(vec![
            (rank + 1).to_string(),
            format!("{:.4}", result.score),
            result.document.symbol.clone(),
            result.document.doc_type.to_string(),
            result.document.text.clone(),
        ]);
    }

    builder.build()
}

/// Health snapshot as a two-column table.
pub fn create_status_table(status: &Status) -> String {
    let mut builder = TableBuilder::new()
        .set_headers(vec!["Field", "Value"])
        .add_row(vec!["State".to_string(), status.state.to_string()])
        .add_row(vec!["Initialized".to_string(), status.initialized.to_string()])
        .add_row(vec![
            "Documents".to_string(),
            status.total_documents.to_string(),
        ])
        .add_row(vec!["Index rows".to_string(), status.index_size.to_string()]);

    if let Some(code) = &status.error_code {
        builder = builder.add_row(vec!["Error code".to_string(), code.clone()]);
    }
    if let Some(error) = &status.error {
        builder = builder.add_row(vec!["Error".to_string(), error.clone()]);
    }

    builder.build()
}

/// Saved artifacts and their metadata, as found on disk.
pub fn create_index_table(summary: &IndexSummary) -> String {
    let mut builder = TableBuilder::new()
        .set_headers(vec!["Field", "Value"])
        .add_row(vec!["Path".to_string(), summary.path.display().to_string()])
        .add_row(vec!["Complete".to_string(), summary.complete.to_string()]);

    for artifact in &summary.artifacts {
        let size = artifact
            .bytes
            .map_or_else(|| "missing".to_string(), |b| format!("{b} bytes"));
        builder = builder.add_row(vec![artifact.name.to_string(), size]);
    }

    if let Some(metadata) = &summary.metadata {
        let created = chrono::DateTime::from_timestamp(metadata.created_at as i64, 0)
            .map_or_else(|| metadata.created_at.to_string(), |t| t.to_rfc3339());
        builder = builder
            .add_row(vec!["Model".to_string(), metadata.model_name.clone()])
            .add_row(vec!["Dimension".to_string(), metadata.dimension.to_string()])
            .add_row(vec![
                "Documents".to_string(),
                metadata.document_count.to_string(),
            ])
            .add_row(vec!["Created".to_string(), created]);
    }
    if let Some(error) = &summary.metadata_error {
        builder = builder.add_row(vec!["Metadata error".to_string(), error.clone()]);
    }

    builder.build()
}
