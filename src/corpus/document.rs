//! Rendering records into retrievable documents.

use serde::{Deserialize, Serialize};

use super::SourceRecord;

/// Placeholder rendered for a missing optional attribute.
pub const MISSING: &str = "N/A";

/// The angle a document describes its company from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Factual description: identity, classification, location, dates.
    #[serde(rename = "company_profile", alias = "profile")]
    Profile,
    /// Investment framing within the sector.
    SectorAnalysis,
}

impl DocumentType {
    pub const ALL: [DocumentType; 2] = [DocumentType::Profile, DocumentType::SectorAnalysis];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Profile => "company_profile",
            DocumentType::SectorAnalysis => "sector_analysis",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A retrievable unit of text with the identity of the company it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub text: String,
    pub symbol: String,
    pub name: String,
    pub sector: String,
    #[serde(rename = "type")]
    pub doc_type: DocumentType,
}

/// Renders every record into one document per [`DocumentType`].
#[derive(Debug, Clone)]
pub struct DocumentBuilder {
    index_name: String,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new("S&P 500")
    }
}

impl DocumentBuilder {
    /// `index_name` is the listing the prose says companies belong to.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }

    /// Documents for `records`, grouped by record in input order.
    ///
    /// Output is a pure function of the input, so rebuilding from the same
    /// records reproduces the same corpus.
    #[must_use]
    pub fn build(&self, records: &[SourceRecord]) -> Vec<Document> {
        records
            .iter()
            .flat_map(|record| {
                DocumentType::ALL
                    .iter()
                    .map(move |&doc_type| self.render(record, doc_type))
            })
            .collect()
    }

    /// Renders a single document.
    #[must_use]
    pub fn render(&self, record: &SourceRecord, doc_type: DocumentType) -> Document {
        let listing = &self.index_name;
        let SourceRecord {
            symbol,
            name,
            sector,
            sub_industry,
            ..
        } = record;
        let hq = record.headquarters.as_deref().unwrap_or(MISSING);

        let text = match doc_type {
            DocumentType::Profile => {
                let added = record.date_added.as_deref().unwrap_or(MISSING);
                let founded = record.founded.as_deref().unwrap_or(MISSING);
                format!(
                    "{name} (Ticker: {symbol}) is a company listed in the {listing} index. \
                     It operates in the {sector} sector within the {sub_industry} sub-industry. \
                     Headquartered in {hq}. Added to {listing}: {added}. Founded: {founded}."
                )
            }
            DocumentType::SectorAnalysis => format!(
                "For investors interested in the {sector} sector: {name} ({symbol}) operates in \
                 {sub_industry}. It is one of the {listing} constituents headquartered in {hq}. \
                 Consider {symbol} when looking at {sector} sector investments."
            ),
        };

        Document {
            text,
            symbol: symbol.clone(),
            name: name.clone(),
            sector: sector.clone(),
            doc_type,
        }
    }
}
