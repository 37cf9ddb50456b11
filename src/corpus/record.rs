//! Structured company records that documents are rendered from.

use serde::{Deserialize, Deserializer, Serialize};

/// One listed company.
///
/// Deserializes from the cached constituents list. Optional attributes that
/// are blank or hold the literal `nan` (as scraped tables often do) are
/// treated as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRecord {
    pub symbol: String,
    pub name: String,
    pub sector: String,
    pub sub_industry: String,
    #[serde(default, deserialize_with = "optional_attribute")]
    pub headquarters: Option<String>,
    #[serde(default, deserialize_with = "optional_attribute")]
    pub date_added: Option<String>,
    #[serde(default, deserialize_with = "optional_attribute")]
    pub founded: Option<String>,
}

impl SourceRecord {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        sector: impl Into<String>,
        sub_industry: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
            sector: sector.into(),
            sub_industry: sub_industry.into(),
            headquarters: None,
            date_added: None,
            founded: None,
        }
    }

    #[must_use]
    pub fn with_headquarters(mut self, headquarters: impl Into<String>) -> Self {
        self.headquarters = clean(headquarters.into());
        self
    }

    #[must_use]
    pub fn with_date_added(mut self, date_added: impl Into<String>) -> Self {
        self.date_added = clean(date_added.into());
        self
    }

    #[must_use]
    pub fn with_founded(mut self, founded: impl Into<String>) -> Self {
        self.founded = clean(founded.into());
        self
    }

    /// A record without a symbol cannot be deduplicated or cited.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.symbol.trim().is_empty()
    }
}

fn clean(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") || trimmed == "N/A" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn optional_attribute<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => clean(s),
        Some(serde_json::Value::Number(n)) => clean(n.to_string()),
        _ => None,
    })
}
