//! Where company records come from.
//!
//! The cached constituents list is the source of truth. When it cannot be
//! read, a small embedded list keeps the index build from failing outright.

use std::path::PathBuf;

use thiserror::Error;

use super::SourceRecord;

/// Errors raised while fetching records.
///
/// Never surfaced past [`load_records`], which recovers with the embedded list.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error(
        "Record source unavailable: {path}: {source}\nSuggestion: Place a constituents list at this path or rely on the built-in fallback list"
    )]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse records from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A provider of company records.
pub trait RecordSource: Send + Sync {
    fn fetch(&self) -> Result<Vec<SourceRecord>, SourceError>;

    /// Short label used in log lines.
    fn describe(&self) -> String;
}

/// Reads the cached JSON array of records.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonFileSource {
    fn fetch(&self) -> Result<Vec<SourceRecord>, SourceError> {
        let content =
            std::fs::read_to_string(&self.path).map_err(|source| SourceError::Unavailable {
                path: self.path.clone(),
                source,
            })?;
        serde_json::from_str(&content).map_err(|source| SourceError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// The built-in list of large-cap constituents.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedSource;

impl RecordSource for EmbeddedSource {
    fn fetch(&self) -> Result<Vec<SourceRecord>, SourceError> {
        Ok(fallback_records())
    }

    fn describe(&self) -> String {
        "built-in fallback list".to_string()
    }
}

/// Fetches records from `source`, substituting the embedded list when the
/// source fails or has nothing usable.
pub fn load_records(source: &dyn RecordSource) -> Vec<SourceRecord> {
    match source.fetch() {
        Ok(records) => {
            let total = records.len();
            let records: Vec<SourceRecord> = records.into_iter().filter(|r| r.is_valid()).collect();
            if records.len() < total {
                tracing::warn!(
                    skipped = total - records.len(),
                    "dropping records without a symbol"
                );
            }
            if records.is_empty() {
                tracing::warn!(
                    source = %source.describe(),
                    "record source is empty, using built-in fallback list"
                );
                fallback_records()
            } else {
                tracing::info!(source = %source.describe(), count = records.len(), "loaded records");
                records
            }
        }
        Err(e) => {
            tracing::warn!(
                source = %source.describe(),
                error = %e,
                "record source unavailable, using built-in fallback list"
            );
            fallback_records()
        }
    }
}

const FALLBACK: [(&str, &str, &str, &str, &str, &str, &str); 20] = [
    ("AAPL", "Apple Inc.", "Information Technology", "Technology Hardware, Storage & Peripherals", "Cupertino, California", "1982-11-30", "1976"),
    ("MSFT", "Microsoft Corporation", "Information Technology", "Systems Software", "Redmond, Washington", "1994-06-01", "1975"),
    ("GOOGL", "Alphabet Inc. (Class A)", "Communication Services", "Interactive Media & Services", "Mountain View, California", "2014-04-03", "1998"),
    ("AMZN", "Amazon.com Inc.", "Consumer Discretionary", "Broadline Retail", "Seattle, Washington", "2005-11-18", "1994"),
    ("NVDA", "NVIDIA Corporation", "Information Technology", "Semiconductors", "Santa Clara, California", "2001-11-30", "1993"),
    ("META", "Meta Platforms Inc.", "Communication Services", "Interactive Media & Services", "Menlo Park, California", "2013-12-23", "2004"),
    ("BRK-B", "Berkshire Hathaway Inc.", "Financials", "Multi-Sector Holdings", "Omaha, Nebraska", "2010-02-16", "1839"),
    ("JPM", "JPMorgan Chase & Co.", "Financials", "Diversified Banks", "New York City, New York", "1975-06-30", "1799"),
    ("TSLA", "Tesla Inc.", "Consumer Discretionary", "Automobile Manufacturers", "Austin, Texas", "2020-12-21", "2003"),
    ("V", "Visa Inc.", "Financials", "Transaction & Payment Processing Services", "San Francisco, California", "2009-12-21", "1958"),
    ("JNJ", "Johnson & Johnson", "Health Care", "Pharmaceuticals", "New Brunswick, New Jersey", "1973-06-30", "1886"),
    ("WMT", "Walmart Inc.", "Consumer Staples", "Consumer Staples Merchandise Retail", "Bentonville, Arkansas", "1982-08-31", "1962"),
    ("UNH", "UnitedHealth Group", "Health Care", "Managed Health Care", "Minnetonka, Minnesota", "1994-07-01", "1977"),
    ("XOM", "Exxon Mobil Corporation", "Energy", "Integrated Oil & Gas", "Spring, Texas", "1957-03-04", "1999"),
    ("PG", "Procter & Gamble", "Consumer Staples", "Household Products", "Cincinnati, Ohio", "1957-03-04", "1837"),
    ("MA", "Mastercard Inc.", "Financials", "Transaction & Payment Processing Services", "Purchase, New York", "2008-07-18", "1966"),
    ("HD", "The Home Depot", "Consumer Discretionary", "Home Improvement Retail", "Atlanta, Georgia", "1988-03-31", "1978"),
    ("CVX", "Chevron Corporation", "Energy", "Integrated Oil & Gas", "San Ramon, California", "1957-03-04", "1879"),
    ("LLY", "Eli Lilly and Company", "Health Care", "Pharmaceuticals", "Indianapolis, Indiana", "1970-08-31", "1876"),
    ("ABBV", "AbbVie Inc.", "Health Care", "Pharmaceuticals", "North Chicago, Illinois", "2012-12-31", "2013"),
];

/// The embedded constituents list.
#[must_use]
pub fn fallback_records() -> Vec<SourceRecord> {
    FALLBACK
        .iter()
        .map(|&(symbol, name, sector, sub_industry, hq, added, founded)| {
            SourceRecord::new(symbol, name, sector, sub_industry)
                .with_headquarters(hq)
                .with_date_added(added)
                .with_founded(founded)
        })
        .collect()
}
