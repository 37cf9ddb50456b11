//! Company records and the documents rendered from them.
//!
//! Records come from a [`RecordSource`]; [`DocumentBuilder`] turns each one
//! into a profile and a sector-analysis document for the index.

mod document;
mod record;
mod source;

pub use document::{Document, DocumentBuilder, DocumentType, MISSING};
pub use record::SourceRecord;
pub use source::{
    EmbeddedSource, JsonFileSource, RecordSource, SourceError, fallback_records, load_records,
};
