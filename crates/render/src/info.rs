//! Document-level metadata shared by all renderers.

use chrono::{DateTime, Local};
use deck_core::RestructuredRecord;

/// Title written at the top of every document.
pub const DOCUMENT_TITLE: &str = "Presentation Knowledge Document";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// What the metadata block of a document shows.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    pub title: String,
    pub created: DateTime<Local>,
    pub slide_count: usize,
    /// Backend of the first record; `None` for an empty document.
    pub backend: Option<String>,
    pub model: Option<String>,
}

impl DocumentInfo {
    /// Metadata for `records`, timestamped now.
    pub fn from_records(records: &[RestructuredRecord]) -> Self {
        let first = records.first();
        Self {
            title: DOCUMENT_TITLE.to_string(),
            created: Local::now(),
            slide_count: records.len(),
            backend: first.map(|r| r.provenance.backend.clone()),
            model: first.map(|r| r.provenance.model.clone()),
        }
    }

    /// Generation time as shown in documents.
    pub fn generated_at(&self) -> String {
        self.created.format(TIMESTAMP_FORMAT).to_string()
    }
}
