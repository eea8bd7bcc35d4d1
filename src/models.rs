//! Core data models used throughout Docwell.
//!
//! These types represent the documents, chunks, citations, and QA records
//! that flow through the ingestion and question-answering pipelines.

use serde::{Deserialize, Serialize};

/// An ingested documentation file stored in SQLite.
///
/// Immutable after creation; removed only by explicit deletion, which
/// cascades to the document's chunks and vector index entries.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: String,
    pub name: String,
    /// `"openapi"` or `"markdown"`.
    pub doc_type: String,
    pub content: String,
    /// Unix seconds. Converted to ISO-8601 at the API edge.
    pub created_at: i64,
}

/// A retrievable segment of a document's text.
///
/// The fragment is a human-readable locator: `spec` for a whole-spec chunk,
/// a path string (e.g. `/invoices`) for per-path spec chunks, or `md:<n>`
/// for prose chunks.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub fragment: String,
    pub text: String,
}

/// A (document, fragment, score) reference justifying part of an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub doc_id: String,
    pub fragment: String,
    /// Similarity score reported by the vector index, when available.
    pub score: Option<f64>,
}

/// A runnable code example attached to an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snippet {
    /// Language tag, e.g. `"curl"`, `"python"`, `"javascript"`.
    pub language: String,
    pub code: String,
}

/// One question/answer interaction.
///
/// `id` and `created_at` are `None` for the degraded "not found" response,
/// which is never persisted; only successful answers enter history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub id: Option<String>,
    pub question: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub snippets: Vec<Snippet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Document metadata as exposed at the API edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    /// ISO-8601 timestamp.
    pub created_at: String,
}

impl From<&Document> for DocumentInfo {
    fn from(doc: &Document) -> Self {
        DocumentInfo {
            id: doc.id.clone(),
            name: doc.name.clone(),
            doc_type: doc.doc_type.clone(),
            created_at: format_ts_iso(doc.created_at),
        }
    }
}

/// History listing entry: question and creation time, no answer body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: String,
    pub question: String,
    pub created_at: String,
}

/// One file submitted for ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestFile {
    pub name: String,
    pub content: String,
}

/// Counts returned after ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub doc_ids: Vec<String>,
    pub chunks_indexed: usize,
}

/// Format a unix-seconds timestamp as ISO-8601 UTC.
pub fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ts_iso() {
        assert_eq!(format_ts_iso(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_ts_iso(1700000000), "2023-11-14T22:13:20Z");
    }

    #[test]
    fn test_qa_record_not_found_shape() {
        let record = QaRecord {
            id: None,
            question: "q".to_string(),
            answer: "a".to_string(),
            citations: vec![],
            snippets: vec![],
            created_at: None,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert!(json["id"].is_null());
        assert!(json.get("created_at").is_none());
    }
}
