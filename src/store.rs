//! SQLite-backed storage for documents, chunks, vectors, and QA history.
//!
//! The pipelines treat this as four narrow collaborators:
//!
//! | Concern   | Operations                                        |
//! |-----------|---------------------------------------------------|
//! | documents | insert, find by id, list, delete (cascades)       |
//! | chunks    | bulk insert, ordered lookup by ids, by document   |
//! | vectors   | bulk upsert, full load for index reseeding        |
//! | history   | append, recent listing, lookup by id              |
//!
//! History is append-only; documents, chunks, and vectors are immutable
//! after ingestion and removed only by document deletion. Stored vectors
//! exist so a non-durable index backend can be rebuilt at startup.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, vec_to_blob};
use crate::index::{chunk_metadata, VectorEntry};
use crate::models::{format_ts_iso, Chunk, Citation, Document, HistoryItem, QaRecord, Snippet};

/// Storage handle shared by the pipelines. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    pub fn new(pool: SqlitePool) -> Self {
        Store { pool }
    }

    // ===== Documents =====

    pub async fn insert_document(&self, doc: &Document) -> Result<()> {
        sqlx::query(
            "INSERT INTO documents (id, name, doc_type, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.doc_type)
        .bind(&doc.content)
        .bind(doc.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            "SELECT id, name, doc_type, content, created_at FROM documents WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(document_from_row))
    }

    /// All documents in insertion order.
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            "SELECT id, name, doc_type, content, created_at FROM documents ORDER BY created_at ASC, rowid ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(document_from_row).collect())
    }

    /// Delete a document along with its chunks and stored vectors.
    /// Returns `false` for unknown ids.
    pub async fn delete_document(&self, id: &str) -> Result<bool> {
        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM vectors WHERE doc_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // ===== Chunks =====

    pub async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        for chunk in chunks {
            sqlx::query("INSERT INTO chunks (id, document_id, fragment, text) VALUES (?, ?, ?, ?)")
                .bind(&chunk.id)
                .bind(&chunk.document_id)
                .bind(&chunk.fragment)
                .bind(&chunk.text)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Fetch chunks by id, preserving input order. Ids that no longer exist
    /// (e.g. their document was deleted) are silently skipped.
    pub async fn chunks_by_ids(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::with_capacity(ids.len());
        for id in ids {
            let row =
                sqlx::query("SELECT id, document_id, fragment, text FROM chunks WHERE id = ?")
                    .bind(id)
                    .fetch_optional(&self.pool)
                    .await?;
            if let Some(row) = row {
                chunks.push(chunk_from_row(&row));
            }
        }
        Ok(chunks)
    }

    /// A document's chunks in insertion order.
    pub async fn chunks_by_document(&self, doc_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            "SELECT id, document_id, fragment, text FROM chunks WHERE document_id = ? ORDER BY rowid ASC",
        )
        .bind(doc_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(chunk_from_row).collect())
    }

    // ===== Vectors =====

    /// Persist index entries so a non-durable backend can be reseeded.
    pub async fn insert_vectors(&self, entries: &[VectorEntry]) -> Result<()> {
        for entry in entries {
            let doc_id = entry.metadata.get("doc_id").cloned().unwrap_or_default();
            let chunk_id = entry.metadata.get("chunk_id").cloned().unwrap_or_default();
            sqlx::query(
                "INSERT INTO vectors (id, doc_id, chunk_id, embedding) VALUES (?, ?, ?, ?)
                 ON CONFLICT(id) DO UPDATE SET embedding = excluded.embedding",
            )
            .bind(&entry.id)
            .bind(doc_id)
            .bind(chunk_id)
            .bind(vec_to_blob(&entry.values))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Every stored vector, ready to upsert into an index backend.
    pub async fn load_vectors(&self) -> Result<Vec<VectorEntry>> {
        let rows = sqlx::query("SELECT id, doc_id, chunk_id, embedding FROM vectors ORDER BY rowid ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|row| {
                let doc_id: String = row.get("doc_id");
                let chunk_id: String = row.get("chunk_id");
                let blob: Vec<u8> = row.get("embedding");
                VectorEntry {
                    id: row.get("id"),
                    values: blob_to_vec(&blob),
                    metadata: chunk_metadata(&doc_id, &chunk_id),
                }
            })
            .collect())
    }

    // ===== History =====

    pub async fn insert_qa(
        &self,
        id: &str,
        question: &str,
        answer: &str,
        citations: &[Citation],
        snippets: &[Snippet],
        created_at: i64,
    ) -> Result<()> {
        let citations_json = serde_json::to_string(citations)?;
        let snippets_json = serde_json::to_string(snippets)?;
        sqlx::query(
            "INSERT INTO qa_history (id, question, answer, citations_json, snippets_json, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(question)
        .bind(answer)
        .bind(citations_json)
        .bind(snippets_json)
        .bind(created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent interactions first. Same-timestamp records fall back to
    /// insertion order.
    pub async fn recent_history(&self, limit: i64) -> Result<Vec<HistoryItem>> {
        let rows = sqlx::query(
            "SELECT id, question, created_at FROM qa_history ORDER BY created_at DESC, rowid DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|row| HistoryItem {
                id: row.get("id"),
                question: row.get("question"),
                created_at: format_ts_iso(row.get("created_at")),
            })
            .collect())
    }

    pub async fn history_by_id(&self, id: &str) -> Result<Option<QaRecord>> {
        let row = sqlx::query(
            "SELECT id, question, answer, citations_json, snippets_json, created_at FROM qa_history WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let citations_json: String = row.get("citations_json");
            let snippets_json: String = row.get("snippets_json");
            QaRecord {
                id: Some(row.get("id")),
                question: row.get("question"),
                answer: row.get("answer"),
                citations: serde_json::from_str(&citations_json).unwrap_or_default(),
                snippets: serde_json::from_str(&snippets_json).unwrap_or_default(),
                created_at: Some(format_ts_iso(row.get("created_at"))),
            }
        }))
    }
}

fn document_from_row(row: &SqliteRow) -> Document {
    Document {
        id: row.get("id"),
        name: row.get("name"),
        doc_type: row.get("doc_type"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

fn chunk_from_row(row: &SqliteRow) -> Chunk {
    Chunk {
        id: row.get("id"),
        document_id: row.get("document_id"),
        fragment: row.get("fragment"),
        text: row.get("text"),
    }
}
