//! Document ingestion pipeline.
//!
//! Coordinates the full flow for each uploaded file:
//!
//! ```text
//! detect type -> normalize -> chunk -> store doc + chunks -> embed -> persist + index
//! ```
//!
//! OpenAPI specs are stored verbatim and chunked structurally (one whole-spec
//! chunk plus one chunk per path). Markdown is normalized, then chunked by
//! sentence packing. Files are processed one at a time; a rejection leaves
//! files ingested before it in place.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use uuid::Uuid;

use crate::app::App;
use crate::chunk::{chunk_text, clean_markdown};
use crate::config::{Config, IngestConfig};
use crate::embedding::Embedder;
use crate::index::{chunk_metadata, VectorEntry, VectorIndex};
use crate::models::{Chunk, Document, IngestFile, IngestSummary};
use crate::openapi;
use crate::store::Store;

/// A file rejected by detection. The HTTP layer maps this to a client error;
/// everything else stays a server-side failure.
#[derive(Debug)]
pub struct InvalidFile(pub String);

impl std::fmt::Display for InvalidFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for InvalidFile {}

/// Ingest a batch of files: detect, chunk, persist, embed, and index each.
pub async fn ingest_files(
    store: &Store,
    embedder: &Embedder,
    index: &Arc<dyn VectorIndex>,
    config: &IngestConfig,
    files: &[IngestFile],
) -> Result<IngestSummary> {
    let mut doc_ids = Vec::with_capacity(files.len());
    let mut chunks_indexed = 0usize;

    for file in files {
        let doc_type = detect_type(&file.name, &file.content, config)?;
        let doc_id = Uuid::new_v4().to_string();

        let (content, chunks) = if doc_type == "openapi" {
            let chunks = spec_chunks(&doc_id, &file.content);
            (file.content.clone(), chunks)
        } else {
            let content = clean_markdown(&file.content);
            let chunks = markdown_chunks(&doc_id, &content, config);
            (content, chunks)
        };

        let doc = Document {
            id: doc_id.clone(),
            name: file.name.clone(),
            doc_type: doc_type.to_string(),
            content,
            created_at: Utc::now().timestamp(),
        };
        store.insert_document(&doc).await?;
        store.insert_chunks(&chunks).await?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await;
        let entries: Vec<VectorEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, values)| VectorEntry {
                id: Uuid::new_v4().to_string(),
                values,
                metadata: chunk_metadata(&doc_id, &chunk.id),
            })
            .collect();
        store.insert_vectors(&entries).await?;
        index.upsert(entries).await?;

        chunks_indexed += chunks.len();
        doc_ids.push(doc_id);
    }

    Ok(IngestSummary {
        doc_ids,
        chunks_indexed,
    })
}

/// CLI entry point for `docwell ingest <files>...`.
pub async fn run_ingest(config: &Config, paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(IngestFile { name, content });
    }

    let app = App::assemble(config.clone()).await?;
    let summary = ingest_files(
        &app.store,
        &app.embedder,
        &app.index,
        &app.config.ingest,
        &files,
    )
    .await?;

    println!("ingest");
    println!("  files: {}", files.len());
    for (file, doc_id) in files.iter().zip(&summary.doc_ids) {
        println!("  {} -> {}", file.name, doc_id);
    }
    println!("  chunks indexed: {}", summary.chunks_indexed);
    println!("ok");
    Ok(())
}

fn detect_type(name: &str, content: &str, config: &IngestConfig) -> Result<&'static str> {
    if config.is_strict() {
        detect_strict_json(name, content)
    } else {
        Ok(openapi::detect_doc_type(name, content))
    }
}

/// Strict detection admits only OpenAPI JSON files.
fn detect_strict_json(name: &str, content: &str) -> Result<&'static str> {
    if !name.to_lowercase().ends_with(".json") {
        return Err(InvalidFile(format!("Only JSON is supported. Invalid file: {}", name)).into());
    }
    let value: serde_json::Value = match serde_json::from_str(content) {
        Ok(value) => value,
        Err(_) => return Err(InvalidFile(format!("Invalid JSON content: {}", name)).into()),
    };
    let is_spec = value
        .as_object()
        .map_or(false, |obj| obj.contains_key("openapi") || obj.contains_key("swagger"));
    if !is_spec {
        return Err(
            InvalidFile(format!("Unsupported JSON type (expect OpenAPI): {}", name)).into(),
        );
    }
    Ok("openapi")
}

/// One whole-spec chunk plus a structural chunk per path. A spec that fails
/// to parse still gets the whole-spec chunk.
fn spec_chunks(doc_id: &str, content: &str) -> Vec<Chunk> {
    let mut chunks = vec![Chunk {
        id: Uuid::new_v4().to_string(),
        document_id: doc_id.to_string(),
        fragment: "spec".to_string(),
        text: content.to_string(),
    }];
    if let Some(spec) = openapi::parse_spec(content) {
        if let Some(paths) = openapi::extract_paths(&spec) {
            for path in paths.keys() {
                chunks.push(Chunk {
                    id: Uuid::new_v4().to_string(),
                    document_id: doc_id.to_string(),
                    fragment: path.clone(),
                    text: format!("Path: {}", path),
                });
            }
        }
    }
    chunks
}

fn markdown_chunks(doc_id: &str, content: &str, config: &IngestConfig) -> Vec<Chunk> {
    chunk_text(content, config.max_chunk_len, config.overlap)
        .into_iter()
        .enumerate()
        .map(|(i, text)| Chunk {
            id: Uuid::new_v4().to_string(),
            document_id: doc_id.to_string(),
            fragment: format!("md:{}", i),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::index::MemoryIndex;
    use crate::{db, migrate};
    use tempfile::TempDir;

    async fn pipeline() -> (TempDir, Store, Embedder, Arc<dyn VectorIndex>) {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::connect(&dir.path().join("test.db")).await.unwrap();
        migrate::run_migrations(&pool).await.unwrap();
        let store = Store::new(pool);
        let embedder = Embedder::from_config(&Config::default());
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryIndex::new());
        (dir, store, embedder, index)
    }

    fn file(name: &str, content: &str) -> IngestFile {
        IngestFile {
            name: name.to_string(),
            content: content.to_string(),
        }
    }

    const SPEC_JSON: &str = r#"{
        "openapi": "3.0.0",
        "info": {"title": "Billing", "version": "1.0.0"},
        "paths": {
            "/invoices": {"post": {"operationId": "createInvoice", "summary": "Create invoice"}},
            "/invoices/{id}": {"get": {"operationId": "getInvoice", "summary": "Get invoice"}}
        }
    }"#;

    #[tokio::test]
    async fn test_ingest_openapi_builds_spec_and_path_chunks() {
        let (_dir, store, embedder, index) = pipeline().await;
        let config = IngestConfig::default();

        let summary = ingest_files(
            &store,
            &embedder,
            &index,
            &config,
            &[file("billing.json", SPEC_JSON)],
        )
        .await
        .unwrap();

        assert_eq!(summary.doc_ids.len(), 1);
        assert_eq!(summary.chunks_indexed, 3);

        let doc = store
            .find_document(&summary.doc_ids[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.doc_type, "openapi");
        // spec bytes are stored verbatim, no normalization
        assert_eq!(doc.content, SPEC_JSON);

        let chunks = store.chunks_by_document(&doc.id).await.unwrap();
        let fragments: Vec<&str> = chunks.iter().map(|c| c.fragment.as_str()).collect();
        assert!(fragments.contains(&"spec"));
        assert!(fragments.contains(&"/invoices"));
        assert!(fragments.contains(&"/invoices/{id}"));
    }

    #[tokio::test]
    async fn test_ingest_markdown_normalizes_and_chunks() {
        let (_dir, store, embedder, index) = pipeline().await;
        let config = IngestConfig {
            detection: "permissive".to_string(),
            max_chunk_len: 80,
            overlap: 20,
        };

        let body = (0..12)
            .map(|i| format!("Paragraph sentence number {} explains the API.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let content = format!("  {}\r\n", body);

        let summary = ingest_files(
            &store,
            &embedder,
            &index,
            &config,
            &[file("guide.md", &content)],
        )
        .await
        .unwrap();

        assert!(summary.chunks_indexed >= 2);

        let doc = store
            .find_document(&summary.doc_ids[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.doc_type, "markdown");
        assert!(!doc.content.contains('\r'));
        assert_eq!(doc.content, doc.content.trim());

        let chunks = store.chunks_by_document(&doc.id).await.unwrap();
        assert_eq!(chunks[0].fragment, "md:0");
        assert_eq!(chunks[1].fragment, "md:1");
    }

    #[tokio::test]
    async fn test_ingest_indexes_every_chunk() {
        let (_dir, store, embedder, index) = pipeline().await;
        let config = IngestConfig::default();

        ingest_files(
            &store,
            &embedder,
            &index,
            &config,
            &[file("billing.json", SPEC_JSON)],
        )
        .await
        .unwrap();

        let probe = embedder.embed(&["invoices".to_string()]).await;
        let hits = index.query(&probe[0], 10).await.unwrap();
        assert_eq!(hits.len(), 3);
        for hit in &hits {
            assert!(hit.metadata.contains_key("doc_id"));
            assert!(hit.metadata.contains_key("chunk_id"));
        }

        // entries are also persisted for index reseeding
        let stored = store.load_vectors().await.unwrap();
        assert_eq!(stored.len(), 3);
        assert!(stored.iter().all(|e| !e.values.is_empty()));
    }

    #[tokio::test]
    async fn test_strict_mode_rejections() {
        let (_dir, store, embedder, index) = pipeline().await;
        let config = IngestConfig {
            detection: "strict-json".to_string(),
            ..IngestConfig::default()
        };

        let err = ingest_files(&store, &embedder, &index, &config, &[file("notes.md", "# hi")])
            .await
            .unwrap_err();
        assert!(err.is::<InvalidFile>());
        assert_eq!(
            err.to_string(),
            "Only JSON is supported. Invalid file: notes.md"
        );

        let err = ingest_files(
            &store,
            &embedder,
            &index,
            &config,
            &[file("broken.json", "{not json")],
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid JSON content: broken.json");

        let err = ingest_files(
            &store,
            &embedder,
            &index,
            &config,
            &[file("data.json", "{\"rows\": []}")],
        )
        .await
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unsupported JSON type (expect OpenAPI): data.json"
        );
    }

    #[tokio::test]
    async fn test_strict_mode_rejection_keeps_earlier_files() {
        let (_dir, store, embedder, index) = pipeline().await;
        let config = IngestConfig {
            detection: "strict-json".to_string(),
            ..IngestConfig::default()
        };

        let result = ingest_files(
            &store,
            &embedder,
            &index,
            &config,
            &[file("billing.json", SPEC_JSON), file("notes.md", "# hi")],
        )
        .await;
        assert!(result.is_err());
        assert_eq!(store.list_documents().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_permissive_mode_accepts_yaml_spec() {
        let (_dir, store, embedder, index) = pipeline().await;
        let config = IngestConfig::default();

        let yaml = "openapi: 3.0.0\ninfo:\n  title: Ping\n  version: 1.0.0\npaths:\n  /ping:\n    get:\n      operationId: ping\n";
        let summary = ingest_files(&store, &embedder, &index, &config, &[file("ping.yaml", yaml)])
            .await
            .unwrap();

        let doc = store
            .find_document(&summary.doc_ids[0])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.doc_type, "openapi");
        assert_eq!(summary.chunks_indexed, 2);
    }
}
