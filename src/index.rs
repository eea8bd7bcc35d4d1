//! Vector index backends.
//!
//! Stores `(id, vector, metadata)` triples and answers k-nearest-neighbor
//! queries by cosine similarity. Two interchangeable backends implement
//! [`VectorIndex`]:
//!
//! | Config value | Backend         | Characteristics                          |
//! |--------------|-----------------|------------------------------------------|
//! | `"memory"`   | [`MemoryIndex`] | Exact linear scan, strongly consistent   |
//! | `"hosted"`   | [`HostedIndex`] | Remote ANN service, eventually consistent |
//!
//! The pipelines depend only on the trait. The active backend is chosen
//! once at startup by [`build_index`] and never changes during the process
//! lifetime; callers must not assume read-your-writes from the hosted
//! backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::config::Config;
use crate::embedding::cosine_similarity;

/// One indexed vector. Metadata carries at minimum `doc_id` and `chunk_id`,
/// linking the entry back to its source chunk.
#[derive(Debug, Clone)]
pub struct VectorEntry {
    /// Entry id, independent of the chunk id.
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// A query match, ranked by cosine similarity.
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

/// Index operations shared by all backends.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Insert or replace entries by id. Idempotent.
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()>;

    /// Remove every entry whose metadata `doc_id` equals the given id.
    /// Deletion is keyed on metadata, not on vector ids.
    async fn delete_by_document(&self, doc_id: &str) -> Result<()>;

    /// Up to `top_k` entries ranked by cosine similarity descending.
    /// An empty index yields an empty result, not an error.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>>;

    /// Whether entries survive a process restart on their own. Non-durable
    /// backends are reseeded from the database at startup.
    fn durable(&self) -> bool;
}

// ============ Memory Backend ============

/// Exact in-process index backed by a flat list. O(n) per query.
#[derive(Default)]
pub struct MemoryIndex {
    entries: Mutex<Vec<VectorEntry>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        let mut stored = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        for entry in entries {
            if let Some(existing) = stored.iter_mut().find(|e| e.id == entry.id) {
                *existing = entry;
            } else {
                stored.push(entry);
            }
        }
        Ok(())
    }

    async fn delete_by_document(&self, doc_id: &str) -> Result<()> {
        let mut stored = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        stored.retain(|e| e.metadata.get("doc_id").map(String::as_str) != Some(doc_id));
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>> {
        let stored = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut hits: Vec<VectorHit> = stored
            .iter()
            .map(|e| VectorHit {
                id: e.id.clone(),
                score: cosine_similarity(vector, &e.values),
                metadata: e.metadata.clone(),
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    fn durable(&self) -> bool {
        false
    }
}

// ============ Hosted Backend ============

/// Thin client for a Pinecone-style hosted index, speaking its REST data
/// plane. Approximate and possibly eventually consistent.
pub struct HostedIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HostedIndex {
    pub fn new(url: &str, api_key: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(HostedIndex {
            client,
            base_url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            bail!("Vector index error {}: {}", status, text);
        }
        Ok(serde_json::from_str(&text).unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl VectorIndex for HostedIndex {
    async fn upsert(&self, entries: Vec<VectorEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let vectors: Vec<serde_json::Value> = entries
            .iter()
            .map(|e| {
                serde_json::json!({
                    "id": e.id,
                    "values": e.values,
                    "metadata": e.metadata,
                })
            })
            .collect();
        self.post("/vectors/upsert", &serde_json::json!({ "vectors": vectors }))
            .await?;
        Ok(())
    }

    async fn delete_by_document(&self, doc_id: &str) -> Result<()> {
        let body = serde_json::json!({
            "filter": { "doc_id": { "$eq": doc_id } }
        });
        self.post("/vectors/delete", &body).await?;
        Ok(())
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<VectorHit>> {
        let body = serde_json::json!({
            "vector": vector,
            "topK": top_k,
            "includeMetadata": true,
        });
        let json = self.post("/query", &body).await?;

        let mut hits = Vec::new();
        if let Some(matches) = json.get("matches").and_then(|m| m.as_array()) {
            for m in matches {
                let id = m.get("id").and_then(|v| v.as_str()).unwrap_or_default();
                if id.is_empty() {
                    continue;
                }
                let score = m.get("score").and_then(|v| v.as_f64()).unwrap_or(0.0) as f32;
                let mut metadata = HashMap::new();
                if let Some(meta) = m.get("metadata").and_then(|v| v.as_object()) {
                    for (k, v) in meta {
                        if let Some(s) = v.as_str() {
                            metadata.insert(k.clone(), s.to_string());
                        }
                    }
                }
                hits.push(VectorHit {
                    id: id.to_string(),
                    score,
                    metadata,
                });
            }
        }
        Ok(hits)
    }

    fn durable(&self) -> bool {
        true
    }
}

// ============ Backend Selection ============

/// Build the configured index backend.
///
/// A hosted selection without a usable URL or API key falls back to the
/// in-memory index with a warning; the process keeps a single backend for
/// its whole lifetime.
pub fn build_index(config: &Config) -> Arc<dyn VectorIndex> {
    if config.index.backend == "hosted" {
        if let Some(hosted) = &config.index.hosted {
            let api_key = std::env::var(&hosted.api_key_env).unwrap_or_default();
            if api_key.is_empty() {
                eprintln!(
                    "Warning: {} is not set; using the in-memory vector index",
                    hosted.api_key_env
                );
            } else {
                match HostedIndex::new(&hosted.url, &api_key, hosted.timeout_secs) {
                    Ok(index) => return Arc::new(index),
                    Err(e) => {
                        eprintln!("Warning: hosted index unavailable ({}); using the in-memory vector index", e);
                    }
                }
            }
        } else {
            eprintln!("Warning: index.backend is \"hosted\" but [index.hosted] is missing; using the in-memory vector index");
        }
    }
    Arc::new(MemoryIndex::new())
}

/// Metadata mapping for a chunk's index entry.
pub fn chunk_metadata(doc_id: &str, chunk_id: &str) -> HashMap<String, String> {
    let mut metadata = HashMap::new();
    metadata.insert("doc_id".to_string(), doc_id.to_string());
    metadata.insert("chunk_id".to_string(), chunk_id.to_string());
    metadata
}
