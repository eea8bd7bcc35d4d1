//! Embedding providers and vector utilities.
//!
//! Defines the [`EmbeddingProvider`] trait and concrete implementations:
//! - **[`SeededProvider`]** — deterministic pseudo-random vectors for offline and test use.
//! - **[`OpenAiProvider`]** — calls the OpenAI embeddings API.
//!
//! # Provider Selection
//!
//! | Config value | Provider           |
//! |--------------|--------------------|
//! | `"fallback"` | [`SeededProvider`]  |
//! | `"openai"`   | [`OpenAiProvider`]  |
//!
//! Embedding is never a hard failure point. [`Embedder`] wraps the selected
//! provider and substitutes seeded vectors when the live provider is
//! unavailable or errors, printing a warning instead of propagating. Every
//! vector leaving this module has exactly the index's configured dimension
//! (see [`fit_dims`]).

use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::{Config, EmbeddingConfig};

/// An embedding backend: text in, fixed-dimension vectors out.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}

// ============ Seeded Provider ============

/// Deterministic pseudo-random embeddings.
///
/// A single seeded stream advances across calls: repeated calls yield
/// different vectors, but the full sequence is reproducible from the seed.
/// Values are uniform in `[-0.5, 0.5)`.
pub struct SeededProvider {
    dims: usize,
    rng: Mutex<StdRng>,
}

impl SeededProvider {
    pub fn new(dims: usize, seed: u64) -> Self {
        SeededProvider {
            dims,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Draw `count` vectors from the stream.
    pub fn generate(&self, count: usize) -> Vec<Vec<f32>> {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        (0..count)
            .map(|_| (0..self.dims).map(|_| rng.gen::<f32>() - 0.5).collect())
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for SeededProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(self.generate(texts.len()))
    }
}

// ============ OpenAI Provider ============

/// Embedding provider using the OpenAI API.
///
/// Calls `POST https://api.openai.com/v1/embeddings` with the configured
/// model. Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        if api_key.is_empty() {
            bail!("OPENAI_API_KEY environment variable not set");
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(OpenAiProvider {
            client,
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = serde_json::json!({
            "model": self.model,
            "input": texts,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("OpenAI API error {}: {}", status, body_text);
        }

        let json: serde_json::Value = response.json().await?;
        parse_embedding_response(&json, texts.len())
    }
}

/// Extract the `data[].embedding` arrays in order.
fn parse_embedding_response(json: &serde_json::Value, expected: usize) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data array"))?;

    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(data.len());
    for item in data {
        let values = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing embedding"))?;
        vectors.push(values.iter().map(|v| v.as_f64().unwrap_or(0.0) as f32).collect());
    }

    if vectors.len() != expected {
        bail!(
            "Embeddings response has {} vectors for {} inputs",
            vectors.len(),
            expected
        );
    }
    Ok(vectors)
}

// ============ Embedder ============

/// Embedding front door used by both pipelines.
///
/// Holds the configured live provider (if any) plus the seeded fallback.
/// Provider failures degrade to fallback vectors with a warning instead of
/// an error, so the ingestion and QA paths never see an embedding failure.
pub struct Embedder {
    provider: Option<Box<dyn EmbeddingProvider>>,
    fallback: SeededProvider,
    dims: usize,
}

impl Embedder {
    /// Select the provider from configuration.
    ///
    /// Construction never fails: an unusable live provider (e.g. missing
    /// API key) downgrades to fallback mode with a warning.
    pub fn from_config(config: &Config) -> Self {
        let dims = config.index.dims;
        let provider: Option<Box<dyn EmbeddingProvider>> =
            match config.embedding.provider.as_str() {
                "openai" => match OpenAiProvider::new(&config.embedding) {
                    Ok(p) => Some(Box::new(p)),
                    Err(e) => {
                        eprintln!("Warning: {}; using seeded fallback embeddings", e);
                        None
                    }
                },
                _ => None,
            };

        Embedder {
            provider,
            fallback: SeededProvider::new(dims, config.embedding.seed),
            dims,
        }
    }

    /// Embed texts, substituting seeded vectors on any provider failure.
    pub async fn embed(&self, texts: &[String]) -> Vec<Vec<f32>> {
        if texts.is_empty() {
            return Vec::new();
        }
        if let Some(provider) = &self.provider {
            match provider.embed(texts).await {
                Ok(vectors) => {
                    return vectors
                        .into_iter()
                        .map(|v| fit_dims(v, self.dims))
                        .collect();
                }
                Err(e) => {
                    eprintln!("Warning: embedding failed ({}); using seeded fallback", e);
                }
            }
        }
        self.fallback.generate(texts.len())
    }

    pub fn dims(&self) -> usize {
        self.dims
    }
}

/// Project a vector to exactly `dims` dimensions: truncate if longer,
/// zero-pad if shorter.
pub fn fit_dims(mut v: Vec<f32>, dims: usize) -> Vec<f32> {
    v.resize(dims, 0.0);
    v
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`. Mismatched lengths and zero-norm
/// vectors yield `0.0` rather than an error.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }
    dot / denom
}

/// Serialize an embedding vector to bytes for BLOB storage.
/// Each f32 becomes 4 little-endian bytes.
pub fn vec_to_blob(v: &[f32]) -> Vec<u8> {
    let mut blob = Vec::with_capacity(v.len() * 4);
    for value in v {
        blob.extend_from_slice(&value.to_le_bytes());
    }
    blob
}

/// Deserialize a stored BLOB back into an embedding vector.
/// A trailing partial chunk is ignored.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
