use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/docwell.db")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8787".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// `"permissive"` (extension + content sniffing) or `"strict-json"`
    /// (reject anything that is not an OpenAPI/Swagger JSON document).
    #[serde(default = "default_detection")]
    pub detection: String,
    #[serde(default = "default_max_chunk_len")]
    pub max_chunk_len: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            detection: default_detection(),
            max_chunk_len: default_max_chunk_len(),
            overlap: default_overlap(),
        }
    }
}

impl IngestConfig {
    pub fn is_strict(&self) -> bool {
        self.detection == "strict-json"
    }
}

fn default_detection() -> String {
    "permissive".to_string()
}
fn default_max_chunk_len() -> usize {
    1200
}
fn default_overlap() -> usize {
    200
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            seed: default_seed(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "fallback".to_string()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}
fn default_seed() -> u64 {
    12345
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: String,
    #[serde(default = "default_dims")]
    pub dims: usize,
    #[serde(default)]
    pub hosted: Option<HostedIndexConfig>,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            dims: default_dims(),
            hosted: None,
        }
    }
}

fn default_index_backend() -> String {
    "memory".to_string()
}
fn default_dims() -> usize {
    384
}

#[derive(Debug, Deserialize, Clone)]
pub struct HostedIndexConfig {
    pub url: String,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_env() -> String {
    "PINECONE_API_KEY".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_provider")]
    pub provider: String,
    /// Model override; each provider has its own default.
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_generation_provider(),
            model: None,
            max_tokens: default_max_tokens(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_generation_provider() -> String {
    "disabled".to_string()
}
fn default_max_tokens() -> u32 {
    800
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate ingest
    match config.ingest.detection.as_str() {
        "permissive" | "strict-json" => {}
        other => anyhow::bail!(
            "Unknown ingest detection mode: '{}'. Must be permissive or strict-json.",
            other
        ),
    }
    if config.ingest.max_chunk_len == 0 {
        anyhow::bail!("ingest.max_chunk_len must be > 0");
    }
    if config.ingest.overlap >= config.ingest.max_chunk_len {
        anyhow::bail!("ingest.overlap must be smaller than ingest.max_chunk_len");
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "fallback" | "openai" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be fallback or openai.",
            other
        ),
    }

    // Validate index
    match config.index.backend.as_str() {
        "memory" | "hosted" => {}
        other => anyhow::bail!(
            "Unknown index backend: '{}'. Must be memory or hosted.",
            other
        ),
    }
    if config.index.dims == 0 {
        anyhow::bail!("index.dims must be > 0");
    }
    if config.index.backend == "hosted" && config.index.hosted.is_none() {
        anyhow::bail!("[index.hosted] with a url must be set when index.backend is 'hosted'");
    }

    // Validate generation
    match config.generation.provider.as_str() {
        "disabled" | "openai" | "gemini" => {}
        other => anyhow::bail!(
            "Unknown generation provider: '{}'. Must be disabled, openai, or gemini.",
            other
        ),
    }

    Ok(config)
}
