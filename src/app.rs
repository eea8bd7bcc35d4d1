//! Process-wide pipeline wiring.
//!
//! Every entry point, CLI command or HTTP server, assembles the same set of
//! collaborators from configuration: storage, embedder, vector index, and
//! optional snippet generator. Which backends are active is decided once
//! here at startup; changing backends requires a restart.

use std::sync::Arc;

use anyhow::Result;

use crate::config::Config;
use crate::embedding::Embedder;
use crate::generate::Generator;
use crate::index::{self, VectorIndex};
use crate::store::Store;
use crate::{db, migrate};

/// The assembled pipeline: configuration plus every backend collaborator.
pub struct App {
    pub config: Config,
    pub store: Store,
    pub embedder: Embedder,
    pub index: Arc<dyn VectorIndex>,
    pub generator: Option<Generator>,
}

impl App {
    /// Connect storage (running migrations) and select backends per config.
    ///
    /// A non-durable index starts empty, so it is reseeded here from the
    /// vectors persisted at ingestion time.
    pub async fn assemble(config: Config) -> Result<App> {
        let pool = db::connect(&config.db.path).await?;
        migrate::run_migrations(&pool).await?;
        let store = Store::new(pool);
        let embedder = Embedder::from_config(&config);
        let index = index::build_index(&config);
        let generator = Generator::from_config(&config);

        if !index.durable() {
            let entries = store.load_vectors().await?;
            if !entries.is_empty() {
                index.upsert(entries).await?;
            }
        }

        Ok(App {
            config,
            store,
            embedder,
            index,
            generator,
        })
    }
}
