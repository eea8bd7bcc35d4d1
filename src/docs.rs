//! Document listing and removal.
//!
//! Removal cascades: the document row and its chunks are deleted first,
//! then the vector index entries carrying that document id. An unknown id
//! touches nothing. Used by both the CLI and the HTTP API.

use std::sync::Arc;

use anyhow::{bail, Result};

use crate::app::App;
use crate::config::Config;
use crate::index::VectorIndex;
use crate::models::DocumentInfo;
use crate::store::Store;

/// Metadata for every stored document, oldest first.
pub async fn list_documents(store: &Store) -> Result<Vec<DocumentInfo>> {
    let docs = store.list_documents().await?;
    Ok(docs.iter().map(DocumentInfo::from).collect())
}

/// Remove a document, its chunks, and its index entries. Returns `false`
/// when the id is unknown.
pub async fn remove_document(
    store: &Store,
    index: &Arc<dyn VectorIndex>,
    id: &str,
) -> Result<bool> {
    if !store.delete_document(id).await? {
        return Ok(false);
    }
    index.delete_by_document(id).await?;
    Ok(true)
}

/// CLI entry point for `docwell docs list`.
pub async fn run_list(config: &Config) -> Result<()> {
    let app = App::assemble(config.clone()).await?;
    let docs = list_documents(&app.store).await?;

    if docs.is_empty() {
        println!("No documents.");
        return Ok(());
    }
    for (i, doc) in docs.iter().enumerate() {
        println!("{}. {} ({})", i + 1, doc.name, doc.doc_type);
        println!("    created: {}", doc.created_at);
        println!("    id: {}", doc.id);
        println!();
    }
    Ok(())
}

/// CLI entry point for `docwell docs rm <id>`.
pub async fn run_remove(config: &Config, id: &str) -> Result<()> {
    let app = App::assemble(config.clone()).await?;
    if !remove_document(&app.store, &app.index, id).await? {
        bail!("document not found: {}", id);
    }
    println!("deleted {}", id);
    Ok(())
}
