//! Question answering over the indexed corpus.
//!
//! ```text
//! embed question -> query index (top 6) -> resolve chunks in hit order
//!   -> citations (top 3, with scores) -> answer text -> snippets
//!   -> persist -> QA record
//! ```
//!
//! Chunk ids the index returns but storage no longer holds (their document
//! was deleted mid-flight) are silently dropped. When nothing resolves, a
//! fixed "not found" record is returned and never persisted.

use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use uuid::Uuid;

use crate::answer;
use crate::app::App;
use crate::config::Config;
use crate::embedding::Embedder;
use crate::generate::Generator;
use crate::index::VectorIndex;
use crate::models::{format_ts_iso, Citation, QaRecord};
use crate::store::Store;

/// Vector hits requested per question.
const TOP_K: usize = 6;
/// Citations and answer excerpts drawn from the top resolved chunks.
const MAX_CITATIONS: usize = 3;

pub async fn ask(
    store: &Store,
    embedder: &Embedder,
    index: &Arc<dyn VectorIndex>,
    generator: Option<&Generator>,
    question: &str,
) -> Result<QaRecord> {
    let vectors = embedder.embed(&[question.to_string()]).await;
    let hits = index.query(&vectors[0], TOP_K).await?;

    // resolve hits against chunk storage, preserving rank order
    let mut chunk_ids: Vec<String> = Vec::with_capacity(hits.len());
    for hit in &hits {
        if let Some(id) = hit.metadata.get("chunk_id") {
            if !chunk_ids.iter().any(|existing| existing == id) {
                chunk_ids.push(id.clone());
            }
        }
    }
    let chunks = store.chunks_by_ids(&chunk_ids).await?;

    if chunks.is_empty() {
        return Ok(answer::not_found_record(question));
    }

    let score_for = |chunk_id: &str| -> Option<f64> {
        hits.iter()
            .find(|hit| hit.metadata.get("chunk_id").map(String::as_str) == Some(chunk_id))
            .map(|hit| hit.score as f64)
    };

    let citations: Vec<Citation> = chunks
        .iter()
        .take(MAX_CITATIONS)
        .map(|chunk| Citation {
            doc_id: chunk.document_id.clone(),
            fragment: chunk.fragment.clone(),
            score: score_for(&chunk.id),
        })
        .collect();

    let contexts: Vec<String> = chunks
        .iter()
        .take(MAX_CITATIONS)
        .map(|chunk| chunk.text.clone())
        .collect();
    let answer_text = answer::format_answer(&contexts);

    // spec-grounded snippets are available when the top-matched document is
    // an OpenAPI spec
    let top_doc = store.find_document(&chunks[0].document_id).await?;
    let spec_content = top_doc
        .as_ref()
        .filter(|doc| doc.doc_type == "openapi")
        .map(|doc| doc.content.as_str());

    let snippets = answer::synthesize_snippets(generator, question, &contexts, spec_content).await;

    let id = Uuid::new_v4().to_string();
    let created_at = Utc::now().timestamp();
    store
        .insert_qa(&id, question, &answer_text, &citations, &snippets, created_at)
        .await?;

    Ok(QaRecord {
        id: Some(id),
        question: question.to_string(),
        answer: answer_text,
        citations,
        snippets,
        created_at: Some(format_ts_iso(created_at)),
    })
}

/// CLI entry point for `docwell ask "<question>"`.
pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let app = App::assemble(config.clone()).await?;
    let record = ask(
        &app.store,
        &app.embedder,
        &app.index,
        app.generator.as_ref(),
        question,
    )
    .await?;

    print_record(&record);
    if let Some(id) = &record.id {
        println!("saved to history: {}", id);
    }
    Ok(())
}

/// Print an answer record to stdout. Shared by `ask` and `history show`.
pub fn print_record(record: &QaRecord) {
    println!("--- Answer ---");
    println!("{}", record.answer);
    println!();

    println!("--- Citations ({}) ---", record.citations.len());
    for citation in &record.citations {
        match citation.score {
            Some(score) => println!("[{:.4}] {} / {}", score, citation.doc_id, citation.fragment),
            None => println!("[  -   ] {} / {}", citation.doc_id, citation.fragment),
        }
    }
    println!();

    println!("--- Snippets ({}) ---", record.snippets.len());
    for snippet in &record.snippets {
        println!("[{}]", snippet.language);
        println!("{}", snippet.code);
        println!();
    }
}
