//! QA history inspection from the command line.

use anyhow::{bail, Result};

use crate::app::App;
use crate::config::Config;
use crate::qa::print_record;

/// CLI entry point for `docwell history list`.
pub async fn run_list(config: &Config, limit: i64) -> Result<()> {
    let app = App::assemble(config.clone()).await?;
    let items = app.store.recent_history(limit.clamp(1, 50)).await?;

    if items.is_empty() {
        println!("No history.");
        return Ok(());
    }
    for (i, item) in items.iter().enumerate() {
        println!("{}. {}", i + 1, item.question);
        println!("    asked: {}", item.created_at);
        println!("    id: {}", item.id);
        println!();
    }
    Ok(())
}

/// CLI entry point for `docwell history show <id>`.
pub async fn run_show(config: &Config, id: &str) -> Result<()> {
    let app = App::assemble(config.clone()).await?;
    let Some(record) = app.store.history_by_id(id).await? else {
        bail!("history record not found: {}", id);
    };

    println!("--- Question ---");
    println!("{}", record.question);
    println!();
    print_record(&record);
    if let Some(created_at) = &record.created_at {
        println!("asked: {}", created_at);
    }
    Ok(())
}
