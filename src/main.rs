//! # Docwell CLI (`docwell`)
//!
//! The `docwell` binary is the primary interface for Docwell. It provides
//! commands for database initialization, document ingestion, question
//! answering, history inspection, and starting the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! docwell --config ./config/docwell.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docwell init` | Create the SQLite database and run schema migrations |
//! | `docwell ingest <files>...` | Ingest OpenAPI specs and markdown guides |
//! | `docwell ask "<question>"` | Answer a question over the ingested docs |
//! | `docwell docs list` | List stored documents |
//! | `docwell docs rm <id>` | Delete a document and its chunks |
//! | `docwell history list` | List recent QA interactions |
//! | `docwell history show <id>` | Show one QA interaction in full |
//! | `docwell serve` | Start the JSON HTTP API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! docwell init --config ./config/docwell.toml
//!
//! # Ingest a spec and a guide
//! docwell ingest ./billing.json ./guide.md
//!
//! # Ask a question
//! docwell ask "How do I create an invoice?"
//!
//! # Remove a document
//! docwell docs rm 6e2dd3e0-61d4-4bb4-9bb3-0f2b1a6ef2ab
//!
//! # Start the HTTP API
//! docwell serve
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use docwell::{config, db, docs, history, ingest, migrate, qa, server};

/// Docwell CLI — grounded question answering over API documentation.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/docwell.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "docwell",
    about = "Docwell — grounded question answering over API documentation",
    version,
    long_about = "Docwell ingests OpenAPI specs and markdown guides, chunks and embeds them \
    into a vector index, and answers questions with excerpt-grounded answers, citations, and \
    runnable code snippets via a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/docwell.toml`. Database, ingestion, embedding,
    /// index, generation, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/docwell.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (documents,
    /// chunks, vectors, qa_history). This command is idempotent — running it
    /// multiple times is safe.
    Init,

    /// Ingest documentation files.
    ///
    /// Detects each file as an OpenAPI spec or markdown, chunks it, embeds
    /// the chunks, and stores everything. In `strict-json` detection mode,
    /// only OpenAPI JSON files are accepted.
    Ingest {
        /// Files to ingest (OpenAPI JSON/YAML or markdown).
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Answer a question over the ingested docs.
    ///
    /// Embeds the question, retrieves the closest chunks, and prints a
    /// grounded answer with citations and code snippets. Successful answers
    /// are saved to history.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Manage stored documents.
    Docs {
        #[command(subcommand)]
        action: DocsAction,
    },

    /// Inspect QA history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Start the JSON HTTP API server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// ingest, qa, docs, history, and health endpoints.
    Serve,
}

/// Document management subcommands.
#[derive(Subcommand)]
enum DocsAction {
    /// List stored documents.
    List,

    /// Delete a document, its chunks, and its vector index entries.
    Rm {
        /// Document id.
        id: String,
    },
}

/// History subcommands.
#[derive(Subcommand)]
enum HistoryAction {
    /// List recent QA interactions, most recent first.
    List {
        /// Maximum entries to show (capped at 50).
        #[arg(long, default_value_t = 50)]
        limit: i64,
    },

    /// Show one QA interaction in full.
    Show {
        /// History record id.
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { files } => {
            ingest::run_ingest(&cfg, &files).await?;
        }
        Commands::Ask { question } => {
            qa::run_ask(&cfg, &question).await?;
        }
        Commands::Docs { action } => match action {
            DocsAction::List => {
                docs::run_list(&cfg).await?;
            }
            DocsAction::Rm { id } => {
                docs::run_remove(&cfg, &id).await?;
            }
        },
        Commands::History { action } => match action {
            HistoryAction::List { limit } => {
                history::run_list(&cfg, limit).await?;
            }
            HistoryAction::Show { id } => {
                history::run_show(&cfg, &id).await?;
            }
        },
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
