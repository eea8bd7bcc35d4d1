//! # Docwell
//!
//! Grounded question answering over ingested API documentation.
//!
//! Docwell ingests OpenAPI specs and markdown guides, chunks and embeds
//! them into a vector index, and answers questions with excerpt-grounded
//! answer text, citations back to the source fragments, and runnable code
//! snippets. Both a CLI and a JSON HTTP API drive the same pipelines.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌──────────────┐   ┌─────────────────┐
//! │   Files   │──▶│  Ingestion   │──▶│ SQLite + vector │
//! │ spec / md │   │ chunk+embed  │   │      index      │
//! └───────────┘   └──────────────┘   └────────┬────────┘
//!                                             │
//!                          ┌──────────────────┤
//!                          ▼                  ▼
//!                    ┌──────────┐       ┌──────────┐
//!                    │   CLI    │       │   HTTP   │
//!                    │(docwell) │       │  (JSON)  │
//!                    └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! docwell init                        # create database
//! docwell ingest api.json guide.md    # ingest docs
//! docwell ask "How do I create an invoice?"
//! docwell serve                       # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Sentence-aware text chunking |
//! | [`openapi`] | Spec parsing and operation ranking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Vector index backends |
//! | [`ingest`] | Ingestion pipeline |
//! | [`qa`] | Question answering pipeline |
//! | [`answer`] | Answer and snippet synthesis |
//! | [`generate`] | Generative snippet provider |
//! | [`server`] | JSON HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod answer;
pub mod app;
pub mod chunk;
pub mod config;
pub mod db;
pub mod docs;
pub mod embedding;
pub mod generate;
pub mod history;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod openapi;
pub mod qa;
pub mod server;
pub mod store;
