//! # docqa
//!
//! Retrieval-augmented question answering over local PDF collections.
//!
//! docqa ingests the PDF files in a configured directory, splits their
//! extracted text into chunks, embeds each chunk through a hosted embedding
//! model, and keeps the vectors in an in-memory index. Questions are
//! answered by embedding the query, retrieving the nearest chunks, and
//! handing them to a hosted text-generation model as grounding context.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────┐   ┌────────────┐
//! │ Scanner  │──▶│ Extractor │──▶│ Chunker │──▶│ Embedding  │
//! │ (PDFs)   │   │           │   │         │   │ provider   │
//! └──────────┘   └───────────┘   └─────────┘   └─────┬──────┘
//!                                                    ▼
//!                ┌───────────┐   ┌──────────┐   ┌─────────────┐
//!                │ Generator │◀──│ Retriever│◀──│ ChunkIndex  │
//!                │ (hosted)  │   │          │   │ (in memory) │
//!                └───────────┘   └──────────┘   └─────────────┘
//! ```
//!
//! The index lives for the process lifetime only — there is no persistence.
//! Each ingest pass appends to it; re-ingesting the same documents
//! duplicates their chunks by design.
//!
//! ## Quick Start
//!
//! ```bash
//! docqa ingest                     # process the documents directory
//! docqa ask "What is covered?"     # one-shot ingest + question
//! docqa preview ./documents/a.pdf  # extraction snippet for one file
//! docqa serve                      # long-lived HTTP service
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`scan`] | Document directory scanning |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Text chunking |
//! | [`embedding`] | Embedding provider calls |
//! | [`index`] | In-memory vector index + chunk store |
//! | [`engine`] | Ingestion and query orchestration |
//! | [`generate`] | Prompt assembly and text generation |
//! | [`service`] | Shared error kinds for hosted-model calls |
//! | [`server`] | HTTP service shell |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod extract;
pub mod generate;
pub mod index;
pub mod scan;
pub mod server;
pub mod service;
