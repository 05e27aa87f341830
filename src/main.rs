//! # docqa CLI
//!
//! Command-line interface for the retrieval-augmented question answering
//! pipeline. All commands accept a `--config` flag pointing to a TOML
//! configuration file.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docqa ingest` | Process every PDF in the documents directory |
//! | `docqa ask "<question>"` | One-shot: ingest, then answer a question |
//! | `docqa preview <path>` | Print an extraction snippet for one file |
//! | `docqa serve` | Start the long-lived HTTP service |
//!
//! The index is in-memory only, so `ingest` on its own is a corpus check
//! (it reports what was extracted and indexed, then exits). To query, use
//! `ask` for a one-shot run or `serve` for a process that keeps the index
//! alive across requests.
//!
//! ## Examples
//!
//! ```bash
//! # Validate the corpus without calling the embedding service
//! docqa ingest --dry-run
//!
//! # Ask a question against the configured documents directory
//! docqa ask "What is the refund policy?"
//!
//! # Serve the JSON API
//! docqa serve --config ./config/docqa.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use docqa::config;
use docqa::engine::QaEngine;
use docqa::server;

/// docqa — retrieval-augmented question answering over local PDF
/// collections.
#[derive(Parser)]
#[command(
    name = "docqa",
    about = "Retrieval-augmented question answering over local PDF collections",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docqa.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every document in the configured directory.
    ///
    /// Extracts, chunks, embeds, and indexes each PDF, then prints a
    /// report. Extraction failures skip the document; service failures
    /// abort the pass.
    Ingest {
        /// Show document and chunk counts without embedding or indexing.
        #[arg(long)]
        dry_run: bool,
    },

    /// Ingest the corpus and answer a single question.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Print an extraction snippet for a single document.
    ///
    /// Useful as immediate feedback after dropping a file into the
    /// documents directory.
    Preview {
        /// Path to the PDF file.
        path: PathBuf,
    },

    /// Start the HTTP service.
    ///
    /// Exposes `POST /process`, `POST /query`, and `GET /health` on the
    /// configured bind address. The index lives as long as the process.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest { dry_run } => {
            let engine = QaEngine::open(cfg);
            let report = if dry_run {
                engine.ingest_dry_run()?
            } else {
                engine.ingest().await?
            };
            if dry_run {
                println!("ingest (dry-run)");
            } else {
                println!("ingest");
            }
            println!("  documents processed: {}", report.documents_processed);
            println!("  documents skipped: {}", report.documents_skipped);
            println!("  chunks indexed: {}", report.chunks_indexed);
            println!("ok");
            engine.close();
        }
        Commands::Ask { question } => {
            let engine = QaEngine::open(cfg);
            let report = engine.ingest().await?;
            println!(
                "indexed {} chunks from {} documents",
                report.chunks_indexed, report.documents_processed
            );
            let answer = engine.answer(&question).await?;
            println!();
            println!("{}", answer.response);
            if !answer.sources.is_empty() {
                println!();
                println!("sources:");
                for source in &answer.sources {
                    println!("  - {}", source);
                }
            }
            engine.close();
        }
        Commands::Preview { path } => {
            let engine = QaEngine::open(cfg);
            let snippet = engine.preview(&path)?;
            println!("{}", snippet);
        }
        Commands::Serve => {
            let engine = Arc::new(QaEngine::open(cfg));
            server::run_server(engine).await?;
        }
    }

    Ok(())
}
