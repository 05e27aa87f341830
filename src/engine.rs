//! Ingestion and query orchestration.
//!
//! [`QaEngine`] owns the configuration and the in-memory [`ChunkIndex`]
//! and exposes the three boundary operations: `ingest`, `answer`, and
//! `preview`. One engine instance is created per process (`open`) and
//! injected into the CLI commands and HTTP handlers; the index lives
//! exactly as long as the engine.
//!
//! Locking discipline: the index sits behind a single `RwLock`. Embedding
//! and generation calls never run under the lock; `add` takes the write
//! lock only after a document's vectors are in hand, and a query's
//! `search` + `resolve` pair runs under one read-lock scope so no ingest
//! can slip in between them.

use std::path::Path;
use std::sync::RwLock;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::embedding::{embed_query, embed_texts};
use crate::extract::{extract_document, preview as extract_preview};
use crate::generate::{build_prompt, generate, NO_DOCUMENTS_RESPONSE};
use crate::index::ChunkIndex;
use crate::scan::scan_documents;

/// Corpus-level ingestion failure, reported as a user-visible message.
#[derive(Debug)]
pub enum IngestError {
    /// The documents directory holds no matching files.
    NoDocuments,
    /// Documents were present but none yielded any text.
    NoTextExtracted,
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::NoDocuments => {
                write!(f, "no documents found to process; add PDF files first")
            }
            IngestError::NoTextExtracted => {
                write!(f, "no text could be extracted from any document")
            }
        }
    }
}

impl std::error::Error for IngestError {}

/// Outcome of an ingest pass.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub documents_processed: usize,
    pub documents_skipped: usize,
    pub chunks_indexed: usize,
}

/// Answer to a query, with the chunk texts it was grounded on.
///
/// `sources` is empty exactly when the fixed no-documents response was
/// returned without calling the generation service.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub response: String,
    pub sources: Vec<String>,
}

/// The question-answering engine: configuration plus the process-wide
/// chunk index.
pub struct QaEngine {
    config: Config,
    index: RwLock<ChunkIndex>,
}

impl QaEngine {
    /// Open an engine with an empty index at the configured
    /// dimensionality.
    pub fn open(config: Config) -> Self {
        let index = ChunkIndex::new(config.embedding.dims);
        Self {
            config,
            index: RwLock::new(index),
        }
    }

    /// Shut the engine down, logging final index statistics.
    ///
    /// The index is memory-only, so close discards it; this exists to make
    /// the lifecycle explicit rather than to flush anything.
    pub fn close(self) {
        let size = self.index.read().unwrap().len();
        tracing::info!(chunks = size, "engine closed");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current number of indexed chunks.
    pub fn index_size(&self) -> usize {
        self.index.read().unwrap().len()
    }

    /// Process every document currently in the corpus directory.
    ///
    /// Each document is extracted, chunked, embedded as one batch, and
    /// appended to the index. Extraction failures skip the document and
    /// the pass continues; embedding failures and dimensionality
    /// mismatches abort the pass with nothing from the failed document
    /// added. Ingestion is additive: processing the same corpus twice
    /// stores its chunks twice.
    pub async fn ingest(&self) -> Result<IngestReport> {
        let files = scan_documents(&self.config)?;
        if files.is_empty() {
            return Err(IngestError::NoDocuments.into());
        }

        let mut report = IngestReport {
            documents_processed: 0,
            documents_skipped: 0,
            chunks_indexed: 0,
        };

        for file in &files {
            let text = match extract_document(&file.path) {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(document = %file.name, error = %e, "skipping document");
                    report.documents_skipped += 1;
                    continue;
                }
            };

            let chunks = chunk_text(&self.config.chunking, &text);

            // Embed before taking the lock; the write lock covers only the
            // paired append.
            let vectors = embed_texts(&self.config.embedding, &chunks)
                .await
                .with_context(|| format!("embedding failed for {}", file.name))?;

            {
                let mut index = self.index.write().unwrap();
                index.add(&vectors, &chunks)?;
            }

            tracing::info!(document = %file.name, chunks = chunks.len(), "indexed document");
            report.documents_processed += 1;
            report.chunks_indexed += chunks.len();
        }

        if report.chunks_indexed == 0 {
            return Err(IngestError::NoTextExtracted.into());
        }

        Ok(report)
    }

    /// Scan and extract without embedding or indexing: reports what an
    /// ingest pass would do.
    pub fn ingest_dry_run(&self) -> Result<IngestReport> {
        let files = scan_documents(&self.config)?;
        if files.is_empty() {
            return Err(IngestError::NoDocuments.into());
        }

        let mut report = IngestReport {
            documents_processed: 0,
            documents_skipped: 0,
            chunks_indexed: 0,
        };

        for file in &files {
            match extract_document(&file.path) {
                Ok(text) => {
                    report.documents_processed += 1;
                    report.chunks_indexed += chunk_text(&self.config.chunking, &text).len();
                }
                Err(e) => {
                    tracing::warn!(document = %file.name, error = %e, "would skip document");
                    report.documents_skipped += 1;
                }
            }
        }

        Ok(report)
    }

    /// Answer a query from the indexed corpus.
    ///
    /// Retrieves the nearest chunks and conditions the generation model on
    /// them. With nothing retrieved, returns the fixed no-documents
    /// response without calling the generation service.
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let sources = self.retrieve(query, self.config.retrieval.top_k).await?;

        if sources.is_empty() {
            return Ok(Answer {
                response: NO_DOCUMENTS_RESPONSE.to_string(),
                sources,
            });
        }

        let prompt = build_prompt(&sources, query);
        let response = generate(&self.config.generation, &prompt).await?;

        Ok(Answer { response, sources })
    }

    /// Embed the query and return the texts of its `k` nearest chunks,
    /// nearest first.
    ///
    /// An empty index short-circuits to an empty result before the query
    /// is embedded — a cold index never costs a network call. Positions
    /// that fall outside the store are dropped; the single-container
    /// index makes that unreachable in practice, but the boundary guards
    /// it anyway.
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        if self.index.read().unwrap().is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = embed_query(&self.config.embedding, query).await?;

        let index = self.index.read().unwrap();
        let hits = index.search(&query_vec, k);
        Ok(hits
            .iter()
            .filter_map(|&(position, _)| index.resolve(position).map(str::to_string))
            .collect())
    }

    /// Extraction snippet for a single document, for immediate feedback.
    pub fn preview(&self, path: &Path) -> Result<String> {
        Ok(extract_preview(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocumentsConfig, EmbeddingConfig, GenerationConfig};
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(root: &Path, service_url: &str) -> Config {
        Config {
            documents: DocumentsConfig {
                root: root.to_path_buf(),
                include_globs: vec!["**/*.pdf".to_string()],
                exclude_globs: vec![],
                follow_symlinks: false,
            },
            chunking: Default::default(),
            retrieval: Default::default(),
            embedding: EmbeddingConfig {
                provider: "ollama".to_string(),
                model: "test-embed".to_string(),
                dims: 3,
                url: Some(service_url.to_string()),
                ..Default::default()
            },
            generation: GenerationConfig {
                provider: "ollama".to_string(),
                model: "test-gen".to_string(),
                url: Some(service_url.to_string()),
                ..Default::default()
            },
            server: Default::default(),
        }
    }

    fn seeded_engine(config: Config) -> QaEngine {
        let engine = QaEngine::open(config);
        {
            let mut index = engine.index.write().unwrap();
            index
                .add(
                    &[vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]],
                    &[
                        "Apples are red.".to_string(),
                        "Bananas are yellow.".to_string(),
                    ],
                )
                .unwrap();
        }
        engine
    }

    #[tokio::test]
    async fn test_answer_on_empty_index_short_circuits() {
        let tmp = tempfile::tempdir().unwrap();
        // Unroutable service URL: the test fails loudly if anything tries
        // the network, which the empty-index path must not.
        let engine = QaEngine::open(test_config(tmp.path(), "http://127.0.0.1:1"));

        let answer = engine.answer("anything?").await.unwrap();
        assert_eq!(answer.response, NO_DOCUMENTS_RESPONSE);
        assert!(answer.sources.is_empty());
    }

    #[tokio::test]
    async fn test_answer_retrieves_nearest_chunk_and_grounds_prompt() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let engine = seeded_engine(test_config(tmp.path(), &server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [[0.0, 0.9, 0.1]]})),
            )
            .mount(&server)
            .await;

        // The generation mock only matches prompts carrying the banana
        // chunk verbatim; an ungrounded prompt gets a 404 and fails the
        // test.
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_string_contains("Bananas are yellow."))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "They are yellow."})),
            )
            .mount(&server)
            .await;

        let answer = engine.answer("What color are bananas?").await.unwrap();
        assert_eq!(answer.response, "They are yellow.");
        assert_eq!(answer.sources[0], "Bananas are yellow.");
        assert_eq!(answer.sources.len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_is_surfaced() {
        let server = MockServer::start().await;
        let tmp = tempfile::tempdir().unwrap();
        let engine = seeded_engine(test_config(tmp.path(), &server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [[1.0, 0.0, 0.0]]})),
            )
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model exploded"))
            .mount(&server)
            .await;

        let err = engine.answer("why?").await.unwrap_err();
        let service_err = err
            .downcast_ref::<crate::service::ServiceError>()
            .expect("expected a ServiceError");
        assert!(matches!(
            service_err,
            crate::service::ServiceError::Api { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn test_ingest_empty_directory_is_empty_corpus() {
        let tmp = tempfile::tempdir().unwrap();
        let engine = QaEngine::open(test_config(tmp.path(), "http://127.0.0.1:1"));

        let err = engine.ingest().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::NoDocuments)
        ));
        assert_eq!(engine.index_size(), 0);
    }

    #[tokio::test]
    async fn test_ingest_unreadable_documents_reports_no_text() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("junk.pdf"), b"not a pdf at all").unwrap();
        let engine = QaEngine::open(test_config(tmp.path(), "http://127.0.0.1:1"));

        let err = engine.ingest().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IngestError>(),
            Some(IngestError::NoTextExtracted)
        ));
        assert_eq!(engine.index_size(), 0);
    }
}
