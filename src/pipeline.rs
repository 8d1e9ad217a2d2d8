//! Build and query flows.
//!
//! The [`Pipeline`] ties the stages together:
//!
//! ```text
//! build:  staging dir -> extract -> chunk -> embed -> snapshot
//! query:  question -> embed -> cosine top-k -> prompt -> Ollama
//! ```
//!
//! Both flows are stateless between calls; the snapshot file is the only
//! thing that persists. A query never mutates the index, and a build
//! replaces the snapshot wholesale or leaves it untouched.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chunk;
use crate::config::Config;
use crate::embedding::{create_embedder, Embedder};
use crate::error::QaError;
use crate::generate::{AnswerBackend, OllamaGenerator};
use crate::index::{self, IndexEntry};
use crate::ingest;
use crate::models::{BuildReport, SearchHit};
use crate::prompt;

/// A produced answer together with the chunks it was grounded on.
#[derive(Debug)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<SearchHit>,
}

pub struct Pipeline {
    config: Config,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn AnswerBackend>,
}

impl Pipeline {
    /// Build a pipeline from configuration, wiring the configured embedding
    /// provider and an Ollama answer backend.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let embedder = create_embedder(&config.embedding)?;
        let generator = Arc::new(OllamaGenerator::new(&config.generation)?);
        Ok(Self {
            config,
            embedder,
            generator,
        })
    }

    /// Build a pipeline with explicit backends. Used by tests and by
    /// callers that bring their own embedder or generator.
    pub fn with_backends(
        config: Config,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn AnswerBackend>,
    ) -> Self {
        Self {
            config,
            embedder,
            generator,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.config.index.snapshot_path()
    }

    /// Rebuild the index snapshot from the current staging directory.
    ///
    /// The rebuild is always from scratch; there is no incremental path.
    /// If anything fails — including an empty document set — the previous
    /// snapshot stays in place unchanged.
    pub async fn build_index(&self) -> Result<BuildReport, QaError> {
        let report = ingest::load_staged(&self.config.staging.dir)
            .map_err(|e| QaError::IndexBuild(e.to_string()))?;

        let mut chunks = Vec::new();
        for doc in &report.documents {
            chunks.extend(chunk::chunk_document(
                doc,
                self.config.chunking.max_chars,
                self.config.chunking.overlap_chars,
            ));
        }

        if chunks.is_empty() {
            return Err(QaError::EmptyDocumentSet);
        }

        let dims = self.embedder.dims();
        let mut entries = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(self.config.embedding.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let vectors = self
                .embedder
                .embed(&texts)
                .await
                .map_err(|e| QaError::IndexBuild(format!("embedding failed: {}", e)))?;

            if vectors.len() != batch.len() {
                return Err(QaError::IndexBuild(format!(
                    "embedder returned {} vectors for {} chunks",
                    vectors.len(),
                    batch.len()
                )));
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                // An embedder disagreeing with its own declared dims is a
                // backend fault, not a stale snapshot.
                if vector.len() != dims {
                    return Err(QaError::IndexBuild(format!(
                        "embedder produced a {}-dimensional vector, expected {}",
                        vector.len(),
                        dims
                    )));
                }
                entries.push(IndexEntry {
                    chunk_id: chunk.id.clone(),
                    source: chunk.source.clone(),
                    chunk_index: chunk.chunk_index,
                    text: chunk.text.clone(),
                    hash: chunk.hash.clone(),
                    vector,
                });
            }
        }

        let snapshot = self.snapshot_path();
        index::write_snapshot(&snapshot, self.embedder.model_name(), dims, &entries).await?;

        Ok(BuildReport {
            documents: report.documents.len(),
            chunks: entries.len(),
            skipped: report.skipped,
            snapshot,
        })
    }

    /// Answer a question from the indexed documents.
    ///
    /// The snapshot's existence is checked before any backend work; a
    /// missing index is reported without embedding the question or calling
    /// the generator.
    pub async fn answer(&self, question: &str, top_k: usize) -> Result<Answer, QaError> {
        let snapshot = self.snapshot_path();
        if !index::snapshot_exists(&snapshot) {
            return Err(QaError::IndexNotFound(snapshot));
        }

        let loaded = index::load_snapshot(&snapshot, self.embedder.dims()).await?;

        let query_vector = self
            .embedder
            .embed_query(question)
            .await
            .map_err(|e| QaError::Embedding(e.to_string()))?;

        let hits = loaded.search(&query_vector, top_k);
        let composed = prompt::compose(&hits, question);
        let text = self.generator.generate(&composed).await?;

        Ok(Answer {
            text,
            sources: hits,
        })
    }
}
