//! Document pipeline
//!
//! Fetched page text flows through three stages:
//! 1. [`chunk_text`] splits it into boundary-aware chunks
//! 2. [`Enricher`] attaches a title, summary and embedding to each chunk
//! 3. a [`ChunkSink`] persists one record per chunk
//!
//! A failed write is logged and counted; it never stops sibling chunks or the crawl.

mod chunker;
mod enrichment;

pub use chunker::chunk_text;
pub use enrichment::Enricher;

use crate::storage::ChunkSink;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, Span};

/// One persisted chunk record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub url: String,
    /// 0-based position of the chunk within its page
    pub chunk_number: usize,
    pub title: String,
    pub summary: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Provenance of a chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source: String,
    /// Length of the content in characters
    pub chunk_size: usize,
    /// UTC time of enrichment, RFC 3339
    pub crawled_at: String,
    pub url_path: String,
}

/// What happened to the chunks of one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub written: usize,
    pub failed: usize,
}

/// Chunk, enrich and persist fetched documents
#[derive(Clone)]
pub struct DocumentPipeline {
    chunk_size: usize,
    enricher: Enricher,
    sink: Arc<dyn ChunkSink>,
    span: Span,
}

impl DocumentPipeline {
    pub fn new(chunk_size: usize, enricher: Enricher, sink: Arc<dyn ChunkSink>, span: Span) -> Self {
        Self {
            chunk_size,
            enricher,
            sink,
            span,
        }
    }

    /// Runs one document through every stage
    pub async fn process_document(&self, url: &str, text: &str) -> DocumentOutcome {
        let span = tracing::info_span!(parent: &self.span, "document", url = %url);
        let chunks = chunk_text(text, self.chunk_size);
        span.in_scope(|| debug!(chunks = chunks.len(), "Chunked document"));

        let enriched = self.enricher.enrich_document(url, chunks, &span).await;

        span.in_scope(|| {
            let mut outcome = DocumentOutcome::default();
            for chunk in &enriched {
                match self.sink.persist(chunk) {
                    Ok(location) => {
                        debug!(chunk = chunk.chunk_number, path = %location, "Saved chunk");
                        outcome.written += 1;
                    }
                    Err(e) => {
                        error!(chunk = chunk.chunk_number, error = %e, "Failed to save chunk");
                        outcome.failed += 1;
                    }
                }
            }
            outcome
        })
    }
}
