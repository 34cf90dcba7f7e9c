use crate::config::IntelligenceConfig;
use crate::intelligence::{ChunkSummary, ContentIntelligence};
use crate::pipeline::{ChunkMetadata, DocumentChunk};
use crate::retry::{retry_with_backoff, RetryPolicy};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{warn, Instrument, Span};
use url::Url;

/// Attaches title, summary and embedding to chunks
///
/// Never fails: a failed summary becomes the sentinel pair and a failed embedding
/// becomes a zero vector, so every chunk yields a persistable record.
#[derive(Clone)]
pub struct Enricher {
    intelligence: Arc<dyn ContentIntelligence>,
    embed_policy: RetryPolicy,
    embedding_dim: usize,
}

impl Enricher {
    pub fn new(intelligence: Arc<dyn ContentIntelligence>, config: &IntelligenceConfig) -> Self {
        Self {
            intelligence,
            embed_policy: RetryPolicy::Exponential {
                base: Duration::from_millis(config.embed_backoff_base_ms),
                max_attempts: config.embed_max_attempts,
            },
            embedding_dim: config.embedding_dim,
        }
    }

    /// Enriches every chunk of one document concurrently, keeping chunk order
    pub async fn enrich_document(
        &self,
        url: &str,
        chunks: Vec<String>,
        parent: &Span,
    ) -> Vec<DocumentChunk> {
        let tasks = chunks.into_iter().enumerate().map(|(n, content)| {
            let span = tracing::debug_span!(parent: parent, "enrich", url = %url, chunk = n);
            self.enrich(url, n, content).instrument(span)
        });
        join_all(tasks).await
    }

    /// Enriches one chunk; summary and embedding are requested concurrently
    pub async fn enrich(&self, url: &str, chunk_number: usize, content: String) -> DocumentChunk {
        let (summary, embedding) = tokio::join!(self.summarize(&content, url), self.embed(&content));

        DocumentChunk {
            url: url.to_string(),
            chunk_number,
            title: summary.title,
            summary: summary.summary,
            metadata: ChunkMetadata {
                source: url.to_string(),
                chunk_size: content.chars().count(),
                crawled_at: Utc::now().to_rfc3339(),
                url_path: Url::parse(url)
                    .map(|u| u.path().to_string())
                    .unwrap_or_default(),
            },
            content,
            embedding,
        }
    }

    async fn summarize(&self, text: &str, url: &str) -> ChunkSummary {
        match self.intelligence.summarize(text, url).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(url = %url, error = %e, "Summarization failed, using placeholder title and summary");
                ChunkSummary::fallback()
            }
        }
    }

    async fn embed(&self, text: &str) -> Vec<f32> {
        let result = retry_with_backoff(
            self.embed_policy,
            |e: &crate::intelligence::IntelligenceError| e.is_transient(),
            |_| self.intelligence.embed(text),
        )
        .await;

        match result {
            Ok(embedding) => embedding,
            Err(e) => {
                warn!(error = %e, "Embedding failed, using zero vector");
                vec![0.0; self.embedding_dim]
            }
        }
    }
}
