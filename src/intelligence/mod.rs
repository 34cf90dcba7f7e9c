//! Content intelligence
//!
//! The language-model service that titles, summarizes and embeds chunks. The
//! pipeline talks to it only through [`ContentIntelligence`]; [`OllamaClient`] is the
//! HTTP implementation.

mod ollama;

pub use ollama::OllamaClient;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Title used when a chunk could not be summarized
pub const FALLBACK_TITLE: &str = "Error processing title";

/// Summary used when a chunk could not be summarized
pub const FALLBACK_SUMMARY: &str = "Error processing summary";

/// Title and summary of one chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub title: String,
    pub summary: String,
}

impl ChunkSummary {
    /// The sentinel pair recorded when summarization fails
    pub fn fallback() -> Self {
        Self {
            title: FALLBACK_TITLE.to_string(),
            summary: FALLBACK_SUMMARY.to_string(),
        }
    }
}

/// Errors returned by a content intelligence service
#[derive(Debug, Error)]
pub enum IntelligenceError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: StatusCode },

    #[error("Malformed response from {endpoint}: {reason}")]
    Malformed { endpoint: String, reason: String },

    #[error("Expected a {expected}-dimensional embedding, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

impl IntelligenceError {
    /// Whether retrying the same request may succeed
    ///
    /// Transport failures, rate limiting and server errors are transient. A response
    /// that arrived but could not be used is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Malformed { .. } | Self::Dimension { .. } => false,
        }
    }
}

/// A service that can title, summarize and embed text
#[async_trait]
pub trait ContentIntelligence: Send + Sync {
    /// Checks that the service is reachable and configured; called once at startup
    async fn health_check(&self) -> Result<(), IntelligenceError>;

    /// Produces a title and summary for a chunk of `url`
    async fn summarize(&self, text: &str, url: &str) -> Result<ChunkSummary, IntelligenceError>;

    /// Produces the embedding vector of `text`
    async fn embed(&self, text: &str) -> Result<Vec<f32>, IntelligenceError>;
}
