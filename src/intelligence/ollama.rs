use crate::config::IntelligenceConfig;
use crate::intelligence::{ChunkSummary, ContentIntelligence, IntelligenceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

const SUMMARY_INSTRUCTIONS: &str = "You extract titles and summaries from documentation chunks.\n\
Respond with ONLY a JSON object in this exact format:\n\
{\"title\": \"brief title here\", \"summary\": \"brief summary here\"}\n\
For the title: if this looks like the start of a document, use its title; \
otherwise derive a descriptive title for the chunk.\n\
For the summary: concisely state the main points of the chunk.";

/// Client for an Ollama-compatible HTTP API
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
    model: String,
    embed_model: String,
    embedding_dim: usize,
    summary_input_chars: usize,
}

impl OllamaClient {
    /// Builds a client from the intelligence configuration
    pub fn new(config: &IntelligenceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embed_model: config.embed_model.clone(),
            embedding_dim: config.embedding_dim,
            summary_input_chars: config.summary_input_chars,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn summary_prompt(&self, text: &str, url: &str) -> String {
        let excerpt: String = text.chars().take(self.summary_input_chars).collect();
        format!("{SUMMARY_INSTRUCTIONS}\n\nURL: {url}\n\nContent:\n{excerpt}...")
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, IntelligenceError> {
        let response = self
            .client
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|source| IntelligenceError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        check_status(endpoint, response)
    }
}

#[async_trait]
impl ContentIntelligence for OllamaClient {
    async fn health_check(&self) -> Result<(), IntelligenceError> {
        let endpoint = self.endpoint("/api/version");
        let response = self.client.get(&endpoint).send().await.map_err(|source| {
            IntelligenceError::Transport {
                endpoint: endpoint.clone(),
                source,
            }
        })?;
        let response = check_status(&endpoint, response)?;

        match response.json::<VersionResponse>().await {
            Ok(version) => {
                tracing::info!(version = %version.version, base_url = %self.base_url, "Content intelligence service is reachable")
            }
            Err(e) => tracing::debug!(error = %e, "Version response had no version field"),
        }
        Ok(())
    }

    async fn summarize(&self, text: &str, url: &str) -> Result<ChunkSummary, IntelligenceError> {
        let endpoint = self.endpoint("/api/generate");
        let request = GenerateRequest {
            model: &self.model,
            prompt: self.summary_prompt(text, url),
            stream: false,
        };

        let response = self.post_json(&endpoint, &request).await?;
        let body: GenerateResponse =
            response
                .json()
                .await
                .map_err(|e| IntelligenceError::Malformed {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                })?;

        parse_summary(body.response).map_err(|reason| IntelligenceError::Malformed {
            endpoint,
            reason,
        })
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, IntelligenceError> {
        let endpoint = self.endpoint("/api/embeddings");
        let request = EmbeddingRequest {
            model: &self.embed_model,
            prompt: text,
        };

        let response = self.post_json(&endpoint, &request).await?;
        let body: EmbeddingResponse =
            response
                .json()
                .await
                .map_err(|e| IntelligenceError::Malformed {
                    endpoint: endpoint.clone(),
                    reason: e.to_string(),
                })?;

        if body.embedding.len() != self.embedding_dim {
            return Err(IntelligenceError::Dimension {
                expected: self.embedding_dim,
                actual: body.embedding.len(),
            });
        }
        Ok(body.embedding)
    }
}

fn check_status(
    endpoint: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, IntelligenceError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(IntelligenceError::Status {
            endpoint: endpoint.to_string(),
            status,
        })
    }
}

/// Reads the model's answer, which arrives either as a JSON object or as a string
/// containing one
fn parse_summary(response: Value) -> Result<ChunkSummary, String> {
    let value = match response {
        Value::String(raw) => serde_json::from_str::<Value>(extract_json_object(&raw))
            .map_err(|e| format!("response is not JSON: {e}"))?,
        other => other,
    };
    serde_json::from_value(value).map_err(|e| format!("missing title or summary: {e}"))
}

/// Trims chatter and code fences around the first `{ ... }` in a model answer
fn extract_json_object(raw: &str) -> &str {
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw,
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Value,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct VersionResponse {
    version: String,
}
