use serde::{Deserialize, Serialize};

/// Main configuration structure for Doc-Trawler
///
/// Every key is optional; anything missing from the file takes its default.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
    pub intelligence: IntelligenceConfig,
}

/// Crawl behavior configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Root URL; its network location and path define the crawl scope
    pub url: String,

    /// Worker pool size, also the number of fetches allowed in flight
    pub max_concurrent: u32,

    /// Retries after the first failed fetch of a page
    pub max_retries: u32,

    /// Fixed delay between fetch retries (milliseconds)
    pub retry_delay_ms: u64,

    /// Maximum chunk length in characters
    pub chunk_size: usize,

    /// User agent sent with every request
    pub user_agent: String,

    /// Mean politeness delay before each request (milliseconds)
    pub politeness_delay_ms: u64,

    /// Upper bound of the random jitter added to the politeness delay (milliseconds)
    pub politeness_jitter_ms: u64,

    /// Whether robots.txt exclusions are honored
    pub respect_robots: bool,

    /// Drop links to other hosts from the structured link list
    pub exclude_external_links: bool,

    /// Markup tags skipped when converting pages to text
    pub excluded_tags: Vec<String>,

    /// Host patterns that are never fetched ("example.com" or "*.example.com")
    pub excluded_domains: Vec<String>,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            url: "https://example.com".to_string(),
            max_concurrent: 5,
            max_retries: 3,
            retry_delay_ms: 1000,
            chunk_size: 5000,
            user_agent: concat!("doc-trawler/", env!("CARGO_PKG_VERSION")).to_string(),
            politeness_delay_ms: 1000,
            politeness_jitter_ms: 300,
            respect_robots: true,
            exclude_external_links: true,
            excluded_tags: vec!["script".to_string(), "style".to_string()],
            excluded_domains: Vec::new(),
            request_timeout_secs: 30,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving chunk records and the sitemap
    pub output_dir: String,

    /// Sitemap file name inside the output directory
    pub sitemap_file: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            output_dir: "crawled_data".to_string(),
            sitemap_file: "sitemap.xml".to_string(),
        }
    }
}

/// Content intelligence (Ollama-compatible) configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IntelligenceConfig {
    /// Base URL of the service
    pub base_url: String,

    /// Model used for titles and summaries
    pub model: String,

    /// Model used for embeddings
    pub embed_model: String,

    /// Dimensionality of every embedding vector
    pub embedding_dim: usize,

    /// Total embedding attempts before falling back to a zero vector
    pub embed_max_attempts: u32,

    /// Base of the exponential embedding backoff (milliseconds)
    pub embed_backoff_base_ms: u64,

    /// Per-request timeout (seconds)
    pub request_timeout_secs: u64,

    /// Characters of chunk text included in the summary prompt
    pub summary_input_chars: usize,
}

impl Default for IntelligenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.2:3b".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            embedding_dim: 768,
            embed_max_attempts: 3,
            embed_backoff_base_ms: 1000,
            request_timeout_secs: 30,
            summary_input_chars: 1000,
        }
    }
}
