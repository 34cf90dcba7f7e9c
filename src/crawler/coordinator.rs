//! Ingest coordinator - top-level run orchestration
//!
//! One run moves through four stages:
//! 1. Health check of the content intelligence service (fatal on failure)
//! 2. Discovery traversal to a fixpoint, then sitemap save
//! 3. Sitemap load under the current scope (an empty sitemap aborts the run)
//! 4. Parallel fetch phase: fetch, chunk, enrich and persist every page
//!
//! Discovery finishes completely before the fetch phase starts.

use crate::config::Config;
use crate::crawler::discovery::discover;
use crate::crawler::fetcher::{Fetcher, HttpFetcher};
use crate::crawler::scheduler::{CrawlReport, FetchScheduler};
use crate::intelligence::{ContentIntelligence, OllamaClient};
use crate::pipeline::{DocumentPipeline, Enricher};
use crate::sitemap::SitemapStore;
use crate::storage::{ChunkSink, JsonFileSink};
use crate::url::Scope;
use crate::TrawlerError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Instrument, Span};

/// Main ingest coordinator
pub struct Coordinator {
    config: Arc<Config>,
    fetcher: Arc<dyn Fetcher>,
    intelligence: Arc<dyn ContentIntelligence>,
    sink: Arc<dyn ChunkSink>,
    show_progress: bool,
    span: Span,
}

impl Coordinator {
    /// Creates a coordinator from explicit collaborators
    pub fn new(
        config: Config,
        fetcher: Arc<dyn Fetcher>,
        intelligence: Arc<dyn ContentIntelligence>,
        sink: Arc<dyn ChunkSink>,
    ) -> Self {
        let span = tracing::info_span!(
            "ingest",
            root = %config.crawl.url,
            output = %config.output.output_dir
        );

        Self {
            config: Arc::new(config),
            fetcher,
            intelligence,
            sink,
            show_progress: false,
            span,
        }
    }

    /// Creates a coordinator with the built-in HTTP fetcher, Ollama client and JSON
    /// file sink
    ///
    /// # Errors
    ///
    /// Fails if either HTTP client cannot be built.
    pub fn from_config(config: Config) -> crate::Result<Self> {
        let fetcher = Arc::new(HttpFetcher::new(&config.crawl)?);
        let intelligence = Arc::new(OllamaClient::new(&config.intelligence)?);
        let sink = Arc::new(JsonFileSink::new(&config.output.output_dir));
        Ok(Self::new(config, fetcher, intelligence, sink))
    }

    /// Draws a progress bar during the fetch phase
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// The crawl scope of the configured root URL
    pub fn scope(&self) -> crate::Result<Scope> {
        Ok(Scope::new(&self.config.crawl.url)?)
    }

    /// Where the sitemap of this run is saved
    pub fn sitemap_path(&self) -> PathBuf {
        Path::new(&self.config.output.output_dir).join(&self.config.output.sitemap_file)
    }

    /// Runs the whole ingest
    ///
    /// # Errors
    ///
    /// * `TrawlerError::Intelligence` - the health check failed; nothing was fetched
    /// * `TrawlerError::NoUrlsDiscovered` - discovery left an empty sitemap
    /// * `TrawlerError::Storage` - the sitemap could not be saved or read
    pub async fn run(&self) -> crate::Result<CrawlReport> {
        self.run_stages().instrument(self.span.clone()).await
    }

    async fn run_stages(&self) -> crate::Result<CrawlReport> {
        let scope = self.scope()?;
        info!(scope = %scope, "Starting ingest");

        if let Err(e) = self.intelligence.health_check().await {
            error!(
                error = %e,
                endpoint = %self.config.intelligence.base_url,
                "Content intelligence service is unavailable, aborting"
            );
            return Err(e.into());
        }
        info!("Content intelligence service is healthy");

        let sitemap = Arc::new(SitemapStore::new(scope.clone(), self.sitemap_path()));
        discover(
            self.fetcher.as_ref(),
            &sitemap,
            &self.config.crawl.url,
            &self.span,
        )
        .await?;

        let seeds = sitemap.load(&scope)?;
        if seeds.is_empty() {
            error!(path = %sitemap.path().display(), "No URLs found in sitemap");
            return Err(TrawlerError::NoUrlsDiscovered {
                sitemap: sitemap.path().display().to_string(),
            });
        }
        info!(urls = seeds.len(), "Loaded seed URLs from sitemap");

        let enricher = Enricher::new(Arc::clone(&self.intelligence), &self.config.intelligence);
        let pipeline = DocumentPipeline::new(
            self.config.crawl.chunk_size,
            enricher,
            Arc::clone(&self.sink),
            self.span.clone(),
        );

        let scheduler = FetchScheduler::new(
            &self.config.crawl,
            Arc::clone(&self.fetcher),
            pipeline,
            Arc::clone(&sitemap),
            &self.span,
        )
        .with_progress(self.show_progress);

        let report = scheduler.run(&seeds).await?;
        info!(
            processed = report.processed,
            dropped = report.dropped,
            chunks = report.chunks_written,
            "Ingest complete"
        );
        Ok(report)
    }
}

/// Runs a complete ingest with the built-in collaborators
///
/// # Example
///
/// ```no_run
/// use doc_trawler::config::load_config;
/// use doc_trawler::crawler::run_ingest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("doc-trawler.toml"))?;
/// let report = run_ingest(config).await?;
/// println!("{} pages processed", report.processed);
/// # Ok(())
/// # }
/// ```
pub async fn run_ingest(config: Config) -> crate::Result<CrawlReport> {
    Coordinator::from_config(config)?.run().await
}
