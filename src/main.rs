//! Doc-Trawler main entry point
//!
//! This is the command-line interface for the Doc-Trawler documentation ingester.

use anyhow::Context;
use clap::Parser;
use doc_trawler::config::{
    compute_config_hash, load_config_or_default, persist_overrides, validate, Config, ConfigOrigin,
};
use doc_trawler::crawler::{Coordinator, CrawlReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Doc-Trawler: a scoped documentation ingester
///
/// Doc-Trawler discovers every page under one site path, splits each page into
/// chunks, asks a local model for a title, summary and embedding per chunk, and
/// writes one JSON record per chunk.
#[derive(Parser, Debug)]
#[command(name = "doc-trawler")]
#[command(version = "1.0.0")]
#[command(about = "A scoped documentation ingester", long_about = None)]
struct Cli {
    /// Root URL to ingest; only pages beneath its path are crawled
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = "doc-trawler.toml")]
    config: PathBuf,

    /// Number of concurrent fetch workers
    #[arg(long)]
    max_concurrent: Option<u32>,

    /// Retries per page before it is dropped
    #[arg(long)]
    max_retries: Option<u32>,

    /// Directory for chunk records and the sitemap
    #[arg(long)]
    output_dir: Option<String>,

    /// Base URL of the Ollama-compatible service
    #[arg(long)]
    ollama_url: Option<String>,

    /// Model used for titles and summaries
    #[arg(long)]
    ollama_model: Option<String>,

    /// Model used for embeddings
    #[arg(long)]
    ollama_embed_model: Option<String>,

    /// Expected embedding length
    #[arg(long)]
    embedding_dim: Option<usize>,

    /// Maximum characters per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    /// Applies explicit command-line values to `config`
    ///
    /// Returns true if any value was given.
    fn apply_overrides(&self, config: &mut Config) -> bool {
        let mut changed = false;

        if let Some(url) = &self.url {
            config.crawl.url = url.clone();
            changed = true;
        }
        if let Some(n) = self.max_concurrent {
            config.crawl.max_concurrent = n;
            changed = true;
        }
        if let Some(n) = self.max_retries {
            config.crawl.max_retries = n;
            changed = true;
        }
        if let Some(n) = self.chunk_size {
            config.crawl.chunk_size = n;
            changed = true;
        }
        if let Some(dir) = &self.output_dir {
            config.output.output_dir = dir.clone();
            changed = true;
        }
        if let Some(url) = &self.ollama_url {
            config.intelligence.base_url = url.clone();
            changed = true;
        }
        if let Some(model) = &self.ollama_model {
            config.intelligence.model = model.clone();
            changed = true;
        }
        if let Some(model) = &self.ollama_embed_model {
            config.intelligence.embed_model = model.clone();
            changed = true;
        }
        if let Some(dim) = self.embedding_dim {
            config.intelligence.embedding_dim = dim;
            changed = true;
        }

        changed
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, origin) = load_config_or_default(&cli.config);
    if origin == ConfigOrigin::File {
        let hash = compute_config_hash(&cli.config)
            .with_context(|| format!("Failed to hash {}", cli.config.display()))?;
        tracing::info!("Configuration loaded successfully (hash: {})", hash);
    }

    let overridden = cli.apply_overrides(&mut config);
    validate(&config).context("Invalid configuration")?;

    if cli.dry_run {
        return handle_dry_run(&config);
    }

    // A corrupt file is never overwritten
    if overridden && origin != ConfigOrigin::Corrupt {
        persist_overrides(&cli.config, &config)
            .with_context(|| format!("Failed to save {}", cli.config.display()))?;
    }

    let report = handle_ingest(config, !cli.quiet).await?;
    if !cli.quiet {
        print_report(&report);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
///
/// `RUST_LOG` takes precedence when set.
fn setup_logging(verbose: u8, quiet: bool) {
    let default_filter = if quiet {
        // Only show errors
        "error"
    } else {
        match verbose {
            0 => "doc_trawler=info,warn",
            1 => "doc_trawler=debug,info",
            2 => "doc_trawler=trace,debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    let scope = doc_trawler::Scope::new(&config.crawl.url).context("Invalid root URL")?;

    println!("=== Doc-Trawler Dry Run ===\n");

    println!("Crawl:");
    println!("  Root URL: {}", config.crawl.url);
    println!("  Scope: {}", scope);
    println!("  Max concurrent: {}", config.crawl.max_concurrent);
    println!(
        "  Max retries: {} ({}ms apart)",
        config.crawl.max_retries, config.crawl.retry_delay_ms
    );
    println!("  Chunk size: {} chars", config.crawl.chunk_size);
    println!(
        "  Politeness delay: {}ms + up to {}ms jitter",
        config.crawl.politeness_delay_ms, config.crawl.politeness_jitter_ms
    );
    println!("  Respect robots.txt: {}", config.crawl.respect_robots);

    println!("\nExcluded Domains ({}):", config.crawl.excluded_domains.len());
    for domain in &config.crawl.excluded_domains {
        println!("  - {}", domain);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.output_dir);
    println!("  Sitemap: {}", config.output.sitemap_file);

    println!("\nContent Intelligence:");
    println!("  Endpoint: {}", config.intelligence.base_url);
    println!("  Model: {}", config.intelligence.model);
    println!(
        "  Embedding model: {} ({} dimensions)",
        config.intelligence.embed_model, config.intelligence.embedding_dim
    );

    println!("\n✓ Configuration is valid");
    println!("✓ Would ingest everything under {}", scope);

    Ok(())
}

/// Handles the main ingest operation
async fn handle_ingest(config: Config, show_progress: bool) -> anyhow::Result<CrawlReport> {
    tracing::info!(
        "Max concurrent: {}, max retries: {}, chunk size: {}",
        config.crawl.max_concurrent,
        config.crawl.max_retries,
        config.crawl.chunk_size
    );

    let coordinator = Coordinator::from_config(config)
        .context("Failed to build HTTP clients")?
        .with_progress(show_progress);

    match coordinator.run().await {
        Ok(report) => {
            tracing::info!("Ingest completed successfully");
            Ok(report)
        }
        Err(e) => {
            tracing::error!("Ingest failed: {}", e);
            Err(e.into())
        }
    }
}

fn print_report(report: &CrawlReport) {
    println!("\n=== Ingest Summary ===");
    println!("  Seed URLs: {}", report.seeds);
    println!("  Pages processed: {}", report.processed);
    println!("  Pages dropped: {}", report.dropped);
    println!("  Chunks written: {}", report.chunks_written);
    if report.chunk_failures > 0 {
        println!("  Chunk write failures: {}", report.chunk_failures);
    }
}
