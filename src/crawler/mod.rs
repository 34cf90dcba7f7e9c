//! Crawler module for page discovery and fetching
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`Fetcher`] trait
//! - HTML parsing and both link extraction strategies
//! - The sequential discovery traversal
//! - The shared frontier and the parallel fetch scheduler
//! - Overall ingest coordination

mod coordinator;
mod discovery;
mod fetcher;
mod frontier;
mod parser;
mod progress;
mod scheduler;

pub use coordinator::{run_ingest, Coordinator};
pub use discovery::{discover, DiscoveryStats};
pub use fetcher::{build_http_client, FetchError, FetchedPage, Fetcher, HttpFetcher};
pub use frontier::{FetchTask, Frontier, FrontierSnapshot};
pub use parser::{extract_markup_links, html_to_text, parse_html, ParsedPage};
pub use progress::ProgressTracker;
pub use scheduler::{CrawlReport, FetchScheduler};
