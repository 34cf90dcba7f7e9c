//! Configuration module for Doc-Trawler
//!
//! This module handles loading, parsing, validating and persisting TOML configuration.
//! Every key is optional. A corrupt file never aborts a run: it is reported and the
//! defaults are used in memory.
//!
//! # Example
//!
//! ```no_run
//! use doc_trawler::config::load_config_or_default;
//! use std::path::Path;
//!
//! let (config, _origin) = load_config_or_default(Path::new("doc-trawler.toml"));
//! println!("Crawling {} with {} workers", config.crawl.url, config.crawl.max_concurrent);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlConfig, IntelligenceConfig, OutputConfig};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_or_default, persist_overrides, ConfigOrigin,
};
pub use validation::validate;
