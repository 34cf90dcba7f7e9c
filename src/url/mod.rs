//! URL handling for Doc-Trawler
//!
//! Normalization for frontier and sitemap membership, the crawl scope filter, and
//! host matching for excluded domains.

mod domain;
mod normalize;
mod scope;

pub use domain::{extract_domain, is_excluded_domain, matches_wildcard};
pub use normalize::{normalize_url, PageUrl};
pub use scope::{in_scope, Scope};

pub(crate) use normalize::normalize_path;
