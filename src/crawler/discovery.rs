//! Discovery traversal
//!
//! A single sequential breadth-first walk from the seed URL. Every page that fetches
//! successfully is added to the sitemap and its in-scope links are followed until
//! nothing new is reachable. The sitemap is saved before the traversal returns, so the
//! fetch phase always starts from a complete, persisted seed list.

use crate::crawler::fetcher::Fetcher;
use crate::sitemap::SitemapStore;
use crate::storage::StorageResult;
use crate::url::{normalize_url, PageUrl};
use std::collections::{HashSet, VecDeque};
use tracing::{debug, info, warn, Instrument, Span};

/// Counters from one discovery traversal
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryStats {
    /// Pages requested
    pub visited: usize,
    /// Pages that failed to fetch
    pub failed: usize,
    /// URLs in the sitemap when the traversal finished
    pub discovered: usize,
}

/// Walks the site from `seed` to a fixpoint, filling and saving `sitemap`
///
/// Fetch failures are logged and skipped. Only a failure to save the sitemap is an
/// error.
pub async fn discover(
    fetcher: &dyn Fetcher,
    sitemap: &SitemapStore,
    seed: &str,
    parent: &Span,
) -> StorageResult<DiscoveryStats> {
    let span = tracing::info_span!(parent: parent, "discovery", seed = %seed);
    traverse(fetcher, sitemap, seed).instrument(span).await
}

async fn traverse(
    fetcher: &dyn Fetcher,
    sitemap: &SitemapStore,
    seed: &str,
) -> StorageResult<DiscoveryStats> {
    let scope = sitemap.scope();
    let mut stats = DiscoveryStats::default();
    let mut visited: HashSet<PageUrl> = HashSet::new();
    let mut frontier: VecDeque<PageUrl> = VecDeque::new();

    let seed = normalize_url(seed);
    visited.insert(seed.clone());
    frontier.push_back(seed);

    info!("Starting discovery");

    while let Some(url) = frontier.pop_front() {
        stats.visited += 1;

        let page = match fetcher.fetch(url.as_str()).await {
            Ok(page) => page,
            Err(e) => {
                warn!(url = %url, error = %e, "Discovery fetch failed");
                stats.failed += 1;
                continue;
            }
        };

        // A redirect may land on a URL reached separately
        visited.insert(page.url.clone());
        if sitemap.add(page.url.as_str()) {
            debug!(url = %page.url, "Discovered");
        }

        for link in &page.links {
            if !scope.contains(link) {
                continue;
            }
            let link = normalize_url(link);
            if visited.insert(link.clone()) {
                frontier.push_back(link);
            }
        }
    }

    sitemap.save()?;
    stats.discovered = sitemap.len();

    info!(
        visited = stats.visited,
        failed = stats.failed,
        discovered = stats.discovered,
        "Discovery complete, sitemap saved to {}",
        sitemap.path().display()
    );

    Ok(stats)
}
