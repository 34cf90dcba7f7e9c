//! Fetch scheduler
//!
//! A fixed pool of workers sharing one [`Frontier`], one [`SitemapStore`] and one
//! document pipeline. Each worker:
//! 1. claims the next task from the frontier
//! 2. fetches it while holding a concurrency permit
//! 3. on success: marks it processed, adds it to the sitemap, runs the document
//!    pipeline and enqueues the page's in-scope links
//! 4. on failure: waits the fixed retry delay and re-enqueues the task with its attempt
//!    counter incremented, or drops the URL once its retries are spent
//!
//! The run ends when the frontier is drained. The sitemap is then saved and the
//! fetcher closed.

use crate::config::CrawlConfig;
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::{FetchTask, Frontier};
use crate::crawler::parser::extract_markup_links;
use crate::crawler::progress::ProgressTracker;
use crate::pipeline::DocumentPipeline;
use crate::retry::RetryPolicy;
use crate::sitemap::SitemapStore;
use crate::url::Scope;
use crate::TrawlerError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn, Instrument, Span};
use url::Url;

/// Totals for one fetch phase
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlReport {
    /// URLs loaded from the sitemap to start the phase
    pub seeds: usize,
    /// Pages fetched successfully
    pub processed: usize,
    /// URLs given up on after their last retry
    pub dropped: usize,
    pub chunks_written: usize,
    pub chunk_failures: usize,
    /// Progress count at the end: every URL fetched or given up on
    pub completed: u64,
}

/// Runs the parallel fetch phase
pub struct FetchScheduler {
    fetcher: Arc<dyn Fetcher>,
    pipeline: DocumentPipeline,
    sitemap: Arc<SitemapStore>,
    max_concurrent: usize,
    retry_policy: RetryPolicy,
    show_progress: bool,
    span: Span,
}

/// State every worker shares for one run
struct Shared {
    fetcher: Arc<dyn Fetcher>,
    pipeline: DocumentPipeline,
    sitemap: Arc<SitemapStore>,
    frontier: Frontier,
    progress: ProgressTracker,
    permits: Arc<Semaphore>,
    retry_policy: RetryPolicy,
    processed: AtomicUsize,
    dropped: AtomicUsize,
    chunks_written: AtomicUsize,
    chunk_failures: AtomicUsize,
}

impl FetchScheduler {
    pub fn new(
        config: &CrawlConfig,
        fetcher: Arc<dyn Fetcher>,
        pipeline: DocumentPipeline,
        sitemap: Arc<SitemapStore>,
        parent: &Span,
    ) -> Self {
        Self {
            fetcher,
            pipeline,
            sitemap,
            max_concurrent: config.max_concurrent.max(1) as usize,
            retry_policy: RetryPolicy::Fixed {
                delay: Duration::from_millis(config.retry_delay_ms),
                max_retries: config.max_retries,
            },
            show_progress: false,
            span: tracing::info_span!(parent: parent, "fetch"),
        }
    }

    /// Draws a progress bar while the phase runs
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Fetches and processes `seeds` and everything in scope reachable from them
    ///
    /// # Errors
    ///
    /// Fails when a worker task panics or the final sitemap save fails. Page and
    /// chunk failures are counted in the report instead.
    pub async fn run<I, S>(&self, seeds: I) -> crate::Result<CrawlReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let frontier = Frontier::new();
        let seeds = frontier.push(seeds);

        let progress = if self.show_progress {
            ProgressTracker::with_bar(seeds as u64)
        } else {
            ProgressTracker::hidden(seeds as u64)
        };

        let shared = Arc::new(Shared {
            fetcher: Arc::clone(&self.fetcher),
            pipeline: self.pipeline.clone(),
            sitemap: Arc::clone(&self.sitemap),
            frontier,
            progress,
            permits: Arc::new(Semaphore::new(self.max_concurrent)),
            retry_policy: self.retry_policy,
            processed: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            chunks_written: AtomicUsize::new(0),
            chunk_failures: AtomicUsize::new(0),
        });

        self.span
            .in_scope(|| info!(seeds, workers = self.max_concurrent, "Starting fetch phase"));

        let mut workers = JoinSet::new();
        for id in 0..self.max_concurrent {
            let span = tracing::debug_span!(parent: &self.span, "worker", id);
            workers.spawn(run_worker(Arc::clone(&shared)).instrument(span));
        }

        let mut failure = None;
        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                self.span.in_scope(|| error!(error = %e, "Fetch worker failed"));
                failure.get_or_insert_with(|| TrawlerError::Worker(e.to_string()));
            }
        }

        shared.progress.finish();
        let snapshot = shared.frontier.snapshot();
        self.span.in_scope(|| debug!(?snapshot, "Frontier drained"));

        self.sitemap.save()?;
        self.fetcher.close().await;

        if let Some(e) = failure {
            return Err(e);
        }

        let report = CrawlReport {
            seeds,
            processed: shared.processed.load(Ordering::Relaxed),
            dropped: shared.dropped.load(Ordering::Relaxed),
            chunks_written: shared.chunks_written.load(Ordering::Relaxed),
            chunk_failures: shared.chunk_failures.load(Ordering::Relaxed),
            completed: shared.progress.completed(),
        };

        self.span.in_scope(|| {
            info!(
                processed = report.processed,
                dropped = report.dropped,
                chunks = report.chunks_written,
                chunk_failures = report.chunk_failures,
                "Fetch phase complete"
            )
        });

        Ok(report)
    }
}

/// A task claimed from the frontier
///
/// Dropping the claim finishes the task unless it was retried or dropped first.
/// A worker that panics mid-task therefore still releases its claim, and the
/// other workers can drain the frontier.
struct Claim<'a> {
    frontier: &'a Frontier,
    task: FetchTask,
    settled: bool,
}

impl<'a> Claim<'a> {
    fn new(frontier: &'a Frontier, task: FetchTask) -> Self {
        Self {
            frontier,
            task,
            settled: false,
        }
    }

    fn retry(mut self) {
        self.frontier.retry(&self.task);
        self.settled = true;
    }

    fn give_up(mut self) {
        self.frontier.drop_task(&self.task);
        self.settled = true;
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.frontier.finish(&self.task);
        }
    }
}

async fn run_worker(shared: Arc<Shared>) {
    while let Some(task) = shared.frontier.next().await {
        let claim = Claim::new(&shared.frontier, task);
        let Ok(permit) = Arc::clone(&shared.permits).acquire_owned().await else {
            break;
        };

        let task = &claim.task;
        debug!(url = %task.url, attempt = task.attempt, "Fetching");

        match shared.fetcher.fetch(task.url.as_str()).await {
            Ok(page) => {
                handle_page(&shared, task, page).await;
                drop(permit);
            }
            Err(e) => {
                drop(permit);
                if shared.retry_policy.should_retry(task.attempt) {
                    warn!(
                        url = %task.url,
                        attempt = task.attempt + 1,
                        max_attempts = shared.retry_policy.max_attempts(),
                        error = %e,
                        "Fetch failed, retrying"
                    );
                    tokio::time::sleep(shared.retry_policy.delay_for(task.attempt)).await;
                    claim.retry();
                } else {
                    error!(
                        url = %task.url,
                        attempts = task.attempt + 1,
                        error = %e,
                        "Fetch failed, giving up"
                    );
                    shared.dropped.fetch_add(1, Ordering::Relaxed);
                    shared.progress.advance(task.url.as_str());
                    claim.give_up();
                }
            }
        }
    }
}

async fn handle_page(shared: &Shared, task: &FetchTask, page: FetchedPage) {
    shared.frontier.mark_processed(&task.url);
    if page.url != task.url {
        debug!(from = %task.url, to = %page.url, "Followed redirect");
        shared.frontier.mark_processed(&page.url);
    }
    shared.processed.fetch_add(1, Ordering::Relaxed);

    shared.sitemap.add(page.url.as_str());
    shared.progress.advance(page.url.as_str());

    let outcome = shared
        .pipeline
        .process_document(page.url.as_str(), &page.text)
        .await;
    shared
        .chunks_written
        .fetch_add(outcome.written, Ordering::Relaxed);
    shared
        .chunk_failures
        .fetch_add(outcome.failed, Ordering::Relaxed);

    let links = collect_links(&page, shared.sitemap.scope());
    let added = shared.frontier.push(&links);
    debug!(url = %page.url, links = links.len(), added, "Enqueued links");
}

/// Merges the fetcher's structured links with links scanned from the raw markup,
/// keeping those in scope
///
/// Markup links resolve against the URL the page was served from, which keeps a
/// trailing slash the normalized URL has lost. Duplicates are left for the
/// frontier to drop.
fn collect_links(page: &FetchedPage, scope: &Scope) -> Vec<String> {
    let mut links = page.links.clone();

    if let Some(markup) = &page.markup {
        let base = match &page.base_url {
            Some(base) => Ok(base.clone()),
            None => Url::parse(page.url.as_str()),
        };
        match base {
            Ok(base) => links.extend(extract_markup_links(markup, &base)),
            Err(e) => debug!(url = %page.url, error = %e, "Cannot resolve markup links"),
        }
    }

    links.retain(|link| scope.contains(link));
    links
}
