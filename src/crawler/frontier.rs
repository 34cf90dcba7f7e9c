//! Shared crawl frontier
//!
//! Every fetch worker pulls from one [`Frontier`]. All membership changes happen
//! under a single lock, so claiming a URL (moving it from `pending` into `queued`)
//! is atomic and a URL is never fetched by two workers at once.
//!
//! The frontier is drained when nothing is pending and no claimed task is still
//! in flight. Retries are explicit [`FetchTask`] values with an attempt counter.

use crate::url::{normalize_url, PageUrl};
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// A URL waiting to be fetched, with the number of failed attempts so far
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchTask {
    pub url: PageUrl,
    pub attempt: u32,
}

impl FetchTask {
    pub fn new(url: PageUrl) -> Self {
        Self { url, attempt: 0 }
    }

    /// The same URL, one attempt later
    pub fn next_attempt(&self) -> Self {
        Self {
            url: self.url.clone(),
            attempt: self.attempt + 1,
        }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    /// Successfully fetched URLs; never fetched again
    processed: HashSet<PageUrl>,
    /// URLs claimed by a worker (in flight or waiting on a retry)
    queued: HashSet<PageUrl>,
    /// URLs given up on after exhausting their retries
    dropped: HashSet<PageUrl>,
    pending: VecDeque<FetchTask>,
    /// URLs currently in `pending`
    pending_urls: HashSet<PageUrl>,
    in_flight: usize,
}

/// Point-in-time view of the frontier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierSnapshot {
    pub processed: usize,
    pub queued: usize,
    pub dropped: usize,
    pub pending: usize,
    pub in_flight: usize,
}

/// FIFO work queue with processed/queued dedup sets
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    changed: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues URLs that are not already processed, claimed or pending
    ///
    /// Returns how many were added.
    pub fn push<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut added = 0;
        {
            let mut state = self.lock();
            for url in urls {
                let url = normalize_url(url.as_ref());
                if state.processed.contains(&url)
                    || state.queued.contains(&url)
                    || state.pending_urls.contains(&url)
                {
                    continue;
                }
                tracing::trace!(url = %url, "Added to frontier");
                state.pending_urls.insert(url.clone());
                state.pending.push_back(FetchTask::new(url));
                added += 1;
            }
        }
        if added > 0 {
            self.changed.notify_waiters();
        }
        added
    }

    /// Claims the next task, waiting while other workers may still add work
    ///
    /// Returns `None` once the frontier is drained. Tasks whose URL has since been
    /// processed are skipped.
    pub async fn next(&self) -> Option<FetchTask> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                while let Some(task) = state.pending.pop_front() {
                    state.pending_urls.remove(&task.url);

                    if state.processed.contains(&task.url) {
                        continue;
                    }
                    if task.attempt == 0 && state.queued.contains(&task.url) {
                        continue;
                    }

                    state.queued.insert(task.url.clone());
                    state.in_flight += 1;
                    return Some(task);
                }

                if state.in_flight == 0 {
                    drop(state);
                    self.changed.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Records a successful fetch of `url`
    pub fn mark_processed(&self, url: &PageUrl) {
        let mut state = self.lock();
        state.queued.remove(url);
        state.processed.insert(url.clone());
    }

    /// Ends the work on a claimed task
    pub fn finish(&self, task: &FetchTask) {
        {
            let mut state = self.lock();
            state.in_flight = state.in_flight.saturating_sub(1);
            tracing::trace!(url = %task.url, in_flight = state.in_flight, "Task finished");
        }
        self.changed.notify_waiters();
    }

    /// Puts a failed task back with its attempt counter incremented, ending the
    /// current claim
    pub fn retry(&self, task: &FetchTask) {
        {
            let mut state = self.lock();
            let next = task.next_attempt();
            state.pending_urls.insert(next.url.clone());
            state.pending.push_back(next);
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    /// Gives up on a claimed task for this run, ending the claim
    ///
    /// The URL is released from `queued`, so a later link to it enqueues it again.
    pub fn drop_task(&self, task: &FetchTask) {
        {
            let mut state = self.lock();
            state.queued.remove(&task.url);
            state.dropped.insert(task.url.clone());
            state.in_flight = state.in_flight.saturating_sub(1);
        }
        self.changed.notify_waiters();
    }

    pub fn snapshot(&self) -> FrontierSnapshot {
        let state = self.lock();
        FrontierSnapshot {
            processed: state.processed.len(),
            queued: state.queued.len(),
            dropped: state.dropped.difference(&state.processed).count(),
            pending: state.pending.len(),
            in_flight: state.in_flight,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new();
        frontier.push(["https://ex.com/a", "https://ex.com/b", "https://ex.com/c"]);

        let mut order = Vec::new();
        while let Some(task) = frontier.next().await {
            order.push(task.url.to_string());
            frontier.mark_processed(&task.url);
            frontier.finish(&task);
        }

        assert_eq!(order, vec!["https://ex.com/a", "https://ex.com/b", "https://ex.com/c"]);
    }

    #[tokio::test]
    async fn test_push_dedups_normalized_urls() {
        let frontier = Frontier::new();
        assert_eq!(frontier.push(["https://ex.com/a", "https://ex.com/a/"]), 1);

        let task = frontier.next().await.unwrap();
        // claimed URLs are not enqueued again
        assert_eq!(frontier.push(["https://ex.com/a"]), 0);

        frontier.mark_processed(&task.url);
        frontier.finish(&task);
        // nor are processed ones
        assert_eq!(frontier.push(["https://ex.com/a"]), 0);
        assert!(frontier.next().await.is_none());
    }

    #[tokio::test]
    async fn test_retry_increments_attempt() {
        let frontier = Frontier::new();
        frontier.push(["https://ex.com/a"]);

        let first = frontier.next().await.unwrap();
        assert_eq!(first.attempt, 0);
        frontier.retry(&first);

        let second = frontier.next().await.unwrap();
        assert_eq!(second.url, first.url);
        assert_eq!(second.attempt, 1);

        frontier.drop_task(&second);
        assert!(frontier.next().await.is_none());

        let snapshot = frontier.snapshot();
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[tokio::test]
    async fn test_dropped_url_can_be_rediscovered() {
        let frontier = Frontier::new();
        frontier.push(["https://ex.com/flaky"]);
        let task = frontier.next().await.unwrap();
        frontier.drop_task(&task);

        assert_eq!(frontier.push(["https://ex.com/flaky"]), 1);
        let again = frontier.next().await.unwrap();
        assert_eq!(again.attempt, 0);
    }

    #[tokio::test]
    async fn test_processed_pending_task_skipped() {
        let frontier = Frontier::new();
        frontier.push(["https://ex.com/a", "https://ex.com/b"]);
        frontier.mark_processed(&PageUrl::from("https://ex.com/b"));

        let task = frontier.next().await.unwrap();
        assert_eq!(task.url.as_str(), "https://ex.com/a");
        frontier.finish(&task);
        assert!(frontier.next().await.is_none());
    }

    #[tokio::test]
    async fn test_waiting_worker_receives_late_work() {
        let frontier = Arc::new(Frontier::new());
        frontier.push(["https://ex.com/root"]);
        let root = frontier.next().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.next().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.push(["https://ex.com/child"]);
        frontier.mark_processed(&root.url);
        frontier.finish(&root);

        let child = waiter.await.unwrap().unwrap();
        assert_eq!(child.url.as_str(), "https://ex.com/child");
    }

    #[tokio::test]
    async fn test_all_waiters_released_when_drained() {
        let frontier = Arc::new(Frontier::new());
        frontier.push(["https://ex.com/only"]);
        let task = frontier.next().await.unwrap();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move { frontier.next().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.mark_processed(&task.url);
        frontier.finish(&task);

        for waiter in waiters {
            assert!(waiter.await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_concurrent_claims_are_unique() {
        let frontier = Arc::new(Frontier::new());
        let urls: Vec<String> = (0..50).map(|i| format!("https://ex.com/p{i}")).collect();
        frontier.push(&urls);
        frontier.push(&urls);

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move {
                    let mut claimed = Vec::new();
                    while let Some(task) = frontier.next().await {
                        claimed.push(task.url.clone());
                        tokio::task::yield_now().await;
                        frontier.push([task.url.as_str()]);
                        frontier.mark_processed(&task.url);
                        frontier.finish(&task);
                    }
                    claimed
                })
            })
            .collect();

        let mut all = Vec::new();
        for worker in workers {
            all.extend(worker.await.unwrap());
        }
        let unique: HashSet<_> = all.iter().cloned().collect();
        assert_eq!(all.len(), 50);
        assert_eq!(unique.len(), 50);
    }
}
