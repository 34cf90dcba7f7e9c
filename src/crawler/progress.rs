//! Crawl progress
//!
//! Observability only: nothing in the crawl reads these numbers to make decisions.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};

const BAR_TEMPLATE: &str = "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}";

/// Counts URLs that will not be retried again, against the seed count
#[derive(Debug)]
pub struct ProgressTracker {
    completed: AtomicU64,
    total: u64,
    bar: Option<ProgressBar>,
}

impl ProgressTracker {
    /// A tracker that only counts
    pub fn hidden(total: u64) -> Self {
        Self {
            completed: AtomicU64::new(0),
            total,
            bar: None,
        }
    }

    /// A tracker that also draws a progress bar on stderr
    pub fn with_bar(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
            bar.set_style(style.progress_chars("=> "));
        }
        Self {
            completed: AtomicU64::new(0),
            total,
            bar: Some(bar),
        }
    }

    /// Records one finished URL (fetched, or dropped after its last retry)
    pub fn advance(&self, url: &str) -> u64 {
        let completed = self.completed.fetch_add(1, Ordering::Relaxed) + 1;
        if let Some(bar) = &self.bar {
            // Pages found during the fetch phase push past the seed count
            if completed > bar.length().unwrap_or(self.total) {
                bar.inc_length(1);
            }
            bar.set_message(url.to_string());
            bar.inc(1);
        }
        completed
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    /// The seed count the tracker started with
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_past_total() {
        let tracker = ProgressTracker::hidden(2);
        assert_eq!(tracker.advance("https://ex.com/a"), 1);
        assert_eq!(tracker.advance("https://ex.com/b"), 2);
        assert_eq!(tracker.advance("https://ex.com/c"), 3);
        assert_eq!(tracker.completed(), 3);
        assert_eq!(tracker.total(), 2);
    }

    #[test]
    fn test_bar_length_grows() {
        let tracker = ProgressTracker::with_bar(1);
        tracker.advance("https://ex.com/a");
        tracker.advance("https://ex.com/b");
        assert_eq!(tracker.bar.as_ref().and_then(|b| b.length()), Some(2));
        tracker.finish();
    }
}
