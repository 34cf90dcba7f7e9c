use crate::robots::RobotsRules;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<RobotsRules>>>;

/// Per-origin robots.txt cache
///
/// Each origin's robots.txt is fetched at most once; concurrent lookups for the same
/// origin wait on the first fetch.
#[derive(Debug, Default)]
pub struct RobotsCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the rules for `origin`, running `load` the first time it is seen
    pub async fn get_or_load<F, Fut>(&self, origin: &str, load: F) -> Arc<RobotsRules>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = RobotsRules>,
    {
        let slot = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            entries.entry(origin.to_string()).or_default().clone()
        };

        slot.get_or_init(|| async move { Arc::new(load().await) })
            .await
            .clone()
    }

    /// Number of origins cached
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
