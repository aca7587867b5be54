use crate::model::TrackId;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

pub const DEFAULT_URL_CACHE_CAPACITY: usize = 100;

#[derive(Debug, Default)]
struct Entries {
    urls: HashMap<TrackId, String>,
    insertion_order: VecDeque<TrackId>,
}

/// Bounded track id -> stream URL cache.
///
/// Eviction is strictly by insertion order: a hit does not refresh an entry.
/// Entries are keyed by track id only, regardless of the quality tier they
/// were resolved at.
#[derive(Clone, Debug)]
pub struct UrlCache {
    capacity: usize,
    cache: Arc<Mutex<Entries>>,
}

impl Default for UrlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_URL_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            cache: Arc::new(Mutex::new(Entries::default())),
        }
    }

    pub fn get(&self, track_id: TrackId) -> Option<String> {
        self.cache.lock().urls.get(&track_id).cloned()
    }

    pub fn contains(&self, track_id: TrackId) -> bool {
        self.cache.lock().urls.contains_key(&track_id)
    }

    /// Stores `url` and returns the evicted track id, if any.
    pub fn insert(&self, track_id: TrackId, url: String) -> Option<TrackId> {
        let mut entries = self.cache.lock();
        if entries.urls.insert(track_id, url).is_some() {
            // Overwrites keep their original position.
            return None;
        }
        entries.insertion_order.push_back(track_id);

        if entries.insertion_order.len() > self.capacity {
            let oldest = entries.insertion_order.pop_front()?;
            entries.urls.remove(&oldest);
            return Some(oldest);
        }
        None
    }

    /// Returns the cached URL or runs `resolver`, caching a resolved URL.
    ///
    /// A resolver answering `Ok(None)` (no playable URL) leaves the cache
    /// untouched, as does an error.
    pub async fn get_or_resolve<F, Fut, E>(
        &self,
        track_id: TrackId,
        resolver: F,
    ) -> Result<Option<String>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>, E>>,
    {
        if let Some(url) = self.get(track_id) {
            return Ok(Some(url));
        }

        let resolved = resolver().await?;
        if let Some(url) = &resolved {
            self.insert(track_id, url.clone());
        }
        Ok(resolved)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
