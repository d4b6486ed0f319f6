//! Bounded cache of parsed remote stylesheets.
//!
//! Entries are evicted least-recently-used first. A URL being fetched is marked
//! in flight so concurrent callers wait for that single fetch instead of
//! issuing their own.

use crate::error::Result;
use crate::fetch::StylesheetFetcher;
use css_syntax::{Stylesheet, parse_stylesheet};
use lru::LruCache;
use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use url::Url;

struct CacheState {
    /// `None` when caching is disabled. Grows on demand; `capacity` bounds it.
    entries: Option<LruCache<Url, Arc<Stylesheet>>>,
    capacity: usize,
    in_flight: HashSet<Url>,
}

/// Remote stylesheet cache shared by every call made with one configuration.
pub struct StylesheetCache {
    fetcher: Arc<dyn StylesheetFetcher>,
    state: Mutex<CacheState>,
    ready: Condvar,
}

/// Clears the in-flight mark for a URL and wakes waiters, even if the fetch unwinds.
struct InFlight<'cache> {
    cache: &'cache StylesheetCache,
    url: Url,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.cache.lock().in_flight.remove(&self.url);
        self.cache.ready.notify_all();
    }
}

impl StylesheetCache {
    /// A `capacity` of zero disables caching; every lookup fetches again.
    pub fn new(capacity: usize, fetcher: Arc<dyn StylesheetFetcher>) -> Self {
        Self {
            fetcher,
            state: Mutex::new(CacheState {
                entries: (capacity > 0).then(LruCache::unbounded),
                capacity,
                in_flight: HashSet::new(),
            }),
            ready: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the stylesheet at `url`, fetching and parsing it on a miss.
    ///
    /// A hit refreshes the entry's recency. Failed fetches are not cached.
    ///
    /// # Errors
    /// Propagates the fetcher's error.
    pub fn get_or_fetch(&self, url: &Url) -> Result<Arc<Stylesheet>> {
        let mut state = self.lock();
        if state.entries.is_none() {
            drop(state);
            return self.load(url);
        }
        loop {
            if let Some(sheet) = state.entries.as_mut().and_then(|entries| entries.get(url)) {
                log::debug!("stylesheet cache hit: {url}");
                return Ok(Arc::clone(sheet));
            }
            if !state.in_flight.contains(url) {
                break;
            }
            log::trace!("waiting for in-flight fetch of {url}");
            state = self
                .ready
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        log::debug!("stylesheet cache miss: {url}");
        state.in_flight.insert(url.clone());
        drop(state);

        let _in_flight = InFlight {
            cache: self,
            url: url.clone(),
        };
        let sheet = self.load(url)?;
        let mut guard = self.lock();
        let capacity = guard.capacity;
        if let Some(entries) = guard.entries.as_mut() {
            entries.put(url.clone(), Arc::clone(&sheet));
            while entries.len() > capacity
                && let Some((evicted, _)) = entries.pop_lru()
            {
                log::debug!("stylesheet cache evicted {evicted}");
            }
        }
        drop(guard);
        Ok(sheet)
    }

    fn load(&self, url: &Url) -> Result<Arc<Stylesheet>> {
        let text = self.fetcher.fetch(url)?;
        Ok(Arc::new(parse_stylesheet(&text)))
    }

    /// True if `url` is cached. Does not touch recency.
    pub fn contains(&self, url: &Url) -> bool {
        self.lock()
            .entries
            .as_ref()
            .is_some_and(|entries| entries.contains(url))
    }

    /// Remove every entry.
    pub fn clear(&self) {
        if let Some(entries) = self.lock().entries.as_mut() {
            entries.clear();
        }
    }

    /// Number of cached stylesheets.
    pub fn len(&self) -> usize {
        self.lock().entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of entries; zero when caching is disabled.
    pub fn capacity(&self) -> usize {
        self.lock().capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InlineError;
    use core::error::Error;
    use core::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        calls: AtomicUsize,
    }

    impl StylesheetFetcher for Counting {
        fn fetch(&self, url: &Url) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if url.path().ends_with("broken.css") {
                return Err(InlineError::Network {
                    location: url.to_string(),
                    source: "boom".into(),
                });
            }
            Ok(format!("p {{ content: '{}' }}", url.path()))
        }
    }

    fn url(path: &str) -> Result<Url, Box<dyn Error>> {
        Ok(Url::parse("https://example.com/")?.join(path)?)
    }

    #[test]
    fn hits_do_not_refetch() -> Result<(), Box<dyn Error>> {
        let fetcher = Arc::new(Counting::default());
        let cache = StylesheetCache::new(2, Arc::clone(&fetcher) as Arc<dyn StylesheetFetcher>);
        let first = cache.get_or_fetch(&url("a.css")?)?;
        let second = cache.get_or_fetch(&url("a.css")?)?;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
        Ok(())
    }

    #[test]
    fn evicts_least_recently_used() -> Result<(), Box<dyn Error>> {
        let fetcher = Arc::new(Counting::default());
        let cache = StylesheetCache::new(2, Arc::clone(&fetcher) as Arc<dyn StylesheetFetcher>);
        cache.get_or_fetch(&url("a.css")?)?;
        cache.get_or_fetch(&url("b.css")?)?;
        // Touch `a` so that `b` becomes the eviction candidate.
        cache.get_or_fetch(&url("a.css")?)?;
        cache.get_or_fetch(&url("c.css")?)?;
        assert!(cache.contains(&url("a.css")?));
        assert!(!cache.contains(&url("b.css")?));
        assert!(cache.contains(&url("c.css")?));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 3);
        Ok(())
    }

    #[test]
    fn zero_capacity_always_refetches() -> Result<(), Box<dyn Error>> {
        let fetcher = Arc::new(Counting::default());
        let cache = StylesheetCache::new(0, Arc::clone(&fetcher) as Arc<dyn StylesheetFetcher>);
        cache.get_or_fetch(&url("a.css")?)?;
        cache.get_or_fetch(&url("a.css")?)?;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 0);
        Ok(())
    }

    #[test]
    fn failures_are_not_cached() -> Result<(), Box<dyn Error>> {
        let fetcher = Arc::new(Counting::default());
        let cache = StylesheetCache::new(4, Arc::clone(&fetcher) as Arc<dyn StylesheetFetcher>);
        let broken = url("broken.css")?;
        assert!(matches!(cache.get_or_fetch(&broken), Err(InlineError::Network { .. })));
        assert!(matches!(cache.get_or_fetch(&broken), Err(InlineError::Network { .. })));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
        Ok(())
    }

    #[test]
    fn clear_empties_the_cache() -> Result<(), Box<dyn Error>> {
        let cache = StylesheetCache::new(4, Arc::new(Counting::default()));
        cache.get_or_fetch(&url("a.css")?)?;
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.capacity(), 4);
        Ok(())
    }

    #[test]
    fn large_capacity_allocates_lazily() -> Result<(), Box<dyn Error>> {
        let cache = StylesheetCache::new(usize::MAX, Arc::new(Counting::default()));
        assert_eq!(cache.capacity(), usize::MAX);
        cache.get_or_fetch(&url("a.css")?)?;
        cache.get_or_fetch(&url("b.css")?)?;
        assert_eq!(cache.len(), 2);
        Ok(())
    }
}
