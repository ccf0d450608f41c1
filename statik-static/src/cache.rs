//! Path resolution cache
//!
//! Memoizes the normalized lookup path for a `(root, pathname)` pair so hot
//! paths skip the string work on every request. Purely an optimization: a
//! miss recomputes the same value a hit would return.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock};

/// Upper bound on cached entries
pub const PATH_CACHE_CAPACITY: usize = 1000;

const KEY_SEPARATOR: char = '\0';

static SHARED: LazyLock<Arc<PathCache>> =
    LazyLock::new(|| Arc::new(PathCache::with_capacity(PATH_CACHE_CAPACITY)));

/// Bounded LRU from `root + '\0' + pathname` to the normalized pathname
pub struct PathCache {
    entries: Mutex<LruCache<String, String>>,
}

impl PathCache {
    /// Create a cache holding at most `capacity` entries (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// The process-wide cache shared by every middleware instance
    pub fn shared() -> Arc<PathCache> {
        Arc::clone(&SHARED)
    }

    /// Return the cached value for `(root, pathname)`, computing and
    /// inserting it on a miss
    pub fn resolve<F>(&self, pathname: &str, root: &str, compute: F) -> String
    where
        F: FnOnce(&str) -> String,
    {
        let key = cache_key(root, pathname);

        if let Some(hit) = self.entries.lock().get(&key) {
            tracing::trace!("path cache hit: {}", pathname);
            return hit.clone();
        }

        let value = compute(pathname);
        self.entries.lock().put(key, value.clone());
        value
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `(root, pathname)` is cached, without touching recency
    pub fn contains(&self, pathname: &str, root: &str) -> bool {
        self.entries.lock().contains(&cache_key(root, pathname))
    }
}

fn cache_key(root: &str, pathname: &str) -> String {
    let mut key = String::with_capacity(root.len() + pathname.len() + 1);
    key.push_str(root);
    key.push(KEY_SEPARATOR);
    key.push_str(pathname);
    key
}

/// Collapse runs of `/` into a single slash
pub fn normalize_pathname(pathname: &str) -> String {
    let mut out = String::with_capacity(pathname.len());
    let mut prev_slash = false;
    for c in pathname.chars() {
        if c == '/' {
            if prev_slash {
                continue;
            }
            prev_slash = true;
        } else {
            prev_slash = false;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_resolve_memoizes() {
        let cache = PathCache::with_capacity(4);
        let calls = Cell::new(0);
        let compute = |p: &str| {
            calls.set(calls.get() + 1);
            normalize_pathname(p)
        };

        assert_eq!(cache.resolve("/a//b", "/srv", compute), "/a/b");
        assert_eq!(cache.resolve("/a//b", "/srv", compute), "/a/b");
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_roots_do_not_collide() {
        let cache = PathCache::with_capacity(4);
        cache.resolve("/x", "/one", |_| "from-one".to_string());
        let value = cache.resolve("/x", "/two", |_| "from-two".to_string());
        assert_eq!(value, "from-two");
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = PathCache::with_capacity(2);
        cache.resolve("/a", "/r", normalize_pathname);
        cache.resolve("/b", "/r", normalize_pathname);

        // touch /a so /b becomes the oldest
        cache.resolve("/a", "/r", |_| unreachable!());
        cache.resolve("/c", "/r", normalize_pathname);

        assert!(cache.contains("/a", "/r"));
        assert!(!cache.contains("/b", "/r"));
        assert!(cache.contains("/c", "/r"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_evicted_entry_recomputes_same_value() {
        let cache = PathCache::with_capacity(1);
        let first = cache.resolve("//x//y", "/r", normalize_pathname);
        cache.resolve("/other", "/r", normalize_pathname);
        let again = cache.resolve("//x//y", "/r", normalize_pathname);
        assert_eq!(first, again);
        assert_eq!(again, normalize_pathname("//x//y"));
    }

    #[test]
    fn test_bounded_by_capacity() {
        let cache = PathCache::with_capacity(PATH_CACHE_CAPACITY);
        for i in 0..PATH_CACHE_CAPACITY + 50 {
            cache.resolve(&format!("/file-{i}"), "/r", normalize_pathname);
        }
        assert_eq!(cache.len(), PATH_CACHE_CAPACITY);
        assert!(!cache.contains("/file-0", "/r"));
    }

    #[test]
    fn test_normalize_pathname() {
        assert_eq!(normalize_pathname(""), "");
        assert_eq!(normalize_pathname("/"), "/");
        assert_eq!(normalize_pathname("///a///b/"), "/a/b/");
        assert_eq!(normalize_pathname("/a/b.txt"), "/a/b.txt");
    }
}
