//! In-memory cache implementation.
//!
//! [`MemoryCache`] keeps every bucket as an append-only table for the lifetime
//! of the process. There is no eviction: entries are keyed by content hash, so
//! the table only grows with the number of distinct inputs seen.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::{Cache, CacheBucket};

type Table = Arc<RwLock<HashMap<String, Vec<u8>>>>;

/// In-memory [`Cache`] whose buckets live as long as the cache handle.
///
/// Buckets opened with the same name share one table:
///
/// ```
/// use folio_cache::{Cache, CacheBucket, MemoryCache};
///
/// let cache = MemoryCache::new();
/// cache.bucket("viz").set("key", b"value");
/// assert_eq!(cache.bucket("viz").get("key"), Some(b"value".to_vec()));
/// ```
#[derive(Default)]
pub struct MemoryCache {
    tables: RwLock<HashMap<String, Table>>,
}

impl MemoryCache {
    /// Create an empty in-memory cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, name: &str) -> Table {
        if let Ok(tables) = self.tables.read()
            && let Some(table) = tables.get(name)
        {
            return Arc::clone(table);
        }

        match self.tables.write() {
            Ok(mut tables) => Arc::clone(tables.entry(name.to_owned()).or_default()),
            // A poisoned registry still hands out a working (unshared) table.
            Err(_) => Table::default(),
        }
    }
}

impl Cache for MemoryCache {
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket> {
        Box::new(MemoryCacheBucket {
            entries: self.table(name),
        })
    }
}

/// A single append-only memo table.
///
/// Cloning the bucket clones the handle, not the entries.
#[derive(Clone, Default)]
pub struct MemoryCacheBucket {
    entries: Table,
}

impl MemoryCacheBucket {
    /// Create a standalone memo table not registered with any [`MemoryCache`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().map_or(0, |entries| entries.len())
    }

    /// Whether the table holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheBucket for MemoryCacheBucket {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &[u8]) {
        let Ok(mut entries) = self.entries.write() else {
            tracing::warn!(key = %key, "memo table lock poisoned, entry dropped");
            return;
        };
        if entries.insert(key.to_owned(), value.to_vec()).is_none() {
            tracing::trace!(key = %key, "memo table entry added");
        }
    }

    fn contains(&self, key: &str) -> bool {
        self.entries
            .read()
            .is_ok_and(|entries| entries.contains_key(key))
    }
}
