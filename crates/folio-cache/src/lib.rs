//! Memo table abstraction for Folio.
//!
//! This crate provides generic caching traits that decouple cache consumers
//! from the underlying storage mechanism. Two traits form the core API:
//!
//! - [`Cache`]: Factory for named cache buckets
//! - [`CacheBucket`]: Key-value store for content-addressed entries
//!
//! Keys are expected to be content addressed (a hash of the cached value's
//! inputs), so entries never go stale and are never evicted.
//!
//! # Implementations
//!
//! - [`NullCache`] / [`NullCacheBucket`]: No-op implementations (always miss)
//! - [`MemoryCache`]: Append-only in-memory tables living for the process lifetime
//!
//! # Example
//!
//! ```
//! use folio_cache::{Cache, CacheBucketExt, MemoryCache};
//!
//! let cache = MemoryCache::new();
//! let bucket = cache.bucket("viz");
//! bucket.set_string("flow-abc", "https://cdn.example.com/flow-abc.svg");
//! assert_eq!(
//!     bucket.get_string("flow-abc").as_deref(),
//!     Some("https://cdn.example.com/flow-abc.svg")
//! );
//! ```

mod ext;
mod memory;

pub use ext::CacheBucketExt;
pub use memory::{MemoryCache, MemoryCacheBucket};

/// A named partition within a [`Cache`].
///
/// Each bucket stores key-value pairs. Values are raw bytes; see
/// [`CacheBucketExt`] for string helpers.
pub trait CacheBucket: Send + Sync {
    /// Retrieve a cached value.
    ///
    /// Returns `None` on cache miss.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Store a value in the cache.
    ///
    /// Overwrites any existing entry for the same key. Since keys are content
    /// addressed, an overwrite always stores an equivalent value.
    fn set(&self, key: &str, value: &[u8]);

    /// Check whether a key is present without copying the value.
    fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}

/// Factory for named cache [`CacheBucket`]s.
///
/// A `Cache` produces buckets that are logically isolated from each other.
pub trait Cache: Send + Sync {
    /// Open or create a named bucket.
    ///
    /// Calling `bucket` multiple times with the same name returns handles that
    /// share the same underlying table.
    fn bucket(&self, name: &str) -> Box<dyn CacheBucket>;
}

/// No-op [`CacheBucket`] that never stores or retrieves data.
///
/// Every `get` returns `None`; every `set` is silently discarded.
pub struct NullCacheBucket;

impl CacheBucket for NullCacheBucket {
    fn get(&self, _key: &str) -> Option<Vec<u8>> {
        None
    }

    fn set(&self, _key: &str, _value: &[u8]) {}
}

/// No-op [`Cache`] that always returns [`NullCacheBucket`]s.
///
/// Use when memoization is disabled.
pub struct NullCache;

impl Cache for NullCache {
    fn bucket(&self, _name: &str) -> Box<dyn CacheBucket> {
        Box::new(NullCacheBucket)
    }
}
