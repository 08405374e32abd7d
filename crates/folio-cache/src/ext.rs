//! Extension trait for [`CacheBucket`] with string convenience methods.

use crate::CacheBucket;

/// String convenience methods for [`CacheBucket`].
///
/// Implemented as default methods on an extension trait so that
/// [`CacheBucket`] implementors only need to handle raw bytes.
pub trait CacheBucketExt: CacheBucket {
    /// Retrieve a cached UTF-8 string.
    ///
    /// Returns `None` on cache miss or invalid UTF-8.
    fn get_string(&self, key: &str) -> Option<String> {
        let bytes = self.get(key)?;
        String::from_utf8(bytes).ok()
    }

    /// Store a string value in the cache.
    fn set_string(&self, key: &str, value: &str) {
        self.set(key, value.as_bytes());
    }
}

impl<B: CacheBucket + ?Sized> CacheBucketExt for B {}
