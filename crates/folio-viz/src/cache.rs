//! Content-addressed storage of rendered visualizations.
//!
//! [`VizKey`] derives a stable hash from a block payload. [`AssetCache`] pairs
//! a process-local memo table (key -> public URL) with an optional remote
//! [`AssetStore`]. Rendered assets are uploaded at most once per key.

use std::sync::Arc;

use folio_cache::{CacheBucket, CacheBucketExt, MemoryCacheBucket};
use folio_storage::{AssetStore, StorageError, StorageErrorKind, UploadRequest};
use sha2::{Digest, Sha256};

use crate::consts::{DEFAULT_KEY_PREFIX, MEDIA_CLASSES};
use crate::html::escape_html;
use crate::kind::VizKind;

/// Visualization parameters for cache key computation.
#[derive(Debug, Clone, Copy)]
pub struct VizKey<'a> {
    /// Block kind.
    pub kind: VizKind,
    /// Block payload. Surrounding whitespace does not affect the hash.
    pub payload: &'a str,
}

impl<'a> VizKey<'a> {
    #[must_use]
    pub fn new(kind: VizKind, payload: &'a str) -> Self {
        Self { kind, payload }
    }

    /// Compute a content hash for this key.
    ///
    /// # Hash Format
    ///
    /// Lowercase hex SHA-256 of the trimmed payload.
    #[must_use]
    pub fn compute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.payload.trim().as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Object store key below `prefix`: `{prefix}/{kind}-{hash}`.
    ///
    /// Also used as the memo table key, so memo buckets shared between
    /// different prefixes never mix URLs.
    #[must_use]
    pub fn object_key(&self, prefix: &str) -> String {
        let name = format!("{}-{}", self.kind, self.compute_hash());
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        }
    }
}

/// Where a rendered visualization lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetBody {
    /// Markup embedded directly in the document.
    Inline(String),
    /// Public URL of a stored object.
    Remote(String),
}

/// A content-addressed rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAsset {
    pub hash: String,
    pub kind: VizKind,
    pub body: AssetBody,
}

impl RenderedAsset {
    /// HTML fragment referencing or embedding the asset.
    #[must_use]
    pub fn to_html(&self) -> String {
        match &self.body {
            AssetBody::Inline(markup) => markup.clone(),
            AssetBody::Remote(url) => format!(
                r#"<img src="{}" alt="{}" class="{MEDIA_CLASSES}" loading="lazy" />"#,
                escape_html(url),
                self.kind.alt_text(),
            ),
        }
    }

    /// Public URL, if the asset is stored remotely.
    #[must_use]
    pub fn url(&self) -> Option<&str> {
        match &self.body {
            AssetBody::Remote(url) => Some(url),
            AssetBody::Inline(_) => None,
        }
    }
}

/// Memo table fronting an optional remote object store.
pub struct AssetCache {
    memo: Box<dyn CacheBucket>,
    store: Option<Arc<dyn AssetStore>>,
    key_prefix: String,
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new(Box::new(MemoryCacheBucket::new()))
    }
}

impl AssetCache {
    /// Create a cache over `memo` with no remote store.
    #[must_use]
    pub fn new(memo: Box<dyn CacheBucket>) -> Self {
        Self {
            memo,
            store: None,
            key_prefix: DEFAULT_KEY_PREFIX.to_owned(),
        }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn AssetStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_memo(mut self, memo: Box<dyn CacheBucket>) -> Self {
        self.memo = memo;
        self
    }

    /// Set the object key prefix (default: `portfolio/viz`).
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Whether a remote store is configured.
    #[must_use]
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Look up a previously stored asset in the memo table.
    ///
    /// The remote store is never consulted.
    #[must_use]
    pub fn get(&self, key: &VizKey<'_>) -> Option<RenderedAsset> {
        let url = self.memo.get_string(&key.object_key(&self.key_prefix))?;
        tracing::trace!(kind = %key.kind, url = %url, "Memo hit");
        Some(RenderedAsset {
            hash: key.compute_hash(),
            kind: key.kind,
            body: AssetBody::Remote(url),
        })
    }

    /// Upload a rendering unless the store already holds it, then memoize its URL.
    ///
    /// # Errors
    ///
    /// Returns [`StorageErrorKind::Unavailable`] when no store is configured,
    /// or the store's error when the existence check or the write fails.
    pub fn put(
        &self,
        key: &VizKey<'_>,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<RenderedAsset, StorageError> {
        let object_key = key.object_key(&self.key_prefix);
        let Some(store) = &self.store else {
            return Err(StorageError::new(StorageErrorKind::Unavailable)
                .with_key(object_key)
                .with_source("no asset store configured"));
        };

        let stored = store.upload(&UploadRequest::new(object_key, body, content_type))?;
        if stored.uploaded {
            tracing::info!(kind = %key.kind, key = %stored.key, "Stored rendered visualization");
        }
        self.remember(key, &stored.url);

        Ok(RenderedAsset {
            hash: key.compute_hash(),
            kind: key.kind,
            body: AssetBody::Remote(stored.url),
        })
    }

    /// Record a URL for `key` without uploading anything.
    pub fn remember(&self, key: &VizKey<'_>, url: &str) {
        self.memo.set_string(&key.object_key(&self.key_prefix), url);
    }
}
