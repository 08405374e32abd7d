//! Mock asset store for testing.
//!
//! Provides [`MockAssetStore`] for unit testing without filesystem or network access.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::store::{AssetStore, StorageError, StorageErrorKind, join_public_url};

/// Backend identifier for error messages.
const BACKEND: &str = "Mock";

/// A stored mock object.
#[derive(Debug, Clone)]
struct MockObject {
    body: Vec<u8>,
    content_type: String,
}

/// Mock asset store for testing.
///
/// Stores objects in memory and counts operations. Use the builder methods
/// to seed objects or inject failures.
///
/// # Example
///
/// ```ignore
/// use folio_storage::{AssetStore, MockAssetStore, StorageErrorKind};
///
/// let store = MockAssetStore::new().failing_puts(StorageErrorKind::Unavailable);
/// assert!(store.put("viz/a.svg", b"<svg/>", "image/svg+xml").is_err());
/// assert_eq!(store.put_count(), 1);
/// ```
#[derive(Debug)]
pub struct MockAssetStore {
    objects: RwLock<HashMap<String, MockObject>>,
    public_url: Option<String>,
    head_failure: Option<StorageErrorKind>,
    put_failure: Option<StorageErrorKind>,
    heads: AtomicUsize,
    puts: AtomicUsize,
}

impl Default for MockAssetStore {
    fn default() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            public_url: Some("https://assets.test".to_owned()),
            head_failure: None,
            put_failure: None,
            heads: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
        }
    }
}

impl MockAssetStore {
    /// Create an empty mock store serving from `https://assets.test`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the public base URL (`None` returns bare keys).
    #[must_use]
    pub fn with_public_url(mut self, url: Option<&str>) -> Self {
        self.public_url = url.map(str::to_owned);
        self
    }

    /// Seed an existing object.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn with_object(self, key: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.objects.write().unwrap().insert(
            key.into(),
            MockObject {
                body: body.into(),
                content_type: "application/octet-stream".to_owned(),
            },
        );
        self
    }

    /// Make every existence check fail with `kind`.
    #[must_use]
    pub fn failing_heads(mut self, kind: StorageErrorKind) -> Self {
        self.head_failure = Some(kind);
        self
    }

    /// Make every write fail with `kind`.
    #[must_use]
    pub fn failing_puts(mut self, kind: StorageErrorKind) -> Self {
        self.put_failure = Some(kind);
        self
    }

    /// Number of `head` calls so far.
    #[must_use]
    pub fn head_count(&self) -> usize {
        self.heads.load(Ordering::SeqCst)
    }

    /// Number of `put` calls so far (including failed ones).
    #[must_use]
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Stored object bytes.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().unwrap().get(key).map(|o| o.body.clone())
    }

    /// Stored object content type.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .unwrap()
            .get(key)
            .map(|o| o.content_type.clone())
    }

    /// Number of stored objects.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().unwrap().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for MockAssetStore {
    fn head(&self, key: &str) -> Result<(), StorageError> {
        self.heads.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.head_failure {
            return Err(StorageError::new(kind).with_key(key).with_backend(BACKEND));
        }
        let exists = self
            .objects
            .read()
            .map_err(|_| StorageError::new(StorageErrorKind::Other).with_backend(BACKEND))?
            .contains_key(key);
        if exists {
            Ok(())
        } else {
            Err(StorageError::not_found(key).with_backend(BACKEND))
        }
    }

    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if let Some(kind) = self.put_failure {
            return Err(StorageError::new(kind).with_key(key).with_backend(BACKEND));
        }
        self.objects
            .write()
            .map_err(|_| StorageError::new(StorageErrorKind::Other).with_backend(BACKEND))?
            .insert(
                key.to_owned(),
                MockObject {
                    body: body.to_vec(),
                    content_type: content_type.to_owned(),
                },
            );
        Ok(())
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(self.public_url.as_deref(), key)
    }
}
