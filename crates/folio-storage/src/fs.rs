//! Filesystem asset store.
//!
//! Provides [`FsAssetStore`] for publishing assets into a local directory,
//! typically a static `public/` folder served next to the site.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::store::{AssetStore, StorageError, StorageErrorKind, join_public_url};

/// Backend identifier for error messages.
const BACKEND: &str = "Fs";

/// Filesystem asset store.
///
/// Objects are written to `{root}/{key}`. URLs are `{public_url}/{key}` when a
/// public base URL is set, otherwise the bare key.
///
/// # Example
///
/// ```ignore
/// use std::path::PathBuf;
/// use folio_storage::{AssetStore, FsAssetStore};
///
/// let store = FsAssetStore::new(PathBuf::from("public")).with_public_url("https://example.com");
/// store.put("viz/flow-abc.svg", svg.as_bytes(), "image/svg+xml")?;
/// ```
#[derive(Debug)]
pub struct FsAssetStore {
    root: PathBuf,
    public_url: Option<String>,
}

impl FsAssetStore {
    /// Create a store rooted at `root`.
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            public_url: None,
        }
    }

    /// Set the public base URL objects are served from.
    #[must_use]
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Root directory of the store.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a key to a path below the root, rejecting keys that would escape it.
    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let escapes = key.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::new(StorageErrorKind::InvalidKey)
                .with_key(key)
                .with_backend(BACKEND));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetStore for FsAssetStore {
    fn head(&self, key: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(()),
            Ok(_) => Err(StorageError::not_found(key).with_backend(BACKEND)),
            Err(e) => Err(StorageError::io(e, Some(key)).with_backend(BACKEND)),
        }
    }

    fn put(&self, key: &str, body: &[u8], _content_type: &str) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StorageError::io(e, Some(key)).with_backend(BACKEND))?;
        }
        fs::write(&path, body).map_err(|e| StorageError::io(e, Some(key)).with_backend(BACKEND))
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(self.public_url.as_deref(), key)
    }
}
