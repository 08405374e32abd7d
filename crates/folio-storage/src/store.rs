//! Asset store trait and error types.
//!
//! Provides the core [`AssetStore`] trait for publishing rendered assets,
//! along with [`StorageError`] for unified error handling across backends.
//!
//! # Key Convention
//!
//! Keys are slash-separated object names without a leading slash
//! (e.g., `"portfolio/viz/flow-3f2a.svg"`). [`UploadRequest`] appends a file
//! extension derived from the content type when the last key segment has none.

/// Semantic error categories (inspired by Object Store + `OpenDAL`).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Object does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// Invalid key or request.
    InvalidKey,
    /// Backend is unavailable or not configured.
    Unavailable,
    /// Too many requests.
    RateLimited,
    /// Operation timed out.
    Timeout,
    /// Other/unknown error category.
    Other,
}

/// Retry guidance (from `OpenDAL`).
#[derive(Debug, PartialEq, Eq, Default, Clone, Copy)]
pub enum ErrorStatus {
    /// Don't retry (config error, not found, invalid key).
    #[default]
    Permanent,
    /// Retry immediately (timeout, connection reset).
    Temporary,
    /// Retry with backoff (rate limited, service unavailable).
    Persistent,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    kind: StorageErrorKind,
    status: ErrorStatus,
    key: Option<String>,
    backend: Option<&'static str>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            status: ErrorStatus::Permanent,
            key: None,
            backend: None,
            source: None,
        }
    }

    /// Attach object key context.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Attach backend identifier.
    #[must_use]
    pub fn with_backend(mut self, backend: &'static str) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Set retry status.
    #[must_use]
    pub fn with_status(mut self, status: ErrorStatus) -> Self {
        self.status = status;
        self
    }

    /// Attach the underlying error source.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Semantic error category.
    #[must_use]
    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    /// Retry guidance.
    #[must_use]
    pub fn status(&self) -> ErrorStatus {
        self.status
    }

    /// Object key the error relates to, if known.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Backend identifier, if known.
    #[must_use]
    pub fn backend(&self) -> Option<&'static str> {
        self.backend
    }

    /// Whether this error reports a missing object.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// Create a not found error for a key.
    #[must_use]
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::new(StorageErrorKind::NotFound).with_key(key)
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, key: Option<&str>) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            std::io::ErrorKind::TimedOut => StorageErrorKind::Timeout,
            _ => StorageErrorKind::Other,
        };
        let status = match err.kind() {
            std::io::ErrorKind::TimedOut => ErrorStatus::Temporary,
            _ => ErrorStatus::Permanent,
        };
        let mut error = Self::new(kind).with_status(status).with_source(err);
        if let Some(k) = key {
            error = error.with_key(k);
        }
        error
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "[Backend] Kind: message (key: portfolio/viz/flow-1.svg)"
        if let Some(backend) = self.backend {
            write!(f, "[{backend}] ")?;
        }

        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::InvalidKey => "Invalid key",
            StorageErrorKind::Unavailable => "Unavailable",
            StorageErrorKind::RateLimited => "Rate limited",
            StorageErrorKind::Timeout => "Timeout",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(key) = &self.key {
            write!(f, " (key: {key})")?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// An object to publish.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// Object key, with or without a file extension.
    pub key: String,
    /// Raw object bytes.
    pub body: Vec<u8>,
    /// MIME type (e.g., `image/svg+xml`).
    pub content_type: String,
    /// Replace an existing object with the same key.
    ///
    /// When `false`, an existing object short-circuits the upload and its URL
    /// is returned as-is.
    pub overwrite: bool,
}

impl UploadRequest {
    /// Create a write-once upload request.
    #[must_use]
    pub fn new(key: impl Into<String>, body: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            body,
            content_type: content_type.into(),
            overwrite: false,
        }
    }

    /// Allow replacing an existing object.
    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Key with a content-type extension appended when the last segment has none.
    #[must_use]
    pub fn resolved_key(&self) -> String {
        let last_segment = self.key.rsplit('/').next().unwrap_or_default();
        if last_segment.contains('.') {
            return self.key.clone();
        }
        match extension_for(&self.content_type) {
            Some(ext) => format!("{}.{ext}", self.key),
            None => self.key.clone(),
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAsset {
    /// Final object key (including extension).
    pub key: String,
    /// Publicly resolvable URL.
    pub url: String,
    /// False when an existing object was reused instead of written.
    pub uploaded: bool,
}

/// File extension for a MIME type (`image/svg+xml` -> `svg`).
///
/// Parameters such as `; charset=utf-8` are ignored.
#[must_use]
pub fn extension_for(content_type: &str) -> Option<&str> {
    let essence = content_type.split(';').next()?.trim();
    let subtype = essence.split_once('/')?.1;
    match subtype {
        "" => None,
        "svg+xml" => Some("svg"),
        other => Some(other),
    }
}

/// Join a public base URL and an object key.
///
/// Without a base URL the key itself is returned.
#[must_use]
pub fn join_public_url(base: Option<&str>, key: &str) -> String {
    match base {
        Some(base) if !base.is_empty() => format!("{}/{key}", base.trim_end_matches('/')),
        _ => key.to_owned(),
    }
}

/// Object store for rendered assets.
///
/// Implementations provide the primitive operations; [`upload`](Self::upload)
/// layers key resolution and write-once semantics on top.
pub trait AssetStore: Send + Sync {
    /// Check that an object exists.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageErrorKind::NotFound`] error when the object is absent,
    /// or any other kind when the backend cannot answer.
    fn head(&self, key: &str) -> Result<(), StorageError>;

    /// Write an object, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the write is rejected or the backend is unreachable.
    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError>;

    /// Public URL for an object key.
    fn public_url(&self, key: &str) -> String;

    /// Publish an object.
    ///
    /// When `request.overwrite` is false, an existing object is reused and no
    /// write happens. Existence-check failures other than "not found" abort
    /// the upload.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] from the existence check or the write.
    fn upload(&self, request: &UploadRequest) -> Result<StoredAsset, StorageError> {
        let key = request.resolved_key();

        if !request.overwrite {
            match self.head(&key) {
                Ok(()) => {
                    tracing::debug!(key = %key, "Asset already stored, skipping upload");
                    return Ok(StoredAsset {
                        url: self.public_url(&key),
                        key,
                        uploaded: false,
                    });
                }
                Err(e) if e.is_not_found() => {}
                Err(e) => return Err(e),
            }
        }

        self.put(&key, &request.body, &request.content_type)?;
        tracing::debug!(key = %key, bytes = request.body.len(), "Uploaded asset");

        Ok(StoredAsset {
            url: self.public_url(&key),
            key,
            uploaded: true,
        })
    }
}
