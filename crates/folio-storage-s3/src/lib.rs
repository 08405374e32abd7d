//! S3-compatible asset store for Folio.
//!
//! [`S3AssetStore`] implements [`AssetStore`] against any S3-compatible
//! service (AWS S3, Cloudflare R2, `MinIO`). The trait is synchronous, so the
//! store owns a small Tokio runtime and blocks on each request.
//!
//! Credentials come from the standard AWS provider chain
//! (`AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`, profiles, instance roles).

use std::error::Error;

use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::error::SdkError;
use folio_storage::{AssetStore, ErrorStatus, StorageError, StorageErrorKind, join_public_url};
use tokio::runtime::Runtime;

/// Backend identifier for error messages.
const BACKEND: &str = "S3";

/// Connection settings for an S3-compatible bucket.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Bucket name.
    pub bucket: String,
    /// S3-compatible endpoint URL (e.g., `https://<account>.r2.cloudflarestorage.com`).
    pub endpoint: Option<String>,
    /// Region (`auto` for R2).
    pub region: String,
    /// Public base URL objects are served from.
    pub public_url: Option<String>,
}

/// Asset store backed by an S3-compatible bucket.
///
/// Must not be used from inside an async context: every call blocks on the
/// store's own runtime.
pub struct S3AssetStore {
    config: S3Config,
    client: Client,
    runtime: Runtime,
}

impl S3AssetStore {
    /// Connect to the configured bucket.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the runtime cannot be started.
    pub fn new(config: S3Config) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(|e| StorageError::io(e, None).with_backend(BACKEND))?;
        let client = runtime.block_on(build_client(&config));

        tracing::debug!(
            bucket = %config.bucket,
            endpoint = ?config.endpoint,
            "S3 asset store ready"
        );

        Ok(Self {
            config,
            client,
            runtime,
        })
    }

    /// Bucket this store writes to.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }
}

impl AssetStore for S3AssetStore {
    fn head(&self, key: &str) -> Result<(), StorageError> {
        let request = self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send();

        match self.runtime.block_on(request) {
            Ok(_) => Ok(()),
            Err(e) => {
                let missing = e.as_service_error().is_some_and(|s| s.is_not_found())
                    || e.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing {
                    Err(StorageError::not_found(key).with_backend(BACKEND))
                } else {
                    Err(sdk_error(&e, key))
                }
            }
        }
    }

    fn put(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), StorageError> {
        let request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .body(body.to_vec().into())
            .content_type(content_type)
            .send();

        self.runtime
            .block_on(request)
            .map(|_| ())
            .map_err(|e| sdk_error(&e, key))
    }

    fn public_url(&self, key: &str) -> String {
        join_public_url(self.config.public_url.as_deref(), key)
    }
}

async fn build_client(config: &S3Config) -> Client {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let Some(endpoint) = &config.endpoint {
        loader = loader.endpoint_url(endpoint);
    }

    let sdk_config = loader.load().await;

    // Custom endpoints (R2, MinIO, LocalStack) need path-style addressing
    // (endpoint/bucket/key) instead of virtual-hosted-style (bucket.endpoint/key).
    if config.endpoint.is_some() {
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .build();
        return Client::from_conf(s3_config);
    }

    Client::new(&sdk_config)
}

/// Convert an SDK error into a [`StorageError`] with retry guidance.
fn sdk_error<E>(err: &SdkError<E, HttpResponse>, key: &str) -> StorageError
where
    E: Error + 'static,
{
    let (kind, status) = match err {
        SdkError::TimeoutError(_) => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
        SdkError::DispatchFailure(_) => (StorageErrorKind::Unavailable, ErrorStatus::Temporary),
        _ => err
            .raw_response()
            .map_or((StorageErrorKind::Other, ErrorStatus::Permanent), |r| {
                classify_http_status(r.status().as_u16())
            }),
    };
    StorageError::new(kind)
        .with_status(status)
        .with_key(key)
        .with_backend(BACKEND)
        .with_source(error_chain(err))
}

/// Map an HTTP status from the object store to an error category.
fn classify_http_status(status: u16) -> (StorageErrorKind, ErrorStatus) {
    match status {
        401 | 403 => (StorageErrorKind::PermissionDenied, ErrorStatus::Permanent),
        404 => (StorageErrorKind::NotFound, ErrorStatus::Permanent),
        408 => (StorageErrorKind::Timeout, ErrorStatus::Temporary),
        429 => (StorageErrorKind::RateLimited, ErrorStatus::Persistent),
        500..=599 => (StorageErrorKind::Unavailable, ErrorStatus::Persistent),
        _ => (StorageErrorKind::Other, ErrorStatus::Permanent),
    }
}

/// Walk the error source chain and join all messages.
fn error_chain(err: &dyn Error) -> String {
    let mut msgs = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        msgs.push(s.to_string());
        source = s.source();
    }
    msgs.join(": ")
}
