//! Object storage abstraction for Folio rendered assets.
//!
//! This crate provides an [`AssetStore`] trait for publishing rendered artifacts
//! (diagram SVGs, images) to an object store and resolving their public URLs.
//! This enables:
//!
//! - **Unit testing** without network access
//! - **Backend flexibility** (local directory, S3-compatible stores)
//! - **Write-once uploads** via an existence check before each put
//!
//! # Architecture
//!
//! The crate provides:
//! - [`AssetStore`] trait with `head()`, `put()`, `public_url()` and the provided `upload()`
//! - [`FsAssetStore`] writing objects below a local directory
//! - [`MockAssetStore`] for testing (behind `mock` feature flag)
//!
//! # Example
//!
//! ```ignore
//! use folio_storage::{AssetStore, FsAssetStore, UploadRequest};
//!
//! let store = FsAssetStore::new("public/assets".into()).with_public_url("/assets");
//! let asset = store.upload(&UploadRequest::new("viz/flow-abc", svg.into_bytes(), "image/svg+xml"))?;
//! assert_eq!(asset.url, "/assets/viz/flow-abc.svg");
//! ```

mod fs;
#[cfg(feature = "mock")]
mod mock;
mod store;

pub use fs::FsAssetStore;
#[cfg(feature = "mock")]
pub use mock::MockAssetStore;
pub use store::{
    AssetStore, ErrorStatus, StorageError, StorageErrorKind, StoredAsset, UploadRequest,
    extension_for, join_public_url,
};
