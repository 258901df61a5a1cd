//! Object store collaborator.
//!
//! The cleaner never talks to a concrete client directly. It asks an
//! [`ObjectStore`] three things: does the bucket exist, what objects live
//! under a prefix, and please delete these keys.

#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod s3;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[cfg(any(test, feature = "test-util"))]
pub use memory::MemoryStore;
pub use s3::{S3Store, S3StoreConfig};

/// Metadata for one object as reported by the store listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectRecord {
    /// Full object key
    pub key: String,

    /// Store-reported last modification time
    pub last_modified: DateTime<Utc>,

    /// Store-reported size in bytes
    pub size_bytes: u64,
}

impl ObjectRecord {
    pub fn new(key: impl Into<String>, last_modified: DateTime<Utc>, size_bytes: u64) -> Self {
        Self {
            key: key.into(),
            last_modified,
            size_bytes,
        }
    }
}

/// A key the store failed to delete
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionFailure {
    pub key: String,
    pub cause: String,
}

impl std::fmt::Display for DeletionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.key, self.cause)
    }
}

/// Errors raised by an object store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("S3 error: {0}")]
    S3(String),

    #[error("invalid listing entry: {0}")]
    InvalidEntry(String),

    #[error("store configuration error: {0}")]
    Config(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One entry of a listing: either a resolved object or a per-item error.
pub type ListEntry = Result<ObjectRecord, StoreError>;

/// The capabilities the cleaner consumes from an S3-compatible store.
///
/// Implementations must be `Send + Sync`; the store handle is only read
/// through `&self`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Check whether `bucket` exists.
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool>;

    /// List every object under `prefix`.
    ///
    /// The outer error means the listing call itself failed. Entries that
    /// could not be resolved come back as `Err` items and the listing goes on.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> StoreResult<Vec<ListEntry>>;

    /// Delete `keys`, reporting only the keys that failed.
    ///
    /// Deletion is best-effort per key; a returned failure says nothing
    /// about the other keys.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Vec<DeletionFailure>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
