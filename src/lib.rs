//! # s3bc
//!
//! Retention cleanup for backups stored in S3-compatible buckets.
//!
//! Given a bucket (optionally scoped to a key prefix), s3bc deletes all but
//! the N most recently modified objects:
//!
//! - **Deterministic selection**: oldest first by last-modified time, ties
//!   broken by key, so the keep/remove boundary never flips between runs
//! - **Best-effort batch deletion**: every selected key is attempted, and
//!   any failure makes the run fail loudly with the offending keys
//! - **Idempotent**: re-running with nothing new in the bucket is a no-op
//! - **Pluggable store**: the engine talks to an [`store::ObjectStore`];
//!   [`store::S3Store`] covers AWS S3, MinIO and friends

pub mod cleaner;
pub mod cli;
pub mod common;
pub mod store;
