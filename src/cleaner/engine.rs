use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::retention;
use crate::common::errors::CleanupError;
use crate::common::locator::BucketLocator;
use crate::store::{DeletionFailure, ObjectRecord, ObjectStore};

/// Options for one cleanup run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanOptions {
    /// Number of most recent objects to keep
    pub save_last: usize,
    /// Select but don't delete
    pub dry_run: bool,
}

impl CleanOptions {
    pub fn keep(save_last: usize) -> Self {
        Self {
            save_last,
            dry_run: false,
        }
    }
}

/// Outcome of a cleanup run
#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub bucket: String,
    pub prefix: String,
    pub save_last: usize,
    /// Objects the listing resolved
    pub listed: usize,
    /// Listing entries that failed to resolve and were skipped
    pub skipped: usize,
    pub kept: usize,
    /// The remove set, oldest first
    pub removed: Vec<ObjectRecord>,
    /// Keys submitted for deletion (0 on a dry run)
    pub attempted: usize,
    /// Keys the store failed to delete
    pub failed: Vec<DeletionFailure>,
    /// Size of the removed objects that were actually deleted
    pub bytes_removed: u64,
    pub dry_run: bool,
    pub duration_secs: f64,
}

impl CleanReport {
    pub fn succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// The run target as `s3://bucket[/prefix]`
    pub fn target(&self) -> BucketLocator {
        BucketLocator {
            bucket: self.bucket.clone(),
            prefix: self.prefix.clone(),
        }
    }

    /// Removed objects the store actually deleted; empty on a dry run
    pub fn deleted(&self) -> impl Iterator<Item = &ObjectRecord> + '_ {
        self.removed
            .iter()
            .filter(move |o| !self.dry_run && !self.failed.iter().any(|f| f.key == o.key))
    }
}

/// Applies a retention policy to one bucket through an [`ObjectStore`].
pub struct Cleaner<S> {
    store: S,
}

impl<S: ObjectStore> Cleaner<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Delete everything but the `save_last` most recent objects under the
    /// locator's prefix.
    ///
    /// Fails fast on a missing bucket or an unreachable store, before any
    /// deletion. Once deletion starts every key is attempted, and any
    /// per-key failure turns the whole run into [`CleanupError::PartialFailure`].
    #[instrument(skip(self), fields(backend = self.store.backend_name()))]
    pub async fn clean(
        &self,
        locator: &BucketLocator,
        options: CleanOptions,
    ) -> Result<CleanReport, CleanupError> {
        let start = Instant::now();
        let bucket = locator.bucket.as_str();

        let exists = self
            .store
            .bucket_exists(bucket)
            .await
            .map_err(|source| CleanupError::StoreUnavailable {
                context: "can't verify that bucket exists",
                source,
            })?;
        if !exists {
            return Err(CleanupError::BucketNotFound(bucket.to_string()));
        }

        let (records, skipped) = self.collect_records(locator).await?;
        let listed = records.len();

        let selection = retention::partition(records, options.save_last);
        info!(
            locator = %locator,
            listed,
            skipped,
            keep = selection.keep.len(),
            remove = selection.remove.len(),
            "Computed retention selection"
        );

        let keys = selection.remove_keys();
        let failed = if options.dry_run || keys.is_empty() {
            Vec::new()
        } else {
            self.delete(bucket, &keys).await
        };
        let attempted = if options.dry_run { 0 } else { keys.len() };

        let bytes_removed = selection
            .remove
            .iter()
            .filter(|o| !failed.iter().any(|f| f.key == o.key))
            .map(|o| o.size_bytes)
            .sum();

        let report = CleanReport {
            bucket: bucket.to_string(),
            prefix: locator.prefix.clone(),
            save_last: options.save_last,
            listed,
            skipped,
            kept: selection.keep.len(),
            removed: selection.remove,
            attempted,
            failed,
            bytes_removed,
            dry_run: options.dry_run,
            duration_secs: start.elapsed().as_secs_f64(),
        };

        if report.succeeded() {
            Ok(report)
        } else {
            Err(CleanupError::PartialFailure {
                report: Box::new(report),
            })
        }
    }

    /// List the prefix, dropping entries that failed to resolve
    async fn collect_records(
        &self,
        locator: &BucketLocator,
    ) -> Result<(Vec<ObjectRecord>, usize), CleanupError> {
        let entries = self
            .store
            .list_objects(&locator.bucket, &locator.prefix, true)
            .await
            .map_err(|source| CleanupError::StoreUnavailable {
                context: "failed to get list of files that should be removed",
                source,
            })?;

        let mut records = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for entry in entries {
            match entry {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(bucket = %locator.bucket, error = %e, "Skipping unreadable listing entry");
                    skipped += 1;
                }
            }
        }

        Ok((records, skipped))
    }

    async fn delete(&self, bucket: &str, keys: &[String]) -> Vec<DeletionFailure> {
        debug!(bucket, keys = keys.len(), "Submitting batch deletion");
        let failed = self.store.delete_objects(bucket, keys).await;
        for failure in &failed {
            warn!(bucket, key = %failure.key, cause = %failure.cause, "Failed to delete object");
        }
        info!(
            bucket,
            deleted = keys.len() - failed.len().min(keys.len()),
            failed = failed.len(),
            "Batch deletion finished"
        );
        failed
    }
}
