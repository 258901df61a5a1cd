//! In-process object store.
//!
//! Holds buckets in memory and lets callers inject failures (unreachable
//! store, broken listing entries, keys that refuse to delete). Every call
//! is counted so tests can assert what the cleaner did and did not touch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{DeletionFailure, ListEntry, ObjectRecord, ObjectStore, StoreError, StoreResult};

#[derive(Default)]
pub struct MemoryStore {
    buckets: Mutex<BTreeMap<String, BTreeMap<String, ObjectRecord>>>,
    unavailable: bool,
    broken_entries: Vec<String>,
    delete_failures: HashMap<String, String>,
    calls: CallCounts,
}

/// Number of times each store capability was invoked
#[derive(Debug, Default)]
pub struct CallCounts {
    bucket_exists: AtomicUsize,
    list_objects: AtomicUsize,
    delete_objects: AtomicUsize,
}

impl CallCounts {
    pub fn bucket_exists(&self) -> usize {
        self.bucket_exists.load(Ordering::SeqCst)
    }

    pub fn list_objects(&self) -> usize {
        self.list_objects.load(Ordering::SeqCst)
    }

    pub fn delete_objects(&self) -> usize {
        self.delete_objects.load(Ordering::SeqCst)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bucket
    pub fn with_bucket(self, bucket: &str) -> Self {
        lock(&self.buckets).entry(bucket.to_string()).or_default();
        self
    }

    /// Add an object, creating the bucket if needed
    pub fn with_object(self, bucket: &str, key: &str, last_modified: DateTime<Utc>) -> Self {
        self.insert(bucket, ObjectRecord::new(key, last_modified, 0));
        self
    }

    /// Add a fully specified record
    pub fn with_record(self, bucket: &str, record: ObjectRecord) -> Self {
        self.insert(bucket, record);
        self
    }

    /// Make every call fail as if the endpoint were unreachable
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Report a per-item listing error in place of this key
    pub fn with_broken_entry(mut self, key: &str) -> Self {
        self.broken_entries.push(key.to_string());
        self
    }

    /// Refuse to delete `key`, reporting `cause`
    pub fn failing_delete(mut self, key: &str, cause: &str) -> Self {
        self.delete_failures.insert(key.to_string(), cause.to_string());
        self
    }

    pub fn insert(&self, bucket: &str, record: ObjectRecord) {
        lock(&self.buckets)
            .entry(bucket.to_string())
            .or_default()
            .insert(record.key.clone(), record);
    }

    /// Keys currently stored in `bucket`, sorted
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.buckets)
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable {
            Err(StoreError::S3("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn bucket_exists(&self, bucket: &str) -> StoreResult<bool> {
        self.calls.bucket_exists.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        Ok(lock(&self.buckets).contains_key(bucket))
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> StoreResult<Vec<ListEntry>> {
        self.calls.list_objects.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let buckets = lock(&self.buckets);
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::S3(format!("NoSuchBucket: {}", bucket)))?;

        let entries: Vec<ListEntry> = objects
            .values()
            .filter(|record| record.key.starts_with(prefix))
            .filter(|record| recursive || !record.key[prefix.len()..].contains('/'))
            .map(|record| {
                if self.broken_entries.contains(&record.key) {
                    Err(StoreError::InvalidEntry(format!("{}: unreadable", record.key)))
                } else {
                    Ok(record.clone())
                }
            })
            .collect();

        Ok(entries)
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Vec<DeletionFailure> {
        self.calls.delete_objects.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.check_available() {
            return keys
                .iter()
                .map(|key| DeletionFailure {
                    key: key.clone(),
                    cause: e.to_string(),
                })
                .collect();
        }

        let mut buckets = lock(&self.buckets);
        let mut failures = Vec::new();
        for key in keys {
            if let Some(cause) = self.delete_failures.get(key) {
                failures.push(DeletionFailure {
                    key: key.clone(),
                    cause: cause.clone(),
                });
                continue;
            }
            // Deleting a missing key succeeds, like S3.
            if let Some(objects) = buckets.get_mut(bucket) {
                objects.remove(key);
            }
        }
        failures
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[tokio::test]
    async fn test_listing_respects_prefix() {
        let store = MemoryStore::new()
            .with_object("b", "db/1", ts(1))
            .with_object("b", "db/2", ts(2))
            .with_object("b", "logs/1", ts(3));

        let entries = store.list_objects("b", "db/", true).await.unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn test_non_recursive_listing_skips_nested_keys() {
        let store = MemoryStore::new()
            .with_object("b", "db/1", ts(1))
            .with_object("b", "db/daily/2", ts(2));

        let entries = store.list_objects("b", "db/", false).await.unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_reports_only_failures() {
        let store = MemoryStore::new()
            .with_object("b", "x", ts(1))
            .with_object("b", "y", ts(2))
            .failing_delete("y", "AccessDenied");

        let failures = store
            .delete_objects("b", &["x".to_string(), "y".to_string()])
            .await;
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].key, "y");
        assert_eq!(store.keys("b"), vec!["y".to_string()]);
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryStore::new().with_bucket("b").unavailable();
        assert!(store.bucket_exists("b").await.is_err());
        assert_eq!(store.calls().bucket_exists(), 1);
    }
}
