use chrono::{DateTime, Duration, TimeZone, Utc};

use s3bc::cleaner::{select, CleanOptions, Cleaner};
use s3bc::common::{BucketLocator, CleanupError};
use s3bc::store::{MemoryStore, ObjectRecord};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Helper to create a bucket holding `count` nightly backups o1..oN, oldest first
fn nightly_backups(bucket: &str, count: i64) -> MemoryStore {
    (1..=count).fold(MemoryStore::new().with_bucket(bucket), |store, day| {
        store.with_record(
            bucket,
            ObjectRecord::new(
                format!("o{}", day),
                base() + Duration::days(day),
                1024 * day as u64,
            ),
        )
    })
}

fn locator(raw: &str) -> BucketLocator {
    BucketLocator::parse(raw).unwrap()
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_seven_backups_keep_five() {
    let cleaner = Cleaner::new(nightly_backups("backups", 7));

    let report = cleaner
        .clean(&locator("s3://backups"), CleanOptions::keep(5))
        .await
        .unwrap();

    let removed: Vec<_> = report.removed.iter().map(|o| o.key.as_str()).collect();
    assert_eq!(removed, vec!["o1", "o2"]);
    assert_eq!(
        cleaner.store().keys("backups"),
        vec!["o3", "o4", "o5", "o6", "o7"]
    );
}

#[tokio::test]
async fn test_fewer_backups_than_window() {
    let cleaner = Cleaner::new(nightly_backups("backups", 3));

    let report = cleaner
        .clean(&locator("s3://backups"), CleanOptions::keep(5))
        .await
        .unwrap();

    assert!(report.removed.is_empty());
    assert_eq!(report.kept, 3);
    assert_eq!(cleaner.store().keys("backups").len(), 3);
}

#[tokio::test]
async fn test_missing_bucket() {
    let cleaner = Cleaner::new(MemoryStore::new());

    let err = cleaner
        .clean(&locator("s3://backups"), CleanOptions::keep(5))
        .await
        .unwrap_err();

    assert!(matches!(err, CleanupError::BucketNotFound(_)));
    assert!(err.to_string().contains("backups"));
    assert_eq!(cleaner.store().calls().bucket_exists(), 1);
    assert_eq!(cleaner.store().calls().list_objects(), 0);
    assert_eq!(cleaner.store().calls().delete_objects(), 0);
}

#[tokio::test]
async fn test_one_failed_deletion_fails_the_run() {
    let store = nightly_backups("backups", 5).failing_delete("o2", "AccessDenied: permission denied");
    let cleaner = Cleaner::new(store);

    let err = cleaner
        .clean(&locator("s3://backups"), CleanOptions::keep(2))
        .await
        .unwrap_err();

    assert_eq!(err.failed_keys(), vec!["o2"]);
    assert!(err.to_string().contains("1 of 3"));
    assert!(err.to_string().contains("AccessDenied"));
    // The other two deletions still went through.
    assert_eq!(cleaner.store().keys("backups"), vec!["o2", "o4", "o5"]);
}

// ─── Properties ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_rerun_is_noop() {
    let cleaner = Cleaner::new(nightly_backups("backups", 10));
    let target = locator("s3://backups");

    cleaner.clean(&target, CleanOptions::keep(4)).await.unwrap();
    let second = cleaner.clean(&target, CleanOptions::keep(4)).await.unwrap();

    assert!(second.removed.is_empty());
    assert_eq!(second.attempted, 0);
    assert_eq!(cleaner.store().calls().delete_objects(), 1);
}

#[tokio::test]
async fn test_keep_zero_empties_prefix() {
    let store = nightly_backups("backups", 4).with_object("backups", "keep-me/manifest", base());
    let cleaner = Cleaner::new(store);

    let report = cleaner
        .clean(&locator("s3://backups/o"), CleanOptions::keep(0))
        .await
        .unwrap();

    assert_eq!(report.removed.len(), 4);
    assert_eq!(cleaner.store().keys("backups"), vec!["keep-me/manifest"]);
}

#[tokio::test]
async fn test_rerun_after_partial_failure_retries_leftover() {
    let store = nightly_backups("backups", 5).failing_delete("o1", "SlowDown");
    let cleaner = Cleaner::new(store);
    let target = locator("s3://backups");

    assert!(cleaner.clean(&target, CleanOptions::keep(3)).await.is_err());
    // o1 is still there and still the oldest, so the next run selects it again.
    let err = cleaner
        .clean(&target, CleanOptions::keep(3))
        .await
        .unwrap_err();
    assert_eq!(err.failed_keys(), vec!["o1"]);
}

#[test]
fn test_equal_timestamps_order_by_key() {
    let ts = base();
    let objects = vec![ObjectRecord::new("b", ts, 0), ObjectRecord::new("a", ts, 0)];
    for _ in 0..5 {
        assert_eq!(select(&objects, 1), vec!["a".to_string()]);
    }
}
