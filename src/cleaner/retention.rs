//! Retention selection: which objects survive a "keep the last N" policy.
//!
//! Pure functions over owned records. Objects are ordered oldest first by
//! last-modified time, ties broken by key, so the keep/remove boundary is
//! the same on every run.

use std::cmp::Ordering;

use crate::store::ObjectRecord;

/// Result of partitioning a listing around the retention boundary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Objects to delete, oldest first
    pub remove: Vec<ObjectRecord>,
    /// The `keep` most recent objects, oldest first
    pub keep: Vec<ObjectRecord>,
}

impl Selection {
    /// Keys selected for deletion, in deletion order
    pub fn remove_keys(&self) -> Vec<String> {
        self.remove.iter().map(|o| o.key.clone()).collect()
    }
}

/// Oldest first; equal timestamps fall back to ascending key order
pub fn recency_order(a: &ObjectRecord, b: &ObjectRecord) -> Ordering {
    a.last_modified
        .cmp(&b.last_modified)
        .then_with(|| a.key.cmp(&b.key))
}

/// Split `objects` into the `keep` most recent and everything older.
///
/// `keep = 0` removes everything; `keep >= objects.len()` removes nothing.
pub fn partition(mut objects: Vec<ObjectRecord>, keep: usize) -> Selection {
    objects.sort_by(recency_order);

    let boundary = objects.len().saturating_sub(keep);
    let kept = objects.split_off(boundary);

    Selection {
        remove: objects,
        keep: kept,
    }
}

/// Keys of the objects that fall outside the retention window
pub fn select(objects: &[ObjectRecord], keep: usize) -> Vec<String> {
    partition(objects.to_vec(), keep).remove_keys()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::HashSet;

    fn ts(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn obj(key: &str, secs: i64) -> ObjectRecord {
        ObjectRecord::new(key, ts(secs), 0)
    }

    /// Deterministic shuffled listing with a few duplicate timestamps
    fn listing(n: usize) -> Vec<ObjectRecord> {
        (0..n)
            .map(|i| {
                let secs = ((i * 7919) % 13) as i64;
                obj(&format!("backup-{:02}", (i * 31) % 97), secs)
            })
            .collect()
    }

    #[test]
    fn test_keeps_most_recent() {
        let objects: Vec<_> = (1..=7).map(|i| obj(&format!("o{}", i), i)).collect();
        assert_eq!(select(&objects, 5), vec!["o1", "o2"]);
    }

    #[test]
    fn test_unordered_input() {
        let objects = vec![obj("c", 30), obj("a", 10), obj("d", 40), obj("b", 20)];
        assert_eq!(select(&objects, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_keep_exceeding_count_removes_nothing() {
        let objects = vec![obj("a", 1), obj("b", 2), obj("c", 3)];
        assert!(select(&objects, 5).is_empty());
        assert!(select(&objects, usize::MAX).is_empty());
    }

    #[test]
    fn test_keep_equal_to_count_removes_nothing() {
        let objects = vec![obj("a", 1), obj("b", 2)];
        assert!(select(&objects, 2).is_empty());
    }

    #[test]
    fn test_keep_zero_removes_everything() {
        let objects = vec![obj("b", 2), obj("a", 1), obj("c", 3)];
        assert_eq!(select(&objects, 0), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_empty_listing() {
        assert!(select(&[], 0).is_empty());
        assert!(select(&[], 5).is_empty());
    }

    #[test]
    fn test_ties_broken_by_key() {
        let objects = vec![obj("b", 5), obj("a", 5)];
        for _ in 0..10 {
            assert_eq!(select(&objects, 1), vec!["a"]);
        }
        let sel = partition(objects, 1);
        assert_eq!(sel.keep[0].key, "b");
    }

    #[test]
    fn test_tie_at_boundary_is_stable_across_input_orders() {
        let forward = vec![obj("x", 1), obj("a", 2), obj("b", 2), obj("y", 3)];
        let mut backward = forward.clone();
        backward.reverse();
        assert_eq!(select(&forward, 2), vec!["x", "a"]);
        assert_eq!(select(&backward, 2), vec!["x", "a"]);
    }

    #[test]
    fn test_removed_never_newer_than_kept() {
        let objects = listing(40);
        for keep in 0..=45 {
            let sel = partition(objects.clone(), keep);
            assert_eq!(sel.remove.len(), objects.len().saturating_sub(keep));
            assert_eq!(sel.keep.len(), keep.min(objects.len()));

            let newest_removed = sel.remove.iter().map(|o| o.last_modified).max();
            let oldest_kept = sel.keep.iter().map(|o| o.last_modified).min();
            if let (Some(removed), Some(kept)) = (newest_removed, oldest_kept) {
                assert!(removed <= kept, "keep={}", keep);
            }
        }
    }

    #[test]
    fn test_partition_covers_input_exactly_once() {
        let objects = listing(25);
        let sel = partition(objects.clone(), 9);

        let mut seen: Vec<_> = sel.remove.iter().chain(&sel.keep).map(|o| &o.key).collect();
        seen.sort();
        let mut expected: Vec<_> = objects.iter().map(|o| &o.key).collect();
        expected.sort();
        assert_eq!(seen, expected);

        let all = select(&objects, 0);
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(all.len(), objects.len());
        assert_eq!(unique.len(), objects.len());
    }
}
