// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-file snapshot of the last known key/value set.
//!
//! The snapshot is what change detection diffs a fresh read against. After a diff
//! it equals the fresh read exactly.

use crate::domain::{SettingsMap, SettingsValue};
use std::collections::BTreeSet;

/// The outcome of diffing a fresh read against a snapshot.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotDiff {
    /// Keys that were added or whose value changed, with their new value
    pub changed: SettingsMap,
    /// Keys that disappeared
    pub removed: BTreeSet<String>,
}

impl SnapshotDiff {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty()
    }

    /// Returns the number of changed and removed keys.
    pub fn len(&self) -> usize {
        self.changed.len() + self.removed.len()
    }

    /// Flattens the diff into `(key, new value)` pairs ordered by key, with `None`
    /// for removed keys.
    pub fn into_changes(self) -> Vec<(String, Option<SettingsValue>)> {
        let mut changes: Vec<(String, Option<SettingsValue>)> = self
            .changed
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .chain(self.removed.into_iter().map(|key| (key, None)))
            .collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        changes
    }
}

/// In-memory map of the last known key/value pairs of one store file.
///
/// # Examples
///
/// ```rust
/// use deskcfg::engine::SnapshotCache;
/// use deskcfg::domain::{SettingsMap, SettingsValue};
///
/// let mut cache = SnapshotCache::new();
/// let mut fresh = SettingsMap::new();
/// fresh.insert("theme".to_string(), SettingsValue::from("dark"));
///
/// let diff = cache.diff(fresh.clone());
/// assert_eq!(diff.changed.len(), 1);
/// assert_eq!(cache.entries(), &fresh);
/// assert!(cache.diff(fresh).is_empty());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotCache {
    entries: SettingsMap,
}

impl SnapshotCache {
    /// Creates an empty snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot seeded with `entries`.
    pub fn seeded(entries: SettingsMap) -> Self {
        Self { entries }
    }

    /// Diffs `current` against the snapshot and replaces the snapshot with it.
    ///
    /// Runs in time linear in the number of keys of both sides.
    pub fn diff(&mut self, current: SettingsMap) -> SnapshotDiff {
        let mut diff = SnapshotDiff::default();

        for (key, value) in &current {
            if self.entries.get(key) != Some(value) {
                diff.changed.insert(key.clone(), value.clone());
            }
        }
        for key in self.entries.keys() {
            if !current.contains_key(key) {
                diff.removed.insert(key.clone());
            }
        }

        self.entries = current;
        diff
    }

    /// Replaces the snapshot without computing a diff.
    pub fn reseed(&mut self, entries: SettingsMap) {
        self.entries = entries;
    }

    /// Records a value written locally.
    pub fn record(&mut self, key: &str, value: SettingsValue) {
        self.entries.insert(key.to_string(), value);
    }

    /// Forgets a key removed locally.
    pub fn forget(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Empties the snapshot.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the cached value for `key`.
    pub fn get(&self, key: &str) -> Option<&SettingsValue> {
        self.entries.get(key)
    }

    /// Returns every cached entry.
    pub fn entries(&self) -> &SettingsMap {
        &self.entries
    }

    /// Returns the number of cached keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no key is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
