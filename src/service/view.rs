// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read-only, unwatched views of a store file.

use crate::adapters::SettingsLocation;
use crate::domain::{Scope, SettingsMap, SettingsValue};
use crate::ports::SettingsFormat;
use std::path::{Path, PathBuf};

/// A point-in-time, read-only view of one scope's store file.
///
/// Views never watch anything and never publish events. They back the
/// cross-scope reads of [`SettingsStore`](crate::service::SettingsStore).
#[derive(Clone, Debug)]
pub struct SettingsView {
    scope: Scope,
    path: PathBuf,
    entries: SettingsMap,
}

impl SettingsView {
    /// Reads the store file of `scope`. An unreadable file yields an empty view.
    pub fn open(location: &SettingsLocation, scope: Scope, format: &dyn SettingsFormat) -> Self {
        let path = location
            .clone()
            .with_extension(format.extension())
            .store_file(&scope);
        let entries = format.load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to read {}: {}", path.display(), e);
            SettingsMap::new()
        });
        Self { scope, path, entries }
    }

    /// Returns the value stored under the full key `key`.
    pub fn get(&self, key: &str) -> Option<SettingsValue> {
        self.entries.get(key).cloned()
    }

    /// Returns the value stored under `key`, or `default` if there is none.
    pub fn get_or(&self, key: &str, default: impl Into<SettingsValue>) -> SettingsValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns every key of the view, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the scope the view was read from.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the store file the view was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
