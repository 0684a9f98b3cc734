// SPDX-License-Identifier: MIT OR Apache-2.0

//! The set of paths currently registered with the filesystem watcher.
//!
//! Registration failures are logged and left for the next reconciliation pass to
//! retry. A `Removed` notification drops the path, so the next pass re-adds it once
//! it exists again.

use crate::ports::{NotificationKind, PathWatcher, RawNotification};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Watched store files and directories.
pub struct WatchSet {
    watcher: Box<dyn PathWatcher>,
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl WatchSet {
    /// Creates an empty watch set on top of `watcher`.
    pub fn new(watcher: Box<dyn PathWatcher>) -> Self {
        Self {
            watcher,
            files: BTreeSet::new(),
            dirs: BTreeSet::new(),
        }
    }

    /// Watches a store file if it exists and is not watched yet.
    ///
    /// Returns `true` if the file is watched after the call.
    pub fn ensure_file(&mut self, path: &Path) -> bool {
        if self.files.contains(path) {
            return true;
        }
        if !path.is_file() {
            return false;
        }
        Self::register(self.watcher.as_mut(), &mut self.files, path)
    }

    /// Watches a directory if it exists and is not watched yet.
    ///
    /// Returns `true` if the directory is watched after the call.
    pub fn ensure_dir(&mut self, path: &Path) -> bool {
        if self.dirs.contains(path) {
            return true;
        }
        if !path.is_dir() {
            return false;
        }
        Self::register(self.watcher.as_mut(), &mut self.dirs, path)
    }

    /// Re-registers a file whose inode was replaced, e.g. by an atomic rename.
    pub fn rearm_file(&mut self, path: &Path) -> bool {
        self.forget(path);
        self.ensure_file(path)
    }

    /// Updates the set from a raw notification.
    pub fn note(&mut self, notification: &RawNotification) {
        if notification.kind != NotificationKind::Removed {
            return;
        }
        let path = notification.path.as_path();
        if self.dirs.contains(path) {
            let nested: Vec<PathBuf> = self
                .files
                .iter()
                .filter(|file| file.starts_with(path))
                .cloned()
                .collect();
            for file in nested {
                self.forget(&file);
            }
        }
        self.forget(path);
    }

    /// Returns `true` if `path` is currently watched.
    pub fn is_watching(&self, path: &Path) -> bool {
        self.files.contains(path) || self.dirs.contains(path)
    }

    /// Returns the watched files.
    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.files.iter().map(PathBuf::as_path)
    }

    /// Returns the watched directories.
    pub fn dirs(&self) -> impl Iterator<Item = &Path> {
        self.dirs.iter().map(PathBuf::as_path)
    }

    fn forget(&mut self, path: &Path) {
        let known = self.files.remove(path) | self.dirs.remove(path);
        if known {
            if let Err(e) = self.watcher.unwatch(path) {
                tracing::debug!("Failed to unwatch {}: {}", path.display(), e);
            }
        }
    }

    fn register(watcher: &mut dyn PathWatcher, set: &mut BTreeSet<PathBuf>, path: &Path) -> bool {
        match watcher.watch(path) {
            Ok(()) => {
                tracing::debug!("Watching {}", path.display());
                set.insert(path.to_path_buf());
                true
            }
            Err(e) => {
                tracing::warn!("Failed to watch {}: {}", path.display(), e);
                false
            }
        }
    }
}

impl std::fmt::Debug for WatchSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchSet")
            .field("files", &self.files)
            .field("dirs", &self.dirs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Result, SettingsError};
    use std::fs;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    #[derive(Clone, Default)]
    struct SharedWatcher {
        watched: Arc<Mutex<BTreeSet<PathBuf>>>,
        refuse: Arc<Mutex<bool>>,
    }

    impl PathWatcher for SharedWatcher {
        fn watch(&mut self, path: &Path) -> Result<()> {
            if *self.refuse.lock().unwrap() {
                return Err(SettingsError::WatcherError {
                    message: "refused".to_string(),
                    source: None,
                });
            }
            self.watched.lock().unwrap().insert(path.to_path_buf());
            Ok(())
        }

        fn unwatch(&mut self, path: &Path) -> Result<()> {
            self.watched.lock().unwrap().remove(path);
            Ok(())
        }
    }

    #[test]
    fn test_missing_paths_are_not_watched() {
        let dir = TempDir::new().unwrap();
        let mut set = WatchSet::new(Box::new(SharedWatcher::default()));
        assert!(!set.ensure_file(&dir.path().join("absent.conf")));
        assert!(!set.ensure_dir(&dir.path().join("absent")));
        assert!(set.ensure_dir(dir.path()));
        assert!(set.is_watching(dir.path()));
    }

    #[test]
    fn test_removed_notification_drops_and_rearms() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("foo.conf");
        fs::write(&file, "a=1\n").unwrap();

        let watcher = SharedWatcher::default();
        let mut set = WatchSet::new(Box::new(watcher.clone()));
        assert!(set.ensure_file(&file));

        set.note(&RawNotification::removed(&file));
        assert!(!set.is_watching(&file));
        assert!(watcher.watched.lock().unwrap().is_empty());

        assert!(set.ensure_file(&file));
        assert!(watcher.watched.lock().unwrap().contains(&file));
    }

    #[test]
    fn test_removed_directory_drops_nested_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("foo.conf");
        fs::write(&file, "").unwrap();

        let mut set = WatchSet::new(Box::new(SharedWatcher::default()));
        set.ensure_dir(dir.path());
        set.ensure_file(&file);

        set.note(&RawNotification::removed(dir.path()));
        assert_eq!(set.files().count(), 0);
        assert_eq!(set.dirs().count(), 0);
    }

    #[test]
    fn test_modified_notification_keeps_watch() {
        let dir = TempDir::new().unwrap();
        let mut set = WatchSet::new(Box::new(SharedWatcher::default()));
        set.ensure_dir(dir.path());
        set.note(&RawNotification::modified(dir.path()));
        assert!(set.is_watching(dir.path()));
    }

    #[test]
    fn test_registration_failure_is_retried() {
        let dir = TempDir::new().unwrap();
        let watcher = SharedWatcher::default();
        *watcher.refuse.lock().unwrap() = true;

        let mut set = WatchSet::new(Box::new(watcher.clone()));
        assert!(!set.ensure_dir(dir.path()));

        *watcher.refuse.lock().unwrap() = false;
        assert!(set.ensure_dir(dir.path()));
    }
}
