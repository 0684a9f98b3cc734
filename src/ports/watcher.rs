// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem watcher trait definition.
//!
//! This module defines the `PathWatcher` trait, which registers and unregisters
//! filesystem watches, and the `RawNotification` a watcher delivers when something
//! under a watched path changes. Watchers do not interpret notifications: they
//! forward them into the store's notification channel, and the store decides what
//! to re-check.

use crate::domain::Result;
use std::path::{Path, PathBuf};

/// What happened to a path, as far as the store cares.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Content or directory entries changed.
    Modified,
    /// The path was removed or renamed away. Its watch is gone.
    Removed,
}

/// A raw, unattributed filesystem notification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawNotification {
    /// The path the notification refers to
    pub path: PathBuf,
    /// What happened to it
    pub kind: NotificationKind,
}

impl RawNotification {
    /// Creates a `Modified` notification for `path`.
    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: NotificationKind::Modified,
        }
    }

    /// Creates a `Removed` notification for `path`.
    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: NotificationKind::Removed,
        }
    }
}

/// A trait for registering filesystem watches.
///
/// Implementations deliver [`RawNotification`]s through whatever channel they were
/// constructed with. Registering an already watched path must succeed.
///
/// # Thread Safety
///
/// Implementations must be `Send` so that a store can move between threads, e.g.
/// behind the shared system-store handle.
///
/// # Examples
///
/// ```rust
/// use deskcfg::ports::PathWatcher;
/// use deskcfg::domain::Result;
/// use std::collections::HashSet;
/// use std::path::{Path, PathBuf};
///
/// #[derive(Default)]
/// struct RecordingWatcher {
///     paths: HashSet<PathBuf>,
/// }
///
/// impl PathWatcher for RecordingWatcher {
///     fn watch(&mut self, path: &Path) -> Result<()> {
///         self.paths.insert(path.to_path_buf());
///         Ok(())
///     }
///
///     fn unwatch(&mut self, path: &Path) -> Result<()> {
///         self.paths.remove(path);
///         Ok(())
///     }
/// }
///
/// let mut watcher = RecordingWatcher::default();
/// watcher.watch(Path::new("/tmp")).unwrap();
/// assert_eq!(watcher.paths.len(), 1);
/// ```
pub trait PathWatcher: Send {
    /// Starts watching `path` (a store file or the store directory).
    fn watch(&mut self, path: &Path) -> Result<()>;

    /// Stops watching `path`. Unwatching an unknown path is not an error.
    fn unwatch(&mut self, path: &Path) -> Result<()>;
}
