// SPDX-License-Identifier: MIT OR Apache-2.0

//! Native filesystem watcher backed by the `notify` crate.
//!
//! This watcher forwards relevant filesystem events as [`RawNotification`]s into
//! the store's notification channel. It performs no debouncing itself; the store
//! coalesces notifications on its own thread.

use crate::domain::{Result, SettingsError};
use crate::ports::{PathWatcher, RawNotification};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use std::sync::mpsc::Sender;

/// Filesystem watcher for store files and the settings directory.
///
/// # Examples
///
/// ```rust,no_run
/// use deskcfg::adapters::NotifyWatcher;
/// use deskcfg::ports::PathWatcher;
/// use std::path::Path;
/// use std::sync::mpsc::channel;
///
/// # fn main() -> deskcfg::domain::Result<()> {
/// let (tx, rx) = channel();
/// let mut watcher = NotifyWatcher::new(tx)?;
/// watcher.watch(Path::new("/home/me/.config/deskcfg"))?;
///
/// for notification in rx {
///     println!("{:?} changed", notification.path);
/// }
/// # Ok(())
/// # }
/// ```
pub struct NotifyWatcher {
    watcher: RecommendedWatcher,
}

impl NotifyWatcher {
    /// Creates a watcher that sends notifications to `sender`.
    pub fn new(sender: Sender<RawNotification>) -> Result<Self> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for notification in translate(&event) {
                        // The store is gone once its receiver is dropped.
                        if sender.send(notification).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => tracing::warn!("Filesystem watcher reported an error: {}", e),
            },
            notify::Config::default(),
        )
        .map_err(|e| SettingsError::WatcherError {
            message: format!("Failed to create file watcher: {}", e),
            source: Some(Box::new(e)),
        })?;

        Ok(Self { watcher })
    }
}

impl std::fmt::Debug for NotifyWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyWatcher").finish_non_exhaustive()
    }
}

impl PathWatcher for NotifyWatcher {
    fn watch(&mut self, path: &Path) -> Result<()> {
        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| SettingsError::WatcherError {
                message: format!("Failed to watch {}: {}", path.display(), e),
                source: Some(Box::new(e)),
            })
    }

    fn unwatch(&mut self, path: &Path) -> Result<()> {
        match self.watcher.unwatch(path) {
            Ok(()) => Ok(()),
            Err(notify::Error {
                kind: notify::ErrorKind::WatchNotFound,
                ..
            }) => Ok(()),
            Err(e) => Err(SettingsError::WatcherError {
                message: format!("Failed to unwatch {}: {}", path.display(), e),
                source: Some(Box::new(e)),
            }),
        }
    }
}

/// Maps a `notify` event onto store notifications.
///
/// Access events are dropped: the store reads its own files on every pass and
/// must not wake itself up by doing so.
fn translate(event: &Event) -> Vec<RawNotification> {
    match &event.kind {
        EventKind::Access(_) => Vec::new(),
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => event
            .paths
            .iter()
            .map(RawNotification::removed)
            .collect(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            let mut out: Vec<RawNotification> =
                event.paths.iter().map(RawNotification::modified).collect();
            if let Some(first) = out.first_mut() {
                *first = RawNotification::removed(first.path.clone());
            }
            out
        }
        _ => event.paths.iter().map(RawNotification::modified).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::NotificationKind;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind};
    use std::fs;
    use std::sync::mpsc::channel;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_translate_ignores_access() {
        let event = Event::new(EventKind::Access(AccessKind::Any)).add_path("/x/a.conf".into());
        assert!(translate(&event).is_empty());
    }

    #[test]
    fn test_translate_kinds() {
        let modify = Event::new(EventKind::Modify(ModifyKind::Data(DataChange::Any)))
            .add_path("/x/a.conf".into());
        assert_eq!(translate(&modify), vec![RawNotification::modified("/x/a.conf")]);

        let create = Event::new(EventKind::Create(CreateKind::File)).add_path("/x/b.conf".into());
        assert_eq!(translate(&create)[0].kind, NotificationKind::Modified);

        let remove = Event::new(EventKind::Remove(RemoveKind::File)).add_path("/x/a.conf".into());
        assert_eq!(translate(&remove), vec![RawNotification::removed("/x/a.conf")]);

        let rename = Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path("/x/a.conf.tmp".into())
            .add_path("/x/a.conf".into());
        assert_eq!(
            translate(&rename),
            vec![
                RawNotification::removed("/x/a.conf.tmp"),
                RawNotification::modified("/x/a.conf"),
            ]
        );
    }

    #[test]
    fn test_watch_missing_path_fails() {
        let (tx, _rx) = channel();
        let mut watcher = NotifyWatcher::new(tx).unwrap();
        assert!(watcher.watch(Path::new("/nonexistent/deskcfg/dir")).is_err());
    }

    #[test]
    fn test_unwatch_unknown_path_is_ok() {
        let dir = TempDir::new().unwrap();
        let (tx, _rx) = channel();
        let mut watcher = NotifyWatcher::new(tx).unwrap();
        assert!(watcher.unwatch(dir.path()).is_ok());
    }

    #[test]
    fn test_directory_change_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let (tx, rx) = channel();
        let mut watcher = NotifyWatcher::new(tx).unwrap();
        watcher.watch(dir.path()).unwrap();

        fs::write(dir.path().join("foo.conf"), "a=1\n").unwrap();

        let notification = rx.recv_timeout(Duration::from_secs(5));
        assert!(notification.is_ok(), "expected a notification for the new file");
    }
}
