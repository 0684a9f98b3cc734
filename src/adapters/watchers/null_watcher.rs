// SPDX-License-Identifier: MIT OR Apache-2.0

//! A watcher that registers nothing.

use crate::domain::Result;
use crate::ports::PathWatcher;
use std::path::Path;

/// A watcher that accepts every registration and never reports anything.
///
/// Stores built with it only see external changes when a pass is forced with
/// `reconcile_now` or when notifications are injected through `notifier`. It is
/// the default when the `watch` feature is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullWatcher;

impl PathWatcher for NullWatcher {
    fn watch(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn unwatch(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }
}
