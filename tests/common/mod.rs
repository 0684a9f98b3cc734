// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helper utilities for settings store integration tests.

use deskcfg::adapters::NullWatcher;
use deskcfg::engine::DEFAULT_DEBOUNCE;
use deskcfg::ports::RawNotification;
use deskcfg::prelude::*;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::Instant;
use tempfile::TempDir;

/// Initializes test logging once per test binary.
///
/// Store diagnostics go through the test writer, so they only show up for
/// failing tests or with `--nocapture`.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Creates a temporary settings directory and its location.
#[allow(dead_code)]
pub fn temp_location() -> (TempDir, SettingsLocation) {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let location = SettingsLocation::new(dir.path());
    (dir, location)
}

/// Builds a store that never receives native notifications.
///
/// Tests deliver notifications by hand through [`touch`] and drive the debounce
/// clock with [`settle`].
#[allow(dead_code)]
pub fn manual_store(location: &SettingsLocation, scope: Scope) -> SettingsStore {
    SettingsStore::builder(location.clone(), scope)
        .watcher(Box::new(NullWatcher))
        .build()
        .unwrap()
}

/// Builds a manual store with the given self-write policy.
#[allow(dead_code)]
pub fn manual_store_with_policy(
    location: &SettingsLocation,
    scope: Scope,
    policy: SelfWritePolicy,
) -> SettingsStore {
    SettingsStore::builder(location.clone(), scope)
        .watcher(Box::new(NullWatcher))
        .self_write_policy(policy)
        .build()
        .unwrap()
}

/// Builds a manual application store.
#[allow(dead_code)]
pub fn app_store(location: &SettingsLocation, name: &str) -> SettingsStore {
    manual_store(location, Scope::application(name).unwrap())
}

/// Delivers a modification notification for `path` to `store`.
#[allow(dead_code)]
pub fn touch(store: &SettingsStore, path: &Path) {
    store
        .notifier()
        .send(RawNotification::modified(path))
        .unwrap();
}

/// Delivers a removal notification for `path` to `store`.
#[allow(dead_code)]
pub fn vanish(store: &SettingsStore, path: &Path) {
    store
        .notifier()
        .send(RawNotification::removed(path))
        .unwrap();
}

/// Runs one full debounce cycle starting now and returns the number of events
/// published by the pass.
#[allow(dead_code)]
pub fn settle(store: &mut SettingsStore) -> usize {
    let start = Instant::now();
    let early = store.process_pending_at(start);
    early + store.process_pending_at(start + DEFAULT_DEBOUNCE)
}

/// Collects every event currently queued on `rx`.
#[allow(dead_code)]
pub fn drain(rx: &Receiver<SettingsEvent>) -> Vec<SettingsEvent> {
    rx.try_iter().collect()
}

/// Collects the externally attributed events currently queued on `rx`.
#[allow(dead_code)]
pub fn drain_external(rx: &Receiver<SettingsEvent>) -> Vec<SettingsEvent> {
    rx.try_iter().filter(SettingsEvent::is_external).collect()
}

/// Builds an external change event.
#[allow(dead_code)]
pub fn external(origin: &str, key: &str, value: Option<SettingsValue>) -> SettingsEvent {
    SettingsEvent::External {
        origin: origin.to_string(),
        key: key.to_string(),
        value,
    }
}
