// SPDX-License-Identifier: MIT OR Apache-2.0

//! The key/value store bound to one store file.
//!
//! A `SettingsStore` reads and writes one store file, resolves keys through its
//! group stack, publishes local change events synchronously, and runs the
//! change-detection engine when driven through its event-loop methods
//! (`process_pending`, `wait_for_changes`, `reconcile_now`).
//!
//! All of this happens on the thread that owns the store. Filesystem watchers
//! only feed a channel; nothing touches the store behind the owner's back.

use crate::adapters::{IniFormat, SettingsLocation};
use crate::domain::settings_key::validate_key;
use crate::domain::{
    GroupStack, Result, Scope, SettingsError, SettingsEvent, SettingsMap, SettingsValue,
};
use crate::engine::{
    ChangeReconciler, DebounceScheduler, EventBus, SelfWritePolicy, SnapshotCache, SubscriptionId,
    WatchSet, DEFAULT_DEBOUNCE,
};
use crate::ports::{PathWatcher, RawNotification, SettingsFormat};
use crate::service::SettingsView;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A settings store bound to the store file of one scope.
///
/// # Examples
///
/// ```rust,no_run
/// use deskcfg::prelude::*;
///
/// # fn main() -> Result<()> {
/// let location = SettingsLocation::from_platform()?;
/// let mut store = SettingsStore::application(location, "panel")?;
///
/// store.begin_group("window");
/// store.set("width", 800)?;
/// store.end_group();
///
/// assert_eq!(store.get("window/width"), Some(SettingsValue::from(800)));
/// # Ok(())
/// # }
/// ```
pub struct SettingsStore {
    scope: Scope,
    location: SettingsLocation,
    path: PathBuf,
    format: Arc<dyn SettingsFormat>,
    entries: SettingsMap,
    groups: GroupStack,
    reconciler: ChangeReconciler,
    watch_set: WatchSet,
    debounce: DebounceScheduler,
    events: EventBus,
    notifications: Receiver<RawNotification>,
    notifier: Sender<RawNotification>,
}

impl SettingsStore {
    /// Creates a store builder.
    pub fn builder(location: SettingsLocation, scope: Scope) -> SettingsStoreBuilder {
        SettingsStoreBuilder::new(location, scope)
    }

    /// Opens the system store with default options.
    pub fn system(location: SettingsLocation) -> Result<Self> {
        Self::builder(location, Scope::System).build()
    }

    /// Opens an application's store with default options.
    pub fn application(location: SettingsLocation, app_name: &str) -> Result<Self> {
        Self::builder(location, Scope::application(app_name)?).build()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Returns the value stored under `key`, resolved against the open groups.
    pub fn get(&self, key: &str) -> Option<SettingsValue> {
        self.entries.get(&self.resolve_for_read(key)?).cloned()
    }

    /// Returns the value stored under `key`, or `default` if there is none.
    pub fn get_or(&self, key: &str, default: impl Into<SettingsValue>) -> SettingsValue {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Returns `true` if a value is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.resolve_for_read(key)
            .is_some_and(|key| self.entries.contains_key(&key))
    }

    /// Returns every key of the store, sorted. Groups are not applied.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Returns the keys stored directly below the current group, relative to it.
    pub fn child_keys(&self) -> Vec<String> {
        self.children(false)
    }

    /// Returns the subgroups directly below the current group, relative to it.
    pub fn child_groups(&self) -> Vec<String> {
        self.children(true)
    }

    fn children(&self, groups: bool) -> Vec<String> {
        let prefix = self.groups.prefix();
        let mut names: Vec<String> = self
            .entries
            .keys()
            .filter_map(|key| {
                if prefix.is_empty() {
                    Some(key.as_str())
                } else {
                    key.strip_prefix(&prefix)?.strip_prefix('/')
                }
            })
            .filter_map(|rest| match (rest.split_once('/'), groups) {
                (Some((group, _)), true) => Some(group.to_string()),
                (None, false) => Some(rest.to_string()),
                _ => None,
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Stores `value` under `key` and persists it immediately.
    ///
    /// Nothing is written and no event is published if the stored value is
    /// already equal to `value`. Returns `true` if the value changed.
    ///
    /// Values holding NaN or an infinite float are rejected with
    /// [`SettingsError::InvalidValue`].
    pub fn set(&mut self, key: &str, value: impl Into<SettingsValue>) -> Result<bool> {
        let key = self.resolve_for_write(key)?;
        let value = value.into();
        if !value.is_finite() {
            return Err(SettingsError::InvalidValue {
                key,
                reason: "NaN and infinite numbers cannot be stored".to_string(),
            });
        }

        let mut current = self.load_for_write();
        if current.get(&key) == Some(&value) {
            self.entries = current;
            return Ok(false);
        }

        current.insert(key.clone(), value.clone());
        self.persist(&current)?;
        self.entries = current;
        self.reconciler.snapshot_mut().record(&key, value.clone());

        tracing::debug!("Set '{}' in '{}' ({})", key, self.scope, value.type_name());
        self.events.publish(&SettingsEvent::Local {
            key,
            value: Some(value),
        });
        Ok(true)
    }

    /// Removes `key` and every key below it, and persists the result.
    ///
    /// A local event with no value is published for `key` and for every removed
    /// child key.
    pub fn remove(&mut self, key: &str) -> Result<()> {
        let key = self.resolve_for_write(key)?;
        let child_prefix = format!("{}/", key);

        let mut current = self.load_for_write();
        let mut removed: Vec<String> = current
            .keys()
            .filter(|k| **k == key || k.starts_with(&child_prefix))
            .cloned()
            .collect();
        removed.sort();

        if !removed.is_empty() {
            for k in &removed {
                current.remove(k);
            }
            self.persist(&current)?;
            for k in &removed {
                self.reconciler.snapshot_mut().forget(k);
            }
        }
        self.entries = current;

        if !removed.contains(&key) {
            removed.insert(0, key);
        }
        for key in removed {
            self.events.publish(&SettingsEvent::Local { key, value: None });
        }
        Ok(())
    }

    /// Removes every key of the store and persists the empty store.
    pub fn clear(&mut self) -> Result<()> {
        let current = self.load_for_write();
        self.persist(&SettingsMap::new())?;
        self.entries.clear();
        self.reconciler.snapshot_mut().clear();

        let mut removed: Vec<String> = current.into_keys().collect();
        removed.sort();
        tracing::debug!("Cleared {} key(s) from '{}'", removed.len(), self.scope);
        for key in removed {
            self.events.publish(&SettingsEvent::Local { key, value: None });
        }
        Ok(())
    }

    /// Synchronizes the in-memory view with the store file.
    ///
    /// Writes are persisted as they happen, so there is never anything buffered
    /// to write out; this re-reads the file so that `get` reflects changes made
    /// by other writers without waiting for the next reconciliation pass.
    pub fn flush(&mut self) -> Result<()> {
        self.entries = self.format.load(&self.path)?;
        Ok(())
    }

    /// Invalid keys are never stored, so reads treat them as absent.
    fn resolve_for_read(&self, key: &str) -> Option<String> {
        let key = self.groups.compose(key);
        validate_key(&key).ok()?;
        Some(key)
    }

    fn resolve_for_write(&self, key: &str) -> Result<String> {
        let key = self.groups.compose(key);
        validate_key(&key)?;
        Ok(key)
    }

    /// Re-reads the store file before a change so that keys written by others
    /// since the last read survive it.
    fn load_for_write(&self) -> SettingsMap {
        match self.format.load(&self.path) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(
                    "Failed to re-read {} before writing, using the cached view: {}",
                    self.path.display(),
                    e
                );
                self.entries.clone()
            }
        }
    }

    fn persist(&mut self, entries: &SettingsMap) -> Result<()> {
        self.reconciler.arm_self_write();
        if let Err(e) = self.format.persist(&self.path, entries) {
            self.reconciler.disarm_self_write();
            return Err(e);
        }
        // The write replaced the file, and may have created the directory.
        self.watch_set.ensure_dir(self.location.dir());
        self.watch_set.rearm_file(&self.path);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Groups
    // ------------------------------------------------------------------

    /// Opens a group: subsequent keys are resolved below `prefix`.
    pub fn begin_group(&mut self, prefix: &str) {
        self.groups.begin(prefix);
    }

    /// Closes the innermost group.
    ///
    /// An `end_group` without a matching `begin_group` is ignored and logged.
    pub fn end_group(&mut self) {
        if !self.groups.end() {
            tracing::warn!("end_group() called on '{}' without an open group", self.scope);
        }
    }

    /// Returns the composed prefix of the open groups.
    pub fn group(&self) -> String {
        self.groups.prefix()
    }

    /// Returns the number of open groups.
    pub fn group_depth(&self) -> usize {
        self.groups.depth()
    }

    // ------------------------------------------------------------------
    // Cross-scope reads
    // ------------------------------------------------------------------

    /// Reads `key` from the system store.
    ///
    /// The system store itself answers from its own view (groups applied). Any
    /// other store opens a short-lived, unwatched view of the system file.
    pub fn read_from_system_scope(&self, key: &str, default: impl Into<SettingsValue>) -> SettingsValue {
        if self.scope.is_system() {
            return self.get_or(key, default);
        }
        SettingsView::open(&self.location, Scope::System, self.format.as_ref()).get_or(key, default)
    }

    /// Reads `key` from another application's store through a short-lived,
    /// unwatched view. An invalid application name yields `default`.
    pub fn read_from_other_application(
        &self,
        app_name: &str,
        key: &str,
        default: impl Into<SettingsValue>,
    ) -> SettingsValue {
        match Scope::application(app_name) {
            Ok(scope) => SettingsView::open(&self.location, scope, self.format.as_ref()).get_or(key, default),
            Err(e) => {
                tracing::warn!("Cannot read from another application: {}", e);
                default.into()
            }
        }
    }

    // ------------------------------------------------------------------
    // Events
    // ------------------------------------------------------------------

    /// Registers a callback for local and external change events.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SettingsEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(callback)
    }

    /// Registers a channel receiving every change event.
    pub fn subscribe_channel(&self) -> (SubscriptionId, Receiver<SettingsEvent>) {
        self.events.subscribe_channel()
    }

    /// Removes a subscriber.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Returns a handle to the store's event bus.
    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    // ------------------------------------------------------------------
    // Event loop
    // ------------------------------------------------------------------

    /// Returns a sender feeding the store's notification channel.
    ///
    /// Watchers created outside the store, or tests, deliver raw notifications
    /// through it.
    pub fn notifier(&self) -> Sender<RawNotification> {
        self.notifier.clone()
    }

    /// Drains pending notifications and runs a reconciliation pass if the
    /// debounce interval has elapsed. Returns the number of events published.
    pub fn process_pending(&mut self) -> usize {
        self.process_pending_at(Instant::now())
    }

    /// Like [`SettingsStore::process_pending`], with an explicit clock.
    pub fn process_pending_at(&mut self, now: Instant) -> usize {
        while let Ok(notification) = self.notifications.try_recv() {
            self.accept(notification, now);
        }
        if self.debounce.fire_if_due(now) {
            self.run_pass()
        } else {
            0
        }
    }

    /// Blocks until a reconciliation pass publishes events or `timeout` elapses.
    /// Returns the number of events published.
    pub fn wait_for_changes(&mut self, timeout: Duration) -> usize {
        let deadline = Instant::now() + timeout;
        loop {
            let now = Instant::now();
            let published = self.process_pending_at(now);
            if published > 0 || now >= deadline {
                return published;
            }

            let until_deadline = deadline.saturating_duration_since(now);
            let wait = self
                .debounce
                .remaining(now)
                .map_or(until_deadline, |remaining| remaining.min(until_deadline));

            match self.notifications.recv_timeout(wait) {
                Ok(notification) => self.accept(notification, Instant::now()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return 0,
            }
        }
    }

    /// Runs a reconciliation pass immediately, regardless of the debounce state.
    /// Returns the number of events published.
    pub fn reconcile_now(&mut self) -> usize {
        while let Ok(notification) = self.notifications.try_recv() {
            self.watch_set.note(&notification);
        }
        self.debounce.cancel();
        self.run_pass()
    }

    /// Returns the pending debounce deadline, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    fn accept(&mut self, notification: RawNotification, now: Instant) {
        tracing::trace!("Notification {:?} for {}", notification.kind, notification.path.display());
        self.watch_set.note(&notification);
        self.debounce.arm(now);
    }

    fn run_pass(&mut self) -> usize {
        let report = self
            .reconciler
            .run_pass(&self.location, self.format.as_ref(), &mut self.watch_set);
        if let Some(entries) = report.own_entries {
            self.entries = entries;
        }
        for event in &report.events {
            self.events.publish(event);
        }
        report.events.len()
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    /// Returns the scope of the store.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Returns the origin identity: `system` or the application name.
    pub fn application_name(&self) -> &str {
        self.scope.origin()
    }

    /// Returns the store file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the settings location.
    pub fn location(&self) -> &SettingsLocation {
        &self.location
    }

    /// Returns the snapshot of the store file used for change detection.
    pub fn snapshot(&self) -> &SnapshotCache {
        self.reconciler.snapshot()
    }

    /// Returns the snapshot of another application's file (system scope only).
    pub fn sibling_snapshot(&self, app_name: &str) -> Option<&SnapshotCache> {
        self.reconciler.sibling_snapshot(app_name)
    }

    /// Returns `true` if the next pass will treat the store file as written locally.
    pub fn self_write_pending(&self) -> bool {
        self.reconciler.self_write_pending()
    }

    /// Returns the set of watched paths.
    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore")
            .field("scope", &self.scope)
            .field("path", &self.path)
            .field("keys", &self.entries.len())
            .field("group", &self.groups.prefix())
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a `SettingsStore`.
///
/// # Examples
///
/// ```rust
/// use deskcfg::prelude::*;
/// use deskcfg::adapters::NullWatcher;
/// use std::time::Duration;
///
/// # fn main() -> Result<()> {
/// let dir = tempfile::TempDir::new()?;
/// let store = SettingsStore::builder(SettingsLocation::new(dir.path()), Scope::System)
///     .debounce(Duration::from_millis(50))
///     .self_write_policy(SelfWritePolicy::DiffAgainstCache)
///     .watcher(Box::new(NullWatcher))
///     .build()?;
/// assert_eq!(store.application_name(), "system");
/// # Ok(())
/// # }
/// ```
pub struct SettingsStoreBuilder {
    location: SettingsLocation,
    scope: Scope,
    debounce: Duration,
    policy: SelfWritePolicy,
    watcher: Option<Box<dyn PathWatcher>>,
    format: Arc<dyn SettingsFormat>,
}

impl SettingsStoreBuilder {
    /// Creates a builder with default options.
    pub fn new(location: SettingsLocation, scope: Scope) -> Self {
        Self {
            location,
            scope,
            debounce: DEFAULT_DEBOUNCE,
            policy: SelfWritePolicy::default(),
            watcher: None,
            format: Arc::new(IniFormat::new()),
        }
    }

    /// Sets the debounce quiet interval.
    pub fn debounce(mut self, interval: Duration) -> Self {
        self.debounce = interval;
        self
    }

    /// Sets how the pass after a local write treats the store file.
    pub fn self_write_policy(mut self, policy: SelfWritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Uses a custom watcher instead of the native one.
    ///
    /// The store's own notification channel is available through
    /// [`SettingsStore::notifier`] after building.
    pub fn watcher(mut self, watcher: Box<dyn PathWatcher>) -> Self {
        self.watcher = Some(watcher);
        self
    }

    /// Uses a custom store file format. Store files are named and discovered by
    /// the format's extension.
    pub fn format(mut self, format: Arc<dyn SettingsFormat>) -> Self {
        self.format = format;
        self
    }

    /// Builds the store: reads the store file, seeds the snapshots and
    /// registers the initial watches.
    pub fn build(self) -> Result<SettingsStore> {
        let location = self.location.with_extension(self.format.extension());
        let (notifier, notifications) = channel();
        let watcher = match self.watcher {
            Some(watcher) => watcher,
            None => default_watcher(notifier.clone())?,
        };

        let path = location.store_file(&self.scope);
        let entries = self.format.load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to read {}, starting empty: {}", path.display(), e);
            SettingsMap::new()
        });

        let mut watch_set = WatchSet::new(watcher);
        watch_set.ensure_file(&path);
        watch_set.ensure_dir(location.dir());

        let mut reconciler = ChangeReconciler::new(&self.scope, path.clone(), entries.clone(), self.policy);
        reconciler.seed_siblings(&location, self.format.as_ref(), &mut watch_set);

        tracing::info!(
            "Opened '{}' settings store at {} ({} key(s))",
            self.scope,
            path.display(),
            entries.len()
        );

        Ok(SettingsStore {
            scope: self.scope,
            location,
            path,
            format: self.format,
            entries,
            groups: GroupStack::new(),
            reconciler,
            watch_set,
            debounce: DebounceScheduler::new(self.debounce),
            events: EventBus::new(),
            notifications,
            notifier,
        })
    }
}

#[cfg(feature = "watch")]
fn default_watcher(notifier: Sender<RawNotification>) -> Result<Box<dyn PathWatcher>> {
    Ok(Box::new(crate::adapters::NotifyWatcher::new(notifier)?))
}

#[cfg(not(feature = "watch"))]
fn default_watcher(_notifier: Sender<RawNotification>) -> Result<Box<dyn PathWatcher>> {
    Ok(Box::new(crate::adapters::NullWatcher))
}
