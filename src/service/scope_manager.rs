// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ownership of the system and application stores.
//!
//! A `ScopeManager` is constructed once at startup and handed to whoever needs
//! settings. It creates the system store lazily, exactly once, even when several
//! threads ask for it at the same time, and builds application stores on demand.
//! [`ScopeManager::global`] offers a process-wide manager for callers that cannot
//! thread a handle through.

use crate::adapters::{IniFormat, SettingsLocation};
use crate::domain::{Result, Scope, SettingsValue};
use crate::engine::{SelfWritePolicy, DEFAULT_DEBOUNCE};
use crate::ports::PathWatcher;
use crate::service::{SettingsStore, SettingsStoreBuilder, SettingsView};
use once_cell::sync::OnceCell;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A shared handle to the system store.
pub type SharedStore = Arc<Mutex<SettingsStore>>;

/// Creates the watcher of each store built by a manager.
pub type WatcherFactory = Arc<dyn Fn() -> Box<dyn PathWatcher> + Send + Sync>;

static GLOBAL: OnceCell<ScopeManager> = OnceCell::new();

/// Owner of the system store and factory of application stores.
///
/// # Examples
///
/// ```rust
/// use deskcfg::prelude::*;
/// use deskcfg::adapters::NullWatcher;
/// use std::sync::Arc;
///
/// # fn main() -> Result<()> {
/// let dir = tempfile::TempDir::new()?;
/// let manager = ScopeManager::new(SettingsLocation::new(dir.path()))
///     .with_watcher_factory(|| Box::new(NullWatcher));
///
/// let mut panel = manager.application("panel")?;
/// panel.set("position", "top")?;
///
/// let system = manager.system()?;
/// assert!(Arc::ptr_eq(&system, &manager.system()?));
/// assert_eq!(
///     manager.read_from_other_application("panel", "position", "bottom"),
///     SettingsValue::from("top")
/// );
/// # Ok(())
/// # }
/// ```
pub struct ScopeManager {
    location: SettingsLocation,
    system: OnceCell<SharedStore>,
    debounce: Duration,
    policy: SelfWritePolicy,
    watcher_factory: Option<WatcherFactory>,
}

impl ScopeManager {
    /// Creates a manager for the given settings location.
    pub fn new(location: SettingsLocation) -> Self {
        Self {
            location,
            system: OnceCell::new(),
            debounce: DEFAULT_DEBOUNCE,
            policy: SelfWritePolicy::default(),
            watcher_factory: None,
        }
    }

    /// Creates a manager for the platform settings location.
    pub fn from_platform() -> Result<Self> {
        Ok(Self::new(SettingsLocation::from_platform()?))
    }

    /// Returns the process-wide manager at the platform settings location,
    /// creating it on first use.
    pub fn global() -> Result<&'static ScopeManager> {
        GLOBAL.get_or_try_init(Self::from_platform)
    }

    /// Sets the debounce interval of the stores built by this manager.
    pub fn with_debounce(mut self, interval: Duration) -> Self {
        self.debounce = interval;
        self
    }

    /// Sets the self-write policy of the stores built by this manager.
    pub fn with_self_write_policy(mut self, policy: SelfWritePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Uses `factory` to create the watcher of each store built by this manager.
    pub fn with_watcher_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Box<dyn PathWatcher> + Send + Sync + 'static,
    {
        self.watcher_factory = Some(Arc::new(factory));
        self
    }

    /// Returns the settings location.
    pub fn location(&self) -> &SettingsLocation {
        &self.location
    }

    /// Returns the system store, creating it on first call.
    ///
    /// Concurrent first calls construct the store exactly once; every caller
    /// receives a handle to the same instance.
    pub fn system(&self) -> Result<SharedStore> {
        self.system
            .get_or_try_init(|| {
                let store = self.builder(Scope::System).build()?;
                Ok(Arc::new(Mutex::new(store)))
            })
            .cloned()
    }

    /// Builds a new store for the application `app_name`.
    pub fn application(&self, app_name: &str) -> Result<SettingsStore> {
        self.builder(Scope::application(app_name)?).build()
    }

    /// Opens a read-only, unwatched view of a scope's store file.
    pub fn open_view(&self, scope: Scope) -> SettingsView {
        SettingsView::open(&self.location, scope, &IniFormat::new())
    }

    /// Reads `key` from the system store file without creating the system store.
    pub fn read_from_system_scope(&self, key: &str, default: impl Into<SettingsValue>) -> SettingsValue {
        self.open_view(Scope::System).get_or(key, default)
    }

    /// Reads `key` from an application's store file. An invalid application
    /// name yields `default`.
    pub fn read_from_other_application(
        &self,
        app_name: &str,
        key: &str,
        default: impl Into<SettingsValue>,
    ) -> SettingsValue {
        match Scope::application(app_name) {
            Ok(scope) => self.open_view(scope).get_or(key, default),
            Err(e) => {
                tracing::warn!("Cannot read from another application: {}", e);
                default.into()
            }
        }
    }

    fn builder(&self, scope: Scope) -> SettingsStoreBuilder {
        let builder = SettingsStore::builder(self.location.clone(), scope)
            .debounce(self.debounce)
            .self_write_policy(self.policy);
        match &self.watcher_factory {
            Some(factory) => builder.watcher(factory()),
            None => builder,
        }
    }
}

impl std::fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopeManager")
            .field("location", &self.location)
            .field("system_created", &self.system.get().is_some())
            .field("debounce", &self.debounce)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Locks a shared store, recovering the guard if a previous holder panicked.
pub fn lock_store(store: &SharedStore) -> MutexGuard<'_, SettingsStore> {
    store.lock().unwrap_or_else(PoisonError::into_inner)
}
