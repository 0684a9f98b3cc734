// SPDX-License-Identifier: MIT OR Apache-2.0

//! A shared, hierarchical settings store for desktop applications.
//!
//! Every application keeps its settings in one INI store file, and a shared
//! `system` store file holds settings every process can see. Processes write
//! these files independently; each store watches its file, debounces bursts of
//! filesystem notifications, diffs the file against its last known contents and
//! publishes one change event per key that actually changed. A store's own
//! writes are not reported back to it as external changes.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Core types (`SettingsValue`, `Scope`, `SettingsEvent`, key
//!   and group handling, errors)
//! - **Ports**: Trait definitions for the file format (`SettingsFormat`) and
//!   filesystem notifications (`PathWatcher`)
//! - **Adapters**: The INI format, store file locations and watcher implementations
//! - **Engine**: Change detection: snapshots, watch set, debounce, reconciliation
//!   and event dispatch
//! - **Service**: `SettingsStore`, `ScopeManager`, `SettingsView` and `PropertySet`
//!
//! # Threading
//!
//! A store is driven by the thread that owns it. Watchers only enqueue raw
//! notifications; reconciliation runs when the owner calls
//! [`SettingsStore::process_pending`](service::SettingsStore::process_pending) or
//! [`SettingsStore::wait_for_changes`](service::SettingsStore::wait_for_changes).
//!
//! # Feature Flags
//!
//! - `watch`: Watch store files with the native filesystem notification API
//!   (default). Without it stores only see changes through explicit
//!   reconciliation.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use deskcfg::prelude::*;
//! use std::time::Duration;
//!
//! # fn main() -> Result<()> {
//! let manager = ScopeManager::global()?;
//!
//! let mut panel = manager.application("panel")?;
//! panel.set("position", "top")?;
//!
//! let system = manager.system()?;
//! let mut system = lock_store(&system);
//! system.subscribe(|event| {
//!     if let SettingsEvent::External { origin, key, value } = event {
//!         println!("{} changed {} to {:?}", origin, key, value);
//!     }
//! });
//! system.wait_for_changes(Duration::from_secs(1));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod engine;
pub mod ports;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::adapters::{IniFormat, SettingsLocation};
    pub use crate::domain::{Result, Scope, SettingsError, SettingsEvent, SettingsValue};
    pub use crate::engine::{SelfWritePolicy, SubscriptionId};
    pub use crate::ports::{PathWatcher, SettingsFormat};
    pub use crate::service::{
        lock_store, PropertySet, ScopeManager, SettingsStore, SettingsView, SharedStore,
    };
}
