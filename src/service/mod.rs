// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer containing the public settings API.
//!
//! This module wires the domain types, the file format and the change-detection
//! engine into the stores applications use: `SettingsStore` for one scope,
//! `ScopeManager` for owning the system store, `SettingsView` for cross-scope
//! snapshot reads, and `PropertySet` for declarative property tables.

pub mod properties;
pub mod scope_manager;
pub mod settings_store;
pub mod view;

// Re-export commonly used types
pub use properties::{PropertyDescriptor, PropertySet, PropertySetBuilder};
pub use scope_manager::{lock_store, ScopeManager, SharedStore, WatcherFactory};
pub use settings_store::{SettingsStore, SettingsStoreBuilder};
pub use view::SettingsView;
