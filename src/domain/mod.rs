// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core types.
//!
//! This module contains the fundamental concepts of the settings store: values,
//! hierarchical keys, scopes, change events and errors. It has no knowledge of
//! files or watchers.

pub mod errors;
pub mod events;
pub mod scope;
pub mod settings_key;
pub mod settings_value;

// Re-export commonly used types
pub use errors::{Result, SettingsError};
pub use events::SettingsEvent;
pub use scope::{Scope, SYSTEM_ORIGIN};
pub use settings_key::GroupStack;
pub use settings_value::{SettingsMap, SettingsValue};
