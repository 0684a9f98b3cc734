// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapters layer containing port implementations.
//!
//! This module contains the INI store format, the mapping from scopes to store
//! files, and the filesystem watchers.

pub mod ini_file;
pub mod location;
pub mod watchers;

pub use ini_file::IniFormat;
pub use location::SettingsLocation;
#[cfg(feature = "watch")]
pub use watchers::NotifyWatcher;
pub use watchers::NullWatcher;
