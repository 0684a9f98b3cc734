// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ports layer containing trait definitions.
//!
//! This module contains the trait definitions (ports) that separate the
//! change-detection engine from the file format and from the filesystem
//! notification backend. Adapters implement them.

pub mod format;
pub mod watcher;

// Re-export commonly used types
pub use format::SettingsFormat;
pub use watcher::{NotificationKind, PathWatcher, RawNotification};
