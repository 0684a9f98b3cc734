// SPDX-License-Identifier: MIT OR Apache-2.0

//! Watcher implementations for filesystem change notification.
//!
//! This module contains implementations of the `PathWatcher` trait.

#[cfg(feature = "watch")]
pub mod notify_watcher;
pub mod null_watcher;

#[cfg(feature = "watch")]
pub use notify_watcher::NotifyWatcher;
pub use null_watcher::NullWatcher;
