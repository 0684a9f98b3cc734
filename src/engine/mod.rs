// SPDX-License-Identifier: MIT OR Apache-2.0

//! The change-detection and synchronization engine.
//!
//! Raw filesystem notifications feed the [`DebounceScheduler`]; when it fires, the
//! [`ChangeReconciler`] re-reads the watched store files, diffs them against their
//! [`SnapshotCache`]s, re-arms the [`WatchSet`], and the resulting events go out
//! through the [`EventBus`].

pub mod debounce;
pub mod event_bus;
pub mod reconciler;
pub mod snapshot;
pub mod watch_set;

pub use debounce::{DebounceScheduler, DEFAULT_DEBOUNCE};
pub use event_bus::{EventBus, EventCallback, SubscriptionId};
pub use reconciler::{ChangeReconciler, PassReport, SelfWritePolicy};
pub use snapshot::{SnapshotCache, SnapshotDiff};
pub use watch_set::WatchSet;
