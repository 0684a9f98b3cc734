// SPDX-License-Identifier: MIT OR Apache-2.0

//! Change events published by a store.

use crate::domain::SettingsValue;

/// A change notification.
///
/// `Local` events fire synchronously from `set`, `remove` and `clear`. `External`
/// events fire after a debounced reconciliation pass and carry the identity of
/// the store file they were observed in. A `None` value means the key was removed.
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsEvent {
    /// A change made through this store instance.
    Local {
        /// The fully composed key
        key: String,
        /// The new value, or `None` after a removal
        value: Option<SettingsValue>,
    },
    /// A change observed on disk that this instance did not make.
    External {
        /// `system` or the owning application's name
        origin: String,
        /// The fully composed key
        key: String,
        /// The new value, or `None` after a removal
        value: Option<SettingsValue>,
    },
}

impl SettingsEvent {
    /// Returns the key the event refers to.
    pub fn key(&self) -> &str {
        match self {
            SettingsEvent::Local { key, .. } | SettingsEvent::External { key, .. } => key,
        }
    }

    /// Returns the new value, if the key was not removed.
    pub fn value(&self) -> Option<&SettingsValue> {
        match self {
            SettingsEvent::Local { value, .. } | SettingsEvent::External { value, .. } => {
                value.as_ref()
            }
        }
    }

    /// Returns the origin identity of an external event.
    pub fn origin(&self) -> Option<&str> {
        match self {
            SettingsEvent::Local { .. } => None,
            SettingsEvent::External { origin, .. } => Some(origin),
        }
    }

    /// Returns `true` for externally attributed events.
    pub fn is_external(&self) -> bool {
        matches!(self, SettingsEvent::External { .. })
    }
}
