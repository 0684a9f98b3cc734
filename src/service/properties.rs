// SPDX-License-Identifier: MIT OR Apache-2.0

//! Declarative property tables over a settings store.
//!
//! A `PropertySet` describes named properties once (key, optional group and
//! default) and then reads, writes and watches them uniformly through a
//! [`SettingsStore`].
//!
//! Property keys resolve against the store's open groups, so use a property
//! set on a store with no group open.

use crate::domain::settings_key::{normalize_key, validate_key};
use crate::domain::{Result, SettingsError, SettingsEvent, SettingsValue};
use crate::engine::SubscriptionId;
use crate::service::SettingsStore;
use std::collections::HashMap;
use std::sync::Arc;

/// One named property.
#[derive(Clone, Debug, PartialEq)]
pub struct PropertyDescriptor {
    /// Property name, unique within its set.
    pub name: String,
    /// Key of the property, relative to `group`.
    pub key: String,
    /// Group the key lives in, if any.
    pub group: Option<String>,
    /// Value returned while the key is absent.
    pub default: SettingsValue,
}

impl PropertyDescriptor {
    /// Returns the full key of the property.
    pub fn full_key(&self) -> String {
        match &self.group {
            Some(group) => normalize_key(&format!("{}/{}", group, self.key)),
            None => normalize_key(&self.key),
        }
    }
}

/// A table of named properties.
///
/// # Examples
///
/// ```rust
/// use deskcfg::prelude::*;
/// use deskcfg::adapters::NullWatcher;
///
/// # fn main() -> Result<()> {
/// let dir = tempfile::TempDir::new()?;
/// let mut store = SettingsStore::builder(SettingsLocation::new(dir.path()), Scope::application("panel")?)
///     .watcher(Box::new(NullWatcher))
///     .build()?;
///
/// let props = PropertySet::builder()
///     .property("autoHide", false)
///     .grouped("width", "geometry", "w", 48)
///     .build()?;
///
/// assert_eq!(props.get(&store, "width"), Some(SettingsValue::from(48)));
/// props.set(&mut store, "width", 64)?;
/// assert_eq!(store.get("geometry/w"), Some(SettingsValue::from(64)));
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct PropertySet {
    descriptors: Vec<PropertyDescriptor>,
    by_name: HashMap<String, usize>,
    by_key: HashMap<String, usize>,
}

impl PropertySet {
    /// Creates a property set builder.
    pub fn builder() -> PropertySetBuilder {
        PropertySetBuilder::default()
    }

    /// Returns the descriptors in declaration order.
    pub fn descriptors(&self) -> &[PropertyDescriptor] {
        &self.descriptors
    }

    /// Returns the descriptor named `name`.
    pub fn descriptor(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.by_name.get(name).map(|&i| &self.descriptors[i])
    }

    /// Returns the descriptor whose full key is `key`.
    pub fn property_for_key(&self, key: &str) -> Option<&PropertyDescriptor> {
        self.by_key.get(key).map(|&i| &self.descriptors[i])
    }

    /// Reads a property, falling back to its default.
    ///
    /// Returns `None` only if no property is named `name`.
    pub fn get(&self, store: &SettingsStore, name: &str) -> Option<SettingsValue> {
        let descriptor = self.descriptor(name)?;
        Some(
            store
                .get(&descriptor.full_key())
                .unwrap_or_else(|| descriptor.default.clone()),
        )
    }

    /// Writes a property. Returns `true` if the stored value changed.
    pub fn set(&self, store: &mut SettingsStore, name: &str, value: impl Into<SettingsValue>) -> Result<bool> {
        let descriptor = self
            .descriptor(name)
            .ok_or_else(|| SettingsError::invalid_key(name, "no property with this name"))?;
        store.set(&descriptor.full_key(), value)
    }

    /// Calls `callback` with the property name and its new value whenever a
    /// described key of `store` changes, locally or externally.
    ///
    /// Removed keys are reported with the property default. Changes to other
    /// stores' files seen by a system store are ignored.
    pub fn watch<F>(&self, store: &SettingsStore, callback: F) -> SubscriptionId
    where
        F: Fn(&str, &SettingsValue) + Send + Sync + 'static,
    {
        let properties = Arc::new(self.clone());
        let origin = store.application_name().to_string();

        store.subscribe(move |event| {
            if let SettingsEvent::External { origin: from, .. } = event {
                if *from != origin {
                    return;
                }
            }
            if let Some(descriptor) = properties.property_for_key(event.key()) {
                let value = event.value().unwrap_or(&descriptor.default);
                callback(&descriptor.name, value);
            }
        })
    }
}

/// Builder for constructing a `PropertySet`.
#[derive(Debug, Default)]
pub struct PropertySetBuilder {
    descriptors: Vec<PropertyDescriptor>,
}

impl PropertySetBuilder {
    /// Adds a property whose key equals its name.
    pub fn property(self, name: &str, default: impl Into<SettingsValue>) -> Self {
        self.keyed(name, name, default)
    }

    /// Adds a property stored under `key`.
    pub fn keyed(mut self, name: &str, key: &str, default: impl Into<SettingsValue>) -> Self {
        self.descriptors.push(PropertyDescriptor {
            name: name.to_string(),
            key: key.to_string(),
            group: None,
            default: default.into(),
        });
        self
    }

    /// Adds a property stored under `key` inside `group`.
    pub fn grouped(mut self, name: &str, group: &str, key: &str, default: impl Into<SettingsValue>) -> Self {
        self.descriptors.push(PropertyDescriptor {
            name: name.to_string(),
            key: key.to_string(),
            group: Some(group.to_string()),
            default: default.into(),
        });
        self
    }

    /// Builds the set, validating every key and rejecting duplicate names or keys.
    pub fn build(self) -> Result<PropertySet> {
        let mut by_name = HashMap::new();
        let mut by_key = HashMap::new();

        for (i, descriptor) in self.descriptors.iter().enumerate() {
            let key = descriptor.full_key();
            validate_key(&key)?;
            if by_name.insert(descriptor.name.clone(), i).is_some() {
                return Err(SettingsError::invalid_key(&key, "duplicate property name"));
            }
            if by_key.insert(key.clone(), i).is_some() {
                return Err(SettingsError::invalid_key(&key, "key used by two properties"));
            }
        }

        Ok(PropertySet {
            descriptors: self.descriptors,
            by_name,
            by_key,
        })
    }
}
