// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dynamically typed settings values.
//!
//! This module provides the `SettingsValue` type. Keys carry no declared type; the
//! value's dynamic type is kept by the persistence layer and handed back verbatim.
//! Values are compared structurally, which is what change detection relies on.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// The flat key/value content of one store file.
pub type SettingsMap = HashMap<String, SettingsValue>;

/// A dynamically typed settings value.
///
/// The serde representation is untagged, so a value serializes to the plain JSON
/// literal it holds (`true`, `42`, `"dark"`, `[1, 2]`, ...).
///
/// # Examples
///
/// ```
/// use deskcfg::domain::SettingsValue;
///
/// let value = SettingsValue::from(800);
/// assert_eq!(value.as_i64(), Some(800));
/// assert_eq!(value, SettingsValue::Int(800));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingsValue {
    /// A boolean flag.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// A floating point number.
    Float(f64),
    /// A string.
    String(String),
    /// An ordered list of values.
    List(Vec<SettingsValue>),
    /// A string-keyed map of values.
    Map(BTreeMap<String, SettingsValue>),
}

impl SettingsValue {
    /// Returns the boolean held by this value, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingsValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the integer held by this value, if it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingsValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the value as a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingsValue::Float(f) => Some(*f),
            SettingsValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    /// Returns the string held by this value, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingsValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list held by this value, if it is one.
    pub fn as_list(&self) -> Option<&[SettingsValue]> {
        match self {
            SettingsValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the map held by this value, if it is one.
    pub fn as_map(&self) -> Option<&BTreeMap<String, SettingsValue>> {
        match self {
            SettingsValue::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Returns `false` if the value is, or contains, a NaN or infinite float.
    ///
    /// Such values have no faithful text form and are rejected by writes.
    pub fn is_finite(&self) -> bool {
        match self {
            SettingsValue::Float(x) => x.is_finite(),
            SettingsValue::List(items) => items.iter().all(SettingsValue::is_finite),
            SettingsValue::Map(map) => map.values().all(SettingsValue::is_finite),
            _ => true,
        }
    }

    /// Returns a short name for the dynamic type, used in log output.
    pub fn type_name(&self) -> &'static str {
        match self {
            SettingsValue::Bool(_) => "bool",
            SettingsValue::Int(_) => "int",
            SettingsValue::Float(_) => "float",
            SettingsValue::String(_) => "string",
            SettingsValue::List(_) => "list",
            SettingsValue::Map(_) => "map",
        }
    }
}

impl fmt::Display for SettingsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingsValue::Bool(b) => write!(f, "{}", b),
            SettingsValue::Int(n) => write!(f, "{}", n),
            SettingsValue::Float(x) => write!(f, "{}", x),
            SettingsValue::String(s) => write!(f, "{}", s),
            SettingsValue::List(_) | SettingsValue::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                write!(f, "{}", json)
            }
        }
    }
}

impl From<bool> for SettingsValue {
    fn from(b: bool) -> Self {
        SettingsValue::Bool(b)
    }
}

impl From<i32> for SettingsValue {
    fn from(n: i32) -> Self {
        SettingsValue::Int(i64::from(n))
    }
}

impl From<i64> for SettingsValue {
    fn from(n: i64) -> Self {
        SettingsValue::Int(n)
    }
}

impl From<u32> for SettingsValue {
    fn from(n: u32) -> Self {
        SettingsValue::Int(i64::from(n))
    }
}

impl From<f64> for SettingsValue {
    fn from(x: f64) -> Self {
        SettingsValue::Float(x)
    }
}

impl From<&str> for SettingsValue {
    fn from(s: &str) -> Self {
        SettingsValue::String(s.to_string())
    }
}

impl From<String> for SettingsValue {
    fn from(s: String) -> Self {
        SettingsValue::String(s)
    }
}

impl<T: Into<SettingsValue>> From<Vec<T>> for SettingsValue {
    fn from(items: Vec<T>) -> Self {
        SettingsValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, SettingsValue>> for SettingsValue {
    fn from(map: BTreeMap<String, SettingsValue>) -> Self {
        SettingsValue::Map(map)
    }
}
