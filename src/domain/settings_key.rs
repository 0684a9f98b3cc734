// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical key handling.
//!
//! Keys are `/`-delimited paths such as `window/geometry/width`. This module
//! normalizes and validates them and provides the `GroupStack` that composes the
//! active group prefix with a leaf key.

use crate::domain::errors::{Result, SettingsError};

/// Separator between key path segments.
pub const KEY_SEPARATOR: char = '/';

/// Normalizes a key path.
///
/// Surrounding separators are trimmed and repeated separators collapse into one,
/// so `"/window//width/"` becomes `"window/width"`. Whitespace around each
/// segment is trimmed as well, and a segment left empty is dropped, so
/// `" window / width "` and `"window/ /width"` name the same key. The INI
/// format trims keys when parsing, so untrimmed keys could not be read back.
///
/// # Examples
///
/// ```
/// use deskcfg::domain::settings_key::normalize_key;
///
/// assert_eq!(normalize_key("/window//width/"), "window/width");
/// assert_eq!(normalize_key("theme"), "theme");
/// assert_eq!(normalize_key(" window / width "), "window/width");
/// ```
pub fn normalize_key(key: &str) -> String {
    key.split(KEY_SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Checks that a normalized key can be persisted.
///
/// Empty keys are rejected, as are keys that would corrupt the INI layout
/// (`=`, brackets, line breaks, or a segment starting with a comment marker).
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(SettingsError::invalid_key(key, "key is empty"));
    }
    if key.contains('=') {
        return Err(SettingsError::invalid_key(key, "contains '='"));
    }
    if key.contains(['[', ']']) {
        return Err(SettingsError::invalid_key(key, "contains a bracket"));
    }
    if key.contains(['\n', '\r']) {
        return Err(SettingsError::invalid_key(key, "contains a line break"));
    }
    if key.split(KEY_SEPARATOR).any(|segment| segment.starts_with([';', '#'])) {
        return Err(SettingsError::invalid_key(key, "a segment starts with a comment marker"));
    }
    Ok(())
}

/// A stack of group prefixes owned by one store instance.
///
/// `begin` pushes a prefix, `end` pops it. Every key-taking store operation
/// resolves its key through [`GroupStack::compose`].
///
/// An unmatched `end` is clamped: the stack stays empty and `end` returns
/// `false`. Callers that care about balance can assert on [`GroupStack::depth`].
///
/// # Examples
///
/// ```
/// use deskcfg::domain::GroupStack;
///
/// let mut groups = GroupStack::new();
/// groups.begin("window");
/// groups.begin("geometry");
/// assert_eq!(groups.compose("width"), "window/geometry/width");
/// groups.end();
/// assert_eq!(groups.prefix(), "window");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupStack {
    segments: Vec<String>,
}

impl GroupStack {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes a group prefix. Empty prefixes are pushed too so that
    /// `begin`/`end` pairs stay balanced.
    pub fn begin(&mut self, prefix: &str) {
        self.segments.push(normalize_key(prefix));
    }

    /// Pops the innermost group. Returns `false` if the stack was already empty.
    pub fn end(&mut self) -> bool {
        self.segments.pop().is_some()
    }

    /// Returns the number of open groups.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Returns the composed prefix of all open groups, or an empty string.
    pub fn prefix(&self) -> String {
        normalize_key(&self.segments.join("/"))
    }

    /// Resolves `key` against the open groups.
    pub fn compose(&self, key: &str) -> String {
        let prefix = self.prefix();
        let key = normalize_key(key);
        match (prefix.is_empty(), key.is_empty()) {
            (true, _) => key,
            (false, true) => prefix,
            (false, false) => format!("{}/{}", prefix, key),
        }
    }
}
