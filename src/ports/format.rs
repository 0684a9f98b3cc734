// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings file format trait definition.
//!
//! This module defines the `SettingsFormat` trait, the port through which the store
//! turns a store file into a flat key/value map and back. Parsing is lenient by
//! contract: a torn or partly malformed file yields whatever entries parse.

use crate::domain::{Result, SettingsError, SettingsMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// A trait for store file formats.
///
/// Implementations only deal with text. The provided [`SettingsFormat::load`] and
/// [`SettingsFormat::persist`] methods handle the file system side, including the
/// "missing file is an empty store" rule.
///
/// # Examples
///
/// ```rust
/// use deskcfg::ports::SettingsFormat;
/// use deskcfg::domain::{SettingsMap, SettingsValue};
///
/// struct LinesFormat;
///
/// impl SettingsFormat for LinesFormat {
///     fn parse(&self, content: &str) -> SettingsMap {
///         content
///             .lines()
///             .filter_map(|line| line.split_once(':'))
///             .map(|(k, v)| (k.to_string(), SettingsValue::from(v)))
///             .collect()
///     }
///
///     fn render(&self, entries: &SettingsMap) -> String {
///         entries.iter().map(|(k, v)| format!("{}:{}\n", k, v)).collect()
///     }
///
///     fn extension(&self) -> &str {
///         "lines"
///     }
/// }
///
/// let entries = LinesFormat.parse("theme:dark\nbroken line\n");
/// assert_eq!(entries.len(), 1);
/// ```
pub trait SettingsFormat: Send + Sync {
    /// Parses file content into a flat key/value map, skipping malformed entries.
    fn parse(&self, content: &str) -> SettingsMap;

    /// Renders a flat key/value map into file content.
    fn render(&self, entries: &SettingsMap) -> String;

    /// Returns the file extension (without the leading dot) of store files.
    fn extension(&self) -> &str;

    /// Reads and parses a store file.
    ///
    /// A missing file is an empty store. Invalid UTF-8 is decoded lossily. Other
    /// I/O errors are returned so the caller can keep its previous view.
    fn load(&self, path: &Path) -> Result<SettingsMap> {
        match fs::read(path) {
            Ok(bytes) => Ok(self.parse(&String::from_utf8_lossy(&bytes))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(SettingsMap::new()),
            Err(e) => Err(SettingsError::IoError(e)),
        }
    }

    /// Renders and writes a store file, creating its directory on demand.
    ///
    /// The content is written to a uniquely named staging file next to the
    /// target and renamed over it. Readers never observe a half-written store
    /// file, and concurrent writers never share a staging file.
    fn persist(&self, path: &Path, entries: &SettingsMap) -> Result<()> {
        let persist_error = |source: std::io::Error| SettingsError::PersistError {
            path: path.to_path_buf(),
            source,
        };
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(persist_error)?;

        let mut staging = NamedTempFile::new_in(dir).map_err(persist_error)?;
        staging
            .write_all(self.render(entries).as_bytes())
            .map_err(persist_error)?;
        staging
            .persist(path)
            .map_err(|e| persist_error(e.error))?;
        Ok(())
    }
}
