// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store file locations.
//!
//! This module maps scopes to store files inside the settings directory and
//! enumerates the store files currently present there.

use crate::domain::{Result, Scope, SettingsError, SYSTEM_ORIGIN};
use directories::BaseDirs;
use std::env;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Subdirectory of the user configuration directory that holds store files.
pub const SETTINGS_SUBDIRECTORY: &str = "deskcfg";

/// File extension of store files.
pub const STORE_EXTENSION: &str = "conf";

/// The directory holding every store file, and the extension store files use.
///
/// The directory is resolved to an absolute path with symlinks followed, so
/// paths built from it match the ones filesystem notifications report. Parts
/// that do not exist yet are kept as given below the deepest existing ancestor.
///
/// # Examples
///
/// ```rust
/// use deskcfg::adapters::SettingsLocation;
/// use deskcfg::domain::Scope;
/// use std::path::Path;
///
/// let location = SettingsLocation::new("/nonexistent/deskcfg");
/// assert_eq!(location.store_file(&Scope::System), Path::new("/nonexistent/deskcfg/system.conf"));
///
/// let panel = Scope::application("panel").unwrap();
/// let location = location.with_extension("ini");
/// assert_eq!(location.store_file(&panel), Path::new("/nonexistent/deskcfg/panel.ini"));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsLocation {
    dir: PathBuf,
    extension: String,
}

impl SettingsLocation {
    /// Uses an explicit settings directory with the default `conf` extension.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: resolve_dir(dir.into()),
            extension: STORE_EXTENSION.to_string(),
        }
    }

    /// Resolves the settings directory under the platform's user configuration
    /// directory, e.g. `~/.config/deskcfg` on Linux.
    pub fn from_platform() -> Result<Self> {
        let base = BaseDirs::new().ok_or_else(|| SettingsError::LocationUnavailable {
            message: "Failed to determine the user configuration directory".to_string(),
        })?;
        Ok(Self::new(base.config_dir().join(SETTINGS_SUBDIRECTORY)))
    }

    /// Uses `extension` (without the leading dot) for naming and discovering
    /// store files.
    pub fn with_extension(mut self, extension: &str) -> Self {
        self.extension = extension.trim_start_matches('.').to_string();
        self
    }

    /// Returns the settings directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the store file extension.
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Returns the store file of a scope.
    pub fn store_file(&self, scope: &Scope) -> PathBuf {
        self.dir
            .join(format!("{}.{}", scope.origin(), self.extension))
    }

    /// Returns the store file of the system scope.
    pub fn system_file(&self) -> PathBuf {
        self.store_file(&Scope::System)
    }

    /// Returns the origin identity owning a store file, or `None` if `path` is
    /// not a store file.
    pub fn origin_of(&self, path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
            return None;
        }
        path.file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Returns `true` if `path` is the system store file name.
    pub fn is_system_file(&self, path: &Path) -> bool {
        self.origin_of(path).as_deref() == Some(SYSTEM_ORIGIN)
    }

    /// Lists the store files currently in the directory, sorted by path.
    ///
    /// A missing directory yields an empty list. Other listing errors are logged
    /// and also yield an empty list, so the next pass simply tries again.
    pub fn discover(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to list settings directory {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && self.origin_of(path).is_some())
            .collect();
        files.sort();
        files
    }
}

/// Canonicalizes the deepest existing ancestor of `dir` and appends the rest.
fn resolve_dir(dir: PathBuf) -> PathBuf {
    if let Ok(resolved) = fs::canonicalize(&dir) {
        return resolved;
    }
    match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(name)) if !parent.as_os_str().is_empty() => {
            resolve_dir(parent.to_path_buf()).join(name)
        }
        _ if dir.is_relative() => env::current_dir()
            .map(|cwd| resolve_dir(cwd).join(&dir))
            .unwrap_or(dir),
        _ => dir,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_store_file_names() {
        let location = SettingsLocation::new("/nonexistent-cfg");
        assert_eq!(location.system_file(), PathBuf::from("/nonexistent-cfg/system.conf"));
        let foo = Scope::application("foo").unwrap();
        assert_eq!(location.store_file(&foo), PathBuf::from("/nonexistent-cfg/foo.conf"));
        assert_eq!(location.extension(), "conf");
    }

    #[test]
    fn test_origin_of() {
        let location = SettingsLocation::new("/nonexistent-cfg");
        assert_eq!(
            location.origin_of(Path::new("/cfg/panel.conf")),
            Some("panel".to_string())
        );
        assert_eq!(location.origin_of(Path::new("/cfg/panel.conf.tmp")), None);
        assert_eq!(location.origin_of(Path::new("/cfg/notes.txt")), None);
        assert_eq!(location.origin_of(Path::new("/cfg/.tmpA1b2C3")), None);
        assert!(location.is_system_file(Path::new("/cfg/system.conf")));
        assert!(!location.is_system_file(Path::new("/cfg/foo.conf")));
    }

    #[test]
    fn test_custom_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.conf"), "").unwrap();
        fs::write(dir.path().join("b.ini"), "").unwrap();

        let location = SettingsLocation::new(dir.path()).with_extension(".ini");
        assert_eq!(location.extension(), "ini");
        assert_eq!(location.discover(), vec![location.dir().join("b.ini")]);
        assert_eq!(location.origin_of(Path::new("/x/b.ini")), Some("b".to_string()));
        assert_eq!(location.origin_of(Path::new("/x/a.conf")), None);
    }

    #[test]
    fn test_relative_directory_is_made_absolute() {
        let location = SettingsLocation::new("relative/deskcfg");
        assert!(location.dir().is_absolute());
        assert!(location.dir().ends_with("relative/deskcfg"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directory_is_resolved() {
        let dir = TempDir::new().unwrap();
        let real = dir.path().join("real");
        fs::create_dir(&real).unwrap();
        let link = dir.path().join("link");
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let location = SettingsLocation::new(&link);
        assert_eq!(location.dir(), fs::canonicalize(&real).unwrap());

        let pending = SettingsLocation::new(link.join("later"));
        assert_eq!(pending.dir(), fs::canonicalize(&real).unwrap().join("later"));
    }

    #[test]
    fn test_discover_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.conf"), "").unwrap();
        fs::write(dir.path().join("a.conf"), "").unwrap();
        fs::write(dir.path().join("a.conf.tmp"), "").unwrap();
        fs::write(dir.path().join("readme.md"), "").unwrap();
        fs::create_dir(dir.path().join("dir.conf")).unwrap();

        let location = SettingsLocation::new(dir.path());
        let found = location.discover();
        assert_eq!(
            found,
            vec![location.dir().join("a.conf"), location.dir().join("b.conf")]
        );
    }

    #[test]
    fn test_discover_missing_directory() {
        let dir = TempDir::new().unwrap();
        let location = SettingsLocation::new(dir.path().join("missing"));
        assert!(location.discover().is_empty());
    }
}
