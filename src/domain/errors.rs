// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the settings store.
//!
//! This module defines the errors that can surface from the settings store.
//! Most failures inside the change-detection engine never reach callers: they are
//! logged and retried on the next reconciliation pass. The errors below are the
//! ones an explicit operation (a write, building a watcher, resolving a location)
//! hands back.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for settings operations.
///
/// It is marked as `#[non_exhaustive]` to allow for future additions without
/// breaking backwards compatibility.
///
/// # Examples
///
/// ```
/// use deskcfg::domain::errors::SettingsError;
///
/// fn check_name(name: &str) -> Result<(), SettingsError> {
///     Err(SettingsError::InvalidApplicationName {
///         name: name.to_string(),
///     })
/// }
///
/// assert!(check_name("system").is_err());
/// ```
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SettingsError {
    /// A key could not be used for a write.
    #[error("Invalid settings key '{key}': {reason}")]
    InvalidKey {
        /// The offending key
        key: String,
        /// Why the key was rejected
        reason: String,
    },

    /// A value cannot be stored without changing its meaning.
    #[error("Invalid value for settings key '{key}': {reason}")]
    InvalidValue {
        /// The key the value was written to
        key: String,
        /// Why the value was rejected
        reason: String,
    },

    /// An application identity cannot be mapped to a store file.
    #[error("Invalid application name: '{name}'")]
    InvalidApplicationName {
        /// The rejected application name
        name: String,
    },

    /// The platform configuration directory could not be determined.
    #[error("Settings location unavailable: {message}")]
    LocationUnavailable {
        /// The error message
        message: String,
    },

    /// An error occurred while setting up or maintaining filesystem watches.
    #[error("Settings watcher error: {message}")]
    WatcherError {
        /// The error message
        message: String,
        /// The underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Persisting a store file failed.
    #[error("Failed to persist settings to {}: {source}", path.display())]
    PersistError {
        /// The store file being written
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl SettingsError {
    /// Creates an `InvalidKey` error.
    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        SettingsError::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_key_error() {
        let error = SettingsError::invalid_key("a=b", "contains '='");
        assert_eq!(
            error.to_string(),
            "Invalid settings key 'a=b': contains '='"
        );
    }

    #[test]
    fn test_invalid_value_error() {
        let error = SettingsError::InvalidValue {
            key: "ratio".to_string(),
            reason: "contains a non-finite number".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid value for settings key 'ratio': contains a non-finite number"
        );
    }

    #[test]
    fn test_invalid_application_name_error() {
        let error = SettingsError::InvalidApplicationName {
            name: "system".to_string(),
        };
        assert_eq!(error.to_string(), "Invalid application name: 'system'");
    }

    #[test]
    fn test_watcher_error() {
        let error = SettingsError::WatcherError {
            message: "inotify limit reached".to_string(),
            source: None,
        };
        assert_eq!(
            error.to_string(),
            "Settings watcher error: inotify limit reached"
        );
    }

    #[test]
    fn test_persist_error_names_path() {
        let error = SettingsError::PersistError {
            path: PathBuf::from("/tmp/deskcfg/foo.conf"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(error.to_string().contains("/tmp/deskcfg/foo.conf"));
        assert!(error.to_string().contains("denied"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = SettingsError::from(io_error);
        assert!(matches!(error, SettingsError::IoError(_)));
    }
}
