// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store scopes.
//!
//! A scope names the configuration namespace a store addresses: the shared system
//! store, or one application's store.

use crate::domain::errors::{Result, SettingsError};
use std::fmt;

/// Origin identity used for the system store.
pub const SYSTEM_ORIGIN: &str = "system";

/// The namespace a store instance addresses.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The desktop-wide store shared by every process.
    System,
    /// A single application's store.
    Application(String),
}

impl Scope {
    /// Creates an application scope after checking that the name maps to a file.
    ///
    /// # Examples
    ///
    /// ```
    /// use deskcfg::domain::Scope;
    ///
    /// let scope = Scope::application("panel").unwrap();
    /// assert_eq!(scope.origin(), "panel");
    /// assert!(Scope::application("system").is_err());
    /// assert!(Scope::application("../etc").is_err());
    /// ```
    pub fn application(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_application_name(&name)?;
        Ok(Scope::Application(name))
    }

    /// Returns the origin identity attached to events from this scope.
    pub fn origin(&self) -> &str {
        match self {
            Scope::System => SYSTEM_ORIGIN,
            Scope::Application(name) => name,
        }
    }

    /// Returns `true` for the system scope.
    pub fn is_system(&self) -> bool {
        matches!(self, Scope::System)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.origin())
    }
}

fn validate_application_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == SYSTEM_ORIGIN
        || name.starts_with('.')
        || name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(SettingsError::InvalidApplicationName {
            name: name.to_string(),
        });
    }
    Ok(())
}
