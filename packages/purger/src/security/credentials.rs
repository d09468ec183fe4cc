//! Record-source sign-in details.
//!
//! The password lives in a `secrecy` box from the moment it is read, so it
//! never shows up in `Debug` output, log lines or error messages.

use std::fmt;

use secrecy::ExposeSecret;
pub use secrecy::SecretString;

use crate::error::{PurgeError, Result};

const USERNAME_VAR: &str = "TP_USERNAME";
const PASSWORD_VAR: &str = "TP_PASSWORD";

/// Username and password for the record source.
///
/// Either half may be missing until [`Credentials::ensure`] is called, which
/// happens before any session is opened.
#[derive(Default)]
pub struct Credentials {
    username: Option<String>,
    password: Option<SecretString>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::from_parts(Some(username.into()), Some(password.into()))
    }

    /// Build from optional parts; blank values count as missing.
    pub fn from_parts(username: Option<String>, password: Option<String>) -> Self {
        Self {
            username: username.filter(|u| !u.trim().is_empty()),
            password: password
                .filter(|p| !p.is_empty())
                .map(SecretString::from),
        }
    }

    /// Replace whichever parts are given, keeping the rest.
    pub fn with_overrides(self, username: Option<String>, password: Option<String>) -> Self {
        let overrides = Self::from_parts(username, password);
        Self {
            username: overrides.username.or(self.username),
            password: overrides.password.or(self.password),
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Both parts, or `MissingCredential` naming the variable to set.
    pub fn ensure(&self) -> Result<(&str, &SecretString)> {
        let username = self
            .username
            .as_deref()
            .ok_or(PurgeError::MissingCredential { name: USERNAME_VAR })?;
        let password = self
            .password
            .as_ref()
            .ok_or(PurgeError::MissingCredential { name: PASSWORD_VAR })?;
        Ok((username, password))
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            username: self.username.clone(),
            password: self
                .password
                .as_ref()
                .map(|p| SecretString::from(p.expose_secret().to_string())),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<hidden>"))
            .finish()
    }
}
