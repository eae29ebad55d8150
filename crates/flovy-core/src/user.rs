//! Application user identity.
//!
//! Flovy itself does not authenticate users; the identity provider does.
//! [`UserId`] is the opaque uid it hands us, and every piece of per-user
//! persisted state (calendar accounts, selected calendars, notes) is
//! namespaced by it so that multiple users sharing a machine never see
//! each other's data.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The identity provider's uid for a signed-in application user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from the provider's uid string.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Returns the raw uid string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns a filesystem-safe form of the uid, usable as a file name
    /// suffix. Anything outside `[A-Za-z0-9._-]` is replaced with `_`.
    pub fn file_key(&self) -> String {
        self.0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(uid: &str) -> Self {
        Self::new(uid)
    }
}
