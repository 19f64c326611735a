//! Data model of the sample remote service.

use serde::{Deserialize, Serialize};

/// A user record with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Login name.
    pub username: String,
    /// Contact address, subject to the email constraint on `echoUser`.
    pub email: Option<String>,
    /// Assigned role names.
    pub roles: Vec<String>,
}

impl User {
    /// A user with just a name.
    pub fn named(username: &str) -> Self {
        Self {
            username: username.to_string(),
            email: None,
            roles: Vec::new(),
        }
    }

    /// Sets the email address.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }
}

/// Visibility scope enum echoed across the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    /// Visible on the local node only.
    Local,
    /// Visible within the application.
    Application,
    /// Visible globally.
    Global,
}

/// Immutable value object with structural equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Immutable {
    /// Numeric payload.
    pub value: i32,
    /// Name payload.
    pub name: String,
}

impl Immutable {
    /// Creates a value object.
    pub fn new(value: i32, name: &str) -> Self {
        Self {
            value,
            name: name.to_string(),
        }
    }
}
