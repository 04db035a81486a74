// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Authentication mechanisms for sessions.
//!
//! CASSH reads credentials from the request's form body, so authenticating a request amounts to
//! adding the right fields to its [`FormParameters`].

use zeroize::Zeroizing;

use crate::params::FormParameters;

/// The way a session authenticates each of its requests.
///
/// The mechanism is chosen when the session is created and applies to every request made through
/// it, including those of the sessions derived from it.
#[derive(Clone, Default, PartialEq, Eq)]
pub enum SessionAuth {
    /// Send no credentials.
    #[default]
    None,
    /// Authenticate with LDAP credentials. The password is wiped from memory on drop.
    Ldap {
        name: String,
        password: Zeroizing<String>,
    },
}

impl SessionAuth {
    /// Shorthand for [`SessionAuth::Ldap`].
    pub fn ldap(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Ldap {
            name: name.into(),
            password: Zeroizing::new(password.into()),
        }
    }

    /// Add this mechanism's credentials to `parameters`, replacing any existing values for the
    /// same fields.
    pub fn extend_request_parameters(&self, parameters: &mut FormParameters) {
        match self {
            SessionAuth::None => {}
            SessionAuth::Ldap { name, password } => {
                parameters.set("realname", name.as_str());
                parameters.set("password", password.as_str());
            }
        }
    }
}

impl std::fmt::Debug for SessionAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionAuth::None => f.write_str("None"),
            SessionAuth::Ldap { name, .. } => f
                .debug_struct("Ldap")
                .field("name", name)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}
