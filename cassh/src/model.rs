// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Domain types returned by, and sent to, the CASSH server.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MissingPrincipal, ValidationError};

fn validate_name(kind: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyName { kind });
    }
    if value.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// The name of a CASSH user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Create a username, rejecting empty names and names with control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name("username", &name)?;
        // Usernames are a path segment; URL normalization drops these.
        if name == "." || name == ".." {
            return Err(ValidationError::DotSegment {
                kind: "username",
                value: name,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An SSH certificate principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Principal(String);

impl Principal {
    /// Create a principal, rejecting empty names and names with control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        validate_name("principal", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! name_impls {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = ValidationError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

name_impls!(Username);
name_impls!(Principal);

/// An ordered list of principals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principals(Vec<Principal>);

impl Principals {
    pub fn new(principals: Vec<Principal>) -> Self {
        Self(principals)
    }

    /// Check that every principal in `required` is in this list.
    ///
    /// Order doesn't matter. The first required principal that is missing is returned as the
    /// error.
    pub fn has<'a>(
        &self,
        required: impl IntoIterator<Item = &'a Principal>,
    ) -> Result<(), MissingPrincipal> {
        for principal in required {
            if !self.0.contains(principal) {
                return Err(MissingPrincipal(principal.clone()));
            }
        }
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Principal> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::ops::Deref for Principals {
    type Target = [Principal];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<Principal>> for Principals {
    fn from(value: Vec<Principal>) -> Self {
        Self(value)
    }
}

impl FromIterator<Principal> for Principals {
    fn from_iter<T: IntoIterator<Item = Principal>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Principals {
    type Item = Principal;
    type IntoIter = std::vec::IntoIter<Principal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Principals {
    type Item = &'a Principal;
    type IntoIter = std::slice::Iter<'a, Principal>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The lifecycle stage of a user's key.
///
/// The server is authoritative; the client only reads the state or asks for a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KeyState {
    /// The key can be signed by the server.
    Active,
    /// The key was revoked and can't be used anymore.
    Revoked,
    /// The key hasn't been activated by an administrator yet.
    Pending,
}

impl KeyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyState::Active => "ACTIVE",
            KeyState::Revoked => "REVOKED",
            KeyState::Pending => "PENDING",
        }
    }
}

impl fmt::Display for KeyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(KeyState::Active),
            "REVOKED" => Ok(KeyState::Revoked),
            "PENDING" => Ok(KeyState::Pending),
            other => Err(other.to_string()),
        }
    }
}

/// The status of a CASSH user and their key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserStatus {
    pub name: Username,
    pub real_name: String,
    pub key_state: KeyState,
    pub key_expiration: DateTime<Utc>,
    pub key_principals: Principals,
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {} ({})", self.key_state, self.name, self.real_name)
    }
}
