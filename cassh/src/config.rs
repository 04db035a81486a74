// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Client configuration.
//!
//! [`Config`] is the serializable form of the options accepted by
//! [`crate::client::ClientBuilder`], suitable for a configuration file.

use std::{collections::BTreeMap, path::PathBuf, time::Duration};

#[cfg(feature = "client-cli")]
use anyhow::Context;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::auth::SessionAuth;

/// Configuration for the CASSH client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The CASSH server address, for example `https://cassh.example.com`.
    pub server_address: String,

    /// The server's timezone.
    ///
    /// The server sends timestamps without a timezone, so they are interpreted in this timezone.
    /// The default is UTC.
    #[serde(default = "default_timezone")]
    pub server_timezone: Tz,

    /// Allow the server address to use `http` instead of `https`.
    ///
    /// Credentials are sent in request bodies, so this should only be used for local testing.
    #[serde(default)]
    pub tolerate_insecure_protocol: bool,

    /// Extra headers to send with each request.
    ///
    /// These are added to, and override, the default `User-Agent` and `CLIENT_VERSION` headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// How long to wait for the server to respond before giving up. The default is 30 seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Option<Duration>,

    /// The CASSH user to act as for user operations.
    #[serde(default)]
    pub username: Option<String>,

    /// LDAP credentials to authenticate with. If unset, requests are not authenticated.
    #[serde(default)]
    pub ldap: Option<LdapCredentials>,
}

fn default_timezone() -> Tz {
    Tz::UTC
}

fn default_request_timeout() -> Option<Duration> {
    Some(Duration::from_secs(30))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_address: "https://cassh.example.com".to_string(),
            server_timezone: default_timezone(),
            tolerate_insecure_protocol: false,
            headers: BTreeMap::new(),
            request_timeout: default_request_timeout(),
            username: None,
            ldap: None,
        }
    }
}

impl Config {
    /// The authentication mechanism described by this configuration.
    pub fn session_auth(&self) -> SessionAuth {
        self.ldap
            .as_ref()
            .map(|ldap| SessionAuth::ldap(ldap.name.clone(), ldap.password.as_str()))
            .unwrap_or_default()
    }
}

#[cfg(feature = "client-cli")]
impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            toml::ser::to_string_pretty(&self).unwrap_or_default()
        )
    }
}

/// LDAP credentials.
#[derive(Clone, Serialize)]
pub struct LdapCredentials {
    /// The LDAP name, sent as the `realname` field.
    pub name: String,
    /// The path to a file containing the LDAP password.
    ///
    /// The password must be entirely on the first line of the file. It is read when the
    /// configuration is loaded. To keep it out of the home directory, consider systemd
    /// credentials:
    ///
    /// ```bash
    /// systemd-ask-password | systemd-creds encrypt - /etc/credstore.encrypted/cassh.ldap_password
    /// ```
    pub password_path: PathBuf,
    #[serde(skip)]
    password: Zeroizing<String>,
}

impl LdapCredentials {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password_path: PathBuf::new(),
            password: Zeroizing::new(password.into()),
        }
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for LdapCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LdapCredentials")
            .field("name", &self.name)
            .field("password_path", &self.password_path)
            .finish_non_exhaustive()
    }
}

impl<'de> Deserialize<'de> for LdapCredentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct LdapHelper {
            name: String,
            password_path: PathBuf,
        }

        let helper = LdapHelper::deserialize(deserializer)?;

        let contents = std::fs::read_to_string(&helper.password_path)
            .map(Zeroizing::new)
            .map_err(|e| {
                serde::de::Error::custom(format!(
                    "Failed to read password file {}: {}",
                    helper.password_path.display(),
                    e
                ))
            })?;
        let password = contents
            .lines()
            .next()
            .map(str::trim)
            .filter(|pass| !pass.is_empty())
            .map(|pass| Zeroizing::new(pass.to_string()))
            .ok_or_else(|| {
                serde::de::Error::custom(format!(
                    "Password file {} does not contain a password on the first line",
                    helper.password_path.display()
                ))
            })?;

        Ok(LdapCredentials {
            name: helper.name,
            password_path: helper.password_path,
            password,
        })
    }
}

/// Where the CLI looks for its configuration when no path is given, relative to
/// `$CONFIGURATION_DIRECTORY`.
#[cfg(feature = "client-cli")]
pub const DEFAULT_CONFIG_PATH: &str = "cassh/client.toml";

#[cfg(feature = "client-cli")]
impl Config {
    /// Parse a TOML configuration file.
    ///
    /// LDAP password files are read as part of parsing.
    pub fn from_file(path: &std::path::Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration from {path:?}"))?;
        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("configuration file {path:?} is invalid"))?;
        tracing::info!(path = %path.display(), server_address = %config.server_address, "Loaded configuration");
        Ok(config)
    }

    /// Find and load the configuration.
    ///
    /// An explicit `path` must exist. Otherwise [`DEFAULT_CONFIG_PATH`] under
    /// `configuration_directory` is used if it's a file, and failing that the defaults are
    /// returned, which only point at an example server.
    pub fn locate(
        path: Option<&std::path::Path>,
        configuration_directory: Option<&std::path::Path>,
    ) -> anyhow::Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }

        match configuration_directory
            .map(|directory| directory.join(DEFAULT_CONFIG_PATH))
            .filter(|path| path.is_file())
        {
            Some(path) => Self::from_file(&path),
            None => {
                tracing::warn!("No CASSH configuration file found; using defaults");
                Ok(Self::default())
            }
        }
    }
}

/// Load the CLI configuration from `path`, or from `$CONFIGURATION_DIRECTORY`.
///
/// When the file exists but can't be parsed, the parse error and an example configuration are
/// printed to stderr before the error is returned.
///
/// # Errors
///
/// Fails if a configuration file exists but is unreadable or invalid.
#[cfg(feature = "client-cli")]
pub fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    let configuration_directory = std::env::var_os("CONFIGURATION_DIRECTORY").map(PathBuf::from);
    if configuration_directory.is_none() {
        tracing::debug!("CONFIGURATION_DIRECTORY is not set");
    }

    Config::locate(path.as_deref(), configuration_directory.as_deref()).inspect_err(|error| {
        eprintln!("{error:#}");
        eprintln!("Example config file:\n\n{}", Config::default());
    })
}
