// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! The CASSH client.
//!
//! A [`Client`] covers the unauthenticated endpoints. Authenticated operations go through
//! sessions derived from it:
//!
//! ```text
//! Client ─┬─ admin_session(auth) ── AdminSession ── user(name) ── AdminUserSession ─┬─ key()
//!         │                                                                          └─ principals()
//!         └─ user_session(name, auth) ── UserSession ── key(public_key) ── UserKeySession
//! ```
//!
//! Deriving a session never talks to the server; each operation is exactly one request.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use chrono_tz::Tz;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT},
    Method, StatusCode,
};
use ssh_key::PublicKey;
use tracing::instrument;
use url::Url;

use crate::{
    auth::SessionAuth,
    config::Config,
    error::{ClientError, ConfigError},
    krl::KeyRevocationList,
    model::Username,
    params::FormParameters,
    protocol,
    transport::{Request, Transport},
};

mod admin;
mod user;

pub use admin::{AdminSession, AdminUserKeySession, AdminUserPrincipalsSession, AdminUserSession};
pub use user::{SignOptions, UserKeySession, UserSession};

/// The client identifier sent in the default headers.
pub const CLIENT_ID: &str = concat!("cassh-rs/", env!("CARGO_PKG_VERSION"));

/// The headers sent with every request unless replaced with [`ClientBuilder::default_headers`].
pub fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(concat!("CASSH-CLIENT cassh-rs/", env!("CARGO_PKG_VERSION"))),
    );
    headers.insert(
        HeaderName::from_static("client_version"),
        HeaderValue::from_static(CLIENT_ID),
    );
    headers
}

/// A CASSH client.
///
/// Cloning is cheap; clones share the underlying transport.
#[derive(Clone, Debug)]
pub struct Client {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    base_url: Url,
    headers: HeaderMap,
    server_timezone: Tz,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client from a [`Config`].
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        let mut builder = Self::builder(config.server_address)
            .server_timezone(config.server_timezone)
            .tolerate_insecure_protocol(config.tolerate_insecure_protocol);
        if let Some(timeout) = config.request_timeout {
            builder = builder.request_timeout(timeout);
        }
        config
            .headers
            .into_iter()
            .fold(builder, |builder, (name, value)| builder.header(name, value))
            .build()
    }

    /// Start configuring a client for the server at `server_address`.
    pub fn builder(server_address: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(server_address)
    }

    /// The server address all request paths are relative to.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// The timezone server timestamps are interpreted in.
    pub fn server_timezone(&self) -> Tz {
        self.inner.server_timezone
    }

    /// Check that the server is reachable.
    pub async fn ping(&self) -> Result<(), ClientError> {
        self.send(Method::GET, &["ping"], None).await?;
        Ok(())
    }

    /// Retrieve the server's name and version.
    pub async fn health(&self) -> Result<(String, String), ClientError> {
        let body = self.send(Method::GET, &["health"], None).await?;
        Ok(protocol::decode_health(&body)?)
    }

    /// Retrieve the server's key revocation list.
    pub async fn key_revocation_list(&self) -> Result<KeyRevocationList, ClientError> {
        let body = self.send(Method::GET, &["krl"], None).await?;
        Ok(protocol::decode_key_revocation_list(&body)?)
    }

    /// Retrieve the public key of the certificate authority that signs user keys.
    pub async fn authority_public_key(&self) -> Result<PublicKey, ClientError> {
        let body = self.send(Method::GET, &["ca"], None).await?;
        Ok(protocol::decode_authority_public_key(&body)?)
    }

    /// Start an administrator session authenticated with `auth`.
    pub fn admin_session(&self, auth: SessionAuth) -> AdminSession {
        AdminSession::new(self.clone(), auth)
    }

    /// Start a session acting as `username`, authenticated with `auth`.
    pub fn user_session(&self, username: Username, auth: SessionAuth) -> UserSession {
        UserSession::new(self.clone(), username, auth)
    }

    fn url(&self, path: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConfigError::NotABaseUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    // Send one request; anything but a 200 is an error.
    #[instrument(level = "debug", skip(self, form), err)]
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &[&str],
        form: Option<FormParameters>,
    ) -> Result<Bytes, ClientError> {
        let request = Request {
            method,
            url: self.url(path)?,
            headers: self.inner.headers.clone(),
            form,
        };

        let response = self.inner.transport.execute(request).await?;
        tracing::debug!(status = %response.status, bytes = response.body.len(), "Received response");
        match response.status {
            StatusCode::OK => Ok(response.body),
            StatusCode::UNAUTHORIZED => Err(ClientError::InsufficientPrivileges),
            status => {
                tracing::warn!(%status, "Server responded with an unhandled status");
                Err(ClientError::UnhandledStatus {
                    status: status.as_u16(),
                })
            }
        }
    }
}

/// Configures and builds a [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    server_address: String,
    transport: Option<Arc<dyn Transport>>,
    default_headers: HeaderMap,
    headers: Vec<(String, String)>,
    server_timezone: Tz,
    tolerate_insecure_protocol: bool,
    request_timeout: Option<Duration>,
}

impl ClientBuilder {
    fn new(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            transport: None,
            default_headers: default_headers(),
            headers: Vec::new(),
            server_timezone: Tz::UTC,
            tolerate_insecure_protocol: false,
            request_timeout: None,
        }
    }

    /// Send requests through `transport` instead of the default [`reqwest::Client`].
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Replace the default headers entirely.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers = headers;
        self
    }

    /// Add a header, replacing any default header of the same name.
    ///
    /// Invalid names and values are reported by [`ClientBuilder::build`].
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The server's timezone, used to interpret the timestamps it sends. Defaults to UTC.
    pub fn server_timezone(mut self, timezone: Tz) -> Self {
        self.server_timezone = timezone;
        self
    }

    /// Allow a server address that doesn't use `https`.
    pub fn tolerate_insecure_protocol(mut self, tolerate: bool) -> Self {
        self.tolerate_insecure_protocol = tolerate;
        self
    }

    /// Give up on requests that take longer than `timeout`.
    ///
    /// This only applies to the default transport; a custom transport handles its own timeouts.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Validate the configuration and build the client.
    pub fn build(self) -> Result<Client, ConfigError> {
        let base_url = Url::parse(&self.server_address)?;
        if base_url.scheme() != "https" && !self.tolerate_insecure_protocol {
            return Err(ConfigError::InsecureProtocol(self.server_address));
        }
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::NotABaseUrl(self.server_address));
        }

        let mut headers = self.default_headers;
        for (name, value) in self.headers {
            let header_name = HeaderName::try_from(name.as_str()).map_err(|source| {
                ConfigError::InvalidHeaderName {
                    name: name.clone(),
                    source,
                }
            })?;
            let header_value = HeaderValue::try_from(value)
                .map_err(|source| ConfigError::InvalidHeaderValue { name, source })?;
            headers.insert(header_name, header_value);
        }

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => {
                let mut builder = reqwest::Client::builder();
                if let Some(timeout) = self.request_timeout {
                    builder = builder.timeout(timeout);
                }
                Arc::new(builder.build().map_err(ConfigError::HttpClient)?)
            }
        };

        tracing::debug!(%base_url, server_timezone = %self.server_timezone, "Built CASSH client");
        Ok(Client {
            inner: Arc::new(Inner {
                base_url,
                headers,
                server_timezone: self.server_timezone,
                transport,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_appended_to_the_base_path() -> anyhow::Result<()> {
        let client = Client::builder("https://cassh.example.com/prefix/").build()?;
        assert_eq!(
            client.url(&["admin", "john.doe"])?.as_str(),
            "https://cassh.example.com/prefix/admin/john.doe"
        );

        let client = Client::builder("https://cassh.example.com").build()?;
        assert_eq!(client.url(&["ping"])?.as_str(), "https://cassh.example.com/ping");

        Ok(())
    }

    #[test]
    fn path_parameters_are_one_segment() -> anyhow::Result<()> {
        let client = Client::builder("https://cassh.example.com").build()?;

        assert_eq!(
            client.url(&["admin", "../ca?x=1#y", "principals"])?.path(),
            "/admin/..%2Fca%3Fx=1%23y/principals"
        );

        Ok(())
    }

    #[test]
    fn insecure_protocol() -> anyhow::Result<()> {
        let error = Client::builder("http://cassh.example.com")
            .build()
            .expect_err("http is rejected");
        assert!(matches!(error, ConfigError::InsecureProtocol(_)));
        assert_eq!(
            error.to_string(),
            "insecure protocol used: http://cassh.example.com"
        );

        Client::builder("http://cassh.example.com")
            .tolerate_insecure_protocol(true)
            .build()?;

        Ok(())
    }

    #[test]
    fn unusable_addresses() {
        assert!(matches!(
            Client::builder("not a url").build(),
            Err(ConfigError::InvalidServerAddress(_))
        ));
        assert!(matches!(
            Client::builder("mailto:cassh@example.com")
                .tolerate_insecure_protocol(true)
                .build(),
            Err(ConfigError::NotABaseUrl(_))
        ));
    }

    #[test]
    fn headers() -> anyhow::Result<()> {
        let client = Client::builder("https://cassh.example.com")
            .header("User-Agent", "custom")
            .header("X-Extra", "1")
            .build()?;
        let headers = &client.inner.headers;

        assert_eq!(headers[USER_AGENT], "custom");
        assert_eq!(headers["x-extra"], "1");
        assert_eq!(headers["client_version"], CLIENT_ID);

        let error = Client::builder("https://cassh.example.com")
            .header("bad header", "1")
            .build()
            .expect_err("spaces aren't allowed in names");
        assert!(matches!(error, ConfigError::InvalidHeaderName { .. }));

        let error = Client::builder("https://cassh.example.com")
            .header("X-Extra", "line\nbreak")
            .build()
            .expect_err("newlines aren't allowed in values");
        assert!(matches!(error, ConfigError::InvalidHeaderValue { .. }));

        Ok(())
    }

    #[test]
    fn replaced_default_headers() -> anyhow::Result<()> {
        let client = Client::builder("https://cassh.example.com")
            .default_headers(HeaderMap::new())
            .build()?;

        assert!(client.inner.headers.is_empty());

        Ok(())
    }

    #[test]
    fn from_config() -> anyhow::Result<()> {
        let config = Config {
            server_address: "http://localhost:8080".to_string(),
            server_timezone: Tz::Europe__Paris,
            tolerate_insecure_protocol: true,
            headers: [("X-Team".to_string(), "infra".to_string())].into(),
            ..Default::default()
        };
        let client = Client::new(config)?;

        assert_eq!(client.server_timezone(), Tz::Europe__Paris);
        assert_eq!(client.base_url().as_str(), "http://localhost:8080/");
        assert_eq!(client.inner.headers["x-team"], "infra");

        Ok(())
    }
}
