// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Error types for the CASSH client.

pub use crate::krl::Error as KrlError;

/// Errors that prevent a [`crate::client::Client`] from being constructed.
///
/// None of these are transient; retrying with the same configuration will
/// fail the same way.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The server address is not a valid URL.
    #[error("unable to parse server address: {0}")]
    InvalidServerAddress(#[from] url::ParseError),

    /// The server address uses a scheme other than `https` and insecure protocols were not
    /// explicitly tolerated. Carries the whole server address.
    #[error("insecure protocol used: {0}")]
    InsecureProtocol(String),

    /// The server address can't have paths appended to it (e.g. `mailto:` URLs).
    #[error("server address cannot be used as a base URL: {0}")]
    NotABaseUrl(String),

    /// A header name provided in the configuration is not a valid HTTP header name.
    #[error("invalid header name {name:?}: {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },

    /// A header value provided in the configuration is not a valid HTTP header value.
    #[error("invalid value for header {name:?}: {source}")]
    InvalidHeaderValue {
        name: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },

    /// The default HTTP transport could not be built.
    ///
    /// This is typically because the system TLS library could not be initialized.
    #[error("unable to build the http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Client-side checks that failed before any request was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A key expiry below one hour was requested; the server only accepts whole hours.
    #[error("invalid expiry {0}, smallest is 1h")]
    ExpiryTooShort(chrono::TimeDelta),

    /// A principal command was issued without any principals.
    #[error("at least one principal is required")]
    NoPrincipals,

    /// A username or principal is empty.
    #[error("{kind} must not be empty")]
    EmptyName { kind: &'static str },

    /// A username is `.` or `..`, which can't be used as a URL path segment.
    #[error("{kind} {value:?} is a relative path segment")]
    DotSegment { kind: &'static str, value: String },

    /// A username or principal contains a control character.
    #[error("{kind} {value:?} contains a control character")]
    ControlCharacter { kind: &'static str, value: String },
}

/// A required principal was not found by [`crate::model::Principals::has`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0} not found in list of principals")]
pub struct MissingPrincipal(pub crate::model::Principal);

/// The server answered with a success status, but the body could not be decoded.
///
/// Each variant names the artifact that failed to parse. Retrying is unlikely to help; this
/// usually indicates the server and client disagree on the protocol.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("unable to parse body as health response: {0}")]
    Health(#[source] serde_json::Error),

    #[error("unable to parse body as user status: {0}")]
    UserStatus(#[source] serde_json::Error),

    /// The server sends timestamps without a timezone; they are interpreted using the
    /// configured server timezone.
    #[error("unable to parse expiration time {value:?}: {reason}")]
    Expiration { value: String, reason: String },

    #[error("unable to parse key state {0:?}")]
    KeyState(String),

    #[error("unable to parse body as krl: {0}")]
    Krl(#[from] KrlError),

    #[error("unable to parse body as ssh key: {0}")]
    AuthorityKey(#[source] ssh_key::Error),

    #[error("unable to parse ssh certificate from raw openssh certificate: {0}")]
    Certificate(#[source] ssh_key::Error),

    /// The body is a valid authorized key, but it is a plain public key rather than a certificate.
    #[error("authorized key is not a certificate")]
    NotACertificate,
}

/// Errors raised by a [`crate::transport::Transport`] when it fails to produce a response.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The default, reqwest-based, transport failed.
    ///
    /// This is very likely due to temporary networking issues, although it could also be because
    /// the server address is wrong or the TLS certificate is not trusted.
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A custom transport failed.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors the [`crate::client::Client`] and its sessions may return.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The client configuration is invalid; no request was attempted.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A client-side precondition failed; no request was attempted.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The server responded with 401 Unauthorized.
    ///
    /// Retrying will not succeed unless the session's credentials change. Use
    /// [`ClientError::is_insufficient_privileges`] to test for this condition.
    #[error("insufficient privileges")]
    InsufficientPrivileges,

    /// The server responded with a status this client does not know how to handle.
    ///
    /// Server errors (5xx) may be worth retrying, but this client never retries on its own.
    #[error("request failed with status {status}: unhandled request status")]
    UnhandledStatus { status: u16 },

    /// The response could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The public key could not be encoded as an authorized key line.
    #[error("unable to encode public key: {0}")]
    PublicKey(#[source] ssh_key::Error),

    /// The request could not be sent or the response could not be read.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Whether this error is the server refusing the provided credentials.
    pub fn is_insufficient_privileges(&self) -> bool {
        matches!(self, ClientError::InsufficientPrivileges)
    }
}
