// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! User sessions, for managing and signing one's own key.

use reqwest::Method;
use ssh_key::{Certificate, PublicKey};

use crate::{
    auth::SessionAuth,
    error::ClientError,
    model::{UserStatus, Username},
    params::FormParameters,
    protocol,
};

use super::Client;

/// A session acting as a single CASSH user.
#[derive(Debug, Clone)]
pub struct UserSession {
    client: Client,
    username: Username,
    auth: SessionAuth,
}

impl UserSession {
    pub(crate) fn new(client: Client, username: Username, auth: SessionAuth) -> Self {
        Self {
            client,
            username,
            auth,
        }
    }

    pub fn username(&self) -> &Username {
        &self.username
    }

    /// The form sent with every request of this session and the sessions derived from it.
    ///
    /// The authentication mechanism is applied last, so it can't be overridden by the username.
    pub fn request_parameters(&self) -> FormParameters {
        let mut parameters = FormParameters::new();
        parameters.set("username", self.username.as_str());
        self.auth.extend_request_parameters(&mut parameters);
        parameters
    }

    /// Retrieve the user's status.
    pub async fn status(&self) -> Result<UserStatus, ClientError> {
        let body = self
            .client
            .send(
                Method::POST,
                &["client", "status"],
                Some(self.request_parameters()),
            )
            .await?;
        Ok(protocol::decode_user_status(
            &body,
            self.client.server_timezone(),
        )?)
    }

    /// Manage `public_key` as this user's key.
    ///
    /// The key's comment is never sent to the server.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::PublicKey`] if the key can't be encoded in the OpenSSH format.
    pub fn key(&self, public_key: &PublicKey) -> Result<UserKeySession, ClientError> {
        let authorized_key =
            protocol::encode_authorized_key(public_key).map_err(ClientError::PublicKey)?;
        Ok(UserKeySession {
            user: self.clone(),
            authorized_key,
        })
    }
}

/// Options for [`UserKeySession::sign`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignOptions {
    force: bool,
}

impl SignOptions {
    /// Ask for a new certificate even if the current one is still valid.
    ///
    /// The server only honors this for administrators.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn extend_request_parameters(&self, parameters: &mut FormParameters) {
        if self.force {
            parameters.set("admin_force", "true");
        }
    }
}

/// A user session scoped to one public key.
#[derive(Debug, Clone)]
pub struct UserKeySession {
    user: UserSession,
    authorized_key: String,
}

impl UserKeySession {
    pub fn request_parameters(&self) -> FormParameters {
        let mut parameters = self.user.request_parameters();
        parameters.set("pubkey", self.authorized_key.as_str());
        parameters
    }

    /// Register the key as the user's key.
    ///
    /// It must then be activated by an administrator before it can be signed.
    pub async fn set(&self) -> Result<(), ClientError> {
        self.user
            .client
            .send(Method::PUT, &["client"], Some(self.request_parameters()))
            .await?;
        Ok(())
    }

    /// Have the key signed by the certificate authority.
    #[tracing::instrument(skip(self), fields(username = %self.user.username))]
    pub async fn sign(&self, options: SignOptions) -> Result<Certificate, ClientError> {
        let mut parameters = self.request_parameters();
        options.extend_request_parameters(&mut parameters);

        let body = self
            .user
            .client
            .send(Method::POST, &["client"], Some(parameters))
            .await?;
        let certificate = protocol::decode_certificate(&body)?;
        tracing::info!(
            key_id = certificate.key_id(),
            serial = certificate.serial(),
            valid_before = certificate.valid_before(),
            "Received signed certificate"
        );
        Ok(certificate)
    }
}
