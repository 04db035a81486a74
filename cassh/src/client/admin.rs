// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Administrator sessions.

use chrono::TimeDelta;
use reqwest::Method;

use crate::{
    auth::SessionAuth,
    error::{ClientError, ValidationError},
    model::{Principal, UserStatus, Username},
    params::FormParameters,
    protocol,
};

use super::Client;

/// An authenticated administrator session.
#[derive(Debug, Clone)]
pub struct AdminSession {
    client: Client,
    auth: SessionAuth,
}

impl AdminSession {
    pub(crate) fn new(client: Client, auth: SessionAuth) -> Self {
        Self { client, auth }
    }

    /// The form sent with every request of this session and the sessions derived from it.
    pub fn request_parameters(&self) -> FormParameters {
        let mut parameters = FormParameters::new();
        self.auth.extend_request_parameters(&mut parameters);
        parameters
    }

    /// Check that the session's credentials grant administrator access.
    ///
    /// Fails with [`ClientError::InsufficientPrivileges`] if they don't.
    pub async fn check_authentication(&self) -> Result<(), ClientError> {
        self.client
            .send(Method::POST, &["test_auth"], Some(self.request_parameters()))
            .await?;
        Ok(())
    }

    /// Manage `username`.
    pub fn user(&self, username: Username) -> AdminUserSession {
        AdminUserSession {
            admin: self.clone(),
            username,
        }
    }
}

/// An administrator session scoped to one user.
#[derive(Debug, Clone)]
pub struct AdminUserSession {
    admin: AdminSession,
    username: Username,
}

impl AdminUserSession {
    pub fn username(&self) -> &Username {
        &self.username
    }

    pub fn request_parameters(&self) -> FormParameters {
        self.admin.request_parameters()
    }

    async fn send(
        &self,
        method: Method,
        subpath: Option<&str>,
        parameters: FormParameters,
    ) -> Result<bytes::Bytes, ClientError> {
        let mut path = vec!["admin", self.username.as_str()];
        path.extend(subpath);
        self.admin.client.send(method, &path, Some(parameters)).await
    }

    /// Retrieve the user's status.
    pub async fn status(&self) -> Result<UserStatus, ClientError> {
        let mut parameters = self.request_parameters();
        parameters.set("status", "true");
        let body = self.send(Method::POST, None, parameters).await?;
        Ok(protocol::decode_user_status(
            &body,
            self.admin.client.server_timezone(),
        )?)
    }

    /// Manage the user's key.
    pub fn key(&self) -> AdminUserKeySession {
        AdminUserKeySession { user: self.clone() }
    }

    /// Manage the user's principals.
    pub fn principals(&self) -> AdminUserPrincipalsSession {
        AdminUserPrincipalsSession { user: self.clone() }
    }
}

/// An administrator session scoped to one user's key.
#[derive(Debug, Clone)]
pub struct AdminUserKeySession {
    user: AdminUserSession,
}

impl AdminUserKeySession {
    pub fn request_parameters(&self) -> FormParameters {
        self.user.request_parameters()
    }

    /// Activate the key, allowing the user to have it signed.
    pub async fn activate(&self) -> Result<(), ClientError> {
        self.user
            .send(Method::POST, None, self.request_parameters())
            .await?;
        Ok(())
    }

    /// Revoke the key. It is added to the key revocation list.
    pub async fn revoke(&self) -> Result<(), ClientError> {
        let mut parameters = self.request_parameters();
        parameters.set("revoke", "true");
        self.user.send(Method::POST, None, parameters).await?;
        Ok(())
    }

    /// Set how long certificates signed for this key are valid.
    ///
    /// The server works in whole hours: the expiry is truncated to hours, and anything shorter
    /// than an hour is rejected with [`ValidationError::ExpiryTooShort`] without contacting the
    /// server.
    pub async fn set_expiry(&self, expiry: TimeDelta) -> Result<(), ClientError> {
        if expiry < TimeDelta::hours(1) {
            return Err(ValidationError::ExpiryTooShort(expiry).into());
        }

        let mut parameters = self.request_parameters();
        parameters.set("expiry", format!("{}h", expiry.num_hours()));
        self.user.send(Method::PATCH, None, parameters).await?;
        Ok(())
    }

    /// Delete the key.
    pub async fn delete(&self) -> Result<(), ClientError> {
        self.user
            .send(Method::DELETE, None, self.request_parameters())
            .await?;
        Ok(())
    }
}

/// An administrator session scoped to one user's principals.
#[derive(Debug, Clone)]
pub struct AdminUserPrincipalsSession {
    user: AdminUserSession,
}

impl AdminUserPrincipalsSession {
    pub fn request_parameters(&self) -> FormParameters {
        self.user.request_parameters()
    }

    async fn update(
        &self,
        field: &str,
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<(), ClientError> {
        let mut parameters = self.request_parameters();
        parameters.remove(field);
        for principal in principals {
            parameters.add(field, principal.as_str());
        }
        if !parameters.contains(field) {
            return Err(ValidationError::NoPrincipals.into());
        }

        self.user
            .send(Method::POST, Some("principals"), parameters)
            .await?;
        Ok(())
    }

    /// Add principals to the user's list.
    pub async fn add(
        &self,
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<(), ClientError> {
        self.update("add", principals).await
    }

    /// Remove principals from the user's list.
    pub async fn remove(
        &self,
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<(), ClientError> {
        self.update("remove", principals).await
    }

    /// Replace the user's list of principals.
    pub async fn set(
        &self,
        principals: impl IntoIterator<Item = Principal>,
    ) -> Result<(), ClientError> {
        self.update("update", principals).await
    }

    /// Reset the user's principals to the server's defaults.
    pub async fn reset(&self) -> Result<(), ClientError> {
        let mut parameters = self.request_parameters();
        parameters.set("purge", "true");
        self.user
            .send(Method::POST, Some("principals"), parameters)
            .await?;
        Ok(())
    }
}
