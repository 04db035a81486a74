// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! The HTTP transport used to reach the CASSH server.
//!
//! The client builds a [`Request`] for each operation and hands it to a [`Transport`], which is
//! responsible for actually talking to the server. By default this is a [`reqwest::Client`], but
//! any implementation can be supplied with [`crate::client::ClientBuilder::transport`], for
//! example to add retries, to route through a proxy, or for testing.

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use url::Url;

use crate::{error::TransportError, params::FormParameters};

/// A request ready to be sent to the server.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    /// The form to send as an `application/x-www-form-urlencoded` body, if any.
    pub form: Option<FormParameters>,
}

/// The parts of the server's response this client uses.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub body: Bytes,
}

impl Response {
    pub fn new(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends requests to the server.
///
/// Implementations must be safe to use from several tasks at once. Cancellation is handled by
/// dropping the returned future.
#[async_trait::async_trait]
pub trait Transport: std::fmt::Debug + Send + Sync {
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;
}

#[async_trait::async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let mut builder = self
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(form) = request.form {
            builder = builder
                .header(
                    CONTENT_TYPE,
                    HeaderValue::from_static("application/x-www-form-urlencoded"),
                )
                .body(form.encode());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok(Response { status, body })
    }
}
