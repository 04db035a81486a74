// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use cassh::{
    auth::SessionAuth,
    client::Client,
    error::TransportError,
    transport::{Request, Response, Transport},
};
use reqwest::StatusCode;

pub const BASE_URL: &str = "https://cassh.example.com";

/// Credentials that every authenticated request in these tests must carry.
pub fn ldap() -> SessionAuth {
    SessionAuth::ldap("admin@example.com", "ldapPwd")
}

/// A transport that records requests and answers with canned responses, in order.
///
/// Once the canned responses run out, every request is answered with an empty 200.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<Request>>>,
    responses: Arc<Mutex<VecDeque<Result<Response, String>>>>,
}

impl RecordingTransport {
    pub fn respond(&self, status: StatusCode, body: impl Into<bytes::Bytes>) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(Response::new(status, body)));
        self
    }

    pub fn fail(&self, reason: &str) -> &Self {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(reason.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// The only request sent so far.
    pub fn request(&self) -> Request {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request");
        requests.into_iter().next().unwrap()
    }
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(reason)) => Err(anyhow::anyhow!(reason).into()),
            None => Ok(Response::new(StatusCode::OK, "")),
        }
    }
}

/// A client talking to a fresh recording transport.
pub fn client() -> (Client, RecordingTransport) {
    let transport = RecordingTransport::default();
    let client = Client::builder(BASE_URL)
        .transport(transport.clone())
        .build()
        .expect("the test client configuration is valid");
    (client, transport)
}

/// Assert the request's method, path, and complete form.
pub fn assert_request(
    request: &Request,
    method: reqwest::Method,
    path: &str,
    form: &[(&str, &str)],
) {
    assert_eq!(request.method, method);
    assert_eq!(request.url.path(), path);
    let sent: Vec<(&str, &str)> = request
        .form
        .as_ref()
        .map(|form| form.iter().collect())
        .unwrap_or_default();
    let mut expected = form.to_vec();
    expected.sort();
    let mut sent_sorted = sent.clone();
    sent_sorted.sort();
    assert_eq!(sent_sorted, expected, "unexpected form {sent:?}");
}
