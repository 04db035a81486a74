// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

/*!
# CASSH client

A client for [CASSH][1], a certificate authority that signs SSH keys over HTTP.

Users register a public key with the server. Once an administrator activates it, the user can
have it signed and receives an OpenSSH certificate valid for the principals the administrator
granted. The server also publishes its CA public key and a key revocation list (KRL).

## Sessions

The [`client::Client`] covers the public endpoints. Everything else goes through a session,
created with an authentication mechanism ([`auth::SessionAuth`]) that is applied to every request
made through it:

```no_run
# async fn example() -> Result<(), Box<dyn std::error::Error>> {
use cassh::{auth::SessionAuth, client::Client, model::{Principal, Username}};

let client = Client::builder("https://cassh.example.com").build()?;
let admin = client.admin_session(SessionAuth::ldap("admin@example.com", "hunter2"));
let principals = admin.user(Username::new("john.doe")?).principals();
principals.add([Principal::new("web")?, Principal::new("db")?]).await?;
# Ok(())
# }
```

Deriving a session never performs I/O. Each operation sends exactly one request and nothing is
retried; wrap calls in `tokio::time::timeout` or configure a request timeout to bound them.

## Crate features

* **client-cli** -
  Build the `cassh-client` command-line interface. This is not enabled by default.

[1]: https://github.com/leboncoin/cassh
*/

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod krl;
pub mod model;
pub mod params;
pub mod protocol;
pub mod transport;

pub use client::{Client, ClientBuilder};
pub use error::ClientError;
