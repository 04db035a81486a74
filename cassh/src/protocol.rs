// SPDX-License-Identifier: MIT
// Copyright (c) Microsoft Corporation.

//! Translation between the CASSH server's wire formats and this crate's types.
//!
//! Each decoder takes the body of a successful response. None of them perform I/O.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use ssh_key::{Certificate, PublicKey};

use crate::{
    error::DecodeError,
    krl::KeyRevocationList,
    model::{KeyState, Principal, Principals, UserStatus, Username},
};

/// The server's timestamp format; it carries no timezone.
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Deserialize)]
struct HealthResponse {
    name: String,
    version: String,
}

/// The user status as the server sends it.
#[derive(Debug, Deserialize)]
struct UserStatusResponse {
    #[serde(default)]
    expiration: String,
    // The server also sends a relative expiry; its meaning isn't settled, so it's not used.
    #[serde(default)]
    #[allow(dead_code)]
    expiry: Option<String>,
    #[serde(default)]
    principals: Vec<String>,
    #[serde(default)]
    realname: String,
    #[serde(default)]
    #[allow(dead_code)]
    ssh_key_hash: Option<serde_json::Value>,
    status: String,
    username: String,
}

/// Decode the `/health` response into the server's name and version.
pub fn decode_health(body: &[u8]) -> Result<(String, String), DecodeError> {
    let response: HealthResponse = serde_json::from_slice(body).map_err(DecodeError::Health)?;
    Ok((response.name, response.version))
}

/// Decode a user status response.
///
/// The server sends the key expiration without a timezone, so it is interpreted in
/// `server_timezone`.
pub fn decode_user_status(body: &[u8], server_timezone: Tz) -> Result<UserStatus, DecodeError> {
    let response: UserStatusResponse =
        serde_json::from_slice(body).map_err(DecodeError::UserStatus)?;

    let key_expiration = parse_expiration(&response.expiration, server_timezone)?;
    let key_state = response
        .status
        .parse::<KeyState>()
        .map_err(DecodeError::KeyState)?;
    let name = Username::new(response.username).map_err(|error| {
        DecodeError::UserStatus(serde::de::Error::custom(format!("invalid username: {error}")))
    })?;
    let key_principals = response
        .principals
        .into_iter()
        .map(Principal::new)
        .collect::<Result<Principals, _>>()
        .map_err(|error| {
            DecodeError::UserStatus(serde::de::Error::custom(format!(
                "invalid principal: {error}"
            )))
        })?;

    Ok(UserStatus {
        name,
        real_name: response.realname,
        key_state,
        key_expiration,
        key_principals,
    })
}

/// Parse a server timestamp, interpreting it in `server_timezone`.
///
/// Local times that occur twice (when clocks go back) resolve to the earlier instant; local times
/// that never occur (when clocks go forward) are an error.
pub fn parse_expiration(value: &str, server_timezone: Tz) -> Result<DateTime<Utc>, DecodeError> {
    let naive = NaiveDateTime::parse_from_str(value, EXPIRATION_FORMAT).map_err(|error| {
        DecodeError::Expiration {
            value: value.to_string(),
            reason: error.to_string(),
        }
    })?;

    server_timezone
        .from_local_datetime(&naive)
        .earliest()
        .map(|expiration| expiration.with_timezone(&Utc))
        .ok_or_else(|| DecodeError::Expiration {
            value: value.to_string(),
            reason: format!("local time does not exist in {server_timezone}"),
        })
}

/// Decode the `/krl` response.
pub fn decode_key_revocation_list(body: &[u8]) -> Result<KeyRevocationList, DecodeError> {
    Ok(KeyRevocationList::parse(body)?)
}

/// Decode the `/ca` response, an OpenSSH authorized key.
pub fn decode_authority_public_key(body: &[u8]) -> Result<PublicKey, DecodeError> {
    let body = String::from_utf8_lossy(body);
    PublicKey::from_openssh(authorized_key_line(&body)).map_err(DecodeError::AuthorityKey)
}

/// Decode the response to a signing request, an OpenSSH certificate.
///
/// A body that holds a plain public key is reported as [`DecodeError::NotACertificate`], distinct
/// from a body that can't be parsed at all.
pub fn decode_certificate(body: &[u8]) -> Result<Certificate, DecodeError> {
    let body = String::from_utf8_lossy(body);
    let line = authorized_key_line(&body);

    match Certificate::from_openssh(line) {
        Ok(certificate) => Ok(certificate),
        Err(error) => {
            if PublicKey::from_openssh(line).is_ok() {
                Err(DecodeError::NotACertificate)
            } else {
                Err(DecodeError::Certificate(error))
            }
        }
    }
}

/// Encode a public key the way the server expects it in the `pubkey` field: an authorized key
/// line without a comment, terminated by a newline.
pub fn encode_authorized_key(key: &PublicKey) -> Result<String, ssh_key::Error> {
    let key = PublicKey::from(key.key_data().clone());
    Ok(format!("{}\n", key.to_openssh()?))
}

// The first line that isn't blank or a comment, as in an authorized_keys file.
fn authorized_key_line(body: &str) -> &str {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with('#'))
        .unwrap_or_default()
}
