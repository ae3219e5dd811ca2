// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Encrypted Login Handshake
//!
//! An `encrypted` request wraps a `user.login` request:
//!
//! - `rsa`: AES key encrypted with the server public key (PKCS#1 v1.5)
//! - `iv`:  AES-CBC initialization vector
//! - `aes`: the login JSON, AES-CBC encrypted with PKCS#7 padding
//!
//! All three are base64. The reply is a normal login response whose
//! `secret` is a placeholder encrypted under the client's own key and IV,
//! so a client that decrypts it finds a well-formed value. None of this
//! provides any security.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use prometheus::IntCounter;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::{self, CryptoError};
use crate::keys::KeyMaterial;
use crate::responses::{self, LoginResponse};
use crate::router::Request;
use crate::tokens;

/// Random bytes behind the made-up `reqid` of a fallback reply (22 chars).
pub const FALLBACK_REQID_BYTES: usize = 16;

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("missing {0:?} field")]
    MissingField(&'static str),
    #[error("invalid base64 in {field:?}: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("login payload is not JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("login payload has no reqid")]
    MissingReqid,
}

pub struct HandshakeSimulator {
    keys: Arc<KeyMaterial>,
    fallbacks: IntCounter,
}

impl HandshakeSimulator {
    /// `fallbacks` is incremented whenever a request cannot be decrypted.
    pub fn new(keys: Arc<KeyMaterial>, fallbacks: IntCounter) -> Self {
        HandshakeSimulator { keys, fallbacks }
    }

    /// Answers an encrypted login. Never fails.
    ///
    /// Requests that cannot be decrypted still get a successful login
    /// reply, with a made-up `reqid` since the real one is unknown.
    pub fn handle_encrypted_login(&self, request: &Request) -> LoginResponse {
        match self.decrypt_login(request) {
            Ok(response) => response,
            Err(e) => {
                warn!("Error handling encrypted login request: {}", e);
                self.fallbacks.inc();
                fallback_login()
            }
        }
    }

    /// Decrypts the wrapped login and builds the reply for its `reqid`.
    pub fn decrypt_login(&self, request: &Request) -> Result<LoginResponse, HandshakeError> {
        let iv = decode_field(request, "iv")?;
        let wrapped_key = decode_field(request, "rsa")?;
        let sealed_login = decode_field(request, "aes")?;

        let aes_key = crypto::rsa_unwrap(self.keys.private_key(), &wrapped_key)?;
        let login_json = crypto::cbc_decrypt(&aes_key, &iv, &sealed_login)?;
        let login: Value = serde_json::from_slice(&login_json)?;

        let reqid = login
            .get("reqid")
            .and_then(Value::as_str)
            .filter(|r| !r.is_empty())
            .ok_or(HandshakeError::MissingReqid)?;
        debug!("Decrypted login request reqid={}", reqid);

        let secret = crypto::cbc_encrypt(&aes_key, &iv, &tokens::placeholder_secret())?;

        let mut response = responses::login(reqid);
        response.secret = STANDARD.encode(secret);
        Ok(response)
    }
}

/// Successful login reply for a request whose `reqid` could not be recovered.
pub fn fallback_login() -> LoginResponse {
    responses::login(&tokens::random_token(FALLBACK_REQID_BYTES))
}

fn decode_field(request: &Request, field: &'static str) -> Result<Vec<u8>, HandshakeError> {
    let text = request
        .field_str(field)
        .ok_or(HandshakeError::MissingField(field))?;
    STANDARD
        .decode(text)
        .map_err(|source| HandshakeError::Base64 { field, source })
}
