// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Token and Secret Generation
//!
//! Random session identifiers, bearer tokens and the placeholder login
//! secret. Every call draws fresh randomness from the OS.

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use data_encoding::BASE32;
use rand::rngs::OsRng;
use rand::RngCore;

use crate::crypto::{self, AES_BLOCK_SIZE};

/// Random bytes behind the login `token` (43 URL-safe chars).
pub const TOKEN_BYTES: usize = 32;
/// Random bytes behind the login `longToken` (86 URL-safe chars).
pub const LONG_TOKEN_BYTES: usize = 64;
/// Random bytes behind the `si` session identifier (32 base32 chars).
pub const SESSION_ID_BYTES: usize = 16;
/// Length of the placeholder secret before encryption.
pub const SECRET_BYTES: usize = 32;

pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// URL-safe, unpadded base64 of `len` random bytes.
pub fn random_token(len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(len))
}

/// Lowercase, padded base32 of 16 random bytes.
pub fn session_id() -> String {
    BASE32
        .encode(&random_bytes(SESSION_ID_BYTES))
        .to_ascii_lowercase()
}

/// A fresh secret value. It carries no meaning beyond its length.
pub fn placeholder_secret() -> Vec<u8> {
    random_bytes(SECRET_BYTES)
}

/// Placeholder secret sealed under a throwaway AES-256 key and IV, base64 encoded.
///
/// Used for the plaintext `user.login` path, where no client key exists to
/// encrypt for. Nobody can decrypt the result.
pub fn encrypted_secret() -> String {
    let mut key = [0u8; 32];
    let mut iv = [0u8; AES_BLOCK_SIZE];
    OsRng.fill_bytes(&mut key);
    OsRng.fill_bytes(&mut iv);
    STANDARD.encode(crypto::cbc_encrypt_256(&key, &iv, &placeholder_secret()))
}
