// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Envelope Decoding
//!
//! Clients prefix every JSON request with a signature of unspecified
//! length and no delimiter. The signature is not checked; decoding only
//! has to find where the JSON starts.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Length of a base64-encoded HMAC-SHA256 signature, the usual prefix.
pub const SIGNATURE_LEN: usize = 44;

/// Largest prefix (in characters) the fallback scan will skip.
pub const MAX_PREFIX_LEN: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Invalid request format: cannot parse JSON")]
    Unparsable,
}

/// Recovers the JSON document from a raw inbound message.
///
/// Tries, in order: the whole message, the suffix after a standard-length
/// signature, then every prefix length from 0 to [`MAX_PREFIX_LEN`]
/// characters. The first suffix that parses wins.
pub fn decode(raw: &str) -> Result<Value, EnvelopeError> {
    if let Some(doc) = parse(raw) {
        return Ok(doc);
    }

    if let Some(doc) = suffix_after(raw, SIGNATURE_LEN).and_then(parse) {
        return Ok(doc);
    }

    for (offset, (start, _)) in raw.char_indices().take(MAX_PREFIX_LEN + 1).enumerate() {
        if let Some(doc) = parse(&raw[start..]) {
            debug!("Found valid JSON at offset {}", offset);
            return Ok(doc);
        }
    }

    Err(EnvelopeError::Unparsable)
}

fn parse(text: &str) -> Option<Value> {
    serde_json::from_str(text).ok()
}

/// The part of `raw` after its first `chars` characters.
fn suffix_after(raw: &str, chars: usize) -> Option<&str> {
    raw.char_indices().nth(chars).map(|(start, _)| &raw[start..])
}
