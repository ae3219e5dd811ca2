// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Server Key Material
//!
//! Loads the pre-provisioned RSA keypair used for the simulated login
//! handshake. The public key is advertised verbatim to clients; the
//! private key unwraps the AES key of encrypted login requests.

use std::path::{Path, PathBuf};

use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// PEM-encoded SubjectPublicKeyInfo, served as-is in `util.crypto.getRSAPub`.
pub const PUBLIC_KEY_FILE: &str = "public_key.pem";
/// PEM-encoded private key, PKCS#8 or PKCS#1.
pub const PRIVATE_KEY_FILE: &str = "private_key.pem";

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {kind} key PEM: {reason}")]
    Pem { kind: &'static str, reason: String },
    #[error("public key does not belong to the private key")]
    Mismatch,
}

/// The server's long-term keypair. Read-only once loaded.
#[derive(Debug)]
pub struct KeyMaterial {
    public_pem: String,
    private: RsaPrivateKey,
}

impl KeyMaterial {
    /// Parses a keypair from PEM text and checks both halves belong together.
    pub fn from_pem(public_pem: String, private_pem: &str) -> Result<Self, KeyError> {
        let public = RsaPublicKey::from_public_key_pem(public_pem.trim()).map_err(|e| {
            KeyError::Pem {
                kind: "public",
                reason: e.to_string(),
            }
        })?;

        let private = RsaPrivateKey::from_pkcs8_pem(private_pem)
            .or_else(|_| RsaPrivateKey::from_pkcs1_pem(private_pem))
            .map_err(|e| KeyError::Pem {
                kind: "private",
                reason: e.to_string(),
            })?;

        if RsaPublicKey::from(&private) != public {
            return Err(KeyError::Mismatch);
        }

        Ok(KeyMaterial {
            public_pem,
            private,
        })
    }

    /// Loads `{keys_dir}/public_key.pem` and `{keys_dir}/private_key.pem`.
    pub fn load(keys_dir: &Path) -> Result<Self, KeyError> {
        let public_pem = read_key_file(&keys_dir.join(PUBLIC_KEY_FILE))?;
        let private_pem = read_key_file(&keys_dir.join(PRIVATE_KEY_FILE))?;
        Self::from_pem(public_pem, &private_pem)
    }

    /// The public key exactly as provisioned on disk.
    pub fn public_key_pem(&self) -> &str {
        &self.public_pem
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey::from(&self.private)
    }
}

fn read_key_file(path: &Path) -> Result<String, KeyError> {
    std::fs::read_to_string(path).map_err(|source| KeyError::Io {
        path: path.to_path_buf(),
        source,
    })
}
