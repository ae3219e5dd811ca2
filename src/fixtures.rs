// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fixture Storage
//!
//! Canned response documents keyed by request type. Sources supply raw
//! fixture text (a directory of `<req>.json` files in production, an
//! in-memory map in tests); [`FixtureStore`] parses and caches them.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("no fixture for request type {0}")]
    NotFound(String),
    #[error("fixture for {request_type} is not valid JSON: {source}")]
    Invalid {
        request_type: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to read fixture for {request_type}: {source}")]
    Io {
        request_type: String,
        #[source]
        source: std::io::Error,
    },
}

/// Trait for fixture backends.
pub trait FixtureSource: Send + Sync {
    /// Returns the raw fixture text for a request type.
    fn read(&self, request_type: &str) -> Result<String, FixtureError>;
}

// ============================================================================
// Directory source
// ============================================================================

/// Reads `<root>/<request_type>.json`.
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        DirectorySource { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the fixture file for a request type.
    pub fn path_for(&self, request_type: &str) -> PathBuf {
        self.root.join(format!("{}.json", request_type))
    }
}

/// Request types become file names, so anything that could leave the
/// fixture directory is refused.
fn is_plain_request_type(request_type: &str) -> bool {
    !request_type.is_empty()
        && !request_type
            .chars()
            .any(|c| matches!(c, '/' | '\\' | ':' | '\0'))
}

impl FixtureSource for DirectorySource {
    fn read(&self, request_type: &str) -> Result<String, FixtureError> {
        if !is_plain_request_type(request_type) {
            return Err(FixtureError::NotFound(request_type.to_string()));
        }

        std::fs::read_to_string(self.path_for(request_type)).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                FixtureError::NotFound(request_type.to_string())
            } else {
                FixtureError::Io {
                    request_type: request_type.to_string(),
                    source,
                }
            }
        })
    }
}

// ============================================================================
// In-memory source (for testing)
// ============================================================================

#[derive(Default)]
pub struct MemorySource {
    docs: RwLock<HashMap<String, String>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the raw text for a request type.
    pub fn insert(&self, request_type: &str, text: impl Into<String>) {
        self.docs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_type.to_string(), text.into());
    }

    /// Builder-style [`MemorySource::insert`].
    pub fn with(self, request_type: &str, text: impl Into<String>) -> Self {
        self.insert(request_type, text);
        self
    }
}

impl FixtureSource for MemorySource {
    fn read(&self, request_type: &str) -> Result<String, FixtureError> {
        self.docs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_type)
            .cloned()
            .ok_or_else(|| FixtureError::NotFound(request_type.to_string()))
    }
}

// ============================================================================
// Caching store
// ============================================================================

/// Parsed fixture templates, loaded on first use.
///
/// Every [`FixtureStore::get`] hands out an independent deep copy, so callers
/// may rewrite the document freely without touching the cached template.
/// Two tasks racing on the first load both parse the file; the first insert
/// wins and the documents are identical anyway.
pub struct FixtureStore {
    source: Box<dyn FixtureSource>,
    cache: RwLock<HashMap<String, Value>>,
}

impl FixtureStore {
    pub fn new(source: impl FixtureSource + 'static) -> Self {
        FixtureStore {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Store backed by a directory of `<req>.json` files.
    pub fn from_dir(root: impl Into<PathBuf>) -> Self {
        Self::new(DirectorySource::new(root))
    }

    /// Returns a fresh copy of the fixture for `request_type`.
    pub fn get(&self, request_type: &str) -> Result<Value, FixtureError> {
        if let Some(template) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(request_type)
        {
            debug!("Using cached fixture for {}", request_type);
            return Ok(template.clone());
        }

        let text = self.source.read(request_type)?;
        let doc: Value = serde_json::from_str(&text).map_err(|source| FixtureError::Invalid {
            request_type: request_type.to_string(),
            source,
        })?;

        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(request_type.to_string())
            .or_insert_with(|| doc.clone());
        debug!("Loaded fixture for {}", request_type);

        Ok(doc)
    }

    /// Number of templates currently cached.
    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
