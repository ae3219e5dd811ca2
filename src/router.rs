// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Request Routing
//!
//! Turns one decoded request into exactly one response. Checks run in a
//! fixed order:
//!
//! 1. no `req` → failure
//! 2. `ping` → pong
//! 3. `encrypted` → simulated login handshake
//! 4. no `reqid` → failure
//! 5. bootstrap types (`util.crypto.getRSAPub`, `user.login`,
//!    `appcgi.sysinfo.getHostName`) → computed reply
//! 6. anything else → fixture lookup
//!
//! Only `ping` and `encrypted` are exempt from the `reqid` requirement.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use crate::fixtures::{FixtureError, FixtureStore};
use crate::handshake::HandshakeSimulator;
use crate::keys::KeyMaterial;
use crate::metrics::MockMetrics;
use crate::responses::{self, Response, GET_HOST_NAME_REQ};

pub const PING_REQ: &str = "ping";
pub const ENCRYPTED_REQ: &str = "encrypted";
pub const GET_RSA_PUB_REQ: &str = "util.crypto.getRSAPub";
pub const LOGIN_REQ: &str = "user.login";

pub const MISSING_REQ_MSG: &str = "Missing \"req\" field in request";
pub const MISSING_REQID_MSG: &str = "Missing \"reqid\" field in request";

/// A decoded client request.
///
/// `req` and `reqid` are `None` when absent, empty or not strings. All
/// fields, including those two, stay available through [`Request::field_str`].
#[derive(Debug, Clone, Default)]
pub struct Request {
    pub req: Option<String>,
    pub reqid: Option<String>,
    fields: Map<String, Value>,
}

impl Request {
    /// Builds a request from a decoded document. Non-objects have no fields.
    pub fn from_value(doc: Value) -> Self {
        let Value::Object(fields) = doc else {
            return Request::default();
        };
        Request {
            req: non_empty_str(&fields, "req"),
            reqid: non_empty_str(&fields, "reqid"),
            fields,
        }
    }

    /// String value of an arbitrary field.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

fn non_empty_str(fields: &Map<String, Value>, name: &str) -> Option<String> {
    fields
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// The protocol state machine. Shared by every connection.
pub struct Router {
    keys: Arc<KeyMaterial>,
    fixtures: Arc<FixtureStore>,
    handshake: HandshakeSimulator,
    metrics: MockMetrics,
}

impl Router {
    pub fn new(keys: Arc<KeyMaterial>, fixtures: Arc<FixtureStore>, metrics: MockMetrics) -> Self {
        let handshake = HandshakeSimulator::new(keys.clone(), metrics.handshake_fallbacks.clone());
        Router {
            keys,
            fixtures,
            handshake,
            metrics,
        }
    }

    pub fn fixtures(&self) -> &FixtureStore {
        &self.fixtures
    }

    /// Routes one request. Every outcome, including failures, is a response.
    pub fn route(&self, request: &Request) -> Response {
        let Some(req) = request.req.as_deref() else {
            return responses::error(None, MISSING_REQ_MSG);
        };

        match req {
            PING_REQ => return responses::ping(),
            ENCRYPTED_REQ => return self.handshake.handle_encrypted_login(request).into(),
            _ => {}
        }

        let Some(reqid) = request.reqid.as_deref() else {
            return responses::error(None, MISSING_REQID_MSG);
        };

        match req {
            GET_RSA_PUB_REQ => responses::rsa_pub(&self.keys, reqid),
            LOGIN_REQ => responses::login(reqid).into(),
            GET_HOST_NAME_REQ => responses::host_name(reqid),
            _ => self.fixture_response(req, reqid),
        }
    }

    fn fixture_response(&self, req: &str, reqid: &str) -> Response {
        let result = self.fixtures.get(req);
        self.metrics
            .fixtures_cached
            .set(self.fixtures.cached_count() as i64);

        match result {
            Ok(template) => {
                let mut doc = responses::replace_reqid(&template, reqid);
                // Correlation must hold even for fixtures authored without a reqid.
                if let Some(fields) = doc.as_object_mut() {
                    fields
                        .entry("reqid")
                        .or_insert_with(|| Value::from(reqid));
                }
                debug!("Serving fixture for {}", req);
                Response::Fixture(doc)
            }
            Err(FixtureError::NotFound(_)) => {
                warn!("No fixture for request type: {}", req);
                self.metrics.fixture_misses.inc();
                responses::error(Some(reqid), format!("Unknown request type: {}", req))
            }
            Err(e @ FixtureError::Invalid { .. }) => {
                error!("{}", e);
                responses::error(Some(reqid), format!("Invalid response format for {}", req))
            }
            Err(e @ FixtureError::Io { .. }) => {
                error!("{}", e);
                responses::error(Some(reqid), format!("Error processing request {}", req))
            }
        }
    }
}
