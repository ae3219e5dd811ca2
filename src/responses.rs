// SPDX-FileCopyrightText: 2026 Mattia Egloff <mattia.egloff@pm.me>
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Response Builders
//!
//! Reply documents for the bootstrap requests, which are computed per
//! request, plus the generic failure reply and the `reqid` rewrite applied
//! to fixture documents.

use serde::Serialize;
use serde_json::Value;

use crate::keys::KeyMaterial;
use crate::tokens;

pub const RESULT_SUCCESS: &str = "succ";
pub const RESULT_FAILURE: &str = "fail";

pub const GET_HOST_NAME_REQ: &str = "appcgi.sysinfo.getHostName";
pub const HOST_NAME: &str = "www.timandes.cn";
pub const TRIM_VERSION: &str = "1.0.0";

/// A reply to exactly one request.
///
/// Bootstrap replies have fixed shapes; fixture replies are arbitrary JSON
/// whose key order is kept as authored.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Pong(PongResponse),
    RsaPub(RsaPubResponse),
    Login(LoginResponse),
    HostName(HostNameResponse),
    Error(ErrorResponse),
    Fixture(Value),
}

impl Response {
    /// Compact JSON as sent on the wire.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// True for replies carrying `"result":"fail"`.
    pub fn is_failure(&self) -> bool {
        match self {
            Response::Error(_) => true,
            Response::Fixture(doc) => {
                doc.get("result").and_then(Value::as_str) == Some(RESULT_FAILURE)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PongResponse {
    pub res: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RsaPubResponse {
    #[serde(rename = "pub")]
    pub public_key: String,
    #[serde(rename = "si")]
    pub session_id: String,
    pub reqid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub result: &'static str,
    pub token: String,
    #[serde(rename = "longToken")]
    pub long_token: String,
    /// Base64 AES-CBC ciphertext of the placeholder secret.
    pub secret: String,
    pub reqid: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostNameResponse {
    pub result: &'static str,
    pub req: &'static str,
    pub reqid: String,
    pub data: HostInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostInfo {
    #[serde(rename = "hostName")]
    pub host_name: &'static str,
    #[serde(rename = "trimVersion")]
    pub trim_version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub result: &'static str,
    pub errmsg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reqid: Option<String>,
}

impl From<LoginResponse> for Response {
    fn from(response: LoginResponse) -> Self {
        Response::Login(response)
    }
}

/// `{"res":"pong"}`
pub fn ping() -> Response {
    Response::Pong(PongResponse { res: "pong" })
}

/// Advertises the server public key with a fresh session identifier.
pub fn rsa_pub(keys: &KeyMaterial, reqid: &str) -> Response {
    Response::RsaPub(RsaPubResponse {
        public_key: keys.public_key_pem().to_string(),
        session_id: tokens::session_id(),
        reqid: reqid.to_string(),
    })
}

/// Successful login with fresh tokens and a throwaway encrypted secret.
pub fn login(reqid: &str) -> LoginResponse {
    LoginResponse {
        result: RESULT_SUCCESS,
        token: tokens::random_token(tokens::TOKEN_BYTES),
        long_token: tokens::random_token(tokens::LONG_TOKEN_BYTES),
        secret: tokens::encrypted_secret(),
        reqid: reqid.to_string(),
    }
}

pub fn host_name(reqid: &str) -> Response {
    Response::HostName(HostNameResponse {
        result: RESULT_SUCCESS,
        req: GET_HOST_NAME_REQ,
        reqid: reqid.to_string(),
        data: HostInfo {
            host_name: HOST_NAME,
            trim_version: TRIM_VERSION,
        },
    })
}

/// Failure reply. `reqid` is echoed only when the request supplied one.
pub fn error(reqid: Option<&str>, errmsg: impl Into<String>) -> Response {
    Response::Error(ErrorResponse {
        result: RESULT_FAILURE,
        errmsg: errmsg.into(),
        reqid: reqid.filter(|r| !r.is_empty()).map(str::to_string),
    })
}

/// Returns a copy of `response` whose `reqid` fields carry `reqid`.
///
/// The top-level field is replaced if present. Independently, a nested
/// `data` object that has its own `reqid` gets it replaced as well. Fields
/// that are absent are not added.
pub fn replace_reqid(response: &Value, reqid: &str) -> Value {
    let mut result = response.clone();
    let Some(fields) = result.as_object_mut() else {
        return result;
    };

    if let Some(top) = fields.get_mut("reqid") {
        *top = Value::from(reqid);
    }
    if let Some(nested) = fields
        .get_mut("data")
        .and_then(Value::as_object_mut)
        .and_then(|data| data.get_mut("reqid"))
    {
        *nested = Value::from(reqid);
    }

    result
}
