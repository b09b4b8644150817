//! Vendor handshake protocol messages.
//!
//! The vendor's sign-in page speaks an RPC-style envelope
//! (`method`/`params`/`id`) to the window it believes opened it. The page
//! has used more than one message shape across versions, so incoming
//! payloads are classified into an explicit tagged union with shape
//! guards instead of ad hoc field probing. Classification is total:
//! anything unrecognized maps to [`HandshakeMessage::Unrecognized`],
//! never an error.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::token::looks_like_token;

/// RPC method name the vendor page uses to deliver the user token.
pub const METHOD_AUTHORIZE: &str = "authorize";

/// RPC method name for the third-party identity handshake step.
pub const METHOD_THIRD_PARTY_INFO: &str = "thirdPartyInfo";

/// Field names observed carrying a token in non-envelope payload shapes.
const TOKEN_FIELD_KEYS: &[&str] = &["token", "musicUserToken", "userToken", "media-user-token"];

/// Cookie name carrying the user token in post-authorization redirects.
pub const TOKEN_COOKIE_NAME: &str = "media-user-token";

static TOKEN_COOKIE_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"media-user-token=([^;]+)").ok());

/// Nested-object search depth for the token-field fallback.
const MAX_PROBE_DEPTH: usize = 3;

/// A classified handshake payload.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeMessage {
    /// The page delivered a token through the authorize RPC call.
    Authorize {
        /// Token-shaped first parameter.
        token: String,
        /// Envelope id, echoed in responses.
        id: Option<Value>,
    },
    /// The page asked for third-party identity info; it will not proceed
    /// until this step succeeds.
    InfoRequest {
        /// Envelope id, echoed in responses.
        id: Option<Value>,
    },
    /// A cookie-like structure from a post-authorization redirect that
    /// embeds the user token.
    CookieUpdate {
        /// Token extracted from the cookie string.
        token: String,
    },
    /// A non-envelope payload carrying a token-shaped string under a
    /// recognized field name.
    TokenField {
        /// The token-shaped value found.
        token: String,
    },
    /// Anything else the page sends; ignored by the bridge.
    Unrecognized,
}

impl HandshakeMessage {
    /// Classifies a raw payload into a handshake message.
    #[must_use]
    pub fn classify(payload: &Value) -> Self {
        if let Some(message) = classify_envelope(payload) {
            return message;
        }
        if let Some(token) = extract_cookie_token(payload) {
            return Self::CookieUpdate { token };
        }
        if let Some(token) = probe_token_field(payload, 0) {
            return Self::TokenField { token };
        }
        Self::Unrecognized
    }

    /// The token this message carries, if any.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Authorize { token, .. }
            | Self::CookieUpdate { token }
            | Self::TokenField { token } => Some(token),
            Self::InfoRequest { .. } | Self::Unrecognized => None,
        }
    }
}

fn classify_envelope(payload: &Value) -> Option<HandshakeMessage> {
    let object = payload.as_object()?;
    let method = object.get("method")?.as_str()?;
    let id = object.get("id").cloned();

    if method.eq_ignore_ascii_case(METHOD_AUTHORIZE) {
        let token = object
            .get("params")
            .and_then(|params| params.as_array())
            .and_then(|params| params.first())
            .and_then(Value::as_str)?;
        if looks_like_token(token) {
            return Some(HandshakeMessage::Authorize {
                token: token.to_string(),
                id,
            });
        }
        return Some(HandshakeMessage::Unrecognized);
    }

    if method.eq_ignore_ascii_case(METHOD_THIRD_PARTY_INFO) {
        return Some(HandshakeMessage::InfoRequest { id });
    }

    None
}

/// Looks for the token cookie pattern inside string payloads or string
/// fields of object payloads.
fn extract_cookie_token(payload: &Value) -> Option<String> {
    let regex = TOKEN_COOKIE_RE.as_ref()?;
    let capture_from = |text: &str| -> Option<String> {
        let captured = regex.captures(text)?.get(1)?.as_str().to_string();
        looks_like_token(&captured).then_some(captured)
    };

    match payload {
        Value::String(text) => capture_from(text),
        Value::Object(object) => object
            .values()
            .filter_map(Value::as_str)
            .find_map(capture_from),
        _ => None,
    }
}

/// Recursively probes object payloads for a token-shaped string under a
/// recognized field name.
fn probe_token_field(payload: &Value, depth: usize) -> Option<String> {
    if depth > MAX_PROBE_DEPTH {
        return None;
    }
    let object = payload.as_object()?;

    for key in TOKEN_FIELD_KEYS {
        if let Some(candidate) = object.get(*key).and_then(Value::as_str)
            && looks_like_token(candidate)
        {
            return Some(candidate.to_string());
        }
    }

    object
        .values()
        .find_map(|nested| probe_token_field(nested, depth + 1))
}

/// Builds the response envelope for a third-party info request.
///
/// The vendor page expects this handshake step to succeed before it
/// proceeds to the authorize call, so the response embeds the
/// application's developer credential.
#[must_use]
pub fn info_response(id: Option<&Value>, developer_token: &str) -> Value {
    json!({
        "id": id.cloned().unwrap_or(Value::Null),
        "result": {
            "developerToken": developer_token,
        },
    })
}
