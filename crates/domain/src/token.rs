//! Captured authorization token types.
//!
//! The token is the only artifact this subsystem produces: an opaque
//! bearer string captured from the vendor's sign-in surface. It is never
//! logged or persisted in full by the relay itself; logging goes through
//! [`AuthorizationToken::preview`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Minimum length a captured value must exceed to count as a token.
///
/// Guards against accepting session IDs, empty strings, or the literal
/// `"null"` the vendor page posts on some cancelled flows.
pub const MIN_TOKEN_LENGTH: usize = 32;

/// Side channel a token was captured through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureChannel {
    /// Captured from the opener handshake protocol (RPC envelope or a
    /// recognized nested token field).
    HandshakeMessage,
    /// Decoded from an intercepted navigation to the private relay scheme.
    UriScheme,
    /// Extracted from a sentinel-prefixed document title change.
    TitleMutation,
}

/// Returns true if a raw value passes the token-shape heuristic.
#[must_use]
pub fn looks_like_token(value: &str) -> bool {
    value.len() > MIN_TOKEN_LENGTH && value != "null"
}

/// An opaque bearer token captured during one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationToken {
    value: String,
    channel: CaptureChannel,
    captured_at: DateTime<Utc>,
}

impl AuthorizationToken {
    /// Validates and wraps a captured value.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::TokenRejected`] if the value fails the
    /// token-shape heuristic.
    pub fn new(value: impl Into<String>, channel: CaptureChannel) -> DomainResult<Self> {
        let value = value.into();
        if !looks_like_token(&value) {
            return Err(DomainError::TokenRejected {
                length: value.len(),
            });
        }
        Ok(Self {
            value,
            channel,
            captured_at: Utc::now(),
        })
    }

    /// The raw token value, for handing to the SDK only.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Which side channel produced this capture.
    #[must_use]
    pub const fn channel(&self) -> CaptureChannel {
        self.channel
    }

    /// When the capture happened.
    #[must_use]
    pub const fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Observed length of the raw value.
    #[must_use]
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Always false: construction rejects empty values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// A log-safe preview of the token (first 8 chars + length).
    #[must_use]
    pub fn preview(&self) -> String {
        let head: String = self.value.chars().take(8).collect();
        format!("{head}... ({} chars)", self.value.len())
    }
}
