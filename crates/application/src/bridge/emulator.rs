//! Host-side handshake emulation core.

use cadenza_domain::handshake::{HandshakeMessage, info_response};
use cadenza_domain::{CaptureChannel, DeveloperCredential};
use serde_json::Value;

/// What the bridge should do with one incoming payload.
#[derive(Debug, Clone, PartialEq)]
pub enum BridgeAction {
    /// A token was captured; relay it and stop listening.
    Capture {
        /// The captured raw token.
        token: String,
        /// Which message shape produced it.
        channel: CaptureChannel,
    },
    /// Answer the page with a response envelope (identity handshake).
    Respond(Value),
    /// Not an authorization payload; the vendor page sends many
    /// unrelated message shapes and none of them may cause an error.
    Ignore,
}

/// Emulates the opener side of the vendor handshake.
///
/// Capture is single-shot per instance: once a token has been accepted,
/// every further payload is ignored, whatever its shape.
#[derive(Debug)]
pub struct OpenerEmulator {
    credential: Option<DeveloperCredential>,
    relayed: bool,
}

impl OpenerEmulator {
    /// Creates an emulator; the credential (when available) is served to
    /// the page's third-party identity requests.
    #[must_use]
    pub const fn new(credential: Option<DeveloperCredential>) -> Self {
        Self {
            credential,
            relayed: false,
        }
    }

    /// Whether a token has already been captured.
    #[must_use]
    pub const fn relayed(&self) -> bool {
        self.relayed
    }

    /// Processes one payload posted to the mock opener or to the
    /// surface's own window.
    pub fn handle(&mut self, payload: &Value) -> BridgeAction {
        if self.relayed {
            return BridgeAction::Ignore;
        }

        match HandshakeMessage::classify(payload) {
            HandshakeMessage::Authorize { token, .. } => self.capture(token),
            HandshakeMessage::InfoRequest { id } => match &self.credential {
                Some(credential) => {
                    BridgeAction::Respond(info_response(id.as_ref(), credential.raw()))
                }
                None => BridgeAction::Ignore,
            },
            HandshakeMessage::CookieUpdate { token } | HandshakeMessage::TokenField { token } => {
                self.capture(token)
            }
            HandshakeMessage::Unrecognized => BridgeAction::Ignore,
        }
    }

    fn capture(&mut self, token: String) -> BridgeAction {
        self.relayed = true;
        BridgeAction::Capture {
            token,
            channel: CaptureChannel::HandshakeMessage,
        }
    }
}
