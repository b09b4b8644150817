//! Token relay channel adapter.
//!
//! Carries the `apple-music-token` event from the surface controller's
//! process to the application process. In this build both ends live in
//! one process, so the boundary is an unbounded channel; the contract
//! stays the same: fire-and-forget, no backpressure, and the receiver
//! owns idempotence.

use cadenza_application::ports::{TOKEN_EVENT, TokenRelay};
use tokio::sync::mpsc;

/// Receiving half handed to the process owning the SDK instance.
pub type TokenReceiver = mpsc::UnboundedReceiver<String>;

/// Sending half of the relay channel.
#[derive(Debug, Clone)]
pub struct ChannelTokenRelay {
    sender: mpsc::UnboundedSender<String>,
}

/// Creates the one-directional relay channel.
#[must_use]
pub fn token_relay_channel() -> (ChannelTokenRelay, TokenReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (ChannelTokenRelay { sender }, receiver)
}

impl TokenRelay for ChannelTokenRelay {
    fn relay(&self, token: &str) {
        tracing::debug!(event = TOKEN_EVENT, length = token.len(), "relaying token");
        // A gone receiver means the application side is shutting down;
        // the capture is simply lost, like any cross-process emit.
        let _ = self.sender.send(token.to_string());
    }
}
