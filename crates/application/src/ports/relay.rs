//! Token relay channel port.

/// Name of the cross-process event carrying a captured token.
pub const TOKEN_EVENT: &str = "apple-music-token";

/// One-directional token transport from the surface controller's process
/// to the process owning the SDK instance.
///
/// Delivery is fire-and-forget: the transport cannot guarantee
/// exactly-once across a process boundary, so "this token has already
/// been handled" is owned by the receiving state machine. Tokens are
/// rare, human-paced events; there is no batching or backpressure.
pub trait TokenRelay: Send + Sync {
    /// Emits `tokenCaptured` with the raw token. Never blocks and never
    /// reports delivery failure to the caller.
    fn relay(&self, token: &str);
}
