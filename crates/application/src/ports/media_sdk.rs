//! Vendor media SDK port.
//!
//! The SDK is a black box running in the application's web context. The
//! relay only needs its authorization surface area: the `isAuthorized`
//! flag, the interactive `authorize()` call (which may throw even when a
//! token is about to arrive through the relay), token injection, and the
//! change notification. Reconfiguration goes through the factory, whose
//! instances read persisted storage at construction time.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

/// Errors surfaced by the vendor SDK.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The interactive authorize call threw.
    #[error("SDK authorize failed: {0}")]
    AuthorizeFailed(String),

    /// Configuring a fresh SDK instance failed.
    #[error("SDK configuration failed: {0}")]
    ConfigureFailed(String),

    /// Any other vendor-thrown error, kept as diagnostic context.
    #[error("SDK error: {0}")]
    Other(String),
}

/// A live vendor SDK instance.
#[async_trait]
pub trait MediaSdk: Send + Sync {
    /// Mirror of the SDK's `isAuthorized` flag.
    async fn is_authorized(&self) -> bool;

    /// The SDK's own interactive authorize call.
    ///
    /// # Errors
    ///
    /// May return [`SdkError::AuthorizeFailed`] even when authorization
    /// eventually succeeds through the relay (the SDK believes its popup
    /// was blocked); callers must not treat this as terminal.
    async fn authorize(&self) -> Result<(), SdkError>;

    /// The SDK's sign-out operation.
    ///
    /// # Errors
    ///
    /// Returns an error if the vendor call throws.
    async fn unauthorize(&self) -> Result<(), SdkError>;

    /// Direct injection: sets the token on the live instance and, where
    /// a handshake message channel is still open, dispatches a synthetic
    /// message in the shape the SDK's internal listener expects.
    ///
    /// # Errors
    ///
    /// Returns an error if the instance rejects the write outright.
    async fn inject_user_token(&self, token: &str) -> Result<(), SdkError>;

    /// Active region/storefront identifier, once authorized.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity lookup throws.
    async fn storefront(&self) -> Result<Option<String>, SdkError>;

    /// Subscription to `authorizationStatusDidChange`.
    fn authorization_changes(&self) -> watch::Receiver<bool>;
}

/// Capability to construct a fresh SDK instance.
#[async_trait]
pub trait MediaSdkFactory: Send + Sync {
    /// Runs the SDK's `configure()` from scratch. The fresh instance
    /// reads its persistence layer during construction, which is what
    /// the reconfigure fallback relies on.
    ///
    /// # Errors
    ///
    /// Returns [`SdkError::ConfigureFailed`] if construction throws.
    async fn configure(&self) -> Result<Arc<dyn MediaSdk>, SdkError>;
}
