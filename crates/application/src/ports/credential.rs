//! Developer credential accessor port.

use async_trait::async_trait;
use cadenza_domain::DeveloperCredential;
use thiserror::Error;

/// Errors raised when fetching the developer credential.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// No credential is configured or the lookup failed.
    #[error("developer credential unavailable: {0}")]
    Unavailable(String),
}

/// Access to the signed three-part developer credential.
///
/// The credential is a non-relay artifact: this subsystem only consumes
/// it, to embed it into the bridge script's handshake responses and to
/// derive the authoritative storage-key namespace.
#[async_trait]
pub trait DeveloperCredentialSource: Send + Sync {
    /// Fetches the developer credential.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError::Unavailable`] if none is configured.
    async fn developer_credential(&self) -> Result<DeveloperCredential, CredentialError>;
}
