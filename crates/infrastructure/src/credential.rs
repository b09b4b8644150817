//! Developer credential source adapter.

use async_trait::async_trait;
use cadenza_application::ports::{CredentialError, DeveloperCredentialSource};
use cadenza_domain::DeveloperCredential;

/// Serves the developer credential configured at startup (typically from
/// the environment); the credential itself is minted out of band.
pub struct StaticCredentialSource {
    credential: Option<DeveloperCredential>,
}

impl StaticCredentialSource {
    /// Wraps a configured credential string.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            credential: Some(DeveloperCredential::new(raw)),
        }
    }

    /// A source with no credential configured.
    #[must_use]
    pub const fn empty() -> Self {
        Self { credential: None }
    }

    /// Builds from an optional environment value.
    #[must_use]
    pub fn from_env_value(value: Option<String>) -> Self {
        value.map_or_else(Self::empty, Self::new)
    }
}

#[async_trait]
impl DeveloperCredentialSource for StaticCredentialSource {
    async fn developer_credential(&self) -> Result<DeveloperCredential, CredentialError> {
        self.credential.clone().ok_or_else(|| {
            CredentialError::Unavailable("no developer credential configured".to_string())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_serves_configured_credential() {
        let source = StaticCredentialSource::new("h.p.s");
        let credential = source.developer_credential().await.unwrap();
        assert_eq!(credential.raw(), "h.p.s");
    }

    #[tokio::test]
    async fn test_empty_source_reports_unavailable() {
        let source = StaticCredentialSource::empty();
        assert!(source.developer_credential().await.is_err());
    }

    #[tokio::test]
    async fn test_from_env_value_none_is_empty() {
        let source = StaticCredentialSource::from_env_value(None);
        assert!(source.developer_credential().await.is_err());
    }
}
