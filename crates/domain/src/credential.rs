//! Developer credential decoding and storage-key derivation.
//!
//! The vendor SDK persists its bearer token under a storage key it
//! derives lazily from the issuer claim of the application's signed
//! developer credential (a three-part token this subsystem consumes but
//! never produces). The derivation is reverse-engineered behavior, not a
//! documented contract; when it stops matching, the fan-out degrades to
//! the historical naming-variant keys.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::error::{DomainError, DomainResult};

/// Historical storage-key names this application has written under.
///
/// Past renames left installs reading any one of these, so every token
/// write fans out across all of them.
pub const NAMING_VARIANT_KEYS: &[&str] = &[
    "music.ampwebplay.media-user-token",
    "music.wsapwebplay.media-user-token",
    "music.amp.media-user-token",
];

/// Payload claims of the developer credential.
#[derive(Debug, Deserialize)]
struct CredentialClaims {
    iss: String,
}

/// The application's signed three-part developer credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeveloperCredential {
    raw: String,
}

impl DeveloperCredential {
    /// Wraps a raw credential string without validating it; decoding is
    /// deferred to [`Self::issuer`].
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The raw credential string, for embedding into the bridge script.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Decodes the payload segment and extracts the issuer claim.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::MalformedCredential`] if the credential is
    /// not a three-part token, the payload is not base64url, or the
    /// claims are not JSON with an `iss` field.
    pub fn issuer(&self) -> DomainResult<String> {
        let mut segments = self.raw.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(DomainError::MalformedCredential(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let decoded = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| DomainError::MalformedCredential(format!("payload not base64url: {e}")))?;
        let claims: CredentialClaims = serde_json::from_slice(&decoded)
            .map_err(|e| DomainError::MalformedCredential(format!("payload not claims JSON: {e}")))?;

        if claims.iss.is_empty() {
            return Err(DomainError::MalformedCredential(
                "empty issuer claim".to_string(),
            ));
        }
        Ok(claims.iss)
    }

    /// The authoritative storage key the vendor SDK derives from the
    /// issuer claim.
    ///
    /// # Errors
    ///
    /// Propagates credential decode failures from [`Self::issuer`].
    pub fn authoritative_storage_key(&self) -> DomainResult<String> {
        let issuer = self.issuer()?;
        Ok(format!("music.{issuer}.media-user-token"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credential_for(issuer: &str) -> DeveloperCredential {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"iss":"{issuer}","iat":1}}"#));
        DeveloperCredential::new(format!("{header}.{payload}.sig"))
    }

    #[test]
    fn test_decodes_issuer_claim() {
        assert_eq!(credential_for("TEAM123").issuer().unwrap(), "TEAM123");
    }

    #[test]
    fn test_authoritative_key_embeds_issuer() {
        let key = credential_for("TEAM123").authoritative_storage_key().unwrap();
        assert_eq!(key, "music.TEAM123.media-user-token");
    }

    #[test]
    fn test_rejects_two_part_credential() {
        let err = DeveloperCredential::new("abc.def").issuer().unwrap_err();
        assert!(matches!(err, DomainError::MalformedCredential(_)));
    }

    #[test]
    fn test_rejects_non_base64_payload() {
        let err = DeveloperCredential::new("a.!!!.c").issuer().unwrap_err();
        assert!(matches!(err, DomainError::MalformedCredential(_)));
    }

    #[test]
    fn test_rejects_non_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode(b"not json");
        let err = DeveloperCredential::new(format!("a.{payload}.c"))
            .issuer()
            .unwrap_err();
        assert!(matches!(err, DomainError::MalformedCredential(_)));
    }

    #[test]
    fn test_variant_keys_are_distinct() {
        let mut keys = NAMING_VARIANT_KEYS.to_vec();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), NAMING_VARIANT_KEYS.len());
    }
}
