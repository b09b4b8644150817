//! SDK authorization state types for UI binding.
//!
//! [`SdkAuthorizationState`] is the host-side mirror of the vendor SDK's
//! authorization flag plus auxiliary identity fields. It is mutated only
//! by the reauthorization state machine, never directly by UI code.

use serde::{Deserialize, Serialize};

/// Phase of the escalating token-ingestion strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ReauthorizationPhase {
    /// No token has been ingested since startup or sign-out.
    #[default]
    Unauthenticated,
    /// A relayed token passed validation and storage fan-out is underway.
    TokenReceived,
    /// The token was set directly on the live SDK instance; waiting for
    /// the settle interval to elapse.
    DirectInjectionAttempted,
    /// Direct injection did not change the SDK's state; a fresh instance
    /// is about to be constructed.
    ReconfigurePending,
    /// A fresh SDK instance was constructed and is being checked.
    ReconfigureAttempted,
    /// The SDK recognizes the token.
    Authorized,
    /// Both strategies failed for this token; a new sign-in starts over.
    Failed,
}

impl ReauthorizationPhase {
    /// Returns true for the two end states.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Authorized | Self::Failed)
    }
}

/// Host-side mirror of the vendor SDK's authorization state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SdkAuthorizationState {
    /// Mirror of the SDK's `isAuthorized` flag.
    pub authorized: bool,
    /// Active region/storefront identifier, fetched after authorization.
    pub storefront: Option<String>,
    /// Where the current ingestion attempt stands.
    pub phase: ReauthorizationPhase,
}

impl SdkAuthorizationState {
    /// State after a successful authorization.
    #[must_use]
    pub const fn authorized(storefront: Option<String>) -> Self {
        Self {
            authorized: true,
            storefront,
            phase: ReauthorizationPhase::Authorized,
        }
    }

    /// State for an in-flight phase, keeping identity fields cleared.
    #[must_use]
    pub const fn in_phase(phase: ReauthorizationPhase) -> Self {
        Self {
            authorized: false,
            storefront: None,
            phase,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_is_unauthenticated() {
        let state = SdkAuthorizationState::default();
        assert!(!state.authorized);
        assert_eq!(state.phase, ReauthorizationPhase::Unauthenticated);
    }

    #[test]
    fn test_terminal_phases() {
        assert!(ReauthorizationPhase::Authorized.is_terminal());
        assert!(ReauthorizationPhase::Failed.is_terminal());
        assert!(!ReauthorizationPhase::ReconfigurePending.is_terminal());
    }

    #[test]
    fn test_authorized_state_carries_storefront() {
        let state = SdkAuthorizationState::authorized(Some("us".to_string()));
        assert!(state.authorized);
        assert_eq!(state.storefront.as_deref(), Some("us"));
    }
}
