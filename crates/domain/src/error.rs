//! Domain error types

use thiserror::Error;

use crate::session::SessionState;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A captured value failed the token-shape heuristic.
    #[error("rejected token of length {length}: below minimum or placeholder")]
    TokenRejected {
        /// Observed length of the rejected value.
        length: usize,
    },

    /// A session was asked to make an illegal lifecycle transition.
    #[error("invalid session transition from {from:?} to {to:?}")]
    InvalidSessionTransition {
        /// State the session was in.
        from: SessionState,
        /// State the transition targeted.
        to: SessionState,
    },

    /// A session was asked to relay a second token.
    #[error("session already relayed a token")]
    AlreadyRelayed,

    /// The developer credential could not be decoded.
    #[error("malformed developer credential: {0}")]
    MalformedCredential(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
