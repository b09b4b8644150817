//! Application error types

use thiserror::Error;

use cadenza_domain::DomainError;

use crate::ports::{CredentialError, SdkError, StorageError, SurfaceError};

/// Application-level errors.
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// A domain validation error occurred.
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),

    /// A surface operation failed.
    #[error("surface error: {0}")]
    Surface(#[from] SurfaceError),

    /// A vendor SDK operation failed.
    #[error("SDK error: {0}")]
    Sdk(#[from] SdkError),

    /// The developer credential could not be fetched.
    #[error("credential error: {0}")]
    Credential(#[from] CredentialError),

    /// A storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// An interactive sign-in exhausted its poll budget without the SDK
    /// becoming authorized.
    #[error("authorization failed: {message}")]
    AuthorizationFailed {
        /// Generic condition for the UI; vendor diagnostics are logged.
        message: String,
    },

    /// A newer sign-in attempt superseded this one.
    #[error("sign-in superseded by a newer attempt")]
    Superseded,
}

/// Result type alias for application operations.
pub type ApplicationResult<T> = Result<T, ApplicationError>;
