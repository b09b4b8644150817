//! Cadenza Domain - Core relay types
//!
//! This crate defines the domain model for the Cadenza authorization
//! token relay. All types here are pure Rust with no I/O dependencies.

pub mod credential;
pub mod error;
pub mod handshake;
pub mod sentinel;
pub mod session;
pub mod state;
pub mod token;

pub use credential::{DeveloperCredential, NAMING_VARIANT_KEYS};
pub use error::{DomainError, DomainResult};
pub use handshake::{HandshakeMessage, info_response};
pub use sentinel::{
    CLOSE_TITLE_PREFIX, RELAY_SCHEME, TOKEN_TITLE_PREFIX, TitleSignal, close_title,
    parse_relay_uri, parse_title, relay_uri, token_title,
};
pub use session::{SessionId, SessionState, SurfaceSession, WindowId};
pub use state::{ReauthorizationPhase, SdkAuthorizationState};
pub use token::{AuthorizationToken, CaptureChannel, MIN_TOKEN_LENGTH, looks_like_token};
