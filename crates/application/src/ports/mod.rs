//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the relay core and the shell it
//! runs in. Each port is a trait implemented by an adapter in the
//! infrastructure layer (or by a scripted double in tests). The surface
//! opener port is the injected replacement for overriding the global
//! popup-open primitive.

mod credential;
mod media_sdk;
mod relay;
mod surface;
mod token_storage;

pub use credential::{CredentialError, DeveloperCredentialSource};
pub use media_sdk::{MediaSdk, MediaSdkFactory, SdkError};
pub use relay::{TOKEN_EVENT, TokenRelay};
pub use surface::{
    AuthorizationSurface, AuthorizationSurfaceOpener, OpenedSurface, SurfaceError, SurfaceEvent,
};
pub use token_storage::{StorageError, TokenStorage};
