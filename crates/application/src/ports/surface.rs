//! Authorization surface ports.
//!
//! The surface is the sandboxed secondary window that hosts the vendor's
//! sign-in flow in place of a browser popup. The controller never talks
//! to a concrete windowing layer; it depends on these traits and on the
//! event stream the opener returns.

use std::sync::Arc;

use async_trait::async_trait;
use cadenza_domain::WindowId;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Errors raised by a surface adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// The surface could not be created or the URL failed to load.
    #[error("failed to open authorization surface: {0}")]
    OpenFailed(String),

    /// The bridge script could not be injected.
    #[error("failed to inject bridge script: {0}")]
    InjectionFailed(String),
}

/// Events a live surface reports to its controller.
///
/// `NavigationRequested` is only emitted for navigations the adapter has
/// already suppressed (the private relay scheme is never resolvable);
/// the controller's job is to decode it, not to cancel it.
#[derive(Debug, Clone)]
pub enum SurfaceEvent {
    /// A navigation inside the surface finished loading.
    NavigationCompleted {
        /// URL that finished loading.
        url: String,
    },
    /// The surface's document title changed.
    TitleChanged {
        /// The new title.
        title: String,
    },
    /// The surface attempted a navigation the adapter intercepted.
    NavigationRequested {
        /// The target URI of the suppressed navigation.
        uri: String,
    },
    /// A script inside the surface posted a message the adapter can
    /// observe directly.
    MessagePosted {
        /// The raw message payload.
        payload: serde_json::Value,
    },
    /// The surface was closed (by the user or programmatically).
    Closed,
}

/// A live authorization surface.
#[async_trait]
pub trait AuthorizationSurface: Send + Sync {
    /// Evaluates a script in the surface's document context.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::InjectionFailed`] if the script cannot be
    /// evaluated.
    async fn inject_script(&self, script: &str) -> Result<(), SurfaceError>;

    /// Closes the surface. Idempotent; a `Closed` event follows.
    async fn close(&self);
}

/// A freshly-opened surface and its event stream.
pub struct OpenedSurface {
    /// Handle for injecting scripts and closing.
    pub surface: Arc<dyn AuthorizationSurface>,
    /// Event stream; ends when the surface is gone.
    pub events: mpsc::Receiver<SurfaceEvent>,
}

/// Capability to open a sandboxed authorization surface.
///
/// This is the injected seam that replaces monkey-patching the global
/// popup-open primitive: production routes here, tests substitute a
/// scripted double.
#[async_trait]
pub trait AuthorizationSurfaceOpener: Send + Sync {
    /// Opens a surface for `owner` and starts loading `url`.
    ///
    /// # Errors
    ///
    /// Returns [`SurfaceError::OpenFailed`] if the surface cannot be
    /// created.
    async fn open(&self, owner: WindowId, url: &Url) -> Result<OpenedSurface, SurfaceError>;
}
