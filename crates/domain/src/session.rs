//! Authorization surface session lifecycle.
//!
//! One [`SurfaceSession`] tracks one live secondary surface opened in
//! place of the browser popup the vendor SDK expects. The lifecycle
//! enforces the single-relay invariant: a session that has captured and
//! relayed a token, or that was closed, never relays again.

use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Identifier of an application window that owns a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u64);

/// Identifier of a single surface session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new sortable session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Lifecycle state of an authorization surface session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    /// Surface is being created and the authorization URL is loading.
    Opening,
    /// First navigation completed; bridge script installed.
    Loaded,
    /// User is signing in; waiting for a capture on any channel.
    AwaitingToken,
    /// A token was captured and relayed.
    Captured,
    /// Surface was closed (with or without a capture).
    Closed,
}

impl SessionState {
    /// Returns true while the session can still produce a capture.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Opening | Self::Loaded | Self::AwaitingToken)
    }
}

/// One live authorization surface.
#[derive(Debug, Clone)]
pub struct SurfaceSession {
    id: SessionId,
    owner: WindowId,
    url: Url,
    state: SessionState,
    relayed: bool,
}

impl SurfaceSession {
    /// Creates a session in the `Opening` state.
    #[must_use]
    pub fn new(owner: WindowId, url: Url) -> Self {
        Self {
            id: SessionId::generate(),
            owner,
            url,
            state: SessionState::Opening,
            relayed: false,
        }
    }

    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Owning application window.
    #[must_use]
    pub const fn owner(&self) -> WindowId {
        self.owner
    }

    /// Authorization URL the surface was opened on.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a token has already been relayed from this session.
    #[must_use]
    pub const fn relayed(&self) -> bool {
        self.relayed
    }

    /// Returns true while the session can still produce a capture.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        self.state.is_live()
    }

    /// Marks a navigation as completed.
    ///
    /// Subsequent navigations inside the vendor flow keep the session in
    /// `AwaitingToken`; only the first load moves `Opening → Loaded`.
    pub fn navigation_completed(&mut self) {
        if self.state == SessionState::Opening {
            self.state = SessionState::Loaded;
        } else if self.state == SessionState::Loaded {
            self.state = SessionState::AwaitingToken;
        }
    }

    /// Marks the session as awaiting a token capture.
    pub fn awaiting_token(&mut self) {
        if self.state.is_live() {
            self.state = SessionState::AwaitingToken;
        }
    }

    /// Records a successful capture-and-relay.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::AlreadyRelayed`] if a token was already
    /// relayed, or [`DomainError::InvalidSessionTransition`] if the
    /// session is no longer live.
    pub fn mark_captured(&mut self) -> DomainResult<()> {
        if self.relayed {
            return Err(DomainError::AlreadyRelayed);
        }
        if !self.state.is_live() {
            return Err(DomainError::InvalidSessionTransition {
                from: self.state,
                to: SessionState::Captured,
            });
        }
        self.state = SessionState::Captured;
        self.relayed = true;
        Ok(())
    }

    /// Marks the surface as closed. Idempotent.
    pub fn close(&mut self) {
        if self.state != SessionState::Captured {
            self.state = SessionState::Closed;
        }
    }
}
