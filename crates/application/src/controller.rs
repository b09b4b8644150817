//! Authorization surface controller.
//!
//! Host-process owner of the secondary surface's lifecycle: it opens the
//! surface through the injected opener port, re-installs the bridge
//! script on every completed navigation (the vendor flow redirects
//! through several pages and each navigation wipes the shim), listens on
//! every capture channel, and relays a captured token exactly once per
//! session before closing the surface.

use std::collections::HashMap;
use std::sync::Arc;

use cadenza_domain::{
    AuthorizationToken, CaptureChannel, DeveloperCredential, SessionId, SurfaceSession, TitleSignal,
    WindowId, parse_relay_uri, parse_title,
};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use url::Url;

use crate::bridge::{BridgeAction, OpenerEmulator, bridge_script};
use crate::error::ApplicationResult;
use crate::ports::{
    AuthorizationSurface, AuthorizationSurfaceOpener, DeveloperCredentialSource, SurfaceEvent,
    TokenRelay,
};

struct SessionHandle {
    id: SessionId,
    surface: Arc<dyn AuthorizationSurface>,
    task: JoinHandle<()>,
}

/// Owns every live authorization surface, at most one per application
/// window.
pub struct AuthorizationSurfaceController {
    opener: Arc<dyn AuthorizationSurfaceOpener>,
    relay: Arc<dyn TokenRelay>,
    credentials: Arc<dyn DeveloperCredentialSource>,
    sessions: Mutex<HashMap<WindowId, SessionHandle>>,
}

impl AuthorizationSurfaceController {
    /// Creates a controller over the given ports.
    #[must_use]
    pub fn new(
        opener: Arc<dyn AuthorizationSurfaceOpener>,
        relay: Arc<dyn TokenRelay>,
        credentials: Arc<dyn DeveloperCredentialSource>,
    ) -> Self {
        Self {
            opener,
            relay,
            credentials,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Opens an authorization surface for `owner` on `url`.
    ///
    /// If a session is already live for the same owner it is closed
    /// first: opening a new surface supersedes the old one.
    ///
    /// # Errors
    ///
    /// Returns a surface error if the adapter cannot create the surface.
    pub async fn open(&self, owner: WindowId, url: &Url) -> ApplicationResult<SessionId> {
        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.remove(&owner) {
            tracing::info!(session = %previous.id, "closing superseded authorization surface");
            previous.surface.close().await;
            previous.task.abort();
        }

        let credential = match self.credentials.developer_credential().await {
            Ok(credential) => Some(credential),
            Err(error) => {
                tracing::warn!(%error, "opening surface without a developer credential");
                None
            }
        };

        let opened = self.opener.open(owner, url).await?;
        let session = SurfaceSession::new(owner, url.clone());
        let id = session.id();
        tracing::info!(session = %id, %url, "authorization surface opened");

        let task = tokio::spawn(run_session(
            session,
            Arc::clone(&opened.surface),
            opened.events,
            Arc::clone(&self.relay),
            credential,
        ));
        sessions.insert(
            owner,
            SessionHandle {
                id,
                surface: opened.surface,
                task,
            },
        );
        Ok(id)
    }

    /// Whether a session is still live for `owner`.
    pub async fn has_live_session(&self, owner: WindowId) -> bool {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&owner)
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Closes the surface for `owner`, if any, without relaying.
    pub async fn close(&self, owner: WindowId) {
        let handle = self.sessions.lock().await.remove(&owner);
        if let Some(handle) = handle {
            handle.surface.close().await;
            let _ = handle.task.await;
        }
    }

    /// Waits for the session owned by `owner` to finish its event loop.
    pub async fn wait_closed(&self, owner: WindowId) {
        let handle = self.sessions.lock().await.remove(&owner);
        if let Some(handle) = handle {
            let _ = handle.task.await;
        }
    }

    /// Closes every live surface. Part of the explicit shutdown path.
    pub async fn dispose(&self) {
        let handles: Vec<SessionHandle> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, handle)| handle).collect()
        };
        for handle in handles {
            handle.surface.close().await;
            let _ = handle.task.await;
        }
    }
}

/// Drives one session's event loop until capture or close.
async fn run_session(
    mut session: SurfaceSession,
    surface: Arc<dyn AuthorizationSurface>,
    mut events: mpsc::Receiver<SurfaceEvent>,
    relay: Arc<dyn TokenRelay>,
    credential: Option<DeveloperCredential>,
) {
    let script = bridge_script(credential.as_ref().map(DeveloperCredential::raw));
    let mut emulator = OpenerEmulator::new(credential);

    while let Some(event) = events.recv().await {
        match event {
            SurfaceEvent::NavigationCompleted { url } => {
                session.navigation_completed();
                tracing::debug!(session = %session.id(), %url, "re-installing bridge script");
                if let Err(error) = surface.inject_script(&script).await {
                    tracing::warn!(session = %session.id(), %error, "bridge injection failed");
                }
            }
            SurfaceEvent::TitleChanged { title } => match parse_title(&title) {
                TitleSignal::Token(value) => {
                    if try_capture(&mut session, &relay, &value, CaptureChannel::TitleMutation) {
                        surface.close().await;
                        break;
                    }
                }
                TitleSignal::CloseRequested => {
                    tracing::info!(session = %session.id(), "surface closed without a token");
                    surface.close().await;
                    session.close();
                    break;
                }
                TitleSignal::Unrelated => {}
            },
            SurfaceEvent::NavigationRequested { uri } => {
                if let Some(value) = parse_relay_uri(&uri)
                    && try_capture(&mut session, &relay, &value, CaptureChannel::UriScheme)
                {
                    surface.close().await;
                    break;
                }
            }
            SurfaceEvent::MessagePosted { payload } => {
                match emulator.handle(&payload) {
                    BridgeAction::Capture { token, channel } => {
                        if try_capture(&mut session, &relay, &token, channel) {
                            surface.close().await;
                            break;
                        }
                    }
                    // The in-surface shim answers identity requests
                    // itself; the host-side emulator only mirrors it.
                    BridgeAction::Respond(_) | BridgeAction::Ignore => {}
                }
            }
            SurfaceEvent::Closed => {
                session.close();
                break;
            }
        }
    }
}

/// Validates and relays a captured value. Returns true when the session
/// relayed it; a false return leaves the session live (invalid value) or
/// already settled (duplicate capture).
fn try_capture(
    session: &mut SurfaceSession,
    relay: &Arc<dyn TokenRelay>,
    value: &str,
    channel: CaptureChannel,
) -> bool {
    let token = match AuthorizationToken::new(value, channel) {
        Ok(token) => token,
        Err(error) => {
            tracing::debug!(session = %session.id(), %error, "capture rejected");
            return false;
        }
    };
    if let Err(error) = session.mark_captured() {
        tracing::debug!(session = %session.id(), %error, "duplicate capture ignored");
        return false;
    }
    tracing::info!(
        session = %session.id(),
        channel = ?token.channel(),
        token = %token.preview(),
        "token captured, relaying"
    );
    relay.relay(token.value());
    true
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::{CredentialError, OpenedSurface, SurfaceError};
    use async_trait::async_trait;
    use cadenza_domain::{relay_uri, token_title};
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubSurface {
        injected: StdMutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl StubSurface {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                injected: StdMutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            })
        }

        fn injection_count(&self) -> usize {
            self.injected.lock().unwrap().len()
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthorizationSurface for StubSurface {
        async fn inject_script(&self, script: &str) -> Result<(), SurfaceError> {
            self.injected.lock().unwrap().push(script.to_string());
            Ok(())
        }

        async fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct StubOpener {
        opened: StdMutex<Vec<(Arc<StubSurface>, mpsc::Sender<SurfaceEvent>)>>,
    }

    impl StubOpener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                opened: StdMutex::new(Vec::new()),
            })
        }

        fn surface(&self, index: usize) -> Arc<StubSurface> {
            Arc::clone(&self.opened.lock().unwrap()[index].0)
        }

        fn sender(&self, index: usize) -> mpsc::Sender<SurfaceEvent> {
            self.opened.lock().unwrap()[index].1.clone()
        }

        fn open_count(&self) -> usize {
            self.opened.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AuthorizationSurfaceOpener for StubOpener {
        async fn open(&self, _owner: WindowId, _url: &Url) -> Result<OpenedSurface, SurfaceError> {
            let (tx, rx) = mpsc::channel(16);
            let surface = StubSurface::new();
            self.opened
                .lock()
                .unwrap()
                .push((Arc::clone(&surface), tx));
            Ok(OpenedSurface {
                surface,
                events: rx,
            })
        }
    }

    struct RecordingRelay {
        tokens: StdMutex<Vec<String>>,
    }

    impl RecordingRelay {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                tokens: StdMutex::new(Vec::new()),
            })
        }

        fn relayed(&self) -> Vec<String> {
            self.tokens.lock().unwrap().clone()
        }
    }

    impl TokenRelay for RecordingRelay {
        fn relay(&self, token: &str) {
            self.tokens.lock().unwrap().push(token.to_string());
        }
    }

    struct StubCredentials;

    #[async_trait]
    impl DeveloperCredentialSource for StubCredentials {
        async fn developer_credential(&self) -> Result<DeveloperCredential, CredentialError> {
            Ok(DeveloperCredential::new("h.p.s"))
        }
    }

    fn auth_url() -> Url {
        Url::parse("https://authorize.music.apple.com/woa").unwrap()
    }

    fn token64() -> String {
        "k".repeat(64)
    }

    struct Fixture {
        controller: AuthorizationSurfaceController,
        opener: Arc<StubOpener>,
        relay: Arc<RecordingRelay>,
    }

    fn fixture() -> Fixture {
        let opener = StubOpener::new();
        let relay = RecordingRelay::new();
        let controller = AuthorizationSurfaceController::new(
            Arc::clone(&opener) as Arc<dyn AuthorizationSurfaceOpener>,
            Arc::clone(&relay) as Arc<dyn TokenRelay>,
            Arc::new(StubCredentials),
        );
        Fixture {
            controller,
            opener,
            relay,
        }
    }

    #[tokio::test]
    async fn test_opening_second_surface_closes_first() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        f.controller.open(owner, &auth_url()).await.unwrap();

        assert_eq!(f.opener.open_count(), 2);
        assert!(f.opener.surface(0).is_closed());
        assert!(!f.opener.surface(1).is_closed());
    }

    #[tokio::test]
    async fn test_bridge_reinjected_on_every_navigation() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        for url in ["https://a.example/one", "https://a.example/two"] {
            tx.send(SurfaceEvent::NavigationCompleted {
                url: url.to_string(),
            })
            .await
            .unwrap();
        }
        tx.send(SurfaceEvent::Closed).await.unwrap();
        f.controller.wait_closed(owner).await;

        assert_eq!(f.opener.surface(0).injection_count(), 2);
        assert!(f.relay.relayed().is_empty());
    }

    #[tokio::test]
    async fn test_title_capture_relays_once_and_closes() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        tx.send(SurfaceEvent::TitleChanged {
            title: token_title(&token64()),
        })
        .await
        .unwrap();
        f.controller.wait_closed(owner).await;

        assert_eq!(f.relay.relayed(), vec![token64()]);
        assert!(f.opener.surface(0).is_closed());
    }

    #[tokio::test]
    async fn test_uri_capture_decodes_token() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        tx.send(SurfaceEvent::NavigationRequested {
            uri: relay_uri(&token64()),
        })
        .await
        .unwrap();
        f.controller.wait_closed(owner).await;

        assert_eq!(f.relay.relayed(), vec![token64()]);
    }

    #[tokio::test]
    async fn test_handshake_capture_through_posted_message() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        tx.send(SurfaceEvent::MessagePosted {
            payload: serde_json::json!({ "method": "authorize", "params": [token64()] }),
        })
        .await
        .unwrap();
        f.controller.wait_closed(owner).await;

        assert_eq!(f.relay.relayed(), vec![token64()]);
    }

    #[tokio::test]
    async fn test_short_title_token_is_rejected() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        tx.send(SurfaceEvent::TitleChanged {
            title: token_title("short"),
        })
        .await
        .unwrap();
        tx.send(SurfaceEvent::Closed).await.unwrap();
        f.controller.wait_closed(owner).await;

        assert!(f.relay.relayed().is_empty());
    }

    #[tokio::test]
    async fn test_close_sentinel_closes_without_relay() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        tx.send(SurfaceEvent::TitleChanged {
            title: cadenza_domain::close_title(),
        })
        .await
        .unwrap();
        f.controller.wait_closed(owner).await;

        assert!(f.relay.relayed().is_empty());
        assert!(f.opener.surface(0).is_closed());
    }

    #[tokio::test]
    async fn test_racing_channels_relay_only_once() {
        let f = fixture();
        let owner = WindowId(1);
        f.controller.open(owner, &auth_url()).await.unwrap();
        let tx = f.opener.sender(0);

        tx.send(SurfaceEvent::TitleChanged {
            title: token_title(&token64()),
        })
        .await
        .unwrap();
        // The second channel firing for the same session is ignored by
        // the session-settled check even if it squeezes in.
        let _ = tx
            .send(SurfaceEvent::NavigationRequested {
                uri: relay_uri(&"other".repeat(13)),
            })
            .await;
        f.controller.wait_closed(owner).await;

        assert_eq!(f.relay.relayed(), vec![token64()]);
    }
}
