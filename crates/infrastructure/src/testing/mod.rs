//! Scripted doubles for exercising the relay flow.
//!
//! These stand in for the real webview surface and the vendor SDK in
//! integration tests: the surface double replays scripted events, the
//! SDK double accepts or ignores direct injection, and its factory reads
//! the authoritative storage key at construction time the way the real
//! SDK's persistence layer does.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use cadenza_application::ports::{
    AuthorizationSurface, AuthorizationSurfaceOpener, MediaSdk, MediaSdkFactory, OpenedSurface,
    SdkError, StorageError, SurfaceError, SurfaceEvent, TokenStorage,
};
use cadenza_domain::WindowId;
use tokio::sync::{mpsc, watch};
use url::Url;

/// In-memory token storage.
#[derive(Default)]
pub struct MemoryTokenStorage {
    entries: StdMutex<HashMap<String, String>>,
}

impl MemoryTokenStorage {
    /// Creates an empty storage.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Synchronous read for assertions.
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl TokenStorage for MemoryTokenStorage {
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value_of(key))
    }
}

/// Surface double: records injected scripts, replays scripted events.
pub struct SimulatedSurface {
    injected: StdMutex<Vec<String>>,
    closed: AtomicBool,
    events: mpsc::Sender<SurfaceEvent>,
}

impl SimulatedSurface {
    /// Number of bridge-script injections so far.
    #[must_use]
    pub fn injection_count(&self) -> usize {
        self.injected
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// Whether the surface was closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Delivers a scripted event to the controller.
    pub async fn emit(&self, event: SurfaceEvent) {
        let _ = self.events.send(event).await;
    }
}

#[async_trait]
impl AuthorizationSurface for SimulatedSurface {
    async fn inject_script(&self, script: &str) -> Result<(), SurfaceError> {
        self.injected
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(script.to_string());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let _ = self.events.send(SurfaceEvent::Closed).await;
    }
}

/// Opener double: hands out simulated surfaces and keeps them reachable
/// for scripting and assertions.
#[derive(Default)]
pub struct SimulatedOpener {
    surfaces: StdMutex<Vec<Arc<SimulatedSurface>>>,
}

impl SimulatedOpener {
    /// Creates an opener with no surfaces yet.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// How many surfaces were opened.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.surfaces
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    /// The `index`-th opened surface.
    ///
    /// # Panics
    ///
    /// Panics if no surface with that index was opened.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn surface(&self, index: usize) -> Arc<SimulatedSurface> {
        Arc::clone(
            &self
                .surfaces
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)[index],
        )
    }
}

#[async_trait]
impl AuthorizationSurfaceOpener for SimulatedOpener {
    async fn open(&self, _owner: WindowId, _url: &Url) -> Result<OpenedSurface, SurfaceError> {
        let (tx, rx) = mpsc::channel(32);
        let surface = Arc::new(SimulatedSurface {
            injected: StdMutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            events: tx,
        });
        self.surfaces
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Arc::clone(&surface));
        Ok(OpenedSurface {
            surface,
            events: rx,
        })
    }
}

/// SDK double with scriptable injection and authorize behavior.
pub struct SimulatedMediaSdk {
    authorized: watch::Sender<bool>,
    accept_injection: bool,
    authorize_error: Option<SdkError>,
    injections: StdMutex<Vec<String>>,
}

impl SimulatedMediaSdk {
    /// Tokens passed through direct injection.
    #[must_use]
    pub fn injections(&self) -> Vec<String> {
        self.injections
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Flips the authorization flag, firing the change event.
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.send_replace(authorized);
    }
}

#[async_trait]
impl MediaSdk for SimulatedMediaSdk {
    async fn is_authorized(&self) -> bool {
        *self.authorized.borrow()
    }

    async fn authorize(&self) -> Result<(), SdkError> {
        self.authorize_error.clone().map_or(Ok(()), Err)
    }

    async fn unauthorize(&self) -> Result<(), SdkError> {
        self.authorized.send_replace(false);
        Ok(())
    }

    async fn inject_user_token(&self, token: &str) -> Result<(), SdkError> {
        self.injections
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(token.to_string());
        if self.accept_injection {
            self.authorized.send_replace(true);
        }
        Ok(())
    }

    async fn storefront(&self) -> Result<Option<String>, SdkError> {
        Ok(self.is_authorized().await.then(|| "us".to_string()))
    }

    fn authorization_changes(&self) -> watch::Receiver<bool> {
        self.authorized.subscribe()
    }
}

/// Factory double whose instances read the authoritative storage key at
/// construction, mirroring the real SDK's lazy persistence read.
pub struct SimulatedSdkFactory {
    storage: Arc<dyn TokenStorage>,
    authoritative_key: String,
    accept_injection: bool,
    authorize_error: Option<SdkError>,
    configures: AtomicUsize,
    instances: StdMutex<Vec<Arc<SimulatedMediaSdk>>>,
}

impl SimulatedSdkFactory {
    /// Creates a factory reading `authoritative_key` from `storage`.
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>, authoritative_key: impl Into<String>) -> Self {
        Self {
            storage,
            authoritative_key: authoritative_key.into(),
            accept_injection: true,
            authorize_error: None,
            configures: AtomicUsize::new(0),
            instances: StdMutex::new(Vec::new()),
        }
    }

    /// Whether instances accept direct injection.
    #[must_use]
    pub const fn with_accept_injection(mut self, accept: bool) -> Self {
        self.accept_injection = accept;
        self
    }

    /// Makes every instance's `authorize()` throw.
    #[must_use]
    pub fn with_authorize_error(mut self, message: impl Into<String>) -> Self {
        self.authorize_error = Some(SdkError::AuthorizeFailed(message.into()));
        self
    }

    /// How many instances were configured (initial included).
    #[must_use]
    pub fn configure_count(&self) -> usize {
        self.configures.load(Ordering::SeqCst)
    }

    /// The most recently configured instance.
    #[must_use]
    pub fn latest_instance(&self) -> Option<Arc<SimulatedMediaSdk>> {
        self.instances
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .last()
            .map(Arc::clone)
    }
}

#[async_trait]
impl MediaSdkFactory for SimulatedSdkFactory {
    async fn configure(&self) -> Result<Arc<dyn MediaSdk>, SdkError> {
        let prior = self.configures.fetch_add(1, Ordering::SeqCst);
        let resumed = prior > 0
            && self
                .storage
                .get(&self.authoritative_key)
                .await
                .ok()
                .flatten()
                .is_some();
        let (authorized, _) = watch::channel(resumed);
        let sdk = Arc::new(SimulatedMediaSdk {
            authorized,
            accept_injection: self.accept_injection,
            authorize_error: self.authorize_error.clone(),
            injections: StdMutex::new(Vec::new()),
        });
        self.instances
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(Arc::clone(&sdk));
        Ok(sdk)
    }
}
