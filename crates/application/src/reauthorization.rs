//! SDK reauthorization state machine.
//!
//! Makes the already-running vendor SDK instance recognize a relayed
//! token with an escalating strategy: storage fan-out, direct injection,
//! then the reconfigure fallback (discard the live instance and build a
//! fresh one so its persistence layer re-reads storage at construction
//! time). Whatever strategy succeeds, the rest of the application
//! observes one stable `isAuthorized` signal through a watch channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cadenza_domain::credential::NAMING_VARIANT_KEYS;
use cadenza_domain::{DomainError, ReauthorizationPhase, SdkAuthorizationState, looks_like_token};
use tokio::sync::{RwLock, watch};

use crate::error::{ApplicationError, ApplicationResult};
use crate::ports::{DeveloperCredentialSource, MediaSdk, MediaSdkFactory, TokenStorage};
use crate::settings::RelaySettings;

/// How an ingestion attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReauthorizationOutcome {
    /// Direct injection was enough.
    AuthorizedDirectly,
    /// Direct injection did not take; the reconfigure fallback did.
    AuthorizedAfterReconfigure,
    /// Both strategies failed; a new sign-in starts the flow over.
    Failed,
}

/// Owns the live SDK instance reference and the authorization mirror.
pub struct SdkReauthorization {
    sdk: RwLock<Arc<dyn MediaSdk>>,
    factory: Arc<dyn MediaSdkFactory>,
    storage: Arc<dyn TokenStorage>,
    credentials: Arc<dyn DeveloperCredentialSource>,
    settings: RelaySettings,
    state: watch::Sender<SdkAuthorizationState>,
    sign_in_generation: AtomicU64,
}

impl SdkReauthorization {
    /// Configures the initial SDK instance and starts mirroring its
    /// change events.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial SDK configuration fails.
    pub async fn init(
        factory: Arc<dyn MediaSdkFactory>,
        storage: Arc<dyn TokenStorage>,
        credentials: Arc<dyn DeveloperCredentialSource>,
        settings: RelaySettings,
    ) -> ApplicationResult<Arc<Self>> {
        let sdk = factory.configure().await?;
        let (state, _) = watch::channel(SdkAuthorizationState::default());
        let machine = Arc::new(Self {
            sdk: RwLock::new(Arc::clone(&sdk)),
            factory,
            storage,
            credentials,
            settings,
            state,
            sign_in_generation: AtomicU64::new(0),
        });
        machine.spawn_change_watcher(&sdk);
        // Stored-token resume: a fresh instance may come up authorized.
        if sdk.is_authorized().await {
            machine.finish_authorized(&sdk).await;
        }
        Ok(machine)
    }

    /// Subscribes to the authorization mirror.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SdkAuthorizationState> {
        self.state.subscribe()
    }

    /// Current snapshot of the authorization mirror.
    #[must_use]
    pub fn current_state(&self) -> SdkAuthorizationState {
        self.state.borrow().clone()
    }

    /// Ingests a relayed token with the escalating strategy.
    ///
    /// # Errors
    ///
    /// Returns a domain error, with no state change, when the token
    /// fails the shape heuristic. Strategy failures are not errors: they
    /// settle the machine in `Failed` and report
    /// [`ReauthorizationOutcome::Failed`].
    pub async fn ingest_token(
        self: &Arc<Self>,
        raw: &str,
    ) -> ApplicationResult<ReauthorizationOutcome> {
        if !looks_like_token(raw) {
            return Err(ApplicationError::Domain(DomainError::TokenRejected {
                length: raw.len(),
            }));
        }

        tracing::info!(length = raw.len(), "ingesting relayed token");
        self.set_phase(ReauthorizationPhase::TokenReceived);
        // Every key variant must be on disk before any reconfiguration:
        // the fresh instance reads storage once, at construction.
        self.fan_out_storage(raw).await;

        self.set_phase(ReauthorizationPhase::DirectInjectionAttempted);
        let sdk = self.current_sdk().await;
        if let Err(error) = sdk.inject_user_token(raw).await {
            tracing::warn!(%error, "direct token injection failed");
        }
        tokio::time::sleep(self.settings.settle_interval).await;
        if sdk.is_authorized().await {
            tracing::info!("direct injection authorized the SDK");
            self.finish_authorized(&sdk).await;
            return Ok(ReauthorizationOutcome::AuthorizedDirectly);
        }

        tracing::info!("direct injection did not take, reconfiguring the SDK");
        self.set_phase(ReauthorizationPhase::ReconfigurePending);
        let fresh = match self.factory.configure().await {
            Ok(fresh) => fresh,
            Err(error) => {
                tracing::warn!(%error, "SDK reconfiguration failed");
                self.set_phase(ReauthorizationPhase::Failed);
                return Ok(ReauthorizationOutcome::Failed);
            }
        };
        *self.sdk.write().await = Arc::clone(&fresh);
        self.spawn_change_watcher(&fresh);
        self.set_phase(ReauthorizationPhase::ReconfigureAttempted);

        // Check immediately, then give the change event one settle
        // interval; the long-lived watcher still catches late flips.
        let mut changes = fresh.authorization_changes();
        if !fresh.is_authorized().await {
            let _ = tokio::time::timeout(self.settings.settle_interval, changes.changed()).await;
        }
        if fresh.is_authorized().await {
            self.finish_authorized(&fresh).await;
            return Ok(ReauthorizationOutcome::AuthorizedAfterReconfigure);
        }

        self.set_phase(ReauthorizationPhase::Failed);
        Ok(ReauthorizationOutcome::Failed)
    }

    /// The interactive sign-in path.
    ///
    /// Awaits the SDK's own `authorize()`, treating a throw as
    /// non-terminal (the token may still arrive through the relay), then
    /// polls `isAuthorized` on a fixed budget. A newer sign-in attempt
    /// supersedes this one between polls.
    ///
    /// # Errors
    ///
    /// [`ApplicationError::AuthorizationFailed`] once the poll budget is
    /// exhausted, or [`ApplicationError::Superseded`] when a newer
    /// attempt took over.
    pub async fn sign_in(&self) -> ApplicationResult<()> {
        let generation = self.sign_in_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let sdk = self.current_sdk().await;
        match sdk.authorize().await {
            Ok(()) => {
                if sdk.is_authorized().await {
                    self.finish_authorized(&sdk).await;
                    return Ok(());
                }
            }
            Err(error) => {
                // The SDK believes its popup was blocked; the relay may
                // still deliver the token, so keep polling.
                tracing::warn!(%error, "authorize call threw, waiting on the relay");
            }
        }

        for attempt in 1..=self.settings.poll_budget {
            tokio::time::sleep(self.settings.poll_interval).await;
            if self.sign_in_generation.load(Ordering::SeqCst) != generation {
                return Err(ApplicationError::Superseded);
            }
            // Re-read the instance: a reconfigure may have swapped it.
            let sdk = self.current_sdk().await;
            if sdk.is_authorized().await {
                tracing::info!(attempt, "interactive sign-in authorized");
                self.finish_authorized(&sdk).await;
                return Ok(());
            }
        }

        Err(ApplicationError::AuthorizationFailed {
            message: "sign-in timed out waiting for authorization".to_string(),
        })
    }

    /// Signs out: the SDK's own unauthorize plus clearing the derived
    /// identity fields. Storage keys are left in place; the next sign-in
    /// overwrites them.
    ///
    /// # Errors
    ///
    /// Propagates a vendor-thrown unauthorize error after the local
    /// mirror is already cleared.
    pub async fn sign_out(&self) -> ApplicationResult<()> {
        self.state.send_replace(SdkAuthorizationState::default());
        let sdk = self.current_sdk().await;
        sdk.unauthorize().await?;
        Ok(())
    }

    async fn current_sdk(&self) -> Arc<dyn MediaSdk> {
        Arc::clone(&*self.sdk.read().await)
    }

    /// Writes the token under every key the SDK might read from. The
    /// authoritative issuer-derived key is written last; a credential
    /// decode failure degrades to the best-effort variants only.
    async fn fan_out_storage(&self, token: &str) {
        for key in NAMING_VARIANT_KEYS {
            if let Err(error) = self.storage.put(key, token).await {
                tracing::warn!(key, %error, "variant storage write failed");
            }
        }

        let authoritative = match self.credentials.developer_credential().await {
            Ok(credential) => credential.authoritative_storage_key(),
            Err(error) => {
                tracing::warn!(%error, "no developer credential, skipping authoritative key");
                return;
            }
        };
        match authoritative {
            Ok(key) => {
                if let Err(error) = self.storage.put(&key, token).await {
                    tracing::warn!(key, %error, "authoritative storage write failed");
                }
            }
            Err(error) => {
                tracing::warn!(%error, "credential decode failed, variant keys only");
            }
        }
    }

    async fn finish_authorized(&self, sdk: &Arc<dyn MediaSdk>) {
        let storefront = match sdk.storefront().await {
            Ok(storefront) => storefront,
            Err(error) => {
                tracing::warn!(%error, "storefront lookup failed");
                None
            }
        };
        // send_replace stores the snapshot even with no subscriber; a
        // late subscriber must still see the authorized state.
        self.state
            .send_replace(SdkAuthorizationState::authorized(storefront));
    }

    fn set_phase(&self, phase: ReauthorizationPhase) {
        self.state.send_modify(|state| state.phase = phase);
    }

    /// Mirrors `authorizationStatusDidChange` from one SDK instance for
    /// as long as that instance is the live one.
    fn spawn_change_watcher(self: &Arc<Self>, sdk: &Arc<dyn MediaSdk>) {
        let mut changes = sdk.authorization_changes();
        let weak = Arc::downgrade(self);
        let sdk = Arc::clone(sdk);
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                let authorized = *changes.borrow();
                let Some(machine) = weak.upgrade() else {
                    break;
                };
                if !Arc::ptr_eq(&sdk, &*machine.sdk.read().await) {
                    break;
                }
                if authorized {
                    machine.finish_authorized(&sdk).await;
                } else {
                    machine.state.send_modify(|state| state.authorized = false);
                }
            }
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ports::{CredentialError, SdkError, StorageError};
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use cadenza_domain::DeveloperCredential;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn token64() -> String {
        "m".repeat(64)
    }

    fn fast_settings() -> RelaySettings {
        RelaySettings::default().with_settle_interval(Duration::from_millis(10))
    }

    struct MemoryStorage {
        entries: StdMutex<HashMap<String, String>>,
    }

    impl MemoryStorage {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entries: StdMutex::new(HashMap::new()),
            })
        }

        fn get_sync(&self, key: &str) -> Option<String> {
            self.entries.lock().unwrap().get(key).cloned()
        }
    }

    #[async_trait]
    impl TokenStorage for MemoryStorage {
        async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.entries
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.get_sync(key))
        }
    }

    struct TeamCredentials;

    #[async_trait]
    impl DeveloperCredentialSource for TeamCredentials {
        async fn developer_credential(&self) -> Result<DeveloperCredential, CredentialError> {
            let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256"}"#);
            let payload = URL_SAFE_NO_PAD.encode(br#"{"iss":"TEAM123"}"#);
            Ok(DeveloperCredential::new(format!("{header}.{payload}.sig")))
        }
    }

    struct BrokenCredentials;

    #[async_trait]
    impl DeveloperCredentialSource for BrokenCredentials {
        async fn developer_credential(&self) -> Result<DeveloperCredential, CredentialError> {
            Ok(DeveloperCredential::new("not-a-jwt"))
        }
    }

    /// Scripted SDK instance: accepts or ignores direct injection.
    struct ScriptedSdk {
        authorized: watch::Sender<bool>,
        accept_injection: bool,
        authorize_error: Option<SdkError>,
    }

    impl ScriptedSdk {
        fn new(initially_authorized: bool, accept_injection: bool) -> Arc<Self> {
            let (authorized, _) = watch::channel(initially_authorized);
            Arc::new(Self {
                authorized,
                accept_injection,
                authorize_error: Some(SdkError::AuthorizeFailed("popup blocked".to_string())),
            })
        }
    }

    #[async_trait]
    impl MediaSdk for ScriptedSdk {
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

        async fn inject_user_token(&self, _token: &str) -> Result<(), SdkError> {
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

    /// Factory whose instances read the authoritative key at
    /// construction time, like the real SDK's persistence layer.
    struct ScriptedFactory {
        storage: Arc<MemoryStorage>,
        authoritative_key: String,
        accept_injection: bool,
        resume_from_storage: bool,
        configures: AtomicUsize,
    }

    impl ScriptedFactory {
        fn new(storage: Arc<MemoryStorage>, accept_injection: bool) -> Arc<Self> {
            Arc::new(Self {
                storage,
                authoritative_key: "music.TEAM123.media-user-token".to_string(),
                accept_injection,
                resume_from_storage: true,
                configures: AtomicUsize::new(0),
            })
        }

        /// A factory whose persistence layer never finds the token, so
        /// reconfigured instances also come up unauthenticated.
        fn never_resuming(storage: Arc<MemoryStorage>) -> Arc<Self> {
            Arc::new(Self {
                storage,
                authoritative_key: "music.TEAM123.media-user-token".to_string(),
                accept_injection: false,
                resume_from_storage: false,
                configures: AtomicUsize::new(0),
            })
        }

        fn configure_count(&self) -> usize {
            self.configures.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl MediaSdkFactory for ScriptedFactory {
        async fn configure(&self) -> Result<Arc<dyn MediaSdk>, SdkError> {
            let count = self.configures.fetch_add(1, Ordering::SeqCst);
            // The initial instance comes up unauthenticated; later ones
            // pick up whatever the fan-out wrote.
            let resumed = self.resume_from_storage
                && count > 0
                && self.storage.get_sync(&self.authoritative_key).is_some();
            Ok(ScriptedSdk::new(resumed, self.accept_injection))
        }
    }

    async fn machine_with(
        factory: Arc<ScriptedFactory>,
        storage: Arc<MemoryStorage>,
    ) -> Arc<SdkReauthorization> {
        SdkReauthorization::init(
            factory,
            storage,
            Arc::new(TeamCredentials),
            fast_settings(),
        )
        .await
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_short_token_with_no_state_change() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = machine_with(factory, Arc::clone(&storage)).await;

        let error = machine.ingest_token("tiny").await.unwrap_err();
        assert!(matches!(error, ApplicationError::Domain(_)));
        assert_eq!(
            machine.current_state().phase,
            ReauthorizationPhase::Unauthenticated
        );
        assert!(storage.get_sync("music.TEAM123.media-user-token").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_storage_fan_out_covers_variants_and_authoritative_key() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = machine_with(factory, Arc::clone(&storage)).await;

        machine.ingest_token(&token64()).await.unwrap();

        for key in NAMING_VARIANT_KEYS {
            assert_eq!(storage.get_sync(key), Some(token64()), "missing {key}");
        }
        assert_eq!(
            storage.get_sync("music.TEAM123.media-user-token"),
            Some(token64())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_credential_decode_failure_degrades_to_variants() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = SdkReauthorization::init(
            factory,
            Arc::clone(&storage) as Arc<dyn TokenStorage>,
            Arc::new(BrokenCredentials),
            fast_settings(),
        )
        .await
        .unwrap();

        machine.ingest_token(&token64()).await.unwrap();

        for key in NAMING_VARIANT_KEYS {
            assert_eq!(storage.get_sync(key), Some(token64()));
        }
        assert!(storage.get_sync("music.TEAM123.media-user-token").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_injection_success_skips_reconfigure() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = machine_with(Arc::clone(&factory), storage).await;

        let outcome = machine.ingest_token(&token64()).await.unwrap();

        assert_eq!(outcome, ReauthorizationOutcome::AuthorizedDirectly);
        assert_eq!(factory.configure_count(), 1, "initial configure only");
        let state = machine.current_state();
        assert!(state.authorized);
        assert_eq!(state.storefront.as_deref(), Some("us"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mirror_stores_authorized_with_no_subscriber_attached() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = machine_with(factory, storage).await;

        // No subscribe() call anywhere: the snapshot itself must flip.
        let outcome = machine.ingest_token(&token64()).await.unwrap();
        assert_eq!(outcome, ReauthorizationOutcome::AuthorizedDirectly);
        assert!(machine.current_state().authorized);

        // A subscriber attaching only now still reads the final state.
        let late = machine.subscribe();
        assert!(late.borrow().authorized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_escalates_to_exactly_one_reconfigure() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), false);
        let machine = machine_with(Arc::clone(&factory), storage).await;

        let outcome = machine.ingest_token(&token64()).await.unwrap();

        assert_eq!(outcome, ReauthorizationOutcome::AuthorizedAfterReconfigure);
        assert_eq!(factory.configure_count(), 2, "initial + one reconfigure");
        assert!(machine.current_state().authorized);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settles_in_failed_when_both_strategies_miss() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::never_resuming(Arc::clone(&storage));
        let machine = machine_with(Arc::clone(&factory), storage).await;

        let outcome = machine.ingest_token(&token64()).await.unwrap();

        assert_eq!(outcome, ReauthorizationOutcome::Failed);
        assert_eq!(factory.configure_count(), 2);
        let state = machine.current_state();
        assert!(!state.authorized);
        assert_eq!(state.phase, ReauthorizationPhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_poll_budget_is_bounded() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), false);
        let machine = machine_with(factory, storage).await;

        let started = tokio::time::Instant::now();
        let error = machine.sign_in().await.unwrap_err();

        assert!(matches!(error, ApplicationError::AuthorizationFailed { .. }));
        let waited = started.elapsed();
        assert!(waited <= Duration::from_secs(16), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_in_succeeds_when_relay_lands_mid_poll() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = machine_with(factory, storage).await;

        let ingesting = {
            let machine = Arc::clone(&machine);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(3)).await;
                machine.ingest_token(&token64()).await
            })
        };

        machine.sign_in().await.unwrap();
        assert!(machine.current_state().authorized);
        ingesting.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_sign_in_supersedes_stale_poll() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), false);
        let machine = machine_with(factory, storage).await;

        let first = {
            let machine = Arc::clone(&machine);
            tokio::spawn(async move { machine.sign_in().await })
        };
        tokio::time::sleep(Duration::from_secs(2)).await;
        let second = {
            let machine = Arc::clone(&machine);
            tokio::spawn(async move { machine.sign_in().await })
        };

        let first_result = first.await.unwrap();
        assert!(matches!(first_result, Err(ApplicationError::Superseded)));
        // The newer attempt still runs out its own budget.
        assert!(second.await.unwrap().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_clears_mirror() {
        let storage = MemoryStorage::new();
        let factory = ScriptedFactory::new(Arc::clone(&storage), true);
        let machine = machine_with(factory, storage).await;

        machine.ingest_token(&token64()).await.unwrap();
        assert!(machine.current_state().authorized);

        machine.sign_out().await.unwrap();
        let state = machine.current_state();
        assert!(!state.authorized);
        assert_eq!(state.phase, ReauthorizationPhase::Unauthenticated);
        assert!(state.storefront.is_none());
    }
}
