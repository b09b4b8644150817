//! Cadenza composition root.
//!
//! Wires the relay components together: the popup router and surface
//! controller on the capture side, the channel relay in the middle, and
//! the SDK reauthorization machine on the consuming side. The host
//! supplies the two embedding-specific ports (surface opener and SDK
//! factory); everything else is constructed here.

use std::sync::Arc;

use cadenza_application::ports::{
    AuthorizationSurfaceOpener, DeveloperCredentialSource, MediaSdkFactory, TokenStorage,
};
use cadenza_application::{
    ApplicationResult, AuthorizationSurfaceController, PopupRouter, RelaySettings,
    SdkReauthorization,
};
use cadenza_infrastructure::token_relay_channel;
use tokio::task::JoinHandle;

/// A fully wired relay stack.
pub struct App {
    controller: Arc<AuthorizationSurfaceController>,
    router: Arc<PopupRouter>,
    reauthorization: Arc<SdkReauthorization>,
    pump: JoinHandle<()>,
}

impl App {
    /// Wires the relay stack over the host-supplied ports and starts
    /// the token pump.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial SDK configuration fails.
    pub async fn bootstrap(
        opener: Arc<dyn AuthorizationSurfaceOpener>,
        factory: Arc<dyn MediaSdkFactory>,
        storage: Arc<dyn TokenStorage>,
        credentials: Arc<dyn DeveloperCredentialSource>,
        settings: RelaySettings,
    ) -> ApplicationResult<Self> {
        let (relay, mut tokens) = token_relay_channel();

        let reauthorization = SdkReauthorization::init(
            factory,
            storage,
            Arc::clone(&credentials),
            settings.clone(),
        )
        .await?;

        let controller = Arc::new(AuthorizationSurfaceController::new(
            opener,
            Arc::new(relay),
            credentials,
        ));
        let router = Arc::new(PopupRouter::new(
            Arc::clone(&controller),
            settings.vendor_hosts,
        ));

        let machine = Arc::clone(&reauthorization);
        let pump = tokio::spawn(async move {
            while let Some(token) = tokens.recv().await {
                match machine.ingest_token(&token).await {
                    Ok(outcome) => tracing::info!(?outcome, "relayed token ingested"),
                    Err(error) => tracing::warn!(%error, "relayed token discarded"),
                }
            }
        });

        Ok(Self {
            controller,
            router,
            reauthorization,
            pump,
        })
    }

    /// The popup router intercepting vendor sign-in windows.
    #[must_use]
    pub fn router(&self) -> Arc<PopupRouter> {
        Arc::clone(&self.router)
    }

    /// The authorization surface controller.
    #[must_use]
    pub fn controller(&self) -> Arc<AuthorizationSurfaceController> {
        Arc::clone(&self.controller)
    }

    /// The SDK reauthorization machine.
    #[must_use]
    pub fn reauthorization(&self) -> Arc<SdkReauthorization> {
        Arc::clone(&self.reauthorization)
    }

    /// Closes every live surface and stops the token pump.
    pub async fn shutdown(&self) {
        self.controller.dispose().await;
        self.pump.abort();
    }
}
