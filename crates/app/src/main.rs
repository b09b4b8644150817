//! Cadenza media client entry point.
//!
//! Runs the relay stack headless: webview embedding is supplied by the
//! host shell, so the binary wires the simulated surface and SDK
//! adapters, reads configuration from the environment, and idles until
//! ctrl-c.

use std::sync::Arc;

use cadenza::App;
use cadenza_application::RelaySettings;
use cadenza_application::ports::TokenStorage;
use cadenza_domain::{DeveloperCredential, NAMING_VARIANT_KEYS};
use cadenza_infrastructure::testing::{SimulatedOpener, SimulatedSdkFactory};
use cadenza_infrastructure::{FileTokenStorage, StaticCredentialSource};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Cadenza v{}", env!("CARGO_PKG_VERSION"));

    // Get configuration from environment
    let developer_token = std::env::var("CADENZA_DEVELOPER_TOKEN").ok();
    let storage_key = developer_token
        .as_deref()
        .and_then(|raw| DeveloperCredential::new(raw).authoritative_storage_key().ok())
        .unwrap_or_else(|| NAMING_VARIANT_KEYS[0].to_string());
    let credentials = Arc::new(StaticCredentialSource::from_env_value(developer_token));

    let storage: Arc<dyn TokenStorage> = Arc::new(FileTokenStorage::in_data_dir("cadenza")?);

    // The simulated embedding stands in for the host shell's webview
    // and vendor SDK adapters.
    let opener = SimulatedOpener::new();
    let factory = Arc::new(SimulatedSdkFactory::new(Arc::clone(&storage), storage_key));

    let app = App::bootstrap(
        opener,
        factory,
        storage,
        credentials,
        RelaySettings::default(),
    )
    .await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    app.shutdown().await;

    Ok(())
}
