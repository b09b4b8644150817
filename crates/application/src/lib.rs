//! Cadenza Application - Relay bridge core
//!
//! The four components of the authorization token relay: the bridge
//! script (opener-handshake emulation), the authorization surface
//! controller, the token relay channel port, and the SDK
//! reauthorization state machine. Everything reaches the outside world
//! through the ports in [`ports`].

pub mod bridge;
pub mod controller;
pub mod error;
pub mod popup;
pub mod ports;
pub mod reauthorization;
pub mod settings;

pub use bridge::{BridgeAction, OpenerEmulator, bridge_script};
pub use controller::AuthorizationSurfaceController;
pub use error::{ApplicationError, ApplicationResult};
pub use popup::{MockWindowHandle, PopupRouter};
pub use reauthorization::{ReauthorizationOutcome, SdkReauthorization};
pub use settings::{DEFAULT_VENDOR_HOSTS, RelaySettings};
