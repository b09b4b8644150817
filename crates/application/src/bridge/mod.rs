//! Bridge script: opener-handshake emulation for the authorization surface.
//!
//! The vendor's sign-in page assumes it was opened by `window.open()`
//! from the host page and speaks a `postMessage`/`window.opener`
//! handshake with it. The bridge makes the sandboxed surface honor that
//! contract. Its decision core lives in [`OpenerEmulator`] as ordinary
//! testable Rust; [`bridge_script`] serializes the same behavior into
//! the single script template injected at every navigation.

mod emulator;
mod template;

pub use emulator::{BridgeAction, OpenerEmulator};
pub use template::bridge_script;
