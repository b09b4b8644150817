//! Cadenza Infrastructure - Adapters
//!
//! Concrete implementations of the application ports: the in-process
//! stand-in for the cross-process token relay channel, the file-backed
//! web-storage mirror the vendor SDK's persistence layer reads, and the
//! static developer credential source. The [`testing`] module carries
//! scripted doubles for exercising the whole relay flow without a real
//! webview.

pub mod credential;
pub mod relay;
pub mod storage;
pub mod testing;

pub use credential::StaticCredentialSource;
pub use relay::{ChannelTokenRelay, TokenReceiver, token_relay_channel};
pub use storage::FileTokenStorage;
