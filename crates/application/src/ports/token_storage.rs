//! Durable token storage port.
//!
//! The vendor SDK's persistence layer reads from the web runtime's
//! durable local storage at construction time. Writes through this port
//! are idempotent, order-independent key/value puts; a racing writer can
//! only overwrite with an equally-valid token for the same session, so
//! no lock discipline is needed.

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a storage adapter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The backing store could not be read or written.
    #[error("storage I/O failed: {0}")]
    Io(String),

    /// The backing store's contents could not be parsed.
    #[error("storage corrupted: {0}")]
    Corrupted(String),
}

/// Key/value storage shared with the vendor SDK's persistence layer.
#[async_trait]
pub trait TokenStorage: Send + Sync {
    /// Writes a value under a key, overwriting any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the write fails.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Reads a value by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or parsed.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
}
