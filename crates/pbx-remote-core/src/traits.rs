//! Queue persistence trait.

use async_trait::async_trait;
use thiserror::Error;

use crate::item::{QueueId, QueueItem};

/// Storage error.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Queue item not found: {0}")]
    NotFound(QueueId),
    #[error("Queue item has no id")]
    MissingId,
    #[error("Stored data is corrupt: {0}")]
    Corrupt(String),
    #[error("Storage error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        Self::Corrupt(e.to_string())
    }
}

/// Trait for queue storage backends.
///
/// Backends store arguments and responses in their serialized form
/// (see [`crate::item::encode_arguments`] and [`crate::item::encode_response`]).
#[async_trait]
pub trait QueueStorage: Send + Sync {
    /// Insert a new item and return its assigned id.
    ///
    /// Any id already present on the item is ignored.
    async fn insert(&self, item: &QueueItem) -> Result<QueueId, StorageError>;

    /// Persist the command, arguments, response and execution date of an
    /// existing item. Clears any claim on it.
    ///
    /// Fails with [`StorageError::NotFound`] and changes nothing if the id is
    /// unknown.
    async fn update(&self, item: &QueueItem) -> Result<(), StorageError>;

    /// Items without a response, in ascending id order.
    async fn list_pending(&self) -> Result<Vec<QueueItem>, StorageError>;

    /// Get an item by id.
    async fn fetch(&self, id: QueueId) -> Result<Option<QueueItem>, StorageError>;

    /// Atomically mark a pending item as in flight.
    ///
    /// Succeeds only if the item is pending and either unclaimed or claimed
    /// before `stale_before`. Returns `false` when another worker holds it.
    async fn claim(&self, id: QueueId, now: i64, stale_before: i64) -> Result<bool, StorageError>;

    /// Drop the claim on an item so the next sweep picks it up again.
    async fn release(&self, id: QueueId) -> Result<(), StorageError>;
}
