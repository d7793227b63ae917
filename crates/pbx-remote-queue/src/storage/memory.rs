//! In-memory queue storage.

use std::{collections::BTreeMap, sync::RwLock};

use async_trait::async_trait;
use pbx_remote_core::{
    item::{decode_arguments, decode_response, encode_arguments, encode_response},
    traits::{QueueStorage, StorageError},
    QueueId, QueueItem,
};

/// Serialized form of one item, as a database row would hold it.
#[derive(Clone)]
struct Row {
    command: String,
    arguments: String,
    response: Option<String>,
    date_added: i64,
    date_executed: Option<i64>,
    claimed_at: Option<i64>,
}

impl Row {
    fn to_item(&self, id: QueueId) -> Result<QueueItem, StorageError> {
        Ok(QueueItem {
            id: Some(id),
            command: self.command.clone(),
            arguments: decode_arguments(&self.arguments)?,
            response: self.response.as_deref().map(decode_response).transpose()?,
            date_added: self.date_added,
            date_executed: self.date_executed,
            claimed_at: self.claimed_at,
        })
    }
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<QueueId, Row>,
    last_id: QueueId,
}

/// In-memory storage implementation.
///
/// Useful for development and single-process deployments.
/// Data is lost on restart.
#[derive(Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    /// Create a new in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueueStorage for MemoryStorage {
    async fn insert(&self, item: &QueueItem) -> Result<QueueId, StorageError> {
        let row = Row {
            command: item.command.clone(),
            arguments: encode_arguments(&item.arguments)?,
            response: item.response.as_ref().map(encode_response).transpose()?,
            date_added: item.date_added,
            date_executed: item.date_executed,
            claimed_at: None,
        };

        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;
        inner.last_id += 1;
        let id = inner.last_id;
        inner.rows.insert(id, row);

        Ok(id)
    }

    async fn update(&self, item: &QueueItem) -> Result<(), StorageError> {
        let id = item.id.ok_or(StorageError::MissingId)?;
        let arguments = encode_arguments(&item.arguments)?;
        let response = item.response.as_ref().map(encode_response).transpose()?;

        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let row = inner.rows.get_mut(&id).ok_or(StorageError::NotFound(id))?;

        row.command.clone_from(&item.command);
        row.arguments = arguments;
        row.response = response;
        row.date_executed = item.date_executed;
        row.claimed_at = None;

        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<QueueItem>, StorageError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        inner
            .rows
            .iter()
            .filter(|(_, row)| row.response.is_none())
            .map(|(id, row)| row.to_item(*id))
            .collect()
    }

    async fn fetch(&self, id: QueueId) -> Result<Option<QueueItem>, StorageError> {
        let inner = self
            .inner
            .read()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        inner.rows.get(&id).map(|row| row.to_item(id)).transpose()
    }

    async fn claim(&self, id: QueueId, now: i64, stale_before: i64) -> Result<bool, StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let Some(row) = inner.rows.get_mut(&id) else {
            return Ok(false);
        };
        if row.response.is_some() || row.claimed_at.is_some_and(|at| at >= stale_before) {
            return Ok(false);
        }
        row.claimed_at = Some(now);
        Ok(true)
    }

    async fn release(&self, id: QueueId) -> Result<(), StorageError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| StorageError::Internal(e.to_string()))?;

        let row = inner.rows.get_mut(&id).ok_or(StorageError::NotFound(id))?;
        row.claimed_at = None;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pbx_remote_core::{Arguments, Event, QueueResponse};

    use super::*;

    fn item(command: &str) -> QueueItem {
        let mut arguments = Arguments::new();
        arguments.insert("queue".to_string(), "support".to_string());
        QueueItem::new(command, arguments)
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        tokio_test::block_on(async {
            let storage = MemoryStorage::new();
            let mut first = item("QueueStatus");
            first.id = Some(99);
            assert_eq!(storage.insert(&first).await.unwrap(), 1);
            assert_eq!(storage.insert(&item("Queues")).await.unwrap(), 2);

            let fetched = storage.fetch(1).await.unwrap().unwrap();
            assert_eq!(fetched.id, Some(1));
            assert_eq!(fetched.command, "QueueStatus");
            assert_eq!(fetched.arguments.get("queue").map(String::as_str), Some("support"));
        });
    }

    #[test]
    fn test_list_pending_skips_executed() {
        tokio_test::block_on(async {
            let storage = MemoryStorage::new();
            for command in ["Queues", "Agents", "Reload"] {
                storage.insert(&item(command)).await.unwrap();
            }
            let mut done = storage.fetch(2).await.unwrap().unwrap();
            let event: Event = [("event", "Agents")].into_iter().collect();
            done.mark_executed(QueueResponse::Events(vec![event.clone()]), 7);
            storage.update(&done).await.unwrap();

            let pending: Vec<_> = storage
                .list_pending()
                .await
                .unwrap()
                .into_iter()
                .map(|i| i.id.unwrap())
                .collect();
            assert_eq!(pending, vec![1, 3]);

            let stored = storage.fetch(2).await.unwrap().unwrap();
            assert_eq!(stored.response, Some(QueueResponse::Events(vec![event])));
            assert_eq!(stored.date_executed, Some(7));
        });
    }

    #[test]
    fn test_update_unknown_or_missing_id() {
        tokio_test::block_on(async {
            let storage = MemoryStorage::new();
            let mut orphan = item("Queues");
            assert!(matches!(storage.update(&orphan).await, Err(StorageError::MissingId)));
            orphan.id = Some(5);
            assert!(matches!(storage.update(&orphan).await, Err(StorageError::NotFound(5))));
            assert!(storage.list_pending().await.unwrap().is_empty());
        });
    }

    #[test]
    fn test_claim_is_exclusive_until_stale_or_released() {
        tokio_test::block_on(async {
            let storage = MemoryStorage::new();
            let id = storage.insert(&item("Queues")).await.unwrap();

            assert!(storage.claim(id, 100, 0).await.unwrap());
            assert!(!storage.claim(id, 101, 0).await.unwrap());
            // claimed at 100, stale once the cutoff passes it
            assert!(storage.claim(id, 500, 200).await.unwrap());

            storage.release(id).await.unwrap();
            assert!(storage.claim(id, 501, 0).await.unwrap());
            assert!(!storage.claim(42, 501, 0).await.unwrap());
        });
    }
}
