//! SQLite queue storage (feature-gated).

use async_trait::async_trait;
use pbx_remote_core::{
    item::{decode_arguments, decode_response, encode_arguments, encode_response},
    traits::{QueueStorage, StorageError},
    QueueId, QueueItem,
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS queue_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    command TEXT NOT NULL,
    arguments TEXT NOT NULL,
    response TEXT NULL,
    date_added INTEGER NOT NULL,
    date_executed INTEGER NULL,
    claimed_at INTEGER NULL
)";

const SELECT_COLUMNS: &str =
    "SELECT id, command, arguments, response, date_added, date_executed, claimed_at FROM queue_items";

type ItemRow = (i64, String, String, Option<String>, i64, Option<i64>, Option<i64>);

fn to_item(row: ItemRow) -> Result<QueueItem, StorageError> {
    let (id, command, arguments, response, date_added, date_executed, claimed_at) = row;
    Ok(QueueItem {
        id: Some(id),
        command,
        arguments: decode_arguments(&arguments)?,
        response: response.as_deref().map(decode_response).transpose()?,
        date_added,
        date_executed,
        claimed_at,
    })
}

fn internal(e: sqlx::Error) -> StorageError {
    StorageError::Internal(e.to_string())
}

/// SQLite storage implementation.
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Connect to `database_url`, creating the database and table if needed.
    ///
    /// # Errors
    /// Returns error if database connection fails.
    pub async fn new(database_url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(internal)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(internal)?;
        Self::from_pool(pool).await
    }

    /// Use an existing pool, creating the table if needed.
    ///
    /// # Errors
    /// Returns error if the schema cannot be created.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        sqlx::query(SCHEMA).execute(&pool).await.map_err(internal)?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl QueueStorage for SqliteStorage {
    async fn insert(&self, item: &QueueItem) -> Result<QueueId, StorageError> {
        let arguments = encode_arguments(&item.arguments)?;
        let response = item.response.as_ref().map(encode_response).transpose()?;

        let result = sqlx::query(
            "INSERT INTO queue_items (command, arguments, response, date_added, date_executed) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&item.command)
        .bind(arguments)
        .bind(response)
        .bind(item.date_added)
        .bind(item.date_executed)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        Ok(result.last_insert_rowid())
    }

    async fn update(&self, item: &QueueItem) -> Result<(), StorageError> {
        let id = item.id.ok_or(StorageError::MissingId)?;
        let arguments = encode_arguments(&item.arguments)?;
        let response = item.response.as_ref().map(encode_response).transpose()?;

        let result = sqlx::query(
            "UPDATE queue_items SET command = ?, arguments = ?, response = ?, \
             date_executed = ?, claimed_at = NULL WHERE id = ?",
        )
        .bind(&item.command)
        .bind(arguments)
        .bind(response)
        .bind(item.date_executed)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<QueueItem>, StorageError> {
        let rows: Vec<ItemRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE response IS NULL ORDER BY id"))
                .fetch_all(&self.pool)
                .await
                .map_err(internal)?;

        rows.into_iter().map(to_item).collect()
    }

    async fn fetch(&self, id: QueueId) -> Result<Option<QueueItem>, StorageError> {
        let row: Option<ItemRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(internal)?;

        row.map(to_item).transpose()
    }

    async fn claim(&self, id: QueueId, now: i64, stale_before: i64) -> Result<bool, StorageError> {
        let result = sqlx::query(
            "UPDATE queue_items SET claimed_at = ? \
             WHERE id = ? AND response IS NULL AND (claimed_at IS NULL OR claimed_at < ?)",
        )
        .bind(now)
        .bind(id)
        .bind(stale_before)
        .execute(&self.pool)
        .await
        .map_err(internal)?;

        Ok(result.rows_affected() == 1)
    }

    async fn release(&self, id: QueueId) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE queue_items SET claimed_at = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(internal)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pbx_remote_core::{Arguments, Event, QueueResponse};

    use super::*;

    async fn storage() -> SqliteStorage {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        SqliteStorage::from_pool(pool).await.unwrap()
    }

    #[tokio::test]
    async fn test_round_trip_and_pending_filter() {
        let storage = storage().await;
        let mut arguments = Arguments::new();
        arguments.insert("queue".to_string(), "support".to_string());
        arguments.insert("member".to_string(), "SIP/1001".to_string());

        let first = storage
            .insert(&QueueItem::new("QueueStatus", arguments.clone()))
            .await
            .unwrap();
        let second = storage
            .insert(&QueueItem::new("Queues", Arguments::new()))
            .await
            .unwrap();
        assert!(second > first);

        let mut item = storage.fetch(first).await.unwrap().unwrap();
        assert_eq!(item.arguments, arguments);
        let event: Event = [("event", "QueueParams"), ("queue", "support")]
            .into_iter()
            .collect();
        item.mark_executed(QueueResponse::Events(vec![event.clone()]), 1_700_000_000);
        storage.update(&item).await.unwrap();

        let pending = storage.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, Some(second));

        let stored = storage.fetch(first).await.unwrap().unwrap();
        assert_eq!(stored.response, Some(QueueResponse::Events(vec![event])));
        assert_eq!(stored.date_executed, Some(1_700_000_000));
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let storage = storage().await;
        let mut item = QueueItem::new("Queues", Arguments::new());
        item.id = Some(77);
        assert!(matches!(storage.update(&item).await, Err(StorageError::NotFound(77))));
    }

    #[tokio::test]
    async fn test_claim_and_release() {
        let storage = storage().await;
        let id = storage
            .insert(&QueueItem::new("Queues", Arguments::new()))
            .await
            .unwrap();

        assert!(storage.claim(id, 100, 0).await.unwrap());
        assert!(!storage.claim(id, 101, 0).await.unwrap());
        storage.release(id).await.unwrap();
        assert!(storage.claim(id, 102, 0).await.unwrap());
        assert_eq!(storage.fetch(id).await.unwrap().unwrap().claimed_at, Some(102));
    }
}
