use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::sqlite::SqliteConnectOptions;
use tracing::warn;

use crate::config::NOTIFICATION_CHANNEL_KEY;
use crate::db::models::WatchRow;
use crate::error::{AppError, Result};
use crate::types::{NotificationConfig, Watch};

/// Persistence for watches, the item catalog and the key-value bot settings.
///
/// Reads are not isolated from concurrent writers: a watch added while a
/// monitor cycle is running is picked up by the next cycle at the latest.
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// All active watches, oldest first.
    async fn list_watches(&self) -> Result<Vec<Watch>>;

    /// Returns the new watch id. A threshold of 0, or one that does not fit
    /// an SQLite INTEGER, is `AppError::BadRequest`.
    async fn add_watch(&self, user_id: u64, item_id: i64, threshold_price: u64) -> Result<i64>;

    /// Returns whether the watch still existed. Removing an absent id is not an error.
    async fn remove_watch(&self, watch_id: i64) -> Result<bool>;

    async fn get_config(&self, key: &str) -> Result<Option<String>>;

    async fn set_config(&self, key: &str, value: &str) -> Result<()>;

    /// Case-insensitive exact match on the item name.
    async fn item_id_by_name(&self, name: &str) -> Result<Option<i64>>;

    async fn item_name(&self, item_id: i64) -> Result<Option<String>>;

    async fn upsert_items(&self, items: &HashMap<i64, String>) -> Result<()>;
}

/// Thresholds are strictly positive and stored as signed 64-bit integers.
pub fn validate_threshold(threshold_price: u64) -> Result<()> {
    if threshold_price == 0 {
        return Err(AppError::BadRequest("threshold_price must be greater than 0".to_string()));
    }
    if threshold_price > i64::MAX as u64 {
        return Err(AppError::BadRequest("threshold_price is too large".to_string()));
    }
    Ok(())
}

/// Reads the alert destination. An unparsable value counts as unset.
pub async fn notification_channel(store: &dyn WatchStore) -> Result<Option<NotificationConfig>> {
    let Some(raw) = store.get_config(NOTIFICATION_CHANNEL_KEY).await? else {
        return Ok(None);
    };
    match raw.trim().parse::<u64>() {
        Ok(channel_id) => Ok(Some(NotificationConfig { channel_id })),
        Err(_) => {
            warn!(value = %raw, "Ignoring malformed {NOTIFICATION_CHANNEL_KEY}");
            Ok(None)
        }
    }
}

// ---------------------------------------------------------------------------
// SqliteStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SqliteStore {
    pool: sqlx::SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database file and applies migrations.
    pub async fn connect(db_path: &str) -> Result<Self> {
        let options =
            SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?.create_if_missing(true);
        let pool = sqlx::SqlitePool::connect_with(options).await?;
        Self::migrate(pool).await
    }

    #[cfg(test)]
    /// Private in-memory database. A single connection keeps every query on
    /// the same memory instance.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::migrate(pool).await
    }

    async fn migrate(pool: sqlx::SqlitePool) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl WatchStore for SqliteStore {
    async fn list_watches(&self) -> Result<Vec<Watch>> {
        let rows = sqlx::query_as::<_, WatchRow>(
            "SELECT id, user_id, item_id, threshold_price FROM watch_list ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Watch::from).collect())
    }

    async fn add_watch(&self, user_id: u64, item_id: i64, threshold_price: u64) -> Result<i64> {
        validate_threshold(threshold_price)?;
        let res = sqlx::query(
            "INSERT INTO watch_list (user_id, item_id, threshold_price) VALUES (?, ?, ?)",
        )
        .bind(user_id as i64)
        .bind(item_id)
        .bind(threshold_price as i64)
        .execute(&self.pool)
        .await?;
        Ok(res.last_insert_rowid())
    }

    async fn remove_watch(&self, watch_id: i64) -> Result<bool> {
        let res = sqlx::query("DELETE FROM watch_list WHERE id = ?")
            .bind(watch_id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_config(&self, key: &str) -> Result<Option<String>> {
        let value: Option<Option<String>> =
            sqlx::query_scalar("SELECT conf_value FROM bot_config WHERE conf_name = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value.flatten())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO bot_config (conf_name, conf_value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn item_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            "SELECT item_id FROM items WHERE name = ? COLLATE NOCASE LIMIT 1",
        )
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn item_name(&self, item_id: i64) -> Result<Option<String>> {
        let name = sqlx::query_scalar::<_, String>("SELECT name FROM items WHERE item_id = ?")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(name)
    }

    async fn upsert_items(&self, items: &HashMap<i64, String>) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (id, name) in items {
            sqlx::query("INSERT OR REPLACE INTO items (item_id, name) VALUES (?, ?)")
                .bind(id)
                .bind(name)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
