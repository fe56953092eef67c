//! Persistent key-value storage.
//!
//! The storefront persists exactly one serialized value per namespace key
//! (today: the cart lines). [`KvStore`] is the seam; production uses
//! [`PgKvStore`] over the `kv_entries` table, tests use [`MemoryKvStore`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::RwLock;

/// Errors from the key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Injected failure from the in-memory test store.
    #[error("storage unavailable")]
    Unavailable,
}

/// A store holding one serialized value per namespace key.
///
/// Absence is not an error: `get` returns `Ok(None)` for keys that were never
/// written.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the value under `key`. Deleting an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Postgres-backed store over the `kv_entries` table.
#[derive(Debug, Clone)]
pub struct PgKvStore {
    pool: PgPool,
}

impl PgKvStore {
    /// Create a store over an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `kv_entries` table if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the statement fails.
    pub async fn ensure_schema(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            ",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for PgKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM kv_entries WHERE key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES ($1, $2, now())
            ON CONFLICT (key) DO UPDATE SET value = $2, updated_at = now()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM kv_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
struct MemoryKvState {
    entries: HashMap<String, String>,
    fail_writes: bool,
}

/// In-memory store for tests.
///
/// Supports injecting write failures to exercise the swallow-and-surface
/// behavior of the cart persistence layer.
#[derive(Debug, Clone, Default)]
pub struct MemoryKvStore {
    state: Arc<RwLock<MemoryKvState>>,
}

impl MemoryKvStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail until called again with `false`.
    pub async fn set_fail_writes(&self, fail: bool) {
        self.state.write().await.fail_writes = fail;
    }

    /// Number of stored entries.
    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Whether the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }
}

#[async_trait]
impl KvStore for MemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.state.read().await.entries.get(key).cloned())
    }

    async fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if state.fail_writes {
            return Err(StorageError::Unavailable);
        }
        state.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        if state.fail_writes {
            return Err(StorageError::Unavailable);
        }
        state.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get("cart").await.expect("read"), None);

        store.put("cart", "[]").await.expect("write");
        assert_eq!(store.get("cart").await.expect("read").as_deref(), Some("[]"));

        store.remove("cart").await.expect("remove");
        assert_eq!(store.get("cart").await.expect("read"), None);
    }

    #[tokio::test]
    async fn test_memory_store_injected_write_failure() {
        let store = MemoryKvStore::new();
        store.set_fail_writes(true).await;

        let err = store.put("cart", "[]").await.expect_err("should fail");
        assert!(matches!(err, StorageError::Unavailable));

        // Reads still work while writes fail.
        assert_eq!(store.get("cart").await.expect("read"), None);

        store.set_fail_writes(false).await;
        store.put("cart", "[]").await.expect("write");
        assert_eq!(store.len().await, 1);
    }
}
