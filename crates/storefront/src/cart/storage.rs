//! Persistent storage slots for serialized carts.
//!
//! A slot is a string value under a string key. The cart store only needs
//! `get` and `set`; `remove` exists for operators clearing a cart from outside
//! the storefront.
//!
//! # Backends
//!
//! - [`MemorySlotStore`] - process memory, used when no database is configured
//! - [`PgSlotStore`] - `PostgreSQL` table `storefront.cart_slot`

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Backend refused the write or is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// String-valued key/value storage.
#[async_trait]
pub trait SlotStore: Send + Sync {
    /// Read a slot. `None` when the slot has never been written or was removed.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Overwrite a slot.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a slot. Removing an absent slot is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// In-process slot store.
#[derive(Debug, Default)]
pub struct MemorySlotStore {
    slots: RwLock<HashMap<String, String>>,
}

impl MemorySlotStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.slots.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.slots
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.slots.write().await.remove(key);
        Ok(())
    }
}

/// A stored slot with its last write time.
#[derive(Debug, Clone)]
pub struct SlotRecord {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// `PostgreSQL`-backed slot store.
///
/// The table is created by the storefront migrations
/// (`cartwright-cli migrate`).
#[derive(Debug, Clone)]
pub struct PgSlotStore {
    pool: PgPool,
}

impl PgSlotStore {
    /// Create a store on an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read a slot together with its last write time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Database` if the query fails.
    pub async fn get_record(&self, key: &str) -> Result<Option<SlotRecord>, StorageError> {
        let row: Option<(String, String, DateTime<Utc>)> = sqlx::query_as(
            r"
            SELECT key, value, updated_at
            FROM storefront.cart_slot
            WHERE key = $1
            ",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(key, value, updated_at)| SlotRecord {
            key,
            value,
            updated_at,
        }))
    }
}

#[async_trait]
impl SlotStore for PgSlotStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.get_record(key).await?.map(|record| record.value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO storefront.cart_slot (key, value, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value, updated_at = NOW()
            ",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM storefront.cart_slot WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
