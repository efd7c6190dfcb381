// SPDX-License-Identifier: LGPL-2.1-or-later
//
// This file is part of FlexLock.
//
// FlexLock is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 2.1 of the License, or
// (at your option) any later version.
//
// FlexLock is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with FlexLock. If not, see <https://www.gnu.org/licenses/>.

//! SQL-based backend adapters.
//!
//! This module provides relational realizations of the
//! [`FlexLockAdapter`](crate::FlexLockAdapter) contract. The mutual-
//! exclusion decision is a single conditional `UPDATE` whose row count is
//! the verdict, so any store with read-committed atomicity for one
//! statement qualifies.
//!
//! Currently we implement a **SQLite** backend. PostgreSQL can be added by
//! following the same pattern with a `PgPool`.

use crate::adapter::FlexLockAdapter;
use crate::error::{LockError, LockResult};
use crate::key::KeyValue;
use async_trait::async_trait;
use tracing::instrument;

#[cfg(feature = "sqlite-backend")]
use sqlx::SqlitePool;

/// Names of the table and columns holding lease records.
///
/// Defaults match the conventional layout:
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS virtual_mutexes (
///   mutex_id TEXT PRIMARY KEY,
///   expire_time INTEGER NOT NULL DEFAULT 0,
///   owner TEXT
/// );
/// ```
///
/// - `expire_time` is epoch milliseconds; 0 means never locked
/// - `owner` is the handle token of the current acquisition
#[derive(Clone, Debug)]
pub struct LockTableConfig {
    pub table: String,
    pub key_column: String,
    pub expire_column: String,
    pub owner_column: String,
}

impl Default for LockTableConfig {
    fn default() -> Self {
        Self {
            table: "virtual_mutexes".to_string(),
            key_column: "mutex_id".to_string(),
            expire_column: "expire_time".to_string(),
            owner_column: "owner".to_string(),
        }
    }
}

/// SQLite-based lock adapter.
///
/// Statements are rendered once at construction from the
/// [`LockTableConfig`] and executed per call against a connection pool.
/// With the default configuration the lease table is created on connect;
/// deployments with bespoke naming or native integer key columns provision
/// their own table (SQLite's type affinity makes the default `TEXT` key
/// column work for integer and decimal keys too).
#[cfg(feature = "sqlite-backend")]
#[derive(Clone)]
pub struct SqliteLockAdapter {
    pool: SqlitePool,
    try_lock_sql: String,
    exists_sql: String,
    insert_sql: String,
    unlock_sql: String,
    force_unlock_sql: String,
}

#[cfg(feature = "sqlite-backend")]
impl SqliteLockAdapter {
    /// Connects with the default table layout.
    ///
    /// `database_url` is any valid `sqlx` SQLite URL, e.g.:
    /// - `sqlite::memory:` (in-memory)
    /// - `sqlite://locks.db`
    pub async fn new(database_url: &str) -> LockResult<Self> {
        Self::with_config(database_url, LockTableConfig::default()).await
    }

    /// Connects with a custom table layout.
    #[instrument(skip(database_url))]
    pub async fn with_config(database_url: &str, config: LockTableConfig) -> LockResult<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| LockError::BackendError(format!("failed to connect SQLite: {e}")))?;

        let LockTableConfig {
            table,
            key_column,
            expire_column,
            owner_column,
        } = config;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {table} \
             ({key_column} TEXT PRIMARY KEY, \
              {expire_column} INTEGER NOT NULL DEFAULT 0, \
              {owner_column} TEXT)"
        ))
        .execute(&pool)
        .await
        .map_err(|e| LockError::BackendError(format!("failed to create lease table: {e}")))?;

        Ok(Self {
            pool,
            try_lock_sql: format!(
                "UPDATE {table} SET {owner_column} = ?1, {expire_column} = ?2 \
                 WHERE {key_column} = ?3 AND {expire_column} <= ?4"
            ),
            exists_sql: format!("SELECT 1 FROM {table} WHERE {key_column} = ?1"),
            insert_sql: format!(
                "INSERT OR IGNORE INTO {table} ({key_column}, {expire_column}) VALUES (?1, 0)"
            ),
            unlock_sql: format!(
                "UPDATE {table} SET {expire_column} = 0 \
                 WHERE {key_column} = ?1 AND {owner_column} = ?2"
            ),
            force_unlock_sql: format!(
                "UPDATE {table} SET {expire_column} = 0 WHERE {key_column} = ?1"
            ),
        })
    }
}

/// Binds a key into the next statement placeholder by its store shape.
#[cfg(feature = "sqlite-backend")]
fn bind_key<'q>(
    query: sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    key: &'q KeyValue,
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    match key {
        KeyValue::Integer(v) => query.bind(*v),
        KeyValue::Decimal(v) => query.bind(*v),
        KeyValue::Text(v) => query.bind(v.as_str()),
    }
}

#[cfg(feature = "sqlite-backend")]
#[async_trait]
impl FlexLockAdapter for SqliteLockAdapter {
    #[instrument(skip(self, key), fields(key = %key))]
    async fn ensure_key(&self, key: &KeyValue) -> LockResult<()> {
        let exists = bind_key(sqlx::query(&self.exists_sql), key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LockError::BackendError(format!("select lease: {e}")))?;

        if exists.is_none() {
            bind_key(sqlx::query(&self.insert_sql), key)
                .execute(&self.pool)
                .await
                .map_err(|e| LockError::BackendError(format!("insert lease: {e}")))?;
        }
        Ok(())
    }

    #[instrument(skip(self, key, owner), fields(key = %key))]
    async fn try_lock(
        &self,
        key: &KeyValue,
        owner: &str,
        now: i64,
        expire_at: i64,
    ) -> LockResult<bool> {
        let query = sqlx::query(&self.try_lock_sql).bind(owner).bind(expire_at);
        let result = bind_key(query, key)
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| LockError::BackendError(format!("update lease: {e}")))?;
        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, key, owner), fields(key = %key))]
    async fn unlock(&self, key: &KeyValue, owner: &str) -> LockResult<()> {
        bind_key(sqlx::query(&self.unlock_sql), key)
            .bind(owner)
            .execute(&self.pool)
            .await
            .map_err(|e| LockError::BackendError(format!("clear lease: {e}")))?;
        Ok(())
    }

    #[instrument(skip(self, key), fields(key = %key))]
    async fn force_unlock(&self, key: &KeyValue) -> LockResult<()> {
        bind_key(sqlx::query(&self.force_unlock_sql), key)
            .execute(&self.pool)
            .await
            .map_err(|e| LockError::BackendError(format!("clear lease: {e}")))?;
        Ok(())
    }
}
