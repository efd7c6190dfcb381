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

//! Environment-based configuration of registries and backends.
//!
//! ## Environment Variables
//!
//! ### Backend Selection
//! - `FLEXLOCK_BACKEND`: backend type (default: "none")
//!   - "none" → in-process exclusion only
//!   - "memory" | "in-memory" → `MemoryLockAdapter`
//!   - "sqlite" → `SqliteLockAdapter`
//!
//! ### SQLite Configuration
//! - `FLEXLOCK_SQLITE_URL`: database URL (default: `sqlite::memory:`)
//! - `FLEXLOCK_TABLE` / `FLEXLOCK_KEY_COLUMN` / `FLEXLOCK_EXPIRE_COLUMN` /
//!   `FLEXLOCK_OWNER_COLUMN`: lease table layout overrides
//!
//! ### Registry Configuration
//! - `FLEXLOCK_POLL_INTERVAL_MS`: contended-key poll interval (default: 100)

use crate::adapter::FlexLockAdapter;
use crate::error::{LockError, LockResult};
use crate::key::LockKey;
use crate::registry::FlexLockRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Backend selection, usually read from the environment.
#[derive(Clone, Debug)]
pub enum BackendType {
    /// No durable backend; exclusion within this process only
    None,
    /// In-memory adapter (requires the memory-backend feature)
    Memory,
    /// SQLite adapter (requires the sqlite-backend feature)
    Sqlite {
        /// Database URL, e.g. `sqlite://locks.db`
        url: String,
    },
}

impl BackendType {
    /// Reads `FLEXLOCK_BACKEND` and the backend-specific settings.
    pub fn from_env() -> LockResult<Self> {
        let backend = std::env::var("FLEXLOCK_BACKEND").unwrap_or_else(|_| "none".to_string());
        match backend.to_lowercase().as_str() {
            "" | "none" => Ok(BackendType::None),
            "memory" | "in-memory" => Ok(BackendType::Memory),
            "sqlite" => Ok(BackendType::Sqlite {
                url: std::env::var("FLEXLOCK_SQLITE_URL")
                    .unwrap_or_else(|_| "sqlite::memory:".to_string()),
            }),
            other => Err(LockError::ConfigError(format!(
                "unknown lock backend: {other}"
            ))),
        }
    }

    /// Builds the adapter this selection names, or `None` for
    /// [`BackendType::None`].
    pub async fn build(&self) -> LockResult<Option<Arc<dyn FlexLockAdapter>>> {
        match self {
            BackendType::None => Ok(None),
            BackendType::Memory => build_memory(),
            BackendType::Sqlite { url } => build_sqlite(url).await,
        }
    }
}

#[cfg(feature = "memory-backend")]
fn build_memory() -> LockResult<Option<Arc<dyn FlexLockAdapter>>> {
    Ok(Some(Arc::new(crate::memory::MemoryLockAdapter::new())))
}

#[cfg(not(feature = "memory-backend"))]
fn build_memory() -> LockResult<Option<Arc<dyn FlexLockAdapter>>> {
    Err(LockError::ConfigError(
        "backend 'memory' requires the memory-backend feature".to_string(),
    ))
}

#[cfg(feature = "sqlite-backend")]
async fn build_sqlite(url: &str) -> LockResult<Option<Arc<dyn FlexLockAdapter>>> {
    let mut table = crate::sql::LockTableConfig::default();
    if let Ok(name) = std::env::var("FLEXLOCK_TABLE") {
        table.table = name;
    }
    if let Ok(name) = std::env::var("FLEXLOCK_KEY_COLUMN") {
        table.key_column = name;
    }
    if let Ok(name) = std::env::var("FLEXLOCK_EXPIRE_COLUMN") {
        table.expire_column = name;
    }
    if let Ok(name) = std::env::var("FLEXLOCK_OWNER_COLUMN") {
        table.owner_column = name;
    }
    let adapter = crate::sql::SqliteLockAdapter::with_config(url, table).await?;
    Ok(Some(Arc::new(adapter)))
}

#[cfg(not(feature = "sqlite-backend"))]
async fn build_sqlite(_url: &str) -> LockResult<Option<Arc<dyn FlexLockAdapter>>> {
    Err(LockError::ConfigError(
        "backend 'sqlite' requires the sqlite-backend feature".to_string(),
    ))
}

/// Builds a registry from the environment: backend per `FLEXLOCK_BACKEND`,
/// poll interval per `FLEXLOCK_POLL_INTERVAL_MS`.
pub async fn registry_from_env<K: LockKey>() -> LockResult<FlexLockRegistry<K>> {
    let mut registry = match BackendType::from_env()?.build().await? {
        Some(adapter) => FlexLockRegistry::with_adapter(adapter),
        None => FlexLockRegistry::new(),
    };
    if let Ok(millis) = std::env::var("FLEXLOCK_POLL_INTERVAL_MS") {
        let millis: u64 = millis.parse().map_err(|_| {
            LockError::ConfigError(format!("invalid FLEXLOCK_POLL_INTERVAL_MS: {millis}"))
        })?;
        registry = registry.with_poll_interval(Duration::from_millis(millis));
    }
    Ok(registry)
}
