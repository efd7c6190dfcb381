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

//! In-memory backend adapter (for testing and single-process use).

use crate::adapter::FlexLockAdapter;
use crate::error::LockResult;
use crate::key::KeyValue;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory realization of the adapter contract.
///
/// ## Purpose
/// Mirrors the durable semantics — zero-lease records, the conditional
/// acquire on `expire_at <= now`, owner-checked release — over a process-
/// local map. Useful as the contract's test double and for sharing one
/// lease table between several registries in the same process.
///
/// ## Limitations
/// - Not persistent (records lost on restart)
/// - Not distributed (single process only)
#[derive(Default)]
pub struct MemoryLockAdapter {
    records: RwLock<HashMap<String, LeaseRecord>>,
}

#[derive(Default)]
struct LeaseRecord {
    /// Epoch milliseconds; 0 = never locked or released.
    expire_at: i64,
    owner: Option<String>,
}

impl MemoryLockAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FlexLockAdapter for MemoryLockAdapter {
    async fn ensure_key(&self, key: &KeyValue) -> LockResult<()> {
        let mut records = self.records.write().await;
        records.entry(key.to_string()).or_default();
        Ok(())
    }

    async fn try_lock(
        &self,
        key: &KeyValue,
        owner: &str,
        now: i64,
        expire_at: i64,
    ) -> LockResult<bool> {
        let mut records = self.records.write().await;
        match records.get_mut(&key.to_string()) {
            Some(record) if record.expire_at <= now => {
                record.owner = Some(owner.to_string());
                record.expire_at = expire_at;
                Ok(true)
            }
            // held by an unexpired lease, or key never registered
            _ => Ok(false),
        }
    }

    async fn unlock(&self, key: &KeyValue, owner: &str) -> LockResult<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&key.to_string()) {
            if record.owner.as_deref() == Some(owner) {
                record.expire_at = 0;
            }
        }
        Ok(())
    }

    async fn force_unlock(&self, key: &KeyValue) -> LockResult<()> {
        let mut records = self.records.write().await;
        if let Some(record) = records.get_mut(&key.to_string()) {
            record.expire_at = 0;
        }
        Ok(())
    }
}
