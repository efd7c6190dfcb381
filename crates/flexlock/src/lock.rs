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

//! A key bound to its registry, carrying the current handle.

use crate::error::LockResult;
use crate::handle::FlexLockHandle;
use crate::key::LockKey;
use crate::registry::FlexLockRegistry;
use std::time::Duration;

/// Convenience binding of one key to one registry.
///
/// Sugar over the [`FlexLockRegistry`] surface for callers that lock and
/// unlock the same key repeatedly: the current handle is kept here so the
/// caller does not thread it through.
pub struct FlexLock<'r, K: LockKey> {
    registry: &'r FlexLockRegistry<K>,
    key: K,
    handle: Option<FlexLockHandle>,
}

impl<'r, K: LockKey> FlexLock<'r, K> {
    pub fn new(registry: &'r FlexLockRegistry<K>, key: K) -> Self {
        Self {
            registry,
            key,
            handle: None,
        }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    /// Handle of the current acquisition, if one is held.
    pub fn handle(&self) -> Option<FlexLockHandle> {
        self.handle
    }

    /// Blocking acquire; see [`FlexLockRegistry::lock`].
    pub async fn lock(&mut self, lease: Duration) -> LockResult<()> {
        self.handle = Some(self.registry.lock(self.key.clone(), lease).await?);
        Ok(())
    }

    /// Non-blocking acquire; returns `false` when the key is held by an
    /// unexpired lease.
    pub async fn try_lock(&mut self, lease: Duration) -> LockResult<bool> {
        match self.registry.try_lock(self.key.clone(), lease).await {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(true)
            }
            Err(err) if err.is_already_locked() => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Releases the current acquisition; a no-op when nothing is held.
    pub async fn unlock(&mut self) -> LockResult<()> {
        self.registry.unlock(self.handle.take()).await
    }
}
