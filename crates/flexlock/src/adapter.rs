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

//! Backend adapter trait making acquire/release decisions durable.

use crate::error::LockResult;
use crate::key::KeyValue;
use async_trait::async_trait;

/// Pluggable capability extending mutual exclusion across process
/// boundaries through a shared store.
///
/// ## Contract
/// The registry remains correct in-process without any adapter; an adapter
/// adds a durable record per key that arbitrates between processes. The
/// store must provide at least read-committed atomicity for the single
/// conditional update in [`try_lock`](FlexLockAdapter::try_lock) — that one
/// statement is what makes cross-process exclusion sound.
///
/// Any I/O failure is reported as
/// [`LockError::BackendError`](crate::LockError::BackendError) and is
/// indeterminate: it must never be read as "acquired", "released", or
/// "denied". Denial is exclusively the `false` return of `try_lock`.
///
/// Timestamps are epoch milliseconds supplied by the registry, so an
/// adapter never consults its own clock for lease arithmetic.
#[async_trait]
pub trait FlexLockAdapter: Send + Sync {
    /// Idempotently ensures a durable record exists for `key`, creating a
    /// zero-lease record if absent.
    ///
    /// Safe to call concurrently for the same key from multiple processes;
    /// exactly one record results (insert-if-absent, never insert-or-fail).
    async fn ensure_key(&self, key: &KeyValue) -> LockResult<()>;

    /// The durable compare-and-swap.
    ///
    /// Records `(owner, expire_at)` and returns `true` only if the stored
    /// lease is unset or its expiry is `<= now`; otherwise changes nothing
    /// and returns `false`. Must execute as one atomic conditional
    /// statement against the store, never a read-then-write pair.
    async fn try_lock(&self, key: &KeyValue, owner: &str, now: i64, expire_at: i64)
        -> LockResult<bool>;

    /// Clears the durable lease only if the recorded owner matches `owner`.
    /// A mismatch (stolen or expired lock) is silently ignored.
    async fn unlock(&self, key: &KeyValue, owner: &str) -> LockResult<()>;

    /// Unconditionally clears the durable lease regardless of owner.
    async fn force_unlock(&self, key: &KeyValue) -> LockResult<()>;
}
