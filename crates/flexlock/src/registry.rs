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

//! The lock coordination core: per-key state, blocking and non-blocking
//! acquisition, lease expiry reclaim, and backend delegation.

use crate::adapter::FlexLockAdapter;
use crate::error::{LockError, LockResult};
use crate::handle::{FlexLockHandle, HandlePool};
use crate::key::{KeyValue, LockKey};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

/// Default interval at which a blocked [`FlexLockRegistry::lock`] call
/// re-checks a contended key.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Per-key lock record. Created on first use of a key, never destroyed.
struct KeyMutex<K> {
    key: K,
    /// Store representation, computed once at entry creation.
    key_value: KeyValue,
    state: tokio::sync::Mutex<MutexState>,
    /// Wake signal for parked waiters; `notify_one` per release.
    available: Notify,
    /// Number of callers currently parked on `available`. A hint for the
    /// release paths; the bounded poll covers any stale reading.
    waiters: AtomicUsize,
}

struct MutexState {
    /// Epoch milliseconds after which the lease is reclaimable; 0 = unlocked.
    expire_at: i64,
    owner: Option<FlexLockHandle>,
}

/// Registry of keyed mutual-exclusion locks with mandatory leases.
///
/// ## Purpose
/// Grants at-most-one-owner access to a logical resource identified by a
/// key. Every acquisition carries a lease: the maximum hold time, after
/// which the lock is considered abandoned and is reclaimed lazily by the
/// next acquisition attempt for that key. An optional
/// [`FlexLockAdapter`] extends the exclusion guarantee across processes.
///
/// ## Concurrency
/// There is no global lock on the steady-state path. Each key has its own
/// critical section and wake signal, so unrelated keys never contend. A
/// registry-wide mutex guards only the lazy insert into the key map and is
/// never held across a backend call.
///
/// ## Growth
/// Key entries are never evicted for the life of the registry; a process
/// locking unboundedly many distinct keys grows the map without bound.
pub struct FlexLockRegistry<K: LockKey> {
    mutexes: parking_lot::Mutex<HashMap<K, Arc<KeyMutex<K>>>>,
    handles: HandlePool<Arc<KeyMutex<K>>>,
    adapter: Option<Arc<dyn FlexLockAdapter>>,
    poll_interval: Duration,
}

/// Decrements the parked-waiter count even when the waiting future is
/// dropped mid-park (cancellation).
struct WaiterGuard<'a>(&'a AtomicUsize);

impl<'a> WaiterGuard<'a> {
    fn park(count: &'a AtomicUsize) -> Self {
        count.fetch_add(1, Ordering::Relaxed);
        Self(count)
    }
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

impl<K: LockKey> FlexLockRegistry<K> {
    /// Creates a registry with no backend: exclusion holds within this
    /// process only.
    pub fn new() -> Self {
        Self {
            mutexes: parking_lot::Mutex::new(HashMap::new()),
            handles: HandlePool::new(),
            adapter: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Creates a registry backed by `adapter` for cross-process exclusion.
    pub fn with_adapter(adapter: Arc<dyn FlexLockAdapter>) -> Self {
        Self {
            adapter: Some(adapter),
            ..Self::new()
        }
    }

    /// Replaces the contended-key poll interval (default 100 ms).
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn adapter(&self) -> Option<&Arc<dyn FlexLockAdapter>> {
        self.adapter.as_ref()
    }

    /// Looks up or lazily creates the per-key record.
    ///
    /// First creation registers the key with the backend; a backend failure
    /// is fatal for the call and nothing is inserted. The map mutex is held
    /// only for the lookup/insert itself, never across the backend call, so
    /// two racing creators may both register the key — `ensure_key` is
    /// idempotent by contract.
    async fn mutex_for(&self, key: K) -> LockResult<Arc<KeyMutex<K>>> {
        if let Some(existing) = self.mutexes.lock().get(&key) {
            return Ok(existing.clone());
        }
        let key_value = key.to_key_value();
        if let Some(adapter) = &self.adapter {
            adapter.ensure_key(&key_value).await?;
        }
        let mut map = self.mutexes.lock();
        let mutex = map
            .entry(key)
            .or_insert_with_key(|key| {
                Arc::new(KeyMutex {
                    key: key.clone(),
                    key_value,
                    state: tokio::sync::Mutex::new(MutexState {
                        expire_at: 0,
                        owner: None,
                    }),
                    available: Notify::new(),
                    waiters: AtomicUsize::new(0),
                })
            })
            .clone();
        Ok(mutex)
    }

    /// One acquisition attempt, executed while holding the per-key scope.
    ///
    /// A lease expiring exactly now is still held: ties favor the
    /// incumbent. Expired leases are reclaimed here, on the next attempt,
    /// not by any background sweep. Local "held" state is committed only
    /// after the backend (if any) has durably agreed; on a backend `false`
    /// or error the just-reserved handle goes straight back to the pool.
    async fn try_acquire_locked(
        &self,
        mutex: &Arc<KeyMutex<K>>,
        state: &mut MutexState,
        lease: Duration,
    ) -> LockResult<FlexLockHandle> {
        let now = now_millis();
        if state.owner.is_some() && state.expire_at >= now {
            return Err(LockError::AlreadyLocked(mutex.key_value.to_string()));
        }

        let expire_at = now + lease.as_millis() as i64;
        let handle = self.handles.reserve(Arc::clone(mutex));

        let adapter = match &self.adapter {
            Some(adapter) => adapter,
            None => {
                state.expire_at = expire_at;
                state.owner = Some(handle);
                return Ok(handle);
            }
        };

        match adapter
            .try_lock(&mutex.key_value, &handle.token().to_string(), now, expire_at)
            .await
        {
            Ok(true) => {
                state.expire_at = expire_at;
                state.owner = Some(handle);
                Ok(handle)
            }
            Ok(false) => {
                self.handles.release(handle);
                Err(LockError::AlreadyLocked(mutex.key_value.to_string()))
            }
            Err(err) => {
                self.handles.release(handle);
                Err(err)
            }
        }
    }

    /// Acquires the lock for `key`, blocking until it is obtained.
    ///
    /// ## Behavior
    /// - Retries while the key is held, parking on the key's wake signal
    ///   bounded by the poll interval or the remaining lease time
    ///   (whichever is smaller, at least 1 ms).
    /// - There is no overall deadline: the call is bounded only by release
    ///   or lease expiry of the key. Dropping the future cancels the wait.
    /// - Waiters race each other and fresh callers; no fairness is
    ///   promised.
    ///
    /// ## Returns
    /// - `Ok(handle)`: lock acquired; pass the handle to [`unlock`](Self::unlock)
    /// - `Err(LockError::BackendError)`: durable attempt failed; nothing acquired
    #[instrument(level = "debug", skip(self))]
    pub async fn lock(&self, key: K, lease: Duration) -> LockResult<FlexLockHandle> {
        let mutex = self.mutex_for(key).await?;
        loop {
            let mut state = mutex.state.lock().await;
            match self.try_acquire_locked(&mutex, &mut state, lease).await {
                Ok(handle) => return Ok(handle),
                Err(LockError::AlreadyLocked(_)) => {}
                Err(err) => return Err(err),
            }

            let now = now_millis();
            let wait_ms = (self.poll_interval.as_millis() as i64)
                .min(state.expire_at - now + 1)
                .max(1);
            let parked = WaiterGuard::park(&mutex.waiters);
            let notified = mutex.available.notified();
            drop(state);
            let _ = tokio::time::timeout(Duration::from_millis(wait_ms as u64), notified).await;
            drop(parked);
        }
    }

    /// Attempts to acquire the lock for `key` without blocking.
    ///
    /// ## Returns
    /// - `Ok(handle)`: lock acquired
    /// - `Err(LockError::AlreadyLocked)`: key held by an unexpired lease —
    ///   an expected outcome to branch on, not a failure
    /// - `Err(LockError::BackendError)`: durable attempt failed
    #[instrument(level = "debug", skip(self))]
    pub async fn try_lock(&self, key: K, lease: Duration) -> LockResult<FlexLockHandle> {
        let mutex = self.mutex_for(key).await?;
        let mut state = mutex.state.lock().await;
        self.try_acquire_locked(&mutex, &mut state, lease).await
    }

    /// Releases a lock. A `None` handle, an already-released handle, and a
    /// handle superseded by expiry or [`force_unlock`](Self::force_unlock)
    /// are all silent no-ops.
    ///
    /// Local state is cleared and one waiter woken before any captured
    /// backend error is re-raised, so a store outage never leaves the
    /// in-process view stuck in "held".
    pub async fn unlock(&self, handle: impl Into<Option<FlexLockHandle>>) -> LockResult<()> {
        let Some(handle) = handle.into() else {
            return Ok(());
        };
        let Some(mutex) = self.handles.release(handle) else {
            return Ok(());
        };
        let mut state = mutex.state.lock().await;
        if state.owner != Some(handle) {
            return Ok(());
        }

        let mut backend_err = None;
        if let Some(adapter) = &self.adapter {
            if let Err(err) = adapter
                .unlock(&mutex.key_value, &handle.token().to_string())
                .await
            {
                warn!(key = ?mutex.key, error = %err, "backend release failed, clearing local state first");
                backend_err = Some(err);
            }
        }

        state.expire_at = 0;
        state.owner = None;
        if mutex.waiters.load(Ordering::Relaxed) > 0 {
            mutex.available.notify_one();
        }
        debug!(key = ?mutex.key, "unlocked");

        match backend_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Releases the lock for `key` even if the caller does not own it, or
    /// owns it through another registry sharing the same backend. Local
    /// lease and owner are cleared regardless of who holds them.
    ///
    /// As with [`unlock`](Self::unlock), local cleanup and waiter wake-up
    /// happen before a captured backend error is re-raised.
    #[instrument(level = "debug", skip(self))]
    pub async fn force_unlock(&self, key: K) -> LockResult<()> {
        let mutex = self.mutex_for(key).await?;
        let mut state = mutex.state.lock().await;

        let mut backend_err = None;
        if let Some(adapter) = &self.adapter {
            if let Err(err) = adapter.force_unlock(&mutex.key_value).await {
                warn!(key = ?mutex.key, error = %err, "backend force release failed, clearing local state first");
                backend_err = Some(err);
            }
        }

        state.expire_at = 0;
        state.owner = None;
        if mutex.waiters.load(Ordering::Relaxed) > 0 {
            mutex.available.notify_one();
        }
        debug!(key = ?mutex.key, "force unlocked");

        match backend_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl<K: LockKey> Default for FlexLockRegistry<K> {
    fn default() -> Self {
        Self::new()
    }
}
