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

//! Lock handles and the reservation slot pool behind them.

use parking_lot::Mutex;
use std::collections::VecDeque;
use ulid::Ulid;

/// Handle representing one live acquisition of a lock.
///
/// Pairs the pool slot index with a globally unique token. The token,
/// rendered as a string, is the owner identity recorded by backends. A
/// handle is valid from [`HandlePool::reserve`] until [`HandlePool::release`];
/// a released slot may be reused for a later reservation under a fresh
/// token, so holding a handle across its release boundary is a logic error
/// the pool tolerates by treating the stale handle as already released.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct FlexLockHandle {
    index: u32,
    token: Ulid,
}

impl FlexLockHandle {
    /// Slot index within the pool.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Unique token identifying this reservation; the externally visible
    /// owner identity.
    pub fn token(&self) -> Ulid {
        self.token
    }
}

enum Slot<T> {
    Unused,
    InUse { token: Ulid, data: T },
}

/// Pool of reservation slots with index reuse.
///
/// Storage is an append-only slab plus a free list of recycled indices.
/// Invariant: an index is either in use or present exactly once in the
/// free list. All operations are O(1) amortized, never block beyond the
/// internal mutex, and are safe to call from any thread.
pub struct HandlePool<T> {
    inner: Mutex<PoolInner<T>>,
}

struct PoolInner<T> {
    slots: Vec<Slot<T>>,
    free: VecDeque<u32>,
}

impl<T> HandlePool<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                slots: Vec::new(),
                free: VecDeque::new(),
            }),
        }
    }

    /// Attaches `data` to a fresh or recycled slot and returns a handle
    /// uniquely identifying the reservation until the next `release`.
    pub fn reserve(&self, data: T) -> FlexLockHandle {
        let mut inner = self.inner.lock();
        let token = Ulid::new();
        let index = match inner.free.pop_front() {
            Some(index) => {
                inner.slots[index as usize] = Slot::InUse { token, data };
                index
            }
            None => {
                inner.slots.push(Slot::InUse { token, data });
                (inner.slots.len() - 1) as u32
            }
        };
        FlexLockHandle { index, token }
    }

    /// Detaches and returns the data associated with `handle`, marking the
    /// slot reusable.
    ///
    /// Release is idempotent: an already-released, recycled, or otherwise
    /// unknown handle returns `None` rather than erroring. Double-unlock
    /// tolerance in the registry rests on this.
    pub fn release(&self, handle: FlexLockHandle) -> Option<T> {
        let mut inner = self.inner.lock();
        let index = handle.index as usize;
        let live = matches!(
            inner.slots.get(index),
            Some(Slot::InUse { token, .. }) if *token == handle.token
        );
        if !live {
            return None;
        }
        let slot = std::mem::replace(&mut inner.slots[index], Slot::Unused);
        inner.free.push_back(handle.index);
        match slot {
            Slot::InUse { data, .. } => Some(data),
            Slot::Unused => None,
        }
    }
}

impl<T> Default for HandlePool<T> {
    fn default() -> Self {
        Self::new()
    }
}
