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

//! # FlexLock
//!
//! ## Purpose
//! Keyed mutual-exclusion locks with mandatory leases. A
//! [`FlexLockRegistry`] grants at-most-one-owner access to a logical
//! resource identified by an arbitrary key; every acquisition names a
//! lease, the maximum hold time after which the lock is reclaimable even
//! if never released. An optional backend adapter extends the guarantee
//! across process boundaries through a persistent store.
//!
//! ## Design Decisions
//! - **Lease-based expiration**: abandoned locks are reclaimed lazily at
//!   the next acquisition attempt, never by a background sweep
//! - **Per-key synchronization**: unrelated keys never contend; a blocked
//!   `lock` polls its key on a bounded interval as the liveness mechanism
//!   against missed wake-ups
//! - **Atomic conditional update**: backends decide acquisition with one
//!   compare-and-swap statement, making cross-process exclusion correct
//!   without transactions spanning reads
//! - **Pooled handles**: acquisitions are identified by small reusable
//!   tokens, and release through a stale handle is a tolerated no-op
//!
//! ## Backend Support
//! - **None**: in-process exclusion only (default)
//! - **InMemory**: shared lease table within one process (feature:
//!   `memory-backend`)
//! - **SQLite**: persistent, cross-process (feature: `sqlite-backend`)
//!
//! ## Examples
//!
//! ### Basic Usage
//! ```rust,no_run
//! use flexlock::FlexLockRegistry;
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = FlexLockRegistry::new();
//!
//! // Block until the key is ours, holding it for at most one second
//! let handle = registry.lock("orders:42", Duration::from_millis(1000)).await?;
//!
//! // ... critical section ...
//!
//! registry.unlock(handle).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ### Cross-process exclusion
//! ```rust,ignore
//! use flexlock::{sql::SqliteLockAdapter, FlexLockRegistry};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let adapter = Arc::new(SqliteLockAdapter::new("sqlite://locks.db").await?);
//! let registry = FlexLockRegistry::with_adapter(adapter);
//!
//! match registry.try_lock("batch:nightly", Duration::from_secs(300)).await {
//!     Ok(handle) => { /* we own the batch */ }
//!     Err(e) if e.is_already_locked() => { /* another process owns it */ }
//!     Err(e) => return Err(e.into()),
//! }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod handle;
pub mod key;
pub mod lock;
pub mod registry;

#[cfg(feature = "memory-backend")]
pub mod memory;

#[cfg(any(feature = "sqlite-backend", feature = "postgres-backend"))]
pub mod sql;

pub use adapter::FlexLockAdapter;
pub use error::{LockError, LockResult};
pub use handle::{FlexLockHandle, HandlePool};
pub use key::{KeyValue, LockKey};
pub use lock::FlexLock;
pub use registry::{FlexLockRegistry, DEFAULT_POLL_INTERVAL};

#[cfg(feature = "memory-backend")]
pub use memory::MemoryLockAdapter;

#[cfg(feature = "sqlite-backend")]
pub use sql::{LockTableConfig, SqliteLockAdapter};
