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

//! SQLite adapter integration tests.
//!
//! These tests verify:
//! - The conditional-update compare-and-swap and its tie-break
//! - Owner-checked and forced lease clearing
//! - Insert-if-absent key registration
//! - Exclusion between registries sharing one store
//! - Integer keys and custom table layouts

#[cfg(feature = "sqlite-backend")]
mod tests {
    use flexlock::{
        sql::{LockTableConfig, SqliteLockAdapter},
        FlexLockAdapter, FlexLockRegistry, KeyValue, LockError,
    };
    use std::sync::Arc;
    use std::time::Duration;

    async fn create_adapter() -> Arc<SqliteLockAdapter> {
        Arc::new(SqliteLockAdapter::new("sqlite::memory:").await.unwrap())
    }

    fn key() -> KeyValue {
        KeyValue::Text("test-key".to_string())
    }

    #[tokio::test]
    async fn try_lock_is_exclusive_until_expiry() {
        let adapter = create_adapter().await;
        adapter.ensure_key(&key()).await.unwrap();

        assert!(adapter.try_lock(&key(), "owner-a", 1_000, 2_000).await.unwrap());
        assert!(!adapter.try_lock(&key(), "owner-b", 1_999, 3_000).await.unwrap());
        // expiry exactly at "now" is reclaimable durably
        assert!(adapter.try_lock(&key(), "owner-b", 2_000, 3_000).await.unwrap());
    }

    #[tokio::test]
    async fn try_lock_requires_a_registered_key() {
        let adapter = create_adapter().await;
        assert!(!adapter.try_lock(&key(), "owner-a", 1_000, 2_000).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_key_is_idempotent() {
        let adapter = create_adapter().await;
        adapter.ensure_key(&key()).await.unwrap();
        assert!(adapter.try_lock(&key(), "owner-a", 1_000, 5_000).await.unwrap());
        // re-registering must not reset the live lease
        adapter.ensure_key(&key()).await.unwrap();
        assert!(!adapter.try_lock(&key(), "owner-b", 1_500, 5_000).await.unwrap());
    }

    #[tokio::test]
    async fn unlock_requires_the_recorded_owner() {
        let adapter = create_adapter().await;
        adapter.ensure_key(&key()).await.unwrap();
        assert!(adapter.try_lock(&key(), "owner-a", 1_000, 5_000).await.unwrap());

        adapter.unlock(&key(), "owner-b").await.unwrap();
        assert!(!adapter.try_lock(&key(), "owner-b", 1_500, 5_000).await.unwrap());

        adapter.unlock(&key(), "owner-a").await.unwrap();
        assert!(adapter.try_lock(&key(), "owner-b", 1_500, 5_000).await.unwrap());
    }

    #[tokio::test]
    async fn force_unlock_clears_any_owner() {
        let adapter = create_adapter().await;
        adapter.ensure_key(&key()).await.unwrap();
        assert!(adapter.try_lock(&key(), "owner-a", 1_000, 5_000).await.unwrap());

        adapter.force_unlock(&key()).await.unwrap();
        assert!(adapter.try_lock(&key(), "owner-b", 1_500, 5_000).await.unwrap());
    }

    #[tokio::test]
    async fn concurrent_try_lock_single_winner() {
        let adapter = create_adapter().await;
        adapter.ensure_key(&key()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..10 {
            let adapter = adapter.clone();
            tasks.push(tokio::spawn(async move {
                adapter
                    .try_lock(&key(), &format!("owner-{i}"), 1_000, 2_000)
                    .await
                    .unwrap()
            }));
        }

        let mut winners = 0;
        for task in tasks {
            if task.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1, "exactly one racing caller may win the CAS");
    }

    #[tokio::test]
    async fn registry_roundtrip_through_sqlite() {
        let registry = FlexLockRegistry::with_adapter(create_adapter().await);
        let handle = registry.lock("key", Duration::from_millis(1000)).await.unwrap();
        registry.unlock(handle).await.unwrap();
        let handle = registry.lock("key", Duration::from_millis(1000)).await.unwrap();
        registry.unlock(handle).await.unwrap();
        registry.unlock(handle).await.unwrap();
    }

    #[tokio::test]
    async fn excludes_across_registries_sharing_a_store() {
        let adapter = create_adapter().await;
        let registry_a = FlexLockRegistry::with_adapter(adapter.clone());
        let registry_b = FlexLockRegistry::with_adapter(adapter);

        let handle = registry_a.lock("job:1", Duration::from_secs(30)).await.unwrap();
        let denied = registry_b.try_lock("job:1", Duration::from_secs(30)).await;
        assert!(matches!(denied, Err(LockError::AlreadyLocked(_))));

        registry_a.unlock(handle).await.unwrap();
        let handle = registry_b.try_lock("job:1", Duration::from_secs(30)).await.unwrap();
        registry_b.unlock(handle).await.unwrap();
    }

    #[tokio::test]
    async fn force_unlock_frees_a_lock_held_elsewhere() {
        let adapter = create_adapter().await;
        let registry_a = FlexLockRegistry::with_adapter(adapter.clone());
        let registry_b = FlexLockRegistry::with_adapter(adapter);

        let held = registry_a.lock("job:2", Duration::from_secs(30)).await.unwrap();
        // registry B never held the lock; the durable lease is cleared anyway
        registry_b.force_unlock("job:2").await.unwrap();

        let handle = registry_b.try_lock("job:2", Duration::from_secs(30)).await.unwrap();
        registry_b.unlock(handle).await.unwrap();

        // A's local view is cleared lazily by its own late unlock
        registry_a.unlock(held).await.unwrap();
    }

    #[tokio::test]
    async fn integer_keys_roundtrip() {
        let registry = FlexLockRegistry::with_adapter(create_adapter().await);
        let handle = registry.lock(42i64, Duration::from_secs(5)).await.unwrap();
        let denied = registry.try_lock(42i64, Duration::from_secs(5)).await;
        assert!(matches!(denied, Err(LockError::AlreadyLocked(_))));
        registry.unlock(handle).await.unwrap();
    }

    #[tokio::test]
    async fn custom_table_layout() {
        let config = LockTableConfig {
            table: "job_leases".to_string(),
            key_column: "job_id".to_string(),
            expire_column: "lease_until".to_string(),
            owner_column: "holder".to_string(),
        };
        let adapter = Arc::new(
            SqliteLockAdapter::with_config("sqlite::memory:", config)
                .await
                .unwrap(),
        );
        let registry = FlexLockRegistry::with_adapter(adapter);
        let handle = registry.lock("key", Duration::from_millis(1000)).await.unwrap();
        registry.unlock(handle).await.unwrap();
    }
}
