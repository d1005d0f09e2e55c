use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::db::store::{validate_threshold, WatchStore};
use crate::error::Result;
use crate::types::Watch;

/// Process-local store. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    /// watch_id → watch
    watches: DashMap<i64, Watch>,
    /// item_id → name
    items: DashMap<i64, String>,
    config: DashMap<String, String>,
    next_watch_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl WatchStore for MemoryStore {
    async fn list_watches(&self) -> Result<Vec<Watch>> {
        let mut watches: Vec<Watch> = self.watches.iter().map(|e| e.value().clone()).collect();
        watches.sort_by_key(|w| w.id);
        Ok(watches)
    }

    async fn add_watch(&self, user_id: u64, item_id: i64, threshold_price: u64) -> Result<i64> {
        validate_threshold(threshold_price)?;
        let id = self.next_watch_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.watches.insert(id, Watch { id, user_id, item_id, threshold_price });
        Ok(id)
    }

    async fn remove_watch(&self, watch_id: i64) -> Result<bool> {
        Ok(self.watches.remove(&watch_id).is_some())
    }

    async fn get_config(&self, key: &str) -> Result<Option<String>> {
        Ok(self.config.get(key).map(|v| v.value().clone()))
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.config.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn item_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        let name = name.trim();
        Ok(self
            .items
            .iter()
            .find(|e| e.value().eq_ignore_ascii_case(name))
            .map(|e| *e.key()))
    }

    async fn item_name(&self, item_id: i64) -> Result<Option<String>> {
        Ok(self.items.get(&item_id).map(|v| v.value().clone()))
    }

    async fn upsert_items(&self, items: &HashMap<i64, String>) -> Result<()> {
        for (id, name) in items {
            self.items.insert(*id, name.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;

    #[tokio::test]
    async fn ids_are_unique_and_ordered() {
        let store = MemoryStore::new();
        let a = store.add_watch(1, 206, 500).await.unwrap();
        let b = store.add_watch(1, 206, 500).await.unwrap();
        assert_ne!(a, b);

        let listed: Vec<i64> = store.list_watches().await.unwrap().iter().map(|w| w.id).collect();
        assert_eq!(listed, vec![a, b]);
    }

    #[tokio::test]
    async fn zero_threshold_is_rejected_like_sqlite() {
        let store = MemoryStore::new();
        assert!(matches!(store.add_watch(1, 206, 0).await, Err(AppError::BadRequest(_))));
        assert!(matches!(
            store.add_watch(1, 206, u64::MAX).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(store.list_watches().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn remove_twice_is_a_no_op() {
        let store = MemoryStore::new();
        let id = store.add_watch(1, 206, 500).await.unwrap();
        assert!(store.remove_watch(id).await.unwrap());
        assert!(!store.remove_watch(id).await.unwrap());
    }

    #[tokio::test]
    async fn item_lookup_ignores_case() {
        let store = MemoryStore::new();
        store
            .upsert_items(&HashMap::from([(206, "Xanax".to_string())]))
            .await
            .unwrap();
        assert_eq!(store.item_id_by_name("XANAX").await.unwrap(), Some(206));
    }
}
