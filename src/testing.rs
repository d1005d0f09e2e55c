//! Stub collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::db::{MemoryStore, WatchStore};
use crate::error::{AppError, Result};
use crate::fetcher::{ItemCatalog, ListingSource};
use crate::notify::Notifier;
use crate::types::{Listing, Source, Watch};

/// Canned per-item responses; records every item id requested.
/// Items with no canned response return no listings.
pub struct StubSource {
    source: Source,
    responses: Mutex<HashMap<i64, std::result::Result<Vec<(u64, u64)>, String>>>,
    calls: Mutex<Vec<i64>>,
    unavailable: AtomicBool,
}

impl StubSource {
    pub fn new(source: Source) -> Arc<Self> {
        Arc::new(Self {
            source,
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        })
    }

    /// `(price, quantity)` offers, in provider order.
    pub fn respond(&self, item_id: i64, offers: &[(u64, u64)]) {
        self.responses.lock().unwrap().insert(item_id, Ok(offers.to_vec()));
    }

    pub fn fail(&self, item_id: i64) {
        self.responses.lock().unwrap().insert(item_id, Err("boom".to_string()));
    }

    /// Behave like a source with no credential: every item is `SourceUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Relaxed);
    }

    pub fn calls(&self) -> Vec<i64> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ListingSource for StubSource {
    fn source(&self) -> Source {
        self.source
    }

    async fn fetch_by_item_id(&self, item_id: i64) -> Result<Vec<Listing>> {
        self.calls.lock().unwrap().push(item_id);
        if self.unavailable.load(Ordering::Relaxed) {
            return Err(AppError::SourceUnavailable("no key".to_string()));
        }
        let response = self.responses.lock().unwrap().get(&item_id).cloned();
        match response {
            Some(Ok(offers)) => Ok(offers
                .into_iter()
                .map(|(price, quantity)| Listing {
                    item_id,
                    price,
                    quantity,
                    source: self.source,
                    seller_ref: None,
                })
                .collect()),
            Some(Err(msg)) => Err(AppError::Upstream(msg)),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(u64, u64, String)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `(channel_id, user_id, message)` per delivered alert.
    pub fn sent(&self) -> Vec<(u64, u64, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, channel_id: u64, mention_user_id: u64, message: &str) -> Result<()> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(AppError::Upstream("discord down".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((channel_id, mention_user_id, message.to_string()));
        Ok(())
    }
}

/// Serves a fixed catalog, or `SourceUnavailable` when built with `None`.
pub struct StubCatalog {
    items: Option<HashMap<i64, String>>,
    fetches: Mutex<usize>,
}

impl StubCatalog {
    pub fn new(items: Option<HashMap<i64, String>>) -> Arc<Self> {
        Arc::new(Self { items, fetches: Mutex::new(0) })
    }

    pub fn fetches(&self) -> usize {
        *self.fetches.lock().unwrap()
    }
}

#[async_trait]
impl ItemCatalog for StubCatalog {
    async fn fetch_all(&self) -> Result<HashMap<i64, String>> {
        *self.fetches.lock().unwrap() += 1;
        self.items
            .clone()
            .ok_or_else(|| AppError::SourceUnavailable("no key".to_string()))
    }
}

/// `MemoryStore` whose reads or individual removals can be made to fail.
pub struct FlakyStore {
    inner: Arc<MemoryStore>,
    fail_reads: AtomicBool,
    fail_removals: Mutex<HashSet<i64>>,
}

impl FlakyStore {
    pub fn wrap(inner: Arc<MemoryStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            fail_reads: AtomicBool::new(false),
            fail_removals: Mutex::new(HashSet::new()),
        })
    }

    /// Fail `get_config` and `list_watches`.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Relaxed);
    }

    pub fn fail_removal_of(&self, watch_id: i64) {
        self.fail_removals.lock().unwrap().insert(watch_id);
    }

    pub fn heal(&self) {
        self.set_fail_reads(false);
        self.fail_removals.lock().unwrap().clear();
    }

    fn read_guard(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::Relaxed) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl WatchStore for FlakyStore {
    async fn list_watches(&self) -> Result<Vec<Watch>> {
        self.read_guard()?;
        self.inner.list_watches().await
    }

    async fn add_watch(&self, user_id: u64, item_id: i64, threshold_price: u64) -> Result<i64> {
        self.inner.add_watch(user_id, item_id, threshold_price).await
    }

    async fn remove_watch(&self, watch_id: i64) -> Result<bool> {
        if self.fail_removals.lock().unwrap().contains(&watch_id) {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        self.inner.remove_watch(watch_id).await
    }

    async fn get_config(&self, key: &str) -> Result<Option<String>> {
        self.read_guard()?;
        self.inner.get_config(key).await
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<()> {
        self.inner.set_config(key, value).await
    }

    async fn item_id_by_name(&self, name: &str) -> Result<Option<i64>> {
        self.inner.item_id_by_name(name).await
    }

    async fn item_name(&self, item_id: i64) -> Result<Option<String>> {
        self.inner.item_name(item_id).await
    }

    async fn upsert_items(&self, items: &HashMap<i64, String>) -> Result<()> {
        self.inner.upsert_items(items).await
    }
}
