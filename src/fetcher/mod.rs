//! Outbound data sources: the two listing providers and the item catalog.

pub mod bazaar;
pub mod catalog;
pub mod item_market;

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::REQUEST_TIMEOUT_SECS;
use crate::error::{AppError, Result};
use crate::types::{Listing, Source};

pub use bazaar::BazaarSource;
pub use catalog::TornCatalog;
pub use item_market::ItemMarketSource;

/// One independent provider of sell offers.
#[async_trait]
pub trait ListingSource: Send + Sync {
    fn source(&self) -> Source;

    /// Current offers for `item_id`, in the provider's own order.
    async fn fetch_by_item_id(&self, item_id: i64) -> Result<Vec<Listing>>;
}

/// Full id → name mapping of tradeable items.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn fetch_all(&self) -> Result<HashMap<i64, String>>;
}

pub fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()?)
}

/// Torn reports failures as `{"error": {"code": n, "error": "..."}}` with a 200 status.
#[derive(Debug, Deserialize)]
pub struct TornError {
    pub code: i64,
    pub error: String,
}

impl From<TornError> for AppError {
    fn from(e: TornError) -> Self {
        AppError::Upstream(format!("Torn API error {}: {}", e.code, e.error))
    }
}

/// GET `url` and return the body. The url may carry a credential, so it is
/// stripped from any transport error before it can reach a log line.
pub(crate) async fn get_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let resp = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::Http(e.without_url()))?;
    resp.text().await.map_err(|e| AppError::Http(e.without_url()))
}
