use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::ApiKey;
use crate::error::{AppError, Result};
use crate::fetcher::{get_text, ListingSource, TornError};
use crate::types::{Listing, Source};

/// Official item market offers (Torn API v2). Without a key the source is
/// unavailable and never touches the network.
pub struct ItemMarketSource {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<ApiKey>,
}

impl ItemMarketSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<ApiKey>) -> Self {
        Self { client, base_url: base_url.into(), api_key }
    }
}

#[async_trait]
impl ListingSource for ItemMarketSource {
    fn source(&self) -> Source {
        Source::ItemMarket
    }

    async fn fetch_by_item_id(&self, item_id: i64) -> Result<Vec<Listing>> {
        let Some(key) = &self.api_key else {
            return Err(AppError::SourceUnavailable("item market requires TORN_API_KEY".to_string()));
        };
        let url = format!(
            "{}/v2/market/{}/itemmarket?key={}",
            self.base_url.trim_end_matches('/'),
            item_id,
            key.expose()
        );
        let body = get_text(&self.client, &url).await?;
        let listings = parse_item_market_listings(item_id, &body)?;
        debug!(item_id, count = listings.len(), "item market listings fetched");
        Ok(listings)
    }
}

#[derive(Debug, Deserialize)]
struct ItemMarketResponse {
    itemmarket: Option<ItemMarket>,
    error: Option<TornError>,
}

#[derive(Debug, Deserialize)]
struct ItemMarket {
    #[serde(default)]
    listings: Vec<ItemMarketListing>,
}

#[derive(Debug, Deserialize)]
struct ItemMarketListing {
    price: u64,
    amount: u64,
}

pub fn parse_item_market_listings(item_id: i64, body: &str) -> Result<Vec<Listing>> {
    let resp: ItemMarketResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.error {
        return Err(err.into());
    }
    Ok(resp
        .itemmarket
        .map(|m| m.listings)
        .unwrap_or_default()
        .into_iter()
        .map(|l| Listing {
            item_id,
            price: l.price,
            quantity: l.amount,
            source: Source::ItemMarket,
            seller_ref: None,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_market_listings() {
        let body = r#"{
            "itemmarket": {
                "item": {"id": 206, "name": "Xanax", "type": "Drug", "average_price": 830000},
                "listings": [
                    {"price": 1000, "amount": 1},
                    {"price": 1200, "amount": 7}
                ],
                "cache_timestamp": 1700000000
            },
            "_metadata": {"links": {"next": null, "prev": null}}
        }"#;
        let listings = parse_item_market_listings(206, body).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!((listings[0].price, listings[0].quantity), (1000, 1));
        assert_eq!((listings[1].price, listings[1].quantity), (1200, 7));
        assert!(listings.iter().all(|l| l.source == Source::ItemMarket && l.seller_ref.is_none()));
    }

    #[test]
    fn error_payload_becomes_upstream_error() {
        let body = r#"{"error": {"code": 2, "error": "Incorrect key"}}"#;
        match parse_item_market_listings(206, body) {
            Err(AppError::Upstream(msg)) => assert!(msg.contains("Incorrect key")),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let source = ItemMarketSource::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        let err = source.fetch_by_item_id(206).await.unwrap_err();
        assert!(matches!(err, AppError::SourceUnavailable(_)));
    }
}
