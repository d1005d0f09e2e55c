use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::Result;
use crate::fetcher::{get_text, ListingSource};
use crate::types::{Listing, Source};

/// Player bazaar offers, via the weav3r.dev aggregator. Needs no credential.
pub struct BazaarSource {
    client: reqwest::Client,
    base_url: String,
}

impl BazaarSource {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl ListingSource for BazaarSource {
    fn source(&self) -> Source {
        Source::Bazaar
    }

    async fn fetch_by_item_id(&self, item_id: i64) -> Result<Vec<Listing>> {
        let url = format!("{}/api/marketplace/{}", self.base_url.trim_end_matches('/'), item_id);
        let body = get_text(&self.client, &url).await?;
        let listings = parse_bazaar_listings(item_id, &body)?;
        debug!(item_id, count = listings.len(), "bazaar listings fetched");
        Ok(listings)
    }
}

#[derive(Debug, Deserialize)]
struct BazaarResponse {
    #[serde(default)]
    listings: Vec<BazaarListing>,
}

#[derive(Debug, Deserialize)]
struct BazaarListing {
    player_id: Option<u64>,
    quantity: u64,
    price: u64,
}

/// Parse a marketplace response body. A body without `listings` is an empty
/// result, not an error.
pub fn parse_bazaar_listings(item_id: i64, body: &str) -> Result<Vec<Listing>> {
    let resp: BazaarResponse = serde_json::from_str(body)?;
    Ok(resp
        .listings
        .into_iter()
        .map(|l| Listing {
            item_id,
            price: l.price,
            quantity: l.quantity,
            source: Source::Bazaar,
            seller_ref: l.player_id,
        })
        .collect())
}
