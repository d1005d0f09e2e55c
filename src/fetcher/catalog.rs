use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::config::ApiKey;
use crate::error::{AppError, Result};
use crate::fetcher::{get_text, ItemCatalog, TornError};

/// The Torn item list, used to resolve names the local table does not know yet.
pub struct TornCatalog {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<ApiKey>,
}

impl TornCatalog {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<ApiKey>) -> Self {
        Self { client, base_url: base_url.into(), api_key }
    }
}

#[async_trait]
impl ItemCatalog for TornCatalog {
    async fn fetch_all(&self) -> Result<HashMap<i64, String>> {
        let Some(key) = &self.api_key else {
            return Err(AppError::SourceUnavailable("item catalog requires TORN_API_KEY".to_string()));
        };
        let url = format!(
            "{}/torn/?selections=items&key={}",
            self.base_url.trim_end_matches('/'),
            key.expose()
        );
        let body = get_text(&self.client, &url).await?;
        let items = parse_catalog(&body)?;
        info!(count = items.len(), "Item catalog fetched");
        Ok(items)
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    items: Option<HashMap<String, CatalogEntry>>,
    error: Option<TornError>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
}

/// Keys are stringified ids; anything non-numeric is skipped.
pub fn parse_catalog(body: &str) -> Result<HashMap<i64, String>> {
    let resp: CatalogResponse = serde_json::from_str(body)?;
    if let Some(err) = resp.error {
        return Err(err.into());
    }
    Ok(resp
        .items
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, entry)| id.parse::<i64>().ok().map(|id| (id, entry.name)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_item_map() {
        let body = r#"{"items": {
            "206": {"name": "Xanax", "type": "Drug", "market_value": 830000},
            "180": {"name": "Bottle of Beer", "type": "Alcohol"},
            "bogus": {"name": "ignored"}
        }}"#;
        let items = parse_catalog(body).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.get(&206).map(String::as_str), Some("Xanax"));
        assert_eq!(items.get(&180).map(String::as_str), Some("Bottle of Beer"));
    }

    #[test]
    fn error_payload_is_reported() {
        let body = r#"{"error": {"code": 5, "error": "Too many requests"}}"#;
        assert!(matches!(parse_catalog(body), Err(AppError::Upstream(_))));
    }

    #[tokio::test]
    async fn missing_key_is_unavailable() {
        let catalog = TornCatalog::new(reqwest::Client::new(), "http://127.0.0.1:9", None);
        assert!(matches!(catalog.fetch_all().await, Err(AppError::SourceUnavailable(_))));
    }
}
