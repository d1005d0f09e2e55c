use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tracing::{info, warn};

use crate::api::admin::require_admin;
use crate::api::health::{HealthSnapshot, HealthState};
use crate::api::latency::{FetchLatency, LatencySummary};
use crate::config::{ApiKey, NOTIFICATION_CHANNEL_KEY, TOP_LISTINGS};
use crate::db::{validate_threshold, WatchStore};
use crate::error::{AppError, Result};
use crate::fetcher::{ItemCatalog, ListingSource};
use crate::monitor::scheduler::fetch_both;
use crate::monitor::{aggregate, AggregateResult};
use crate::types::{unknown_item_name, Listing, NotificationConfig, Source};

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn WatchStore>,
    pub bazaar: Arc<dyn ListingSource>,
    pub market: Arc<dyn ListingSource>,
    pub catalog: Arc<dyn ItemCatalog>,
    pub health: Arc<HealthState>,
    pub latency: Arc<FetchLatency>,
    /// Bearer token accepted by admin routes; None disables them.
    pub admin_token: Option<ApiKey>,
    /// Signalled by `POST /admin/shutdown`; the server's graceful-shutdown
    /// future waits on it alongside Ctrl-C.
    pub shutdown: Arc<Notify>,
}

pub fn router(state: ApiState) -> Router {
    let admin = Router::new()
        .route("/config/notification-channel", put(set_notification_channel))
        .route("/admin/shutdown", post(request_shutdown))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(get_health))
        .route("/stats/latency", get(get_stats_latency))
        .route("/items/:name/price", get(get_item_price))
        .route("/watches", get(list_watches).post(create_watch))
        .route("/watches/:id", delete(delete_watch))
        .merge(admin)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateWatchRequest {
    pub user_id: u64,
    pub item_name: String,
    pub threshold_price: u64,
}

#[derive(Deserialize)]
pub struct NotificationChannelRequest {
    pub channel_id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WatchResponse {
    pub watch_id: i64,
    pub user_id: u64,
    pub item_id: i64,
    pub item_name: String,
    pub threshold_price: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListingResponse {
    pub price: u64,
    pub quantity: u64,
    pub source: Source,
    pub link: String,
}

impl From<&Listing> for ListingResponse {
    fn from(l: &Listing) -> Self {
        Self { price: l.price, quantity: l.quantity, source: l.source, link: l.link() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PriceCheckResponse {
    pub item_id: i64,
    pub item_name: String,
    pub cheapest: ListingResponse,
    pub top: Vec<ListingResponse>,
    pub total_listings: usize,
}

#[derive(Serialize)]
pub struct LatencyResponse {
    pub bazaar: LatencySummary,
    pub item_market: LatencySummary,
}

// ---------------------------------------------------------------------------
// Item resolution
// ---------------------------------------------------------------------------

/// Resolve a user-typed name to `(item_id, canonical name)`. Unknown names
/// trigger one catalog refresh when the catalog is usable.
async fn resolve_item(state: &ApiState, name: &str) -> Result<(i64, String)> {
    let mut item_id = state.store.item_id_by_name(name).await?;

    if item_id.is_none() {
        match state.catalog.fetch_all().await {
            Ok(items) if !items.is_empty() => {
                state.store.upsert_items(&items).await?;
                info!(count = items.len(), "Item table refreshed from catalog");
                item_id = state.store.item_id_by_name(name).await?;
            }
            Ok(_) => {}
            Err(AppError::SourceUnavailable(_)) => {}
            Err(e) => warn!("Catalog refresh failed: {e}"),
        }
    }

    let Some(item_id) = item_id else {
        return Err(AppError::NotFound(format!("item '{name}'")));
    };
    let canonical = state
        .store
        .item_name(item_id)
        .await?
        .unwrap_or_else(|| name.to_string());
    Ok((item_id, canonical))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn get_health(State(state): State<ApiState>) -> Json<HealthSnapshot> {
    Json(state.health.snapshot())
}

async fn get_stats_latency(State(state): State<ApiState>) -> Json<LatencyResponse> {
    Json(LatencyResponse {
        bazaar: state.latency.summary(Source::Bazaar),
        item_market: state.latency.summary(Source::ItemMarket),
    })
}

async fn get_item_price(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> Result<Json<PriceCheckResponse>> {
    let (item_id, item_name) = resolve_item(&state, &name).await?;

    let (bazaar, market) = fetch_both(
        state.bazaar.as_ref(),
        state.market.as_ref(),
        &state.latency,
        item_id,
    )
    .await
    .map_err(|e| AppError::Upstream(e.to_string()))?;

    let agg = match aggregate(bazaar, market) {
        AggregateResult::Found(a) => a,
        AggregateResult::NoListings => {
            return Err(AppError::NotFound(format!("listings for '{item_name}'")));
        }
    };

    Ok(Json(PriceCheckResponse {
        item_id,
        item_name,
        cheapest: agg.cheapest().into(),
        top: agg.top(TOP_LISTINGS).iter().map(ListingResponse::from).collect(),
        total_listings: agg.total(),
    }))
}

async fn list_watches(State(state): State<ApiState>) -> Result<Json<Vec<WatchResponse>>> {
    let watches = state.store.list_watches().await?;
    let mut out = Vec::with_capacity(watches.len());
    for w in watches {
        let item_name = state
            .store
            .item_name(w.item_id)
            .await?
            .unwrap_or_else(|| unknown_item_name(w.item_id));
        out.push(WatchResponse {
            watch_id: w.id,
            user_id: w.user_id,
            item_id: w.item_id,
            item_name,
            threshold_price: w.threshold_price,
        });
    }
    Ok(Json(out))
}

async fn create_watch(
    State(state): State<ApiState>,
    Json(req): Json<CreateWatchRequest>,
) -> Result<(StatusCode, Json<WatchResponse>)> {
    validate_threshold(req.threshold_price)?;

    let (item_id, item_name) = resolve_item(&state, &req.item_name).await?;
    let watch_id = state
        .store
        .add_watch(req.user_id, item_id, req.threshold_price)
        .await?;
    info!(watch_id, user_id = req.user_id, item_id, threshold = req.threshold_price, "Watch added");

    Ok((
        StatusCode::CREATED,
        Json(WatchResponse {
            watch_id,
            user_id: req.user_id,
            item_id,
            item_name,
            threshold_price: req.threshold_price,
        }),
    ))
}

async fn delete_watch(State(state): State<ApiState>, Path(id): Path<i64>) -> Result<StatusCode> {
    if state.store.remove_watch(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("watch {id}")))
    }
}

async fn set_notification_channel(
    State(state): State<ApiState>,
    Json(req): Json<NotificationChannelRequest>,
) -> Result<Json<NotificationConfig>> {
    state
        .store
        .set_config(NOTIFICATION_CHANNEL_KEY, &req.channel_id.to_string())
        .await?;
    info!(channel_id = req.channel_id, "Notification channel set");
    Ok(Json(NotificationConfig { channel_id: req.channel_id }))
}

async fn request_shutdown(State(state): State<ApiState>) -> StatusCode {
    info!("Shutdown requested over the admin API");
    state.shutdown.notify_one();
    StatusCode::ACCEPTED
}
