use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::api::health::HealthState;
use crate::api::latency::FetchLatency;
use crate::db::{notification_channel, WatchStore};
use crate::error::{AppError, Result};
use crate::fetcher::ListingSource;
use crate::monitor::aggregator::{aggregate, AggregateResult};
use crate::monitor::grouper::{group_by_item, WatchGroup};
use crate::monitor::rate_limit::RateLimiter;
use crate::notify::{format_alert, Notifier};
use crate::types::{unknown_item_name, Listing, NotificationConfig};

/// Failure of one item group. Logged by the scheduler, never propagated.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("both listing sources failed (bazaar: {bazaar}; item market: {market})")]
    BothSourcesFailed { bazaar: AppError, market: AppError },

    #[error("store error: {0}")]
    Store(#[from] AppError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupOutcome {
    /// Neither source had an offer; nothing was evaluated.
    NoListings,
    Evaluated { cheapest_price: u64, alerts_sent: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No alert destination configured.
    ConfigMissing,
    NoWatches,
    /// The store could not be read at cycle start.
    StoreUnavailable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleReport {
    Skipped(SkipReason),
    Completed { groups: usize, failed_groups: usize, alerts_sent: usize },
}

#[derive(Debug, Clone, Copy)]
pub struct MonitorSettings {
    /// Fixed cycle cadence.
    pub tick: Duration,
    /// Minimum gap between two item groups' fetches.
    pub rate_limit: Duration,
}

/// Periodically checks every watched item's cheapest offer and alerts the
/// watchers whose threshold has been reached.
///
/// One cycle runs at a time. Item groups are processed sequentially behind
/// the rate limiter; the two sources of a single group are fetched
/// concurrently and joined before evaluation. A satisfied watch is notified
/// and then removed, so a crash between the two can repeat one alert.
pub struct PriceMonitor {
    store: Arc<dyn WatchStore>,
    bazaar: Arc<dyn ListingSource>,
    market: Arc<dyn ListingSource>,
    notifier: Arc<dyn Notifier>,
    limiter: RateLimiter,
    tick: Duration,
    health: Arc<HealthState>,
    latency: Arc<FetchLatency>,
}

/// Owner side of a running monitor.
pub struct MonitorHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Signal shutdown and wait for the loop to exit. Work on the current
    /// item group is abandoned; its watches are retried by the next run.
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!("Price monitor task ended abnormally: {e}");
        }
    }
}

impl PriceMonitor {
    pub fn new(
        store: Arc<dyn WatchStore>,
        bazaar: Arc<dyn ListingSource>,
        market: Arc<dyn ListingSource>,
        notifier: Arc<dyn Notifier>,
        settings: MonitorSettings,
        health: Arc<HealthState>,
        latency: Arc<FetchLatency>,
    ) -> Self {
        Self {
            store,
            bazaar,
            market,
            notifier,
            limiter: RateLimiter::new(settings.rate_limit),
            tick: settings.tick,
            health,
            latency,
        }
    }

    pub fn start(self) -> MonitorHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(self.run(shutdown_rx));
        MonitorHandle { shutdown_tx, task }
    }

    async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        let mut ticker = interval(self.tick);
        // A cycle that overruns swallows the ticks it missed instead of
        // triggering back-to-back cycles.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.health.set_monitor_running(true);
        info!(tick_secs = self.tick.as_secs(), "Price monitor started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_rx.changed() => break,
            }

            tokio::select! {
                report = self.run_cycle() => log_report(report),
                _ = shutdown_rx.changed() => break,
            }
        }

        self.health.set_monitor_running(false);
        info!("Price monitor stopped");
    }

    /// One full pass over the current watch set.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let channel = match notification_channel(self.store.as_ref()).await {
            Ok(Some(c)) => c,
            Ok(None) => {
                debug!("No notification channel configured, skipping cycle");
                return CycleReport::Skipped(SkipReason::ConfigMissing);
            }
            Err(e) => {
                error!("Could not read notification channel: {e}");
                return CycleReport::Skipped(SkipReason::StoreUnavailable);
            }
        };

        let watches = match self.store.list_watches().await {
            Ok(w) if w.is_empty() => {
                debug!("No active watches, skipping cycle");
                return CycleReport::Skipped(SkipReason::NoWatches);
            }
            Ok(w) => w,
            Err(e) => {
                error!("Could not load watches: {e}");
                return CycleReport::Skipped(SkipReason::StoreUnavailable);
            }
        };

        let groups = group_by_item(watches);
        debug!(groups = groups.len(), "Cycle started");

        let mut failed_groups = 0usize;
        let mut alerts_sent = 0usize;
        for group in &groups {
            match self.process_group(group, channel).await {
                Ok(GroupOutcome::NoListings) => {
                    debug!(item_id = group.item_id, "No listings found");
                }
                Ok(GroupOutcome::Evaluated { cheapest_price, alerts_sent: sent }) => {
                    debug!(item_id = group.item_id, cheapest_price, alerts = sent, "Group evaluated");
                    alerts_sent += sent;
                }
                Err(e) => {
                    error!(item_id = group.item_id, "Item group failed: {e}");
                    failed_groups += 1;
                }
            }
        }

        self.health
            .record_cycle(now_secs(), alerts_sent as u64, failed_groups as u64);

        CycleReport::Completed { groups: groups.len(), failed_groups, alerts_sent }
    }

    async fn process_group(
        &mut self,
        group: &WatchGroup,
        channel: NotificationConfig,
    ) -> std::result::Result<GroupOutcome, FetchError> {
        self.limiter.wait().await;

        let (bazaar, market) = fetch_both(
            self.bazaar.as_ref(),
            self.market.as_ref(),
            &self.latency,
            group.item_id,
        )
        .await?;
        let agg = match aggregate(bazaar, market) {
            AggregateResult::NoListings => return Ok(GroupOutcome::NoListings),
            AggregateResult::Found(a) => a,
        };
        let cheapest = agg.cheapest();

        let mut item_name: Option<String> = None;
        let mut alerts_sent = 0usize;
        for watch in &group.watches {
            if !watch.is_satisfied_by(cheapest.price) {
                continue;
            }

            if item_name.is_none() {
                item_name = Some(
                    self.store
                        .item_name(group.item_id)
                        .await?
                        .unwrap_or_else(|| unknown_item_name(group.item_id)),
                );
            }
            let name = item_name.as_deref().unwrap_or_default();
            let message = format_alert(name, watch.threshold_price, cheapest);

            if let Err(e) = self.notifier.send(channel.channel_id, watch.user_id, &message).await {
                warn!(watch_id = watch.id, user_id = watch.user_id, "Alert delivery failed, will retry: {e}");
                continue;
            }

            self.store.remove_watch(watch.id).await?;
            alerts_sent += 1;
            info!(
                watch_id = watch.id,
                user_id = watch.user_id,
                item_id = group.item_id,
                price = cheapest.price,
                threshold = watch.threshold_price,
                "Alert sent: {name} at {} <= {}",
                cheapest.price,
                watch.threshold_price,
            );
        }

        Ok(GroupOutcome::Evaluated { cheapest_price: cheapest.price, alerts_sent })
    }
}

/// Fetch both sources for one item concurrently and join the outcomes. One
/// failed source degrades to an empty list; both failing is an error.
pub async fn fetch_both(
    bazaar: &dyn ListingSource,
    market: &dyn ListingSource,
    latency: &FetchLatency,
    item_id: i64,
) -> std::result::Result<(Vec<Listing>, Vec<Listing>), FetchError> {
    let (bazaar_result, market_result) = tokio::join!(
        timed_fetch(bazaar, latency, item_id),
        timed_fetch(market, latency, item_id),
    );

    match (bazaar_result, market_result) {
        (Err(bazaar_err), Err(market_err)) => Err(FetchError::BothSourcesFailed {
            bazaar: bazaar_err,
            market: market_err,
        }),
        (bazaar_result, market_result) => Ok((
            degrade(bazaar, item_id, bazaar_result),
            degrade(market, item_id, market_result),
        )),
    }
}

async fn timed_fetch(
    source: &dyn ListingSource,
    latency: &FetchLatency,
    item_id: i64,
) -> Result<Vec<Listing>> {
    let started = Instant::now();
    let result = source.fetch_by_item_id(item_id).await;
    // An unavailable source returns before any request; no latency to record.
    if !matches!(result, Err(AppError::SourceUnavailable(_))) {
        latency.for_source(source.source()).record(started.elapsed());
    }
    result
}

fn degrade(source: &dyn ListingSource, item_id: i64, result: Result<Vec<Listing>>) -> Vec<Listing> {
    match result {
        Ok(listings) => listings,
        // Expected when no credential is configured; not worth a warning every group.
        Err(AppError::SourceUnavailable(reason)) => {
            debug!(item_id, source = %source.source(), "Source unavailable: {reason}");
            Vec::new()
        }
        Err(e) => {
            warn!(item_id, source = %source.source(), "Source fetch failed: {e}");
            Vec::new()
        }
    }
}

fn log_report(report: CycleReport) {
    match report {
        CycleReport::Completed { groups, failed_groups, alerts_sent } => info!(
            groups,
            failed = failed_groups,
            alerts = alerts_sent,
            "Cycle complete: {groups} items checked, {alerts_sent} alerts, {failed_groups} failed",
        ),
        CycleReport::Skipped(reason) => debug!(?reason, "Cycle skipped"),
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
