pub mod discord;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{format_money, Listing};

pub use discord::DiscordNotifier;

/// Delivers an alert. The monitor only waits for the call to complete or fail.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, channel_id: u64, mention_user_id: u64, message: &str) -> Result<()>;
}

pub fn format_alert(item_name: &str, threshold_price: u64, cheapest: &Listing) -> String {
    format!(
        "**{}** is now {} (x{}, {}), at or below your target of {}.\n{}",
        item_name,
        format_money(cheapest.price),
        cheapest.quantity,
        cheapest.source,
        format_money(threshold_price),
        cheapest.link(),
    )
}
