use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Display name used when an item id has no catalog entry.
pub fn unknown_item_name(item_id: i64) -> String {
    format!("Unknown Item (ID: {item_id})")
}

// ---------------------------------------------------------------------------
// Watch
// ---------------------------------------------------------------------------

/// A user's standing request to be alerted once the cheapest offer for
/// `item_id` is at or below `threshold_price`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    pub id: i64,
    pub user_id: u64,
    pub item_id: i64,
    pub threshold_price: u64,
}

impl Watch {
    pub fn is_satisfied_by(&self, price: u64) -> bool {
        price <= self.threshold_price
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Player bazaars, scraped by a third-party aggregator.
    Bazaar,
    /// The official item market.
    ItemMarket,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Source::Bazaar => "Bazaar",
            Source::ItemMarket => "Item Market",
        };
        write!(f, "{s}")
    }
}

/// A single sell offer. Produced fresh every cycle, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub item_id: i64,
    pub price: u64,
    pub quantity: u64,
    pub source: Source,
    /// Seller player id for bazaar offers; item market offers are anonymous.
    pub seller_ref: Option<u64>,
}

impl Listing {
    /// Deep link a buyer can follow to this offer.
    pub fn link(&self) -> String {
        match (self.source, self.seller_ref) {
            (Source::Bazaar, Some(player_id)) => {
                format!("https://www.torn.com/bazaar.php?userId={player_id}")
            }
            _ => format!(
                "https://www.torn.com/page.php?sid=ItemMarket#/market/view=search&itemID={}",
                self.item_id
            ),
        }
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Where alerts are posted. Read once per cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub channel_id: u64,
}

/// `$1,234,567`
pub fn format_money(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    out.push('$');
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
