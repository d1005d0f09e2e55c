//! Database row type matching `migrations/0001_init.sql`.
//! Used by sqlx for typed queries.

use crate::types::Watch;

#[derive(Debug, sqlx::FromRow)]
pub struct WatchRow {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub threshold_price: i64,
}

impl From<WatchRow> for Watch {
    fn from(r: WatchRow) -> Self {
        // SQLite INTEGER is signed; ids and prices are written from u64 values.
        Watch {
            id: r.id,
            user_id: r.user_id as u64,
            item_id: r.item_id,
            threshold_price: r.threshold_price as u64,
        }
    }
}
