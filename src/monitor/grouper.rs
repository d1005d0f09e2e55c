use std::collections::HashMap;

use crate::types::Watch;

/// All watches on one item, in the order they were encountered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchGroup {
    pub item_id: i64,
    pub watches: Vec<Watch>,
}

/// Partition watches by item so each item is fetched once per cycle no matter
/// how many users watch it.
///
/// Groups come out in order of each item's first appearance in `watches`;
/// within a group the input order is kept. Every input watch lands in exactly
/// one group.
pub fn group_by_item(watches: Vec<Watch>) -> Vec<WatchGroup> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<WatchGroup> = Vec::new();

    for watch in watches {
        let slot = *index.entry(watch.item_id).or_insert_with(|| {
            groups.push(WatchGroup { item_id: watch.item_id, watches: Vec::new() });
            groups.len() - 1
        });
        groups[slot].watches.push(watch);
    }

    groups
}
