use crate::types::Listing;

/// Every offer for one item, cheapest first.
///
/// Invariant: `sorted` is non-empty and stably sorted by price, so
/// `sorted[0]` is the first minimum-price listing in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregate {
    sorted: Vec<Listing>,
}

impl Aggregate {
    pub fn cheapest(&self) -> &Listing {
        &self.sorted[0]
    }

    pub fn top(&self, n: usize) -> &[Listing] {
        &self.sorted[..n.min(self.sorted.len())]
    }

    pub fn total(&self) -> usize {
        self.sorted.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateResult {
    NoListings,
    Found(Aggregate),
}

/// Merge both sources' offers (bazaar first, then item market, each in the
/// provider's order) and rank them by price. Ties keep merge order, never
/// quantity or source.
pub fn aggregate(bazaar: Vec<Listing>, market: Vec<Listing>) -> AggregateResult {
    let mut all = bazaar;
    all.extend(market);
    if all.is_empty() {
        return AggregateResult::NoListings;
    }

    // `min_by_key` returns the first of equal minima; the stable sort puts
    // that same listing at the front.
    #[cfg(debug_assertions)]
    let first_min = all.iter().min_by_key(|l| l.price).cloned();

    all.sort_by_key(|l| l.price);

    #[cfg(debug_assertions)]
    debug_assert_eq!(first_min.as_ref(), all.first());

    AggregateResult::Found(Aggregate { sorted: all })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn bazaar(price: u64, quantity: u64, seller: u64) -> Listing {
        Listing { item_id: 1, price, quantity, source: Source::Bazaar, seller_ref: Some(seller) }
    }

    fn market(price: u64, quantity: u64) -> Listing {
        Listing { item_id: 1, price, quantity, source: Source::ItemMarket, seller_ref: None }
    }

    fn found(result: AggregateResult) -> Aggregate {
        match result {
            AggregateResult::Found(a) => a,
            AggregateResult::NoListings => panic!("expected listings"),
        }
    }

    #[test]
    fn both_empty_is_no_listings() {
        assert_eq!(aggregate(Vec::new(), Vec::new()), AggregateResult::NoListings);
    }

    #[test]
    fn one_empty_side_still_aggregates() {
        let a = found(aggregate(Vec::new(), vec![market(1000, 1)]));
        assert_eq!(a.cheapest().price, 1000);
        assert_eq!(a.total(), 1);

        let a = found(aggregate(vec![bazaar(850, 3, 9)], Vec::new()));
        assert_eq!(a.cheapest().source, Source::Bazaar);
    }

    #[test]
    fn cheapest_across_sources() {
        let a = found(aggregate(vec![bazaar(850, 3, 9)], vec![market(1000, 1)]));
        assert_eq!(a.cheapest().price, 850);
        assert_eq!(a.cheapest().quantity, 3);
        assert_eq!(a.cheapest().source, Source::Bazaar);
    }

    #[test]
    fn ties_go_to_first_in_merge_order() {
        // Equal price on both sides: bazaar comes first in the merge.
        let a = found(aggregate(vec![bazaar(500, 1, 9)], vec![market(500, 99)]));
        assert_eq!(a.cheapest().source, Source::Bazaar);

        // Equal price within one source: provider order wins, not quantity.
        let a = found(aggregate(vec![bazaar(700, 1, 1), bazaar(500, 1, 2), bazaar(500, 50, 3)], Vec::new()));
        assert_eq!(a.cheapest().seller_ref, Some(2));
    }

    #[test]
    fn sort_is_stable_and_agrees_with_cheapest() {
        let a = found(aggregate(
            vec![bazaar(900, 1, 1), bazaar(300, 1, 2), bazaar(300, 1, 3)],
            vec![market(300, 4), market(100, 5), market(900, 6)],
        ));
        let order: Vec<(u64, Option<u64>, u64)> =
            a.top(a.total()).iter().map(|l| (l.price, l.seller_ref, l.quantity)).collect();
        assert_eq!(
            order,
            vec![
                (100, None, 5),
                (300, Some(2), 1),
                (300, Some(3), 1),
                (300, None, 4),
                (900, Some(1), 1),
                (900, None, 6),
            ]
        );
        assert_eq!(a.cheapest(), &a.top(a.total())[0]);
        assert!(a.top(a.total()).iter().all(|l| a.cheapest().price <= l.price));
    }

    #[test]
    fn top_is_clamped_to_available() {
        let a = found(aggregate(vec![bazaar(3, 1, 1), bazaar(1, 1, 2)], vec![market(2, 1)]));
        let prices: Vec<u64> = a.top(5).iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![1, 2, 3]);
        assert_eq!(a.top(1).len(), 1);
    }

    #[test]
    fn cheapest_matches_minimum_for_many_shapes() {
        // Small deterministic sweep over price patterns.
        for seed in 0u64..40 {
            let bz: Vec<Listing> = (0..(seed % 5)).map(|i| bazaar((seed * 7 + i * 13) % 11, i, i)).collect();
            let mk: Vec<Listing> = (0..(seed % 4)).map(|i| market((seed * 3 + i * 5) % 11, i)).collect();
            let expected_min = bz.iter().chain(mk.iter()).map(|l| l.price).min();
            match aggregate(bz, mk) {
                AggregateResult::NoListings => assert!(expected_min.is_none()),
                AggregateResult::Found(a) => {
                    assert_eq!(Some(a.cheapest().price), expected_min);
                    assert_eq!(a.cheapest(), &a.top(a.total())[0]);
                }
            }
        }
    }
}
