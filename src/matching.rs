use crate::graph::UnsignedInt;
use crate::preferred::PreferredGraph;

/// A matching on the preferred graph.
///
/// Unmatched buyers and sellers are marked by the maximum value of the
/// index type (`u32::MAX` for `u32`).
#[derive(Debug, Clone)]
pub struct Matching<I: UnsignedInt> {
    /// index b gives the seller matched to buyer b
    pub buyer_to_seller: Vec<I>,
    /// index s gives the buyer matched to seller s
    pub seller_to_buyer: Vec<I>,
}

impl<I: UnsignedInt> Matching<I> {
    pub fn num_matched(&self) -> usize {
        self.buyer_to_seller
            .iter()
            .filter(|&&s| s != I::max_value())
            .count()
    }

    /// Perfect with respect to the full market: every buyer is matched.
    /// A buyer absent from the preferred graph can never be matched and
    /// therefore blocks perfection.
    pub fn is_perfect(&self) -> bool {
        self.buyer_to_seller.iter().all(|&s| s != I::max_value())
    }

    /// Matched (buyer, seller) pairs in ascending buyer order.
    pub fn pairs(&self) -> Vec<(I, I)> {
        self.buyer_to_seller
            .iter()
            .enumerate()
            .filter(|(_, &s)| s != I::max_value())
            .map(|(b, &s)| (I::from_usize(b).unwrap(), s))
            .collect()
    }
}

/// Maximum-cardinality matching on the preferred graph via Kuhn's
/// augmenting-path algorithm. Buyers are processed in ascending index
/// order and adjacency in stored order, so results are deterministic.
pub fn maximum_matching<I: UnsignedInt>(preferred: &PreferredGraph<I>) -> Matching<I> {
    let num_buyers: usize = preferred.num_buyers().as_();
    let num_sellers: usize = preferred.num_sellers().as_();
    let mut matching = Matching {
        buyer_to_seller: vec![I::max_value(); num_buyers],
        seller_to_buyer: vec![I::max_value(); num_sellers],
    };
    let mut visited = vec![false; num_sellers];
    for buyer in 0..num_buyers {
        if preferred.sellers_at(buyer).is_empty() {
            continue;
        }
        visited.iter_mut().for_each(|v| *v = false);
        augment(preferred, buyer, &mut matching, &mut visited);
    }
    matching
}

/// Tries to find an augmenting path from `buyer`; reassigns along the path
/// on success.
fn augment<I: UnsignedInt>(
    preferred: &PreferredGraph<I>,
    buyer: usize,
    matching: &mut Matching<I>,
    visited: &mut [bool],
) -> bool {
    for &seller in preferred.sellers_at(buyer) {
        let seller_usize: usize = seller.as_();
        if visited[seller_usize] {
            continue;
        }
        visited[seller_usize] = true;
        let owner = matching.seller_to_buyer[seller_usize];
        if owner == I::max_value() || augment(preferred, owner.as_(), matching, visited) {
            matching.buyer_to_seller[buyer] = seller;
            matching.seller_to_buyer[seller_usize] = I::from_usize(buyer).unwrap();
            return true;
        }
    }
    false
}
