use std::collections::VecDeque;

use tracing::trace;

use crate::graph::UnsignedInt;
use crate::matching::Matching;
use crate::preferred::PreferredGraph;

/// A Hall-violating witness: a buyer set S with neighborhood N(S) in the
/// preferred graph such that |N(S)| < |S|. Both vectors are in ascending
/// index order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constriction<I: UnsignedInt> {
    pub buyers: Vec<I>,
    pub sellers: Vec<I>,
}

/// How the constricted-set witness is extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WitnessStrategy {
    /// Pick per instance: exhaustive enumeration up to
    /// [`ENUMERATE_LIMIT`](WitnessStrategy::ENUMERATE_LIMIT) active buyers,
    /// alternating-path extraction beyond that.
    Auto,
    /// Enumerate buyer subsets in increasing size, lexicographically within
    /// a size, and return the first Hall violation. Yields the minimal,
    /// deterministically-chosen witness; exponential in the number of
    /// buyers with preferred edges.
    Enumerate,
    /// Derive the witness from a failed maximum matching: the alternating-
    /// reachable buyer set of the lowest-indexed unmatched buyer satisfies
    /// |N(S)| = |S| - 1. Linear time; may pick a different (equally valid)
    /// witness than enumeration.
    AlternatingPath,
}

impl WitnessStrategy {
    /// Largest active-buyer count for which `Auto` still enumerates.
    pub const ENUMERATE_LIMIT: usize = 16;
}

impl Default for WitnessStrategy {
    fn default() -> WitnessStrategy {
        WitnessStrategy::Auto
    }
}

/// Searches the preferred graph for a constricted buyer set.
///
/// Returns `None` when the preferred graph has no edges, or when no
/// Hall violation exists among the buyers that do have edges (with a
/// maximum `matching`, the latter means those buyers are all matched).
/// The caller decides whether `None` is an invariant violation.
pub fn find_constricted_set<I: UnsignedInt>(
    preferred: &PreferredGraph<I>,
    matching: &Matching<I>,
    strategy: WitnessStrategy,
) -> Option<Constriction<I>> {
    if !preferred.has_edges() {
        return None;
    }
    let found = match strategy {
        WitnessStrategy::Enumerate => enumerate_witness(preferred),
        WitnessStrategy::AlternatingPath => alternating_witness(preferred, matching),
        WitnessStrategy::Auto => {
            if preferred.buyers_with_edges().count() <= WitnessStrategy::ENUMERATE_LIMIT {
                enumerate_witness(preferred)
            } else {
                alternating_witness(preferred, matching)
            }
        }
    };
    if let Some(ref constriction) = found {
        debug_assert!(constriction.sellers.len() < constriction.buyers.len());
        trace!(
            "constricted buyers {:?} with neighborhood {:?}",
            constriction.buyers,
            constriction.sellers
        );
    }
    found
}

/// Brute-force search over subsets of the buyers that have preferred
/// edges, smallest subsets first.
fn enumerate_witness<I: UnsignedInt>(preferred: &PreferredGraph<I>) -> Option<Constriction<I>> {
    let active: Vec<I> = preferred.buyers_with_edges().collect();
    let num_sellers: usize = preferred.num_sellers().as_();
    let mut in_neighborhood = vec![false; num_sellers];

    for size in 1..=active.len() {
        let mut combination: Vec<usize> = (0..size).collect();
        loop {
            in_neighborhood.iter_mut().for_each(|x| *x = false);
            let mut neighborhood_len = 0usize;
            for &k in &combination {
                for &seller in preferred.sellers_of(active[k]) {
                    let seller_usize: usize = seller.as_();
                    if !in_neighborhood[seller_usize] {
                        in_neighborhood[seller_usize] = true;
                        neighborhood_len += 1;
                    }
                }
            }
            if neighborhood_len < size {
                let buyers = combination.iter().map(|&k| active[k]).collect();
                let sellers = (0..num_sellers)
                    .filter(|&s| in_neighborhood[s])
                    .map(|s| I::from_usize(s).unwrap())
                    .collect();
                return Some(Constriction { buyers, sellers });
            }
            if !next_combination(&mut combination, active.len()) {
                break;
            }
        }
    }
    None
}

/// Advances `combination` to the lexicographically next size-k subset of
/// `0..n`; returns false once exhausted.
fn next_combination(combination: &mut [usize], n: usize) -> bool {
    let size = combination.len();
    let mut i = size;
    while i > 0 {
        i -= 1;
        if combination[i] != i + n - size {
            combination[i] += 1;
            for j in i + 1..size {
                combination[j] = combination[j - 1] + 1;
            }
            return true;
        }
    }
    false
}

/// Witness extraction from a failed maximum matching: breadth-first search
/// from the lowest-indexed unmatched buyer with edges, alternating between
/// preferred edges (buyer to seller) and matching edges (seller back to its
/// buyer). Since no augmenting path exists, every reached seller is matched
/// to a reached buyer, so the reached buyer set is constricted.
fn alternating_witness<I: UnsignedInt>(
    preferred: &PreferredGraph<I>,
    matching: &Matching<I>,
) -> Option<Constriction<I>> {
    let num_buyers: usize = preferred.num_buyers().as_();
    let num_sellers: usize = preferred.num_sellers().as_();
    let root = (0..num_buyers).find(|&b| {
        !preferred.sellers_at(b).is_empty() && matching.buyer_to_seller[b] == I::max_value()
    })?;

    let mut buyer_reached = vec![false; num_buyers];
    let mut seller_reached = vec![false; num_sellers];
    buyer_reached[root] = true;
    let mut queue = VecDeque::new();
    queue.push_back(root);

    while let Some(buyer) = queue.pop_front() {
        for &seller in preferred.sellers_at(buyer) {
            let seller_usize: usize = seller.as_();
            if seller_reached[seller_usize] {
                continue;
            }
            seller_reached[seller_usize] = true;
            let owner = matching.seller_to_buyer[seller_usize];
            if owner != I::max_value() {
                let owner_usize: usize = owner.as_();
                if !buyer_reached[owner_usize] {
                    buyer_reached[owner_usize] = true;
                    queue.push_back(owner_usize);
                }
            }
        }
    }

    let buyers: Vec<I> = (0..num_buyers)
        .filter(|&b| buyer_reached[b])
        .map(|b| I::from_usize(b).unwrap())
        .collect();
    let sellers: Vec<I> = (0..num_sellers)
        .filter(|&s| seller_reached[s])
        .map(|s| I::from_usize(s).unwrap())
        .collect();
    // holds whenever `matching` is maximum; a free reached seller would
    // mean an augmenting path existed
    if sellers.len() < buyers.len() {
        Some(Constriction { buyers, sellers })
    } else {
        None
    }
}
