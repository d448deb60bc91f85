use crate::graph::{MarketGraph, UnsignedInt};

/// Directed buyer -> seller graph of payoff-maximizing choices at a given
/// price vector. Derived afresh every round and never persisted across
/// rounds except implicitly through the prices that produced it.
#[derive(Debug, Clone)]
pub struct PreferredGraph<I: UnsignedInt> {
    num_buyers: I,
    num_sellers: I,
    // CSR over buyers, mirroring the market graph's row layout
    starts: Vec<usize>,
    sellers: Vec<I>,
}

impl<I: UnsignedInt> PreferredGraph<I> {
    /// Builds the preferred-seller graph: buyer `b` points at every seller
    /// that achieves `max(valuation(b, s) - price(s))` over the sellers `b`
    /// has a valuation for, provided that maximum payoff is non-negative.
    /// Ties are all kept. Pure function of its inputs.
    ///
    /// `prices` is indexed by seller and must cover every seller of the
    /// market graph.
    pub fn build(market: &MarketGraph<I>, prices: &[u64]) -> PreferredGraph<I> {
        let num_buyers_usize: usize = market.num_buyers().as_();
        let mut starts = Vec::with_capacity(num_buyers_usize + 1);
        starts.push(0);
        let mut preferred = Vec::new();

        for buyer in num_iter::range(I::zero(), market.num_buyers()) {
            let (sellers, valuations) = market.valuations_of(buyer);
            let mut max_payoff = i64::MIN;
            for (&seller, &valuation) in sellers.iter().zip(valuations) {
                let seller_usize: usize = seller.as_();
                let payoff = valuation - prices[seller_usize] as i64;
                if payoff > max_payoff {
                    max_payoff = payoff;
                }
            }
            // buyers with no edges, or only negative payoffs, stay isolated
            if !sellers.is_empty() && max_payoff >= 0 {
                for (&seller, &valuation) in sellers.iter().zip(valuations) {
                    let seller_usize: usize = seller.as_();
                    if valuation - prices[seller_usize] as i64 == max_payoff {
                        preferred.push(seller);
                    }
                }
            }
            starts.push(preferred.len());
        }

        PreferredGraph {
            num_buyers: market.num_buyers(),
            num_sellers: market.num_sellers(),
            starts,
            sellers: preferred,
        }
    }

    pub fn num_buyers(&self) -> I {
        self.num_buyers
    }

    pub fn num_sellers(&self) -> I {
        self.num_sellers
    }

    pub fn num_edges(&self) -> usize {
        self.sellers.len()
    }

    pub fn has_edges(&self) -> bool {
        !self.sellers.is_empty()
    }

    /// Preferred sellers of a buyer, in the market graph's edge order.
    pub fn sellers_of(&self, buyer: I) -> &[I] {
        self.sellers_at(buyer.as_())
    }

    pub(crate) fn sellers_at(&self, buyer: usize) -> &[I] {
        &self.sellers[self.starts[buyer]..self.starts[buyer + 1]]
    }

    /// Buyers with at least one preferred seller, ascending.
    pub fn buyers_with_edges(&self) -> impl Iterator<Item = I> + '_ {
        (0..self.starts.len() - 1)
            .filter(move |&b| self.starts[b] < self.starts[b + 1])
            .map(|b| I::from_usize(b).unwrap())
    }

    /// All preferred edges as (buyer, seller) pairs, ascending by buyer.
    pub fn edges(&self) -> impl Iterator<Item = (I, I)> + '_ {
        (0..self.starts.len() - 1).flat_map(move |b| {
            let buyer = I::from_usize(b).unwrap();
            self.sellers_at(b).iter().map(move |&s| (buyer, s))
        })
    }
}
