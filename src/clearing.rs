use tracing::{info, trace};

use crate::constriction::{find_constricted_set, Constriction, WitnessStrategy};
use crate::error::ClearingError;
use crate::graph::{MarketGraph, UnsignedInt};
use crate::matching::{maximum_matching, Matching};
use crate::preferred::PreferredGraph;

/// Snapshot of one round, handed to a [`RoundObserver`].
///
/// `prices` are the prices the round's preferred graph was built from,
/// before any adjustment. When `constriction` is `Some`, each seller in its
/// neighborhood had its price raised by exactly 1 at the end of the round;
/// `None` means the round produced the perfect matching.
pub struct RoundReport<'a, I: UnsignedInt> {
    pub round: u32,
    pub prices: &'a [u64],
    pub preferred: &'a PreferredGraph<I>,
    pub matching: &'a Matching<I>,
    pub constriction: Option<&'a Constriction<I>>,
}

/// Read-only per-round observation hook for presentation layers
/// (verbose/interactive reporting). Never a control input.
pub trait RoundObserver<I: UnsignedInt> {
    fn on_round(&mut self, report: &RoundReport<'_, I>);
}

/// No-op observer.
impl<I: UnsignedInt> RoundObserver<I> for () {
    fn on_round(&mut self, _report: &RoundReport<'_, I>) {}
}

/// Result of a successful clearing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clearing<I: UnsignedInt> {
    /// one (buyer, seller) pair per buyer, ascending by buyer
    pub assignments: Vec<(I, I)>,
    /// final price of each seller, indexed by seller
    pub prices: Vec<u64>,
    /// number of rounds run, including the final matching round
    pub rounds: u32,
}

impl<I: UnsignedInt> Clearing<I> {
    /// Sum of the matched valuations.
    pub fn total_value(&self, market: &MarketGraph<I>) -> i64 {
        self.assignments
            .iter()
            .map(|&(buyer, seller)| {
                market
                    .valuation(buyer, seller)
                    .expect("assignment refers to a market edge")
            })
            .sum()
    }
}

/// Drives the clearing rounds: build the preferred graph, try to match,
/// otherwise raise the prices of a constricted set's neighborhood and
/// repeat. Prices are owned here and mutated only in the adjustment step.
#[derive(Debug, Clone)]
pub struct ClearingSolver {
    max_rounds: u32,
    strategy: WitnessStrategy,
}

impl Default for ClearingSolver {
    fn default() -> ClearingSolver {
        ClearingSolver::new()
    }
}

impl ClearingSolver {
    pub const DEFAULT_MAX_ROUNDS: u32 = 1000;

    pub fn new() -> ClearingSolver {
        ClearingSolver {
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
            strategy: WitnessStrategy::default(),
        }
    }

    /// Replaces the round safety bound (default 1000).
    pub fn with_max_rounds(mut self, max_rounds: u32) -> ClearingSolver {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_strategy(mut self, strategy: WitnessStrategy) -> ClearingSolver {
        self.strategy = strategy;
        self
    }

    pub fn solve<I: UnsignedInt>(
        &self,
        market: &MarketGraph<I>,
    ) -> Result<Clearing<I>, ClearingError> {
        self.solve_with_observer(market, &mut ())
    }

    /// Runs the clearing loop, reporting every round to `observer`.
    ///
    /// Returns the perfect matching and final prices, or a typed error:
    /// input validation failures surface before round 1, a missing witness
    /// while the matching is imperfect is an internal-consistency
    /// violation, and exceeding the round bound is non-convergence.
    pub fn solve_with_observer<I: UnsignedInt, O: RoundObserver<I> + ?Sized>(
        &self,
        market: &MarketGraph<I>,
        observer: &mut O,
    ) -> Result<Clearing<I>, ClearingError> {
        market.validate()?;
        let num_sellers: usize = market.num_sellers().as_();
        let mut prices = vec![0u64; num_sellers];

        for round in 1..=self.max_rounds {
            let preferred = PreferredGraph::build(market, &prices);
            trace!("round {}: prices {:?}", round, prices);
            trace!(
                "round {}: preferred edges {:?}",
                round,
                preferred.edges().collect::<Vec<_>>()
            );

            let matching = maximum_matching(&preferred);
            if matching.is_perfect() {
                observer.on_round(&RoundReport {
                    round,
                    prices: &prices,
                    preferred: &preferred,
                    matching: &matching,
                    constriction: None,
                });
                info!("market cleared after {} rounds", round);
                return Ok(Clearing {
                    assignments: matching.pairs(),
                    prices,
                    rounds: round,
                });
            }

            let constriction = find_constricted_set(&preferred, &matching, self.strategy)
                .ok_or_else(|| {
                    ClearingError::InternalConsistency(
                        "no constricted set exists while the matching is imperfect".to_string(),
                    )
                })?;
            observer.on_round(&RoundReport {
                round,
                prices: &prices,
                preferred: &preferred,
                matching: &matching,
                constriction: Some(&constriction),
            });
            for &seller in &constriction.sellers {
                let seller_usize: usize = seller.as_();
                prices[seller_usize] += 1;
            }
        }
        Err(ClearingError::NonConvergence {
            rounds: self.max_rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Clearing, ClearingSolver, RoundObserver, RoundReport};
    use crate::constriction::WitnessStrategy;
    use crate::error::ClearingError;
    use crate::graph::MarketGraph;
    use rand::distributions::{Distribution, Uniform};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use reservoir_sampling::unweighted::core::r as reservoir_sample;

    fn init() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .try_init();
    }

    fn market_from_edges(
        num_buyers: u32,
        num_sellers: u32,
        edges: &[(u32, u32, i64)],
    ) -> MarketGraph<u32> {
        let mut market = MarketGraph::with_capacity(num_buyers, num_sellers, edges.len()).unwrap();
        for &(buyer, seller, valuation) in edges {
            market.add_valuation(buyer, seller, valuation).unwrap();
        }
        market
    }

    /// Every matched buyer's payoff is maximal over all sellers it values.
    fn assert_equilibrium(market: &MarketGraph<u32>, clearing: &Clearing<u32>) {
        for &(buyer, seller) in &clearing.assignments {
            let payoff =
                market.valuation(buyer, seller).unwrap() - clearing.prices[seller as usize] as i64;
            let (sellers, valuations) = market.valuations_of(buyer);
            for (&other, &valuation) in sellers.iter().zip(valuations) {
                assert!(
                    payoff >= valuation - clearing.prices[other as usize] as i64,
                    "buyer {} would rather have seller {}",
                    buyer,
                    other
                );
            }
        }
    }

    fn assert_complete(clearing: &Clearing<u32>, num_buyers: u32) {
        assert_eq!(clearing.assignments.len(), num_buyers as usize);
        let mut sellers: Vec<u32> = clearing.assignments.iter().map(|&(_, s)| s).collect();
        sellers.sort_unstable();
        sellers.dedup();
        assert_eq!(sellers.len(), num_buyers as usize);
    }

    #[test]
    fn separable_market_clears_in_one_round() {
        init();
        let market = market_from_edges(
            2,
            2,
            &[(0, 0, 10), (0, 1, 8), (1, 0, 7), (1, 1, 9)],
        );
        let clearing = ClearingSolver::new().solve(&market).unwrap();
        assert_eq!(clearing.rounds, 1);
        assert_eq!(clearing.prices, vec![0, 0]);
        assert_eq!(clearing.assignments, vec![(0, 0), (1, 1)]);
        assert_eq!(clearing.total_value(&market), 19);
        assert_equilibrium(&market, &clearing);
    }

    #[test]
    fn contested_seller_is_priced_until_indifference() {
        init();
        // both buyers strictly prefer seller 0 until its price reaches 2
        let market = market_from_edges(
            2,
            2,
            &[(0, 0, 10), (0, 1, 8), (1, 0, 9), (1, 1, 7)],
        );
        let clearing = ClearingSolver::new().solve(&market).unwrap();
        assert_eq!(clearing.rounds, 3);
        assert_eq!(clearing.prices, vec![2, 0]);
        assert_eq!(clearing.assignments, vec![(0, 1), (1, 0)]);
        assert_equilibrium(&market, &clearing);
        assert_complete(&clearing, 2);
    }

    #[test]
    fn single_pair_matches_at_price_zero() {
        init();
        let market = market_from_edges(1, 1, &[(0, 0, 5)]);
        let clearing = ClearingSolver::new().solve(&market).unwrap();
        assert_eq!(clearing.rounds, 1);
        assert_eq!(clearing.prices, vec![0]);
        assert_eq!(clearing.assignments, vec![(0, 0)]);
    }

    #[test]
    fn buyer_without_valuations_is_rejected_up_front() {
        init();
        // buyer 1 has no valuation edge to any seller
        let market = market_from_edges(2, 2, &[(0, 0, 10), (0, 1, 8)]);
        let err = ClearingSolver::new().solve(&market).unwrap_err();
        assert!(matches!(err, ClearingError::InputValidation(_)));
    }

    #[test]
    fn round_bound_forces_non_convergence() {
        init();
        // needs two price raises; a bound of 1 cannot get there
        let market = market_from_edges(2, 2, &[(0, 0, 10), (0, 1, 8), (1, 0, 9), (1, 1, 7)]);
        let err = ClearingSolver::new()
            .with_max_rounds(1)
            .solve(&market)
            .unwrap_err();
        assert!(matches!(err, ClearingError::NonConvergence { rounds: 1 }));
    }

    struct PriceTrace {
        snapshots: Vec<Vec<u64>>,
        raised: Vec<Vec<u32>>,
    }

    impl RoundObserver<u32> for PriceTrace {
        fn on_round(&mut self, report: &RoundReport<'_, u32>) {
            self.snapshots.push(report.prices.to_vec());
            self.raised.push(
                report
                    .constriction
                    .map(|c| c.sellers.clone())
                    .unwrap_or_default(),
            );
        }
    }

    #[test]
    fn prices_rise_monotonically_and_only_in_the_raised_set() {
        init();
        let market = market_from_edges(
            3,
            3,
            &[
                (0, 0, 12),
                (0, 1, 10),
                (1, 0, 11),
                (1, 1, 9),
                (2, 0, 10),
                (2, 2, 4),
            ],
        );
        let mut trace = PriceTrace {
            snapshots: Vec::new(),
            raised: Vec::new(),
        };
        let clearing = ClearingSolver::new()
            .solve_with_observer(&market, &mut trace)
            .unwrap();
        assert_eq!(clearing.rounds as usize, trace.snapshots.len());
        for i in 0..trace.snapshots.len() - 1 {
            for seller in 0..trace.snapshots[i].len() {
                if trace.raised[i].contains(&(seller as u32)) {
                    assert_eq!(trace.snapshots[i + 1][seller], trace.snapshots[i][seller] + 1);
                } else {
                    assert_eq!(trace.snapshots[i + 1][seller], trace.snapshots[i][seller]);
                }
            }
        }
        assert_equilibrium(&market, &clearing);
        assert_complete(&clearing, 3);
    }

    #[test]
    fn hall_violation_is_reported_exactly() {
        init();
        let market = market_from_edges(2, 2, &[(0, 0, 10), (0, 1, 8), (1, 0, 9), (1, 1, 7)]);
        struct WitnessCheck;
        impl RoundObserver<u32> for WitnessCheck {
            fn on_round(&mut self, report: &RoundReport<'_, u32>) {
                if let Some(constriction) = report.constriction {
                    assert!(!constriction.buyers.is_empty());
                    assert!(constriction.sellers.len() < constriction.buyers.len());
                }
            }
        }
        ClearingSolver::new()
            .solve_with_observer(&market, &mut WitnessCheck)
            .unwrap();
    }

    /// Random sparse markets with a planted perfect matching either clear
    /// (and then satisfy the equilibrium property) or fail with the typed
    /// consistency error a buyer priced out of the market produces. They
    /// never spin until the round bound.
    #[test]
    fn random_markets_terminate_with_typed_outcome() {
        init();
        const SIZE: u32 = 8;
        const EXTRA_ARCS: usize = 2;
        let between = Uniform::from(1i64..20);

        for seed in 0..16u64 {
            let mut val_rng = ChaCha8Rng::seed_from_u64(seed);
            let mut filter_rng = ChaCha8Rng::seed_from_u64(seed + 100);

            let mut market = MarketGraph::<u32>::new(SIZE, SIZE).unwrap();
            for buyer in 0..SIZE {
                // plant one guaranteed seller plus a few random extras
                let mut extras = [0u32; EXTRA_ARCS];
                reservoir_sample(0..SIZE, &mut extras, &mut filter_rng);
                let mut sellers: Vec<u32> = extras.to_vec();
                sellers.push(buyer); // planted permutation edge
                sellers.sort_unstable();
                sellers.dedup();
                for seller in sellers {
                    market
                        .add_valuation(buyer, seller, between.sample(&mut val_rng))
                        .unwrap();
                }
            }

            for strategy in [WitnessStrategy::Enumerate, WitnessStrategy::AlternatingPath].iter() {
                match ClearingSolver::new().with_strategy(*strategy).solve(&market) {
                    Ok(clearing) => {
                        assert_complete(&clearing, SIZE);
                        assert_equilibrium(&market, &clearing);
                    }
                    Err(ClearingError::InternalConsistency(_)) => {
                        // a sparse market can price a buyer out entirely
                    }
                    Err(other) => panic!("seed {} failed: {}", seed, other),
                }
            }
        }
    }
}
