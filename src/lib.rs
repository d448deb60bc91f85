//! Market-clearing prices and perfect matchings for assignment markets.
//!
//! Given a bipartite market of buyers and sellers with integer valuations,
//! the solver finds non-negative integer prices and a perfect matching such
//! that every buyer is assigned a payoff-maximizing seller. Prices start at
//! zero and rise by unit increments on the seller neighborhood of a
//! Hall-violating ("constricted") buyer set, until the preferred-seller
//! graph admits a perfect matching.
//!
//! ```
//! use market_clearing::{ClearingSolver, MarketGraph};
//!
//! # fn main() -> Result<(), market_clearing::ClearingError> {
//! let mut market = MarketGraph::<u32>::new(2, 2)?;
//! market.add_valuation(0, 0, 10)?;
//! market.add_valuation(0, 1, 8)?;
//! market.add_valuation(1, 0, 7)?;
//! market.add_valuation(1, 1, 9)?;
//!
//! let clearing = ClearingSolver::new().solve(&market)?;
//! assert_eq!(clearing.assignments, vec![(0, 0), (1, 1)]);
//! assert_eq!(clearing.prices, vec![0, 0]);
//! assert_eq!(clearing.total_value(&market), 19);
//! # Ok(())
//! # }
//! ```

pub mod clearing;
pub mod constriction;
pub mod error;
pub mod graph;
pub mod matching;
pub mod preferred;

pub use crate::clearing::{Clearing, ClearingSolver, RoundObserver, RoundReport};
pub use crate::constriction::{find_constricted_set, Constriction, WitnessStrategy};
pub use crate::error::ClearingError;
pub use crate::graph::{MarketGraph, UnsignedInt};
pub use crate::matching::{maximum_matching, Matching};
pub use crate::preferred::PreferredGraph;
