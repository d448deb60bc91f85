use std::fmt::{Debug, Display};

use num_traits::{AsPrimitive, FromPrimitive, NumAssign, PrimInt, Unsigned};

use crate::error::ClearingError;

/// Index type for buyer and seller identifiers.
///
/// The maximum value of the type is reserved as the "unmatched" sentinel,
/// so a market may hold at most `I::max_value() - 1` sellers.
pub trait UnsignedInt:
    PrimInt + Unsigned + Display + Debug + AsPrimitive<usize> + FromPrimitive + NumAssign
{
}

impl<T> UnsignedInt for T where
    T: PrimInt + Unsigned + Display + Debug + AsPrimitive<usize> + FromPrimitive + NumAssign
{
}

/// Immutable assignment market: `num_buyers` buyers, `num_sellers` sellers
/// and the integer valuation each buyer places on the sellers it is willing
/// to consider. An absent edge means the buyer never prefers that seller.
///
/// Valuations are stored row-per-buyer in CSR form: `i_starts_stops[b]` and
/// `i_starts_stops[b + 1]` delimit buyer `b`'s slice of `column_indices` /
/// `valuations`. Rows are appended in non-decreasing buyer order and the
/// graph is never mutated once a clearing run starts.
#[derive(Debug, Clone)]
pub struct MarketGraph<I: UnsignedInt> {
    num_buyers: I,
    num_sellers: I,
    i_starts_stops: Vec<I>,
    j_counts: Vec<I>,
    column_indices: Vec<I>,
    valuations: Vec<i64>,
}

impl<I: UnsignedInt> MarketGraph<I> {
    pub fn new(num_buyers: I, num_sellers: I) -> Result<MarketGraph<I>, ClearingError> {
        Self::with_capacity(num_buyers, num_sellers, 0)
    }

    pub fn with_capacity(
        num_buyers: I,
        num_sellers: I,
        edge_capacity: usize,
    ) -> Result<MarketGraph<I>, ClearingError> {
        if num_buyers == I::zero() || num_sellers == I::zero() {
            return Err(ClearingError::InputValidation(
                "both buyer and seller partitions must be non-empty".to_string(),
            ));
        }
        if num_buyers > num_sellers {
            return Err(ClearingError::InputValidation(format!(
                "{} buyers cannot all be matched to {} sellers",
                num_buyers, num_sellers
            )));
        }
        if num_sellers == I::max_value() {
            return Err(ClearingError::InputValidation(format!(
                "number of sellers must be below the index type maximum {}",
                I::max_value()
            )));
        }
        let num_buyers_usize: usize = num_buyers.as_();
        let mut i_starts_stops = Vec::with_capacity(num_buyers_usize + 1);
        i_starts_stops.resize(2, I::zero());
        let mut j_counts = Vec::with_capacity(num_buyers_usize);
        j_counts.push(I::zero());
        Ok(MarketGraph {
            num_buyers,
            num_sellers,
            i_starts_stops,
            j_counts,
            column_indices: Vec::with_capacity(edge_capacity),
            valuations: Vec::with_capacity(edge_capacity),
        })
    }

    /// Appends one valuation edge. Edges must arrive in non-decreasing buyer
    /// order; skipped buyers get empty rows (and are later rejected by
    /// [`validate`](Self::validate)).
    pub fn add_valuation(
        &mut self,
        buyer: I,
        seller: I,
        valuation: i64,
    ) -> Result<(), ClearingError> {
        if buyer >= self.num_buyers {
            return Err(ClearingError::InputValidation(format!(
                "buyer {} out of range ({} buyers)",
                buyer, self.num_buyers
            )));
        }
        if seller >= self.num_sellers {
            return Err(ClearingError::InputValidation(format!(
                "seller {} out of range ({} sellers)",
                seller, self.num_sellers
            )));
        }
        let current_row = self.j_counts.len() - 1;
        let row: usize = buyer.as_();
        if row < current_row {
            return Err(ClearingError::InputValidation(format!(
                "valuation edges must be added in buyer order (got buyer {} after buyer {})",
                buyer, current_row
            )));
        }

        // open empty rows for any skipped buyers
        while self.j_counts.len() <= row {
            let last = *self.i_starts_stops.last().unwrap();
            self.i_starts_stops.push(last);
            self.j_counts.push(I::zero());
        }

        let stop = self.i_starts_stops[row + 1]
            .checked_add(&I::one())
            .ok_or_else(|| {
                ClearingError::InputValidation(format!(
                    "edge count overflows the index type maximum {}",
                    I::max_value()
                ))
            })?;
        self.i_starts_stops[row + 1] = stop;
        self.j_counts[row] += I::one();
        self.column_indices.push(seller);
        self.valuations.push(valuation);
        Ok(())
    }

    pub fn num_buyers(&self) -> I {
        self.num_buyers
    }

    pub fn num_sellers(&self) -> I {
        self.num_sellers
    }

    pub fn num_edges(&self) -> usize {
        self.column_indices.len()
    }

    /// Buyer `b`'s sellers and valuations, in insertion order. Buyers with
    /// no valuation edges yield empty slices.
    pub fn valuations_of(&self, buyer: I) -> (&[I], &[i64]) {
        let row: usize = buyer.as_();
        if row + 1 >= self.i_starts_stops.len() {
            return (&[], &[]);
        }
        let start: usize = self.i_starts_stops[row].as_();
        let stop: usize = self.i_starts_stops[row + 1].as_();
        (
            &self.column_indices[start..stop],
            &self.valuations[start..stop],
        )
    }

    /// The valuation buyer places on seller, if that edge exists.
    pub fn valuation(&self, buyer: I, seller: I) -> Option<i64> {
        let (sellers, values) = self.valuations_of(buyer);
        sellers
            .iter()
            .position(|&s| s == seller)
            .map(|idx| values[idx])
    }

    /// Boundary validation run before the orchestrator starts: the graph
    /// must have at least one edge and every buyer at least one valuation
    /// (a buyer without one can never be matched, so the market could only
    /// ever fail by non-convergence).
    pub fn validate(&self) -> Result<(), ClearingError> {
        if self.column_indices.is_empty() {
            return Err(ClearingError::InputValidation(
                "market graph has no valuation edges".to_string(),
            ));
        }
        for buyer in num_iter::range(I::zero(), self.num_buyers) {
            let (sellers, _) = self.valuations_of(buyer);
            if sellers.is_empty() {
                return Err(ClearingError::InputValidation(format!(
                    "buyer {} has no valuation edges",
                    buyer
                )));
            }
        }
        debug_assert!(*self.column_indices.iter().max().unwrap() < self.num_sellers);
        Ok(())
    }
}
