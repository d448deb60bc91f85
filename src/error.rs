use thiserror::Error;

/// Failure modes of a clearing run.
///
/// Every error is raised at its point of detection and propagates to the
/// caller unchanged; the solver never returns a partial matching.
#[derive(Debug, Error)]
pub enum ClearingError {
    /// The input market graph is malformed, empty or attribute-incomplete.
    /// Detected before the round loop starts and never mid-algorithm.
    #[error("invalid market graph: {0}")]
    InputValidation(String),

    /// No Hall-violating buyer set exists even though no perfect matching
    /// does. Indicates a broken algorithmic invariant; always fatal.
    #[error("internal consistency violation: {0}")]
    InternalConsistency(String),

    /// The round safety bound was exceeded before a perfect matching
    /// appeared. The caller may re-invoke with a larger bound.
    #[error("no market-clearing prices found after {rounds} rounds")]
    NonConvergence { rounds: u32 },
}
