//! Recursive dual-description orbit database engine.
//!
//! Given a polyhedral cone as a matrix of extreme rays and a permutation group
//! acting on the rays, this crate enumerates the orbits of facets under the
//! group by adjacency decomposition: pick an unfinished facet orbit, enumerate
//! the facets of its sub-cone (recursively, through the same machinery), flip
//! each ridge to an adjacent facet, and deduplicate the results up to the
//! group action. Progress lives in an [`orbitstore::OrbitStore`], so an
//! interrupted run resumes where it stopped.

pub mod balinski;
pub mod bank;
pub mod db;
pub mod decompose;
pub mod driver;
pub mod key;
pub mod params;
pub mod sampling;

pub use bank::{Bank, MemoryBank};
pub use db::{DatabaseOrbits, OrbitId};
pub use driver::run_dual_desc;
pub use params::RunParams;

/// Error kind distinguishing unrecoverable failures from exhausted budgets.
///
/// `Fatal` is an operator or programming error: malformed input, store I/O
/// failure, an inconsistent group action. It propagates to process exit and is
/// never retried. `RuntimeExhausted` means the wall-clock budget ran out
/// mid-computation, or a finished run could not be certified complete by the
/// connectedness criterion; either way the persisted store holds the partial
/// progress and the run is safe to re-invoke.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("fatal: {0}")]
    Fatal(String),
    #[error("runtime budget exhausted; result inconclusive, store is resumable")]
    RuntimeExhausted,
}

impl From<orbitmath::MathError> for EngineError {
    fn from(e: orbitmath::MathError) -> Self {
        EngineError::Fatal(e.to_string())
    }
}
impl From<orbitstore::StoreError> for EngineError {
    fn from(e: orbitstore::StoreError) -> Self {
        EngineError::Fatal(e.to_string())
    }
}

/// Result type returned by engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
