//! Incidence vectors, permutation groups, and exact rational cone geometry.
//!
//! Everything here is exact: cone computations run over [`num_rational::BigRational`]
//! and group computations run over explicit permutation images. There is no
//! floating-point anywhere in this crate.

#[macro_use]
pub mod ti;

pub mod dualdesc;
pub mod face;
pub mod matrix;
pub mod perm;

pub use dualdesc::{dual_description, dual_description_limited, facet_functional, flip};
pub use face::Face;
pub use matrix::QMatrix;
pub use perm::{Perm, PermGroup};

/// Error from exact cone geometry or group operations.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("face has length {got} but the vertex set has {expected} elements")]
    BadFaceLength { expected: usize, got: usize },
    #[error("permutation images are not a bijection on 0..{0}")]
    BadPermutation(usize),
    #[error("expected a supporting functional but ray {ray} evaluates negative")]
    NotSupporting { ray: usize },
    #[error("kernel of the selected rays is degenerate (dimension {dim})")]
    DegenerateKernel { dim: usize },
    #[error("matrix of extreme rays must have at least one row")]
    EmptyRayMatrix,
}

/// Result type returned by exact math operations.
pub type MathResult<T> = Result<T, MathError>;
