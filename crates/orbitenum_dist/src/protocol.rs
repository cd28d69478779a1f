//! Wire messages exchanged between workers.
//!
//! Exactly two message kinds exist. `NewFacets` carries a batch of routed
//! faces; `Termination` is the one-shot quiescence notice of the two-phase
//! termination protocol. There are no other tags.

use orbitmath::Face;

/// A message from one worker to another.
#[derive(Debug, Clone)]
pub enum Message {
    /// Facets discovered elsewhere that the receiving worker owns.
    NewFacets(FacetBatch),
    /// "I will never send again." Sent exactly once per worker per run.
    Termination,
}

/// Batch of routed faces, flushed together per destination.
#[derive(Debug, Clone)]
pub struct FacetBatch {
    /// Rank that produced the batch.
    pub origin_rank: usize,
    /// The faces, each with its addressing hash and provenance.
    pub faces: Vec<RoutedFace>,
}

/// One face in flight, with the envelope fields of the protocol.
#[derive(Debug, Clone)]
pub struct RoutedFace {
    /// Canonical incidence vector.
    pub face: Face,
    /// Routing hash of `face`; the receiver owns `hash % n_proc`.
    pub hash: u64,
    /// Orbit index on the origin rank whose decomposition produced this face.
    /// Diagnostics only; never used for correctness.
    pub origin_orbit: u64,
    /// Position within that decomposition's output. Diagnostics only.
    pub adjacency_index: u32,
}

/// Per-worker results pulled together by the final gather.
#[derive(Debug, Clone, Default)]
pub struct LocalReport {
    /// Orbit representatives owned by the worker.
    pub faces: Vec<Face>,
    /// Adjacency edges recorded by the worker, as canonical face pairs.
    pub edges: Vec<(Face, Face)>,
}
