//! Deterministic hashing of incidence vectors.
//!
//! The hash is a pure function of the packed incidence bytes: the same face
//! hashes identically on every worker of a run and across runs, which is what
//! shard routing and the pre-filter buckets need. It is *not* invariant under
//! the group action; group equivalence is handled by canonicalization before
//! anything is hashed. Collisions are expected and resolved by exact
//! comparison.

use std::hash::Hasher;

use orbitmath::Face;
use rustc_hash::FxHasher;

/// Seed for the shard-routing hash.
pub const ROUTING_SEED: u32 = 0x1b87_3560;
/// Seed for the dedup pre-filter buckets, distinct from routing so bucket
/// skew and shard skew stay uncorrelated.
pub const BUCKET_SEED: u32 = 0x9e37_79b9;

/// Hashes the incidence bit pattern of `face` under `seed`.
pub fn face_hash(face: &Face, seed: u32) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u32(seed);
    hasher.write(&face.to_bytes());
    hasher.finish()
}

/// Worker that owns `face` among `n_proc` workers.
pub fn owner_of(face: &Face, n_proc: usize) -> usize {
    (face_hash(face, ROUTING_SEED) % n_proc as u64) as usize
}
