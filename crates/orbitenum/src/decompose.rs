//! Adjacency decomposition of one facet orbit.
//!
//! Given a facet representative and its stabilizer, enumerate the facets of
//! the facet's sub-cone (its ridges), keep one representative per ridge orbit
//! under the restricted stabilizer, and flip every representative back to an
//! adjacent facet of the full cone. The output is *not* deduplicated under
//! the full group; that is the database's job.

use std::time::Instant;

use orbitmath::{Face, PermGroup, QMatrix, dual_description, flip};
use rustc_hash::FxHashSet;

use crate::bank::{Bank, CanonicalCone};
use crate::params::RunParams;
use crate::{EngineError, EngineResult, driver};

/// Decomposition context for one run: the cone, the bank of solved sub-cones,
/// and the run's budget.
pub struct Decomposer<'a> {
    ext: &'a QMatrix,
    bank: &'a dyn Bank,
    params: &'a RunParams,
    deadline: Option<Instant>,
    depth: usize,
}

impl<'a> Decomposer<'a> {
    /// Constructs a decomposer for the cone `ext`, which must have full
    /// column rank.
    pub fn new(
        ext: &'a QMatrix,
        bank: &'a dyn Bank,
        params: &'a RunParams,
        deadline: Option<Instant>,
        depth: usize,
    ) -> Self {
        Decomposer {
            ext,
            bank,
            params,
            deadline,
            depth,
        }
    }

    /// Computes the adjacent facets of `facet`, one per ridge orbit under
    /// `stabilizer` (the setwise stabilizer of `facet` in the acting group).
    ///
    /// Runtime exhaustion inside the recursion surfaces as
    /// [`EngineError::RuntimeExhausted`]; the caller leaves the orbit undone
    /// and stops cleanly.
    pub fn decompose(&self, facet: &Face, stabilizer: &PermGroup) -> EngineResult<Vec<Face>> {
        let sub = self.ext.select_face_rows(facet);
        let (sub_red, _) = sub.column_reduction();
        let restricted = stabilizer.restrict_to_face(facet)?;

        // The bank holds the *complete* ridge set of the sub-cone, not orbit
        // representatives: two inequivalent facets can share a canonical
        // sub-cone while carrying different stabilizers, so any group
        // reduction has to happen on the caller's side.
        let canon = CanonicalCone::of(&sub_red);
        let all_ridges: Vec<Face> = match self.bank.lookup(canon.key()) {
            Some(cached) => cached.iter().map(|r| canon.to_local(r)).collect(),
            None => {
                let all = self.sub_facets(&sub_red, &restricted)?;
                self.bank
                    .store(canon.key(), all.iter().map(|r| canon.to_sorted(r)).collect());
                all
            }
        };

        let mut seen: FxHashSet<Face> = FxHashSet::default();
        let mut adjacent = vec![];
        for ridge in &all_ridges {
            let canonical = restricted.canonical_image(ridge)?;
            if seen.insert(canonical.clone()) {
                adjacent.push(flip(self.ext, facet, &canonical)?);
            }
        }
        log::debug!(
            "decomposed facet of incidence {} into {} adjacent facets from {} ridges (depth {})",
            facet.count(),
            adjacent.len(),
            all_ridges.len(),
            self.depth,
        );
        Ok(adjacent)
    }

    /// The complete facet set of a sub-cone: directly when it is small,
    /// through a nested orbit-database run (whose orbit representatives are
    /// expanded back to full orbits) otherwise.
    fn sub_facets(&self, sub: &QMatrix, group: &PermGroup) -> EngineResult<Vec<Face>> {
        if self
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return Err(EngineError::RuntimeExhausted);
        }
        if sub.rows() <= self.params.direct_threshold {
            return Ok(dual_description(sub)?);
        }
        let representatives = driver::run_nested(
            sub,
            group,
            self.bank,
            self.params,
            self.deadline,
            self.depth + 1,
        )?;
        let mut seen: FxHashSet<Face> = FxHashSet::default();
        let mut all = vec![];
        for rep in representatives {
            let (orbit, _) = group.orbit_with_transversal(&rep)?;
            for image in orbit {
                if seen.insert(image.clone()) {
                    all.push(image);
                }
            }
        }
        Ok(all)
    }
}
