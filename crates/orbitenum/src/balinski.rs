//! Connectedness certification of a finished enumeration.
//!
//! The facet adjacency graph of a polytope is connected (Balinski), so a
//! complete orbit set must induce a connected graph on the recorded adjacency
//! edges. A cardinality count alone cannot certify completeness; a run whose
//! graph fails this check is reported inconclusive, never as a success.

use orbitmath::Face;
use rustc_hash::FxHashMap;

/// Whether the recorded adjacency edges connect all orbit representatives
/// into a single component.
///
/// Edge endpoints must be canonical representatives. Edges with an unknown
/// endpoint are ignored, which can only make the check more conservative.
pub fn connectedness_holds(representatives: &[Face], edges: &[(Face, Face)]) -> bool {
    if representatives.len() <= 1 {
        return true;
    }
    let index: FxHashMap<&Face, usize> = representatives
        .iter()
        .enumerate()
        .map(|(i, f)| (f, i))
        .collect();

    let mut dsu = Dsu::new(representatives.len());
    for (a, b) in edges {
        if let (Some(&i), Some(&j)) = (index.get(a), index.get(b)) {
            dsu.union(i, j);
        }
    }
    let root = dsu.find(0);
    (1..representatives.len()).all(|i| dsu.find(i) == root)
}

struct Dsu {
    parent: Vec<usize>,
}

impl Dsu {
    fn new(n: usize) -> Self {
        Dsu {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(i: usize) -> Face {
        Face::from_indices(8, [i])
    }

    #[test]
    fn single_orbit_is_trivially_connected() {
        assert!(connectedness_holds(&[face(0)], &[]));
    }

    #[test]
    fn chain_is_connected() {
        let reps = vec![face(0), face(1), face(2)];
        let edges = vec![(face(0), face(1)), (face(1), face(2))];
        assert!(connectedness_holds(&reps, &edges));
    }

    #[test]
    fn missing_link_fails() {
        let reps = vec![face(0), face(1), face(2)];
        let edges = vec![(face(0), face(1))];
        assert!(!connectedness_holds(&reps, &edges));
    }

    #[test]
    fn edges_to_unknown_faces_are_ignored() {
        let reps = vec![face(0), face(1)];
        let edges = vec![(face(0), face(7)), (face(7), face(1))];
        assert!(!connectedness_holds(&reps, &edges));
    }
}
