//! Permutations and permutation groups acting on vertex sets.
//!
//! Groups are given by generators and act on [`Face`]s through the set action.
//! Orbit enumeration is a plain breadth-first closure with a seen-set, which is
//! the right tool at the face-orbit sizes arithmetic groups produce here;
//! nothing in this module assumes the whole group fits in memory.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::face::Face;
use crate::{MathError, MathResult};

/// Permutation of `0..n`, stored as its image table.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Perm {
    img: Vec<u32>,
}

impl std::fmt::Debug for Perm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Perm{:?}", self.img)
    }
}

impl Perm {
    /// Identity permutation on `0..n`.
    pub fn identity(n: usize) -> Self {
        Perm {
            img: (0..n as u32).collect(),
        }
    }

    /// Constructs a permutation from its image table, checking that it is a
    /// bijection.
    pub fn try_from_images(img: Vec<u32>) -> MathResult<Self> {
        let n = img.len();
        let mut hit = vec![false; n];
        for &i in &img {
            let i = i as usize;
            if i >= n || hit[i] {
                return Err(MathError::BadPermutation(n));
            }
            hit[i] = true;
        }
        Ok(Perm { img })
    }

    /// Number of points acted on.
    pub fn degree(&self) -> usize {
        self.img.len()
    }

    /// Image of point `i`.
    pub fn apply(&self, i: usize) -> usize {
        self.img[i] as usize
    }

    /// Composition `self` then `other`: `(self.then(other))(i) = other(self(i))`.
    pub fn then(&self, other: &Perm) -> Perm {
        Perm {
            img: self.img.iter().map(|&i| other.img[i as usize]).collect(),
        }
    }

    /// Inverse permutation.
    pub fn inverse(&self) -> Perm {
        let mut img = vec![0u32; self.img.len()];
        for (i, &j) in self.img.iter().enumerate() {
            img[j as usize] = i as u32;
        }
        Perm { img }
    }

    /// Set action on a face: vertex `i` is incident in the result iff vertex
    /// `self⁻¹(i)` is incident in `face`.
    pub fn act(&self, face: &Face) -> Face {
        let mut out = Face::empty(face.len());
        for i in face.iter_ones() {
            out.set(self.apply(i), true);
        }
        out
    }
}

/// Permutation group on `0..degree`, given by generators.
#[derive(Debug, Clone)]
pub struct PermGroup {
    degree: usize,
    gens: Vec<Perm>,
}

impl PermGroup {
    /// Trivial group on `n` points.
    pub fn trivial(n: usize) -> Self {
        PermGroup {
            degree: n,
            gens: vec![],
        }
    }

    /// Full symmetric group on `n` points, generated by a transposition and an
    /// `n`-cycle.
    pub fn symmetric(n: usize) -> Self {
        if n < 2 {
            return Self::trivial(n);
        }
        let mut swap: Vec<u32> = (0..n as u32).collect();
        swap.swap(0, 1);
        let cycle: Vec<u32> = (0..n as u32).map(|i| (i + 1) % n as u32).collect();
        let mut gens = vec![Perm { img: swap }];
        if n > 2 {
            gens.push(Perm { img: cycle });
        }
        PermGroup { degree: n, gens }
    }

    /// Constructs a group from generators, all of which must share a degree.
    pub fn from_generators(degree: usize, gens: Vec<Perm>) -> MathResult<Self> {
        for g in &gens {
            if g.degree() != degree {
                return Err(MathError::BadPermutation(degree));
            }
        }
        Ok(PermGroup { degree, gens })
    }

    /// Number of points acted on.
    pub fn degree(&self) -> usize {
        self.degree
    }
    /// Generators of the group.
    pub fn generators(&self) -> &[Perm] {
        &self.gens
    }
    /// Whether the group has no generators (and so is trivial).
    pub fn is_trivial(&self) -> bool {
        self.gens.is_empty()
    }

    fn check_len(&self, face: &Face) -> MathResult<()> {
        if face.len() != self.degree {
            return Err(MathError::BadFaceLength {
                expected: self.degree,
                got: face.len(),
            });
        }
        Ok(())
    }

    /// Returns the orbit of `face` under the set action, together with one
    /// group element per orbit member mapping `face` to it. `face` itself is
    /// at position 0 with the identity.
    pub fn orbit_with_transversal(&self, face: &Face) -> MathResult<(Vec<Face>, Vec<Perm>)> {
        self.check_len(face)?;
        let mut seen: FxHashMap<Face, usize> = FxHashMap::default();
        seen.insert(face.clone(), 0);
        let mut orbit = vec![face.clone()];
        let mut transversal = vec![Perm::identity(self.degree)];
        let mut next = 0;
        while next < orbit.len() {
            for g in &self.gens {
                let image = g.act(&orbit[next]);
                if !seen.contains_key(&image) {
                    seen.insert(image.clone(), orbit.len());
                    transversal.push(transversal[next].then(g));
                    orbit.push(image);
                }
            }
            next += 1;
        }
        Ok((orbit, transversal))
    }

    /// Returns the lexicographically minimal face in the orbit of `face`.
    ///
    /// Two faces are equivalent under the group iff their canonical images are
    /// equal, so this doubles as the equivalence normal form.
    pub fn canonical_image(&self, face: &Face) -> MathResult<Face> {
        if self.gens.is_empty() {
            self.check_len(face)?;
            return Ok(face.clone());
        }
        let (orbit, _) = self.orbit_with_transversal(face)?;
        Ok(orbit.into_iter().min().unwrap_or_else(|| face.clone()))
    }

    /// Tests whether some group element maps `a` onto `b`.
    pub fn are_equivalent(&self, a: &Face, b: &Face) -> MathResult<bool> {
        self.check_len(a)?;
        self.check_len(b)?;
        if a == b {
            return Ok(true);
        }
        if a.count() != b.count() {
            return Ok(false);
        }
        let (orbit, _) = self.orbit_with_transversal(a)?;
        Ok(orbit.contains(b))
    }

    /// Returns generators of the setwise stabilizer of `face`, via Schreier's
    /// lemma on the set-action orbit.
    pub fn stabilizer(&self, face: &Face) -> MathResult<PermGroup> {
        self.check_len(face)?;
        if self.gens.is_empty() {
            return Ok(PermGroup::trivial(self.degree));
        }
        let (orbit, transversal) = self.orbit_with_transversal(face)?;
        let position: FxHashMap<&Face, usize> =
            orbit.iter().enumerate().map(|(i, f)| (f, i)).collect();
        let identity = Perm::identity(self.degree);
        let mut gens: Vec<Perm> = vec![];
        for (i, rep) in transversal.iter().enumerate() {
            for g in &self.gens {
                let image = g.act(&orbit[i]);
                let j = position[&image];
                // Schreier generator: u_i g u_j⁻¹ fixes `face` setwise.
                let s = rep.then(g).then(&transversal[j].inverse());
                if s != identity && !gens.contains(&s) {
                    gens.push(s);
                }
            }
        }
        PermGroup::from_generators(self.degree, gens)
    }

    /// Restricts a group fixing `face` setwise to a permutation group on the
    /// incident vertices of `face`, renumbered `0..face.count()` in ascending
    /// vertex order.
    pub fn restrict_to_face(&self, face: &Face) -> MathResult<PermGroup> {
        self.check_len(face)?;
        let positions: SmallVec<[usize; 16]> = face.iter_ones().collect();
        let mut local_of_global: FxHashMap<usize, u32> = FxHashMap::default();
        for (local, &global) in positions.iter().enumerate() {
            local_of_global.insert(global, local as u32);
        }
        let mut gens = vec![];
        for g in &self.gens {
            let mut img = Vec::with_capacity(positions.len());
            for &p in &positions {
                let q = g.apply(p);
                match local_of_global.get(&q) {
                    Some(&local) => img.push(local),
                    // The generator moves a face vertex off the face, so the
                    // group does not stabilize `face`.
                    None => return Err(MathError::BadPermutation(positions.len())),
                }
            }
            let restricted = Perm::try_from_images(img)?;
            if !gens.contains(&restricted) {
                gens.push(restricted);
            }
        }
        PermGroup::from_generators(positions.len(), gens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perm(img: &[u32]) -> Perm {
        Perm::try_from_images(img.to_vec()).unwrap()
    }

    #[test]
    fn compose_and_invert() {
        let a = perm(&[1, 2, 0]);
        let b = perm(&[0, 2, 1]);
        assert_eq!(a.then(&b).apply(0), 2);
        assert_eq!(a.then(&a).then(&a), Perm::identity(3));
        assert_eq!(a.then(&a.inverse()), Perm::identity(3));
    }

    #[test]
    fn rejects_non_bijections() {
        assert_eq!(
            Perm::try_from_images(vec![0, 0, 1]).unwrap_err(),
            MathError::BadPermutation(3),
        );
    }

    #[test]
    fn symmetric_group_orbit_of_a_pair() {
        let group = PermGroup::symmetric(4);
        let face = Face::from_indices(4, [0, 1]);
        let (orbit, _) = group.orbit_with_transversal(&face).unwrap();
        // All 6 pairs of a 4-set.
        assert_eq!(orbit.len(), 6);
    }

    #[test]
    fn canonical_image_is_orbit_invariant() {
        let group = PermGroup::symmetric(5);
        let a = Face::from_indices(5, [2, 4]);
        let b = Face::from_indices(5, [0, 3]);
        assert_eq!(
            group.canonical_image(&a).unwrap(),
            group.canonical_image(&b).unwrap(),
        );
        assert!(group.are_equivalent(&a, &b).unwrap());
        assert!(
            !group
                .are_equivalent(&a, &Face::from_indices(5, [1]))
                .unwrap()
        );
    }

    #[test]
    fn stabilizer_fixes_the_face() {
        let group = PermGroup::symmetric(4);
        let face = Face::from_indices(4, [0, 1]);
        let stab = group.stabilizer(&face).unwrap();
        assert!(!stab.generators().is_empty());
        for g in stab.generators() {
            assert_eq!(g.act(&face), face);
        }
        // The stabilizer of {0,1} in S4 acts transitively on {0,1}.
        let single = Face::from_indices(4, [0]);
        let (orbit, _) = stab.orbit_with_transversal(&single).unwrap();
        assert_eq!(orbit.len(), 2);
    }

    #[test]
    fn restriction_renumbers_face_vertices() {
        let group = PermGroup::symmetric(4);
        let face = Face::from_indices(4, [1, 3]);
        let stab = group.stabilizer(&face).unwrap();
        let restricted = stab.restrict_to_face(&face).unwrap();
        assert_eq!(restricted.degree(), 2);
        // The restricted action still swaps the two face vertices.
        let single = Face::from_indices(2, [0]);
        let (orbit, _) = restricted.orbit_with_transversal(&single).unwrap();
        assert_eq!(orbit.len(), 2);
    }
}
