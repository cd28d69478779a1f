//! Base cone primitives: supporting functionals, ridge flips, and direct
//! facet enumeration.
//!
//! All functions take the cone as a matrix of extreme rays (one ray per row)
//! with **full column rank**; run a [`QMatrix::column_reduction`] first if the
//! input does not guarantee that. Faces are incidence vectors over the rows.

use itertools::Itertools;
use num_rational::BigRational;
use num_traits::Zero;
use rustc_hash::FxHashSet;

use crate::face::Face;
use crate::matrix::{QMatrix, dot, eval_signs};
use crate::{MathError, MathResult};

/// Returns a functional vanishing exactly on the rays of `face` and strictly
/// positive on every other ray.
///
/// `face` must be a facet of the cone; anything else is reported as
/// [`MathError::NotSupporting`] or [`MathError::DegenerateKernel`].
pub fn facet_functional(ext: &QMatrix, face: &Face) -> MathResult<Vec<BigRational>> {
    check_face_len(ext, face)?;
    let kernel = ext.select_face_rows(face).kernel();
    let off_rows: Vec<usize> = (0..ext.rows()).filter(|&i| !face.get(i)).collect();
    functional_from_kernel(ext, kernel, &off_rows)
}

/// Flips a ridge of the sub-cone spanned by `facet` back to the adjacent
/// facet of the full cone.
///
/// `ridge_local` is an incidence vector over the rays of `facet` (in ascending
/// ray order), as produced by a dual description of the sub-cone. The result
/// is an incidence vector in the original ray numbering.
pub fn flip(ext: &QMatrix, facet: &Face, ridge_local: &Face) -> MathResult<Face> {
    check_face_len(ext, facet)?;
    let positions: Vec<usize> = facet.iter_ones().collect();
    if ridge_local.len() != positions.len() {
        return Err(MathError::BadFaceLength {
            expected: positions.len(),
            got: ridge_local.len(),
        });
    }
    let ridge = Face::from_indices(ext.rows(), ridge_local.iter_ones().map(|i| positions[i]));

    let f = facet_functional(ext, facet)?;

    // Functional cutting the ridge out of the facet: zero on the ridge rays,
    // positive on the remaining facet rays. Its values off the facet are
    // unconstrained; the pivot below fixes that.
    let kernel = ext.select_face_rows(&ridge).kernel();
    let flank_rows: Vec<usize> = facet.iter_ones().filter(|&i| !ridge.get(i)).collect();
    let r = functional_from_kernel(ext, kernel, &flank_rows)?;

    // Rotate: g = r + t* f stays nonnegative on every ray and vanishes on the
    // rays of the adjacent facet, where t* = max over off-facet rays of
    // (-r·x / f·x).
    let mut t_star: Option<BigRational> = None;
    for i in (0..ext.rows()).filter(|&i| !facet.get(i)) {
        let fx = dot(ext.row(i), &f);
        let rx = dot(ext.row(i), &r);
        let t = -rx / fx;
        if t_star.as_ref().is_none_or(|best| t > *best) {
            t_star = Some(t);
        }
    }
    let t_star = t_star.ok_or(MathError::DegenerateKernel { dim: 0 })?;

    let g: Vec<BigRational> = r
        .iter()
        .zip(&f)
        .map(|(ri, fi)| ri + &t_star * fi)
        .collect();
    let signs = eval_signs(ext, &g);
    if let Some(ray) = signs.iter().position(|&s| s < 0) {
        return Err(MathError::NotSupporting { ray });
    }
    Ok(Face::from_indices(
        ext.rows(),
        signs
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == 0)
            .map(|(i, _)| i),
    ))
}

/// Enumerates all facets of the cone by exhausting kernel functionals of
/// (d−1)-subsets of rays.
///
/// This is the direct base primitive: exponential in the ray count and meant
/// for the small sub-cones at the leaves of the recursive decomposition (and
/// for tests). The input need not have full column rank; a column reduction is
/// applied internally. Facets are returned in lexicographic incidence order.
pub fn dual_description(ext: &QMatrix) -> MathResult<Vec<Face>> {
    dual_description_limited(ext, None)
}

/// Like [`dual_description`], but stops after finding `limit` facets.
///
/// With a limit the result is an arbitrary-but-deterministic sample of the
/// facet set, which is all a sampling heuristic needs.
pub fn dual_description_limited(ext: &QMatrix, limit: Option<usize>) -> MathResult<Vec<Face>> {
    if ext.rows() == 0 {
        return Err(MathError::EmptyRayMatrix);
    }
    let (red, _) = ext.column_reduction();
    let d = red.cols();
    let mut seen: FxHashSet<Face> = FxHashSet::default();
    let mut facets = vec![];
    for combo in (0..red.rows()).combinations(d.saturating_sub(1)) {
        let sub = red.select_rows(combo.iter().copied());
        if sub.rank() + 1 != d {
            continue;
        }
        let kernel = sub.kernel();
        // Rank d−1 leaves exactly a line of functionals.
        let Some(v) = kernel.first() else { continue };
        let signs = eval_signs(&red, v);
        if signs.iter().all(|&s| s == 0) {
            continue;
        }
        let one_sided = signs.iter().all(|&s| s >= 0) || signs.iter().all(|&s| s <= 0);
        if !one_sided {
            continue;
        }
        let face = Face::from_indices(
            red.rows(),
            signs
                .iter()
                .enumerate()
                .filter(|&(_, &s)| s == 0)
                .map(|(i, _)| i),
        );
        if seen.insert(face.clone()) {
            facets.push(face);
            if limit.is_some_and(|l| facets.len() >= l) {
                return Ok(facets);
            }
        }
    }
    facets.sort();
    Ok(facets)
}

fn check_face_len(ext: &QMatrix, face: &Face) -> MathResult<()> {
    if face.len() != ext.rows() {
        return Err(MathError::BadFaceLength {
            expected: ext.rows(),
            got: face.len(),
        });
    }
    Ok(())
}

/// Picks the functional from `kernel` that is nonzero on `witness_rows`,
/// normalized positive there.
///
/// Within the span of the cone, functionals vanishing on the selected rays and
/// nonzero on the witness rays form a single ray of the dual, so the witness
/// values come out uniformly signed; mixed signs mean the input face was not a
/// face at all.
fn functional_from_kernel(
    ext: &QMatrix,
    kernel: Vec<Vec<BigRational>>,
    witness_rows: &[usize],
) -> MathResult<Vec<BigRational>> {
    let dim = kernel.len();
    for v in kernel {
        let mut sign = 0i8;
        let mut ok = true;
        for &i in witness_rows {
            let x = dot(ext.row(i), &v);
            if x.is_zero() {
                continue;
            }
            let s = if x > BigRational::zero() { 1 } else { -1 };
            if sign == 0 {
                sign = s;
            } else if sign != s {
                ok = false;
                break;
            }
        }
        if !ok || sign == 0 {
            continue;
        }
        let v = if sign > 0 {
            v
        } else {
            v.into_iter().map(|x| -x).collect()
        };
        // Confirm the functional is strictly positive on every witness ray.
        for &i in witness_rows {
            if dot(ext.row(i), &v).is_zero() {
                return Err(MathError::NotSupporting { ray: i });
            }
        }
        return Ok(v);
    }
    Err(MathError::DegenerateKernel { dim })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    /// Extreme rays of the cone over a unit square (a 3-cone with 4 rays).
    fn square_cone() -> QMatrix {
        QMatrix::from_int_rows(&[
            vec![1, 0, 0],
            vec![1, 1, 0],
            vec![1, 0, 1],
            vec![1, 1, 1],
        ])
    }

    #[test]
    fn simplex_cone_facets() {
        let ext = QMatrix::from_int_rows(&[
            vec![1, 0, 0, 0],
            vec![0, 1, 0, 0],
            vec![0, 0, 1, 0],
            vec![0, 0, 0, 1],
        ]);
        let facets = dual_description(&ext).unwrap();
        assert_eq!(facets.len(), 4);
        for facet in &facets {
            assert_eq!(facet.count(), 3);
        }
    }

    #[test]
    fn square_cone_facets() {
        let facets = dual_description(&square_cone()).unwrap();
        // Four edges of the square.
        assert_eq!(facets.len(), 4);
        for facet in &facets {
            assert_eq!(facet.count(), 2);
        }
    }

    #[test]
    fn facet_functional_signs() {
        let ext = square_cone();
        let facet = Face::from_indices(4, [0, 1]);
        let f = facet_functional(&ext, &facet).unwrap();
        let signs = eval_signs(&ext, &f);
        assert_eq!(signs, vec![0, 0, 1, 1]);
    }

    #[test]
    fn non_face_is_rejected() {
        let ext = square_cone();
        // {0, 3} is a diagonal, not a face.
        let diagonal = Face::from_indices(4, [0, 3]);
        assert!(facet_functional(&ext, &diagonal).is_err());
    }

    #[test]
    fn flip_walks_around_the_square() {
        let ext = square_cone();
        let facet = Face::from_indices(4, [0, 1]);
        // Sub-cone rays are {0, 1}; its facets are the two single rays.
        let sub = ext.select_face_rows(&facet);
        let ridges = dual_description(&sub).unwrap();
        assert_eq!(ridges.len(), 2);
        let mut neighbors = vec![];
        for ridge in &ridges {
            neighbors.push(flip(&ext, &facet, ridge).unwrap());
        }
        let expected = vec![Face::from_indices(4, [0, 2]), Face::from_indices(4, [1, 3])];
        for neighbor in &expected {
            assert!(neighbors.contains(neighbor), "missing {neighbor}");
        }
        assert_eq!(neighbors.len(), expected.len());
    }

    #[test]
    fn flips_of_all_facet_ridges_recover_all_facets() {
        let ext = square_cone();
        let all = dual_description(&ext).unwrap();
        let mut recovered: Vec<Face> = vec![];
        for facet in &all {
            let sub = ext.select_face_rows(facet);
            for ridge in dual_description(&sub).unwrap() {
                let adj = flip(&ext, facet, &ridge).unwrap();
                assert!(all.contains(&adj));
                if !recovered.contains(&adj) {
                    recovered.push(adj);
                }
            }
        }
        recovered.sort();
        assert_eq!(recovered, all);
    }
}
