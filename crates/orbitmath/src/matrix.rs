//! Exact rational matrices.
//!
//! Just the operations the cone computations need: rank, right kernel, row and
//! column selection. Everything runs over [`BigRational`] with no
//! normalization tricks; inputs here are small ray matrices, not bulk numeric
//! data.

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

use crate::face::Face;

/// Dense matrix over [`BigRational`], row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QMatrix {
    rows: usize,
    cols: usize,
    data: Vec<BigRational>,
}

impl QMatrix {
    /// Constructs a matrix from integer rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows are ragged.
    pub fn from_int_rows(rows: &[Vec<i64>]) -> Self {
        let n_cols = rows.first().map_or(0, |r| r.len());
        let mut data = Vec::with_capacity(rows.len() * n_cols);
        for row in rows {
            assert_eq!(row.len(), n_cols, "ragged ray matrix");
            data.extend(
                row.iter()
                    .map(|&x| BigRational::from_integer(BigInt::from(x))),
            );
        }
        QMatrix {
            rows: rows.len(),
            cols: n_cols,
            data,
        }
    }

    /// Constructs a matrix from rational rows.
    ///
    /// # Panics
    ///
    /// Panics if the rows are ragged.
    pub fn from_rows(rows: Vec<Vec<BigRational>>) -> Self {
        let n_cols = rows.first().map_or(0, |r| r.len());
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * n_cols);
        for row in rows {
            assert_eq!(row.len(), n_cols, "ragged matrix");
            data.extend(row);
        }
        QMatrix {
            rows: n_rows,
            cols: n_cols,
            data,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }
    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Row `r` as a slice.
    pub fn row(&self, r: usize) -> &[BigRational] {
        &self.data[r * self.cols..(r + 1) * self.cols]
    }

    /// Returns the matrix consisting of the given rows, in the given order.
    pub fn select_rows(&self, indices: impl IntoIterator<Item = usize>) -> QMatrix {
        let mut data = vec![];
        let mut n_rows = 0;
        for i in indices {
            data.extend_from_slice(self.row(i));
            n_rows += 1;
        }
        QMatrix {
            rows: n_rows,
            cols: self.cols,
            data,
        }
    }

    /// Returns the matrix consisting of the rows incident to `face`.
    pub fn select_face_rows(&self, face: &Face) -> QMatrix {
        self.select_rows(face.iter_ones())
    }

    /// Returns the matrix consisting of the given columns, in the given order.
    pub fn select_cols(&self, indices: &[usize]) -> QMatrix {
        let mut data = Vec::with_capacity(self.rows * indices.len());
        for r in 0..self.rows {
            let row = self.row(r);
            data.extend(indices.iter().map(|&c| row[c].clone()));
        }
        QMatrix {
            rows: self.rows,
            cols: indices.len(),
            data,
        }
    }

    /// Whether every entry is an integer.
    pub fn is_integral(&self) -> bool {
        self.data.iter().all(BigRational::is_integer)
    }

    fn to_row_vecs(&self) -> Vec<Vec<BigRational>> {
        (0..self.rows).map(|r| self.row(r).to_vec()).collect()
    }

    /// Rank of the matrix.
    pub fn rank(&self) -> usize {
        let (_, pivots) = rref(self.to_row_vecs(), self.cols);
        pivots.len()
    }

    /// Basis of the right kernel: all `v` with `A v = 0`.
    pub fn kernel(&self) -> Vec<Vec<BigRational>> {
        let (m, pivots) = rref(self.to_row_vecs(), self.cols);
        let mut basis = vec![];
        for free in (0..self.cols).filter(|c| !pivots.contains(c)) {
            let mut v = vec![BigRational::zero(); self.cols];
            v[free] = BigRational::one();
            for (pivot_row, &pivot_col) in pivots.iter().enumerate() {
                v[pivot_col] = -m[pivot_row][free].clone();
            }
            basis.push(v);
        }
        basis
    }

    /// Selects a maximal linearly independent set of columns, returning the
    /// reduced matrix and the chosen column indices.
    ///
    /// The result has full column rank, which the cone computations in
    /// [`crate::dualdesc`] rely on.
    pub fn column_reduction(&self) -> (QMatrix, Vec<usize>) {
        let (_, pivots) = rref(self.to_row_vecs(), self.cols);
        (self.select_cols(&pivots), pivots)
    }
}

/// Dot product of two equal-length slices.
pub fn dot(a: &[BigRational], b: &[BigRational]) -> BigRational {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .fold(BigRational::zero(), |acc, (x, y)| acc + x * y)
}

/// Sign of each entry of `a` applied to `v`, as `-1`, `0`, `1`.
pub fn eval_signs(m: &QMatrix, v: &[BigRational]) -> Vec<i8> {
    (0..m.rows())
        .map(|r| {
            let x = dot(m.row(r), v);
            if x.is_zero() {
                0
            } else if x.is_positive() {
                1
            } else {
                -1
            }
        })
        .collect()
}

/// Reduced row echelon form; returns the reduced rows and the pivot columns.
fn rref(mut m: Vec<Vec<BigRational>>, cols: usize) -> (Vec<Vec<BigRational>>, Vec<usize>) {
    let rows = m.len();
    let mut pivots = vec![];
    let mut r = 0;
    for c in 0..cols {
        if r == rows {
            break;
        }
        let Some(p) = (r..rows).find(|&i| !m[i][c].is_zero()) else {
            continue;
        };
        m.swap(r, p);
        let inv = m[r][c].clone();
        for x in &mut m[r] {
            *x = &*x / &inv;
        }
        for i in 0..rows {
            if i != r && !m[i][c].is_zero() {
                let factor = m[i][c].clone();
                for c2 in 0..cols {
                    let t = &m[r][c2] * &factor;
                    m[i][c2] = &m[i][c2] - &t;
                }
            }
        }
        pivots.push(c);
        r += 1;
    }
    (m, pivots)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_and_kernel() {
        let m = QMatrix::from_int_rows(&[vec![1, 2, 3], vec![2, 4, 6], vec![0, 1, 1]]);
        assert_eq!(m.rank(), 2);
        let kernel = m.kernel();
        assert_eq!(kernel.len(), 1);
        for r in 0..m.rows() {
            assert!(dot(m.row(r), &kernel[0]).is_zero());
        }
    }

    #[test]
    fn kernel_of_empty_row_set_is_full() {
        let m = QMatrix::from_int_rows(&[vec![1, 0], vec![0, 1]]).select_rows([]);
        assert_eq!(m.rows(), 0);
        assert_eq!(m.kernel().len(), 2);
    }

    #[test]
    fn column_reduction_keeps_rank() {
        let m = QMatrix::from_int_rows(&[vec![1, 1, 2], vec![1, 0, 1], vec![0, 1, 1]]);
        let (reduced, picked) = m.column_reduction();
        assert_eq!(picked, vec![0, 1]);
        assert_eq!(reduced.cols(), 2);
        assert_eq!(reduced.rank(), 2);
    }
}
