//! Cache of previously-solved sub-cones.
//!
//! The decomposition tree visits equivalent sub-cones over and over from
//! sibling branches; the bank maps a sub-cone's canonical form to its
//! complete facet set. Values are deliberately group-free: the same sub-cone
//! can be reached from facets with different stabilizers, and each caller
//! reduces to orbit representatives itself. The trait leaves room for the
//! socket-backed client/server variant; in-process runs use [`MemoryBank`].

use num_rational::BigRational;
use orbitmath::{Face, QMatrix};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// Canonical form of a sub-cone matrix: its rows in sorted order, rendered to
/// a key, plus the permutation mapping sorted positions back to original row
/// indices.
///
/// Faces cached in the bank are numbered in the *sorted* row order, so a hit
/// from a sub-cone whose rows arrived in a different order still decodes
/// correctly through [`CanonicalCone::to_local`].
#[derive(Debug)]
pub struct CanonicalCone {
    key: String,
    /// `original_of_sorted[j]` is the original row index of sorted row `j`.
    original_of_sorted: Vec<usize>,
    /// Inverse of `original_of_sorted`.
    sorted_of_original: Vec<usize>,
}

impl CanonicalCone {
    /// Computes the canonical form of `m`.
    pub fn of(m: &QMatrix) -> Self {
        let mut order: Vec<usize> = (0..m.rows()).collect();
        order.sort_by(|&a, &b| cmp_rows(m.row(a), m.row(b)));
        let mut sorted_of_original = vec![0; m.rows()];
        for (sorted, &original) in order.iter().enumerate() {
            sorted_of_original[original] = sorted;
        }
        let mut key = String::new();
        for &r in &order {
            for x in m.row(r) {
                key.push_str(&x.to_string());
                key.push(',');
            }
            key.push(';');
        }
        CanonicalCone {
            key,
            original_of_sorted: order,
            sorted_of_original,
        }
    }

    /// The lookup key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Renumbers a face from original row order into sorted order.
    pub fn to_sorted(&self, face: &Face) -> Face {
        Face::from_indices(
            face.len(),
            face.iter_ones().map(|i| self.sorted_of_original[i]),
        )
    }

    /// Renumbers a face from sorted order back into original row order.
    pub fn to_local(&self, face: &Face) -> Face {
        Face::from_indices(
            face.len(),
            face.iter_ones().map(|i| self.original_of_sorted[i]),
        )
    }
}

fn cmp_rows(a: &[BigRational], b: &[BigRational]) -> std::cmp::Ordering {
    a.iter().cmp(b.iter())
}

/// Key-value cache of solved sub-cones.
pub trait Bank {
    /// Returns the cached complete facet set for `key`, in sorted-row
    /// numbering.
    fn lookup(&self, key: &str) -> Option<Vec<Face>>;
    /// Caches the complete facet set for `key`, in sorted-row numbering.
    fn store(&self, key: &str, ridges: Vec<Face>);
}

/// In-memory bank with a capacity bound.
#[derive(Debug, Default)]
pub struct MemoryBank {
    capacity: usize,
    entries: Mutex<FxHashMap<String, Vec<Face>>>,
}

impl MemoryBank {
    /// Constructs a bank holding at most `capacity` sub-cones.
    pub fn new(capacity: usize) -> Self {
        MemoryBank {
            capacity,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Number of cached sub-cones.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
    /// Whether the bank is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Bank for MemoryBank {
    fn lookup(&self, key: &str) -> Option<Vec<Face>> {
        let entries = self.entries.lock();
        let hit = entries.get(key).cloned();
        if hit.is_some() {
            log::debug!("bank hit for sub-cone of key length {}", key.len());
        }
        hit
    }

    fn store(&self, key: &str, ridges: Vec<Face>) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity && !entries.contains_key(key) {
            log::debug!("bank full ({} entries), not caching", entries.len());
            return;
        }
        entries.insert(key.to_string(), ridges);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_is_row_order_invariant() {
        let a = QMatrix::from_int_rows(&[vec![1, 0], vec![0, 1], vec![1, 1]]);
        let b = QMatrix::from_int_rows(&[vec![1, 1], vec![1, 0], vec![0, 1]]);
        let ca = CanonicalCone::of(&a);
        let cb = CanonicalCone::of(&b);
        assert_eq!(ca.key(), cb.key());

        // The face {row (1,0)} must survive the round trip through either
        // numbering.
        let fa = Face::from_indices(3, [0]);
        let fb = Face::from_indices(3, [1]);
        assert_eq!(ca.to_sorted(&fa), cb.to_sorted(&fb));
        assert_eq!(ca.to_local(&ca.to_sorted(&fa)), fa);
        assert_eq!(cb.to_local(&cb.to_sorted(&fb)), fb);
    }

    #[test]
    fn bank_respects_capacity() {
        let bank = MemoryBank::new(1);
        bank.store("a", vec![Face::empty(2)]);
        bank.store("b", vec![Face::empty(2)]);
        assert_eq!(bank.len(), 1);
        assert!(bank.lookup("a").is_some());
        assert!(bank.lookup("b").is_none());
        // Re-storing an existing key is always allowed.
        bank.store("a", vec![]);
        assert_eq!(bank.lookup("a"), Some(vec![]));
    }
}
