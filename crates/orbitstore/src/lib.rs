//! Persistent storage for facet orbits.
//!
//! An orbit store is an append-only sequence of `(face, status)` records
//! addressed by insertion index. The same interface is served by two backends:
//! [`FileStore`], which writes through to a three-file shard directory and
//! survives process restarts, and [`MemStore`], which keeps everything in
//! vectors. Which one a run uses is a configuration decision (`saving`), not a
//! compile-time one.

use std::path::{Path, PathBuf};

use orbitmath::Face;

mod file;
mod restructure;

pub use file::FileStore;
pub use restructure::restructure;

/// Error from the persistent store.
///
/// Store errors are operator errors (bad path, permissions, truncated files)
/// and are treated as fatal by every caller; a run never continues past one.
#[allow(missing_docs)]
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store at {path} records {count} orbits but holds data for {available}")]
    Truncated {
        path: PathBuf,
        count: u64,
        available: u64,
    },
    #[error("orbit index {index} out of range (store holds {count})")]
    BadIndex { index: u64, count: u64 },
    #[error("face has length {got} but the store was opened for {expected} vertices")]
    BadFaceLength { expected: usize, got: usize },
}

/// Result type returned by store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only, index-addressed storage of `(face, status)` records.
///
/// `status` is `true` once the orbit's adjacent facets have been enumerated
/// ("done"); records are created not-done and the transition happens at most
/// once.
pub trait OrbitStore {
    /// Number of vertices each stored face ranges over.
    fn n_vertex(&self) -> usize;
    /// Number of stored orbits.
    fn orbit_count(&self) -> u64;
    /// Appends a record and returns its index. The record is durable when
    /// this returns.
    fn append(&mut self, face: &Face, done: bool) -> StoreResult<u64>;
    /// Reads the face at `index`.
    fn face(&mut self, index: u64) -> StoreResult<Face>;
    /// Reads the status bit at `index`.
    fn status(&mut self, index: u64) -> StoreResult<bool>;
    /// Overwrites the status bit at `index`. Durable when this returns.
    fn set_status(&mut self, index: u64, done: bool) -> StoreResult<()>;
}

/// Directory of the shard owned by `rank` out of `n_proc` workers.
pub fn shard_dir(prefix: &Path, n_proc: usize, rank: usize) -> PathBuf {
    PathBuf::from(format!(
        "{}_nproc{n_proc}_rank{rank}",
        prefix.display()
    ))
}

/// In-memory store backend.
#[derive(Debug, Default)]
pub struct MemStore {
    n_vertex: usize,
    faces: Vec<Face>,
    done: Vec<bool>,
}

impl MemStore {
    /// Constructs an empty in-memory store for faces over `n_vertex` vertices.
    pub fn new(n_vertex: usize) -> Self {
        MemStore {
            n_vertex,
            faces: vec![],
            done: vec![],
        }
    }

    fn check_index(&self, index: u64) -> StoreResult<usize> {
        if index >= self.faces.len() as u64 {
            return Err(StoreError::BadIndex {
                index,
                count: self.faces.len() as u64,
            });
        }
        Ok(index as usize)
    }
}

impl OrbitStore for MemStore {
    fn n_vertex(&self) -> usize {
        self.n_vertex
    }

    fn orbit_count(&self) -> u64 {
        self.faces.len() as u64
    }

    fn append(&mut self, face: &Face, done: bool) -> StoreResult<u64> {
        if face.len() != self.n_vertex {
            return Err(StoreError::BadFaceLength {
                expected: self.n_vertex,
                got: face.len(),
            });
        }
        self.faces.push(face.clone());
        self.done.push(done);
        Ok(self.faces.len() as u64 - 1)
    }

    fn face(&mut self, index: u64) -> StoreResult<Face> {
        let i = self.check_index(index)?;
        Ok(self.faces[i].clone())
    }

    fn status(&mut self, index: u64) -> StoreResult<bool> {
        let i = self.check_index(index)?;
        Ok(self.done[i])
    }

    fn set_status(&mut self, index: u64, done: bool) -> StoreResult<()> {
        let i = self.check_index(index)?;
        self.done[i] = done;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mem_store_round_trip() {
        let mut store = MemStore::new(5);
        let a = Face::from_indices(5, [0, 2]);
        let b = Face::from_indices(5, [1, 3, 4]);
        assert_eq!(store.append(&a, false).unwrap(), 0);
        assert_eq!(store.append(&b, true).unwrap(), 1);
        assert_eq!(store.face(0).unwrap(), a);
        assert_eq!(store.face(1).unwrap(), b);
        assert!(!store.status(0).unwrap());
        store.set_status(0, true).unwrap();
        assert!(store.status(0).unwrap());
    }

    #[test]
    fn mem_store_rejects_bad_lengths() {
        let mut store = MemStore::new(5);
        let long = Face::empty(6);
        assert!(matches!(
            store.append(&long, false),
            Err(StoreError::BadFaceLength { expected: 5, got: 6 }),
        ));
        assert!(matches!(store.face(0), Err(StoreError::BadIndex { .. })));
    }

    #[test]
    fn shard_dir_naming() {
        assert_eq!(
            shard_dir(Path::new("/tmp/run/db"), 4, 2),
            PathBuf::from("/tmp/run/db_nproc4_rank2"),
        );
    }
}
