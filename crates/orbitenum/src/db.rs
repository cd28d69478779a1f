//! The orbit database.
//!
//! One `DatabaseOrbits` tracks every facet orbit discovered so far for one
//! cone: the canonical representative of each orbit, whether its adjacent
//! facets have been enumerated yet, and the adjacency edges seen along the
//! way. Representatives are pairwise inequivalent under the acting group;
//! inserting a face equivalent to a known orbit is a no-op. All state is
//! mirrored in an [`OrbitStore`], write-through, so a run can resume.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use orbitmath::ti::TiVec;
use orbitmath::{Face, PermGroup, idx_struct};
use orbitstore::OrbitStore;
use rustc_hash::FxBuildHasher;

use crate::{EngineError, EngineResult};

idx_struct! {
    /// Index of a facet orbit within one database, in insertion order.
    pub struct OrbitId(pub u64);
}

#[derive(Debug)]
struct OrbitEntry {
    face: Face,
    done: bool,
    store_index: u64,
}

/// Result of an insertion attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inserted {
    /// Orbit the face belongs to (new or preexisting).
    pub id: OrbitId,
    /// Whether a new orbit was created.
    pub is_new: bool,
}

/// Database of facet orbits for one cone under one group.
pub struct DatabaseOrbits {
    group: PermGroup,
    store: Box<dyn OrbitStore>,
    /// All orbits, in insertion order.
    orbits: TiVec<OrbitId, OrbitEntry>,
    /// Canonical representative → orbit, for dedup. The map's hashing is the
    /// fast pre-filter; equality on the full bit pattern settles collisions.
    index_of: IndexMap<Face, OrbitId, FxBuildHasher>,
    /// Orbits whose adjacencies are not yet enumerated; the first element is
    /// the minimal-undone selection.
    undone: BTreeSet<OrbitId>,
    /// Recorded orbit adjacencies, as canonical face pairs.
    edges: Vec<(Face, Face)>,
}

impl std::fmt::Debug for DatabaseOrbits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseOrbits")
            .field("orbits", &self.orbits.len())
            .field("undone", &self.undone.len())
            .finish_non_exhaustive()
    }
}

impl DatabaseOrbits {
    /// Opens a database over `store`, loading any orbits it already holds.
    pub fn open(group: PermGroup, mut store: Box<dyn OrbitStore>) -> EngineResult<Self> {
        if store.n_vertex() != group.degree() {
            return Err(EngineError::Fatal(format!(
                "store is over {} vertices but the group acts on {}",
                store.n_vertex(),
                group.degree(),
            )));
        }
        let mut orbits: TiVec<OrbitId, OrbitEntry> = TiVec::new();
        let mut index_of: IndexMap<Face, OrbitId, FxBuildHasher> = IndexMap::default();
        let mut undone = BTreeSet::new();
        for index in 0..store.orbit_count() {
            let face = store.face(index)?;
            let done = store.status(index)?;
            let canonical = group.canonical_image(&face)?;
            if canonical != face {
                log::warn!("stored orbit {index} is not canonical; using its canonical image");
            }
            let id = orbits
                .push(OrbitEntry {
                    face: canonical.clone(),
                    done,
                    store_index: index,
                })
                .map_err(|e| EngineError::Fatal(e.to_string()))?;
            if index_of.insert(canonical, id).is_some() {
                return Err(EngineError::Fatal(format!(
                    "store holds two equivalent orbits (second at index {index})",
                )));
            }
            if !done {
                undone.insert(id);
            }
        }
        if !orbits.is_empty() {
            log::info!(
                "resumed database with {} orbits ({} undone)",
                orbits.len(),
                undone.len(),
            );
        }
        Ok(DatabaseOrbits {
            group,
            store,
            orbits,
            index_of,
            undone,
            edges: vec![],
        })
    }

    /// The acting group.
    pub fn group(&self) -> &PermGroup {
        &self.group
    }
    /// Number of vertices faces range over.
    pub fn n_vertex(&self) -> usize {
        self.group.degree()
    }

    /// Inserts a face, deduplicating up to the group action.
    ///
    /// A face of the wrong length is a programming error and comes back
    /// [`EngineError::Fatal`].
    pub fn insert(&mut self, face: &Face) -> EngineResult<Inserted> {
        if face.len() != self.n_vertex() {
            return Err(EngineError::Fatal(format!(
                "inserted face has length {} but the cone has {} rays",
                face.len(),
                self.n_vertex(),
            )));
        }
        let canonical = self.group.canonical_image(face)?;
        if let Some(&id) = self.index_of.get(&canonical) {
            return Ok(Inserted { id, is_new: false });
        }
        let store_index = self.store.append(&canonical, false)?;
        let id = self
            .orbits
            .push(OrbitEntry {
                face: canonical.clone(),
                done: false,
                store_index,
            })
            .map_err(|e| EngineError::Fatal(e.to_string()))?;
        self.index_of.insert(canonical, id);
        self.undone.insert(id);
        log::trace!("new orbit {id} (incidence {})", face.count());
        Ok(Inserted { id, is_new: true })
    }

    /// Records that the orbits represented by `a` and `b` are adjacent. Both
    /// faces must already be canonical.
    pub fn record_adjacency(&mut self, a: Face, b: Face) {
        self.edges.push((a, b));
    }

    /// Returns the undone orbit with the lowest index, if any.
    pub fn minimal_undone(&self) -> Option<(OrbitId, &Face)> {
        let &id = self.undone.first()?;
        Some((id, &self.orbits.get(id)?.face))
    }

    /// Marks an orbit's adjacencies as fully enumerated. Idempotent; there is
    /// no way back to undone.
    pub fn mark_done(&mut self, id: OrbitId) -> EngineResult<()> {
        let Some(entry) = self.orbits.get_mut(id) else {
            return Err(EngineError::Fatal(format!("mark_done of unknown orbit {id}")));
        };
        if entry.done {
            return Ok(());
        }
        entry.done = true;
        let store_index = entry.store_index;
        self.undone.remove(&id);
        self.store.set_status(store_index, true)?;
        Ok(())
    }

    /// Total number of orbits.
    pub fn number_orbits(&self) -> u64 {
        self.orbits.len() as u64
    }
    /// Number of orbits not yet decomposed.
    pub fn number_undone(&self) -> u64 {
        self.undone.len() as u64
    }
    /// Whether every discovered orbit has been decomposed.
    pub fn is_finished(&self) -> bool {
        self.undone.is_empty()
    }

    /// Representative face of an orbit.
    pub fn face_of(&self, id: OrbitId) -> Option<&Face> {
        self.orbits.get(id).map(|entry| &entry.face)
    }
    /// Whether an orbit is done.
    pub fn is_done(&self, id: OrbitId) -> Option<bool> {
        self.orbits.get(id).map(|entry| entry.done)
    }

    /// All orbit representatives, in insertion order.
    pub fn representatives(&self) -> Vec<Face> {
        self.orbits
            .iter_values()
            .map(|entry| entry.face.clone())
            .collect()
    }
    /// All recorded adjacency edges.
    pub fn adjacency_edges(&self) -> &[(Face, Face)] {
        &self.edges
    }
}

#[cfg(test)]
mod tests {
    use orbitstore::{FileStore, MemStore};

    use super::*;

    fn mem_db(group: PermGroup) -> DatabaseOrbits {
        let store = MemStore::new(group.degree());
        DatabaseOrbits::open(group, Box::new(store)).unwrap()
    }

    #[test]
    fn insertion_is_idempotent() {
        let mut db = mem_db(PermGroup::trivial(6));
        let face = Face::from_indices(6, [0, 2, 4]);
        let first = db.insert(&face).unwrap();
        let second = db.insert(&face).unwrap();
        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(first.id, second.id);
        assert_eq!(db.number_orbits(), 1);
    }

    #[test]
    fn dedup_is_group_invariant_for_every_generator() {
        let group = PermGroup::symmetric(6);
        let generators = group.generators().to_vec();
        let mut db = mem_db(group);
        let face = Face::from_indices(6, [0, 2, 4]);
        db.insert(&face).unwrap();
        for g in &generators {
            let image = g.act(&face);
            let inserted = db.insert(&image).unwrap();
            assert!(!inserted.is_new, "generator image created a duplicate");
        }
        assert_eq!(db.number_orbits(), 1);
    }

    #[test]
    fn minimal_undone_follows_insertion_order() {
        let mut db = mem_db(PermGroup::trivial(4));
        let a = db.insert(&Face::from_indices(4, [0])).unwrap().id;
        let b = db.insert(&Face::from_indices(4, [1])).unwrap().id;
        assert_eq!(db.minimal_undone().map(|(id, _)| id), Some(a));
        db.mark_done(a).unwrap();
        assert_eq!(db.minimal_undone().map(|(id, _)| id), Some(b));
        db.mark_done(b).unwrap();
        assert!(db.is_finished());
        assert!(db.minimal_undone().is_none());
    }

    #[test]
    fn status_is_monotonic() {
        let mut db = mem_db(PermGroup::symmetric(4));
        let face = Face::from_indices(4, [1, 2]);
        let id = db.insert(&face).unwrap().id;
        db.mark_done(id).unwrap();
        assert_eq!(db.is_done(id), Some(true));
        // Re-inserting an equivalent face must not resurrect the orbit.
        db.insert(&Face::from_indices(4, [0, 3])).unwrap();
        assert_eq!(db.is_done(id), Some(true));
        assert!(db.is_finished());
        // mark_done is idempotent.
        db.mark_done(id).unwrap();
        assert_eq!(db.is_done(id), Some(true));
    }

    #[test]
    fn wrong_length_face_is_fatal() {
        let mut db = mem_db(PermGroup::trivial(4));
        assert!(matches!(
            db.insert(&Face::empty(5)),
            Err(EngineError::Fatal(_)),
        ));
    }

    #[test]
    fn resume_from_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("shard");
        let group = PermGroup::symmetric(5);
        let face_a = Face::from_indices(5, [0, 1]);
        let face_b = Face::from_indices(5, [2]);
        let id_a;
        {
            let store = FileStore::open(&dir, 5, true).unwrap();
            let mut db = DatabaseOrbits::open(group.clone(), Box::new(store)).unwrap();
            id_a = db.insert(&face_a).unwrap().id;
            db.insert(&face_b).unwrap();
            db.mark_done(id_a).unwrap();
        }
        let store = FileStore::open(&dir, 5, false).unwrap();
        let mut db = DatabaseOrbits::open(group.clone(), Box::new(store)).unwrap();
        assert_eq!(db.number_orbits(), 2);
        assert_eq!(db.number_undone(), 1);
        assert_eq!(db.is_done(id_a), Some(true));
        // Equivalent faces still dedup after the resume.
        let image = Face::from_indices(5, [3, 4]);
        assert!(!db.insert(&image).unwrap().is_new);
    }
}
