//! Single-process driver loop.
//!
//! Repeatedly select the minimal undone orbit, decompose it, insert the
//! results, mark it done; stop when nothing is undone or the wall-clock
//! budget runs out. On a normal finish the connectedness check has the last
//! word: a disconnected orbit graph downgrades the run to inconclusive.

use std::time::{Duration, Instant};

use orbitmath::{Face, PermGroup, QMatrix};
use orbitstore::{FileStore, MemStore, OrbitStore, shard_dir};
use rustc_hash::FxHashSet;

use crate::bank::{Bank, MemoryBank};
use crate::db::{DatabaseOrbits, OrbitId};
use crate::decompose::Decomposer;
use crate::params::RunParams;
use crate::{EngineError, EngineResult, balinski, sampling};

/// Heuristic used to seed nested sub-cone runs; cheap by construction, and
/// the nested walk completes the rest.
const NESTED_HEURISTIC: &str = "full_rank";

/// Opens the orbit store a worker owns, honoring the `saving` flag.
pub fn open_store(
    params: &RunParams,
    n_vertex: usize,
    n_proc: usize,
    rank: usize,
) -> EngineResult<Box<dyn OrbitStore>> {
    if params.saving {
        let dir = shard_dir(&params.db_prefix, n_proc, rank);
        Ok(Box::new(FileStore::open(&dir, n_vertex, true)?))
    } else {
        Ok(Box::new(MemStore::new(n_vertex)))
    }
}

/// Enumerates the facet orbits of the cone `ext` under `group`.
///
/// Returns the orbit representatives on success. `RuntimeExhausted` means the
/// budget ran out or the finished orbit graph could not be certified
/// connected; either way the persisted store (when `saving` is on) holds the
/// partial result and the run can be re-invoked.
pub fn run_dual_desc(
    ext: &QMatrix,
    group: &PermGroup,
    params: &RunParams,
) -> EngineResult<Vec<Face>> {
    check_input(ext, group)?;
    let (red, _) = ext.column_reduction();
    let store = open_store(params, red.rows(), 1, 0)?;
    let mut db = DatabaseOrbits::open(group.clone(), store)?;
    let bank = MemoryBank::new(params.bank_capacity);
    let deadline = deadline_from(params);

    drive_to_completion(&red, &mut db, &bank, params, deadline, 0)?;
    ensure_adjacency_recorded(&red, &mut db, &bank, params, deadline)?;

    if balinski::connectedness_holds(&db.representatives(), db.adjacency_edges()) {
        log::info!("run complete: {} facet orbits", db.number_orbits());
        Ok(db.representatives())
    } else {
        log::warn!("orbit adjacency graph is not connected; result is inconclusive");
        Err(EngineError::RuntimeExhausted)
    }
}

/// Deadline implied by the configured budget.
pub fn deadline_from(params: &RunParams) -> Option<Instant> {
    params
        .max_runtime
        .map(|secs| Instant::now() + Duration::from_secs(secs))
}

/// Validates the ray matrix and group against each other.
pub fn check_input(ext: &QMatrix, group: &PermGroup) -> EngineResult<()> {
    if ext.rows() == 0 {
        return Err(EngineError::Fatal("the ray matrix has no rows".to_string()));
    }
    if group.degree() != ext.rows() {
        return Err(EngineError::Fatal(format!(
            "group acts on {} points but the cone has {} rays",
            group.degree(),
            ext.rows(),
        )));
    }
    Ok(())
}

/// Runs the select/decompose/insert loop until the database is finished.
///
/// `ext` must have full column rank and as many rows as the database's group
/// degree. An exhausted budget leaves the selected orbit undone and returns
/// [`EngineError::RuntimeExhausted`].
pub fn drive_to_completion(
    ext: &QMatrix,
    db: &mut DatabaseOrbits,
    bank: &dyn Bank,
    params: &RunParams,
    deadline: Option<Instant>,
    depth: usize,
) -> EngineResult<()> {
    if db.number_orbits() == 0 {
        let heuristic = if depth == 0 {
            params.initial_facet_heuristic.as_str()
        } else {
            NESTED_HEURISTIC
        };
        for face in sampling::compute_initial_set(ext, heuristic)? {
            db.insert(&face)?;
        }
    }
    let decomposer = Decomposer::new(ext, bank, params, deadline, depth);
    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            log::warn!("runtime budget exhausted with {} orbits undone", db.number_undone());
            return Err(EngineError::RuntimeExhausted);
        }
        let Some((id, face)) = db.minimal_undone() else {
            break;
        };
        let face = face.clone();
        let stabilizer = db.group().stabilizer(&face)?;
        let adjacent = decomposer.decompose(&face, &stabilizer)?;
        for neighbor in adjacent {
            let inserted = db.insert(&neighbor)?;
            let child = db
                .face_of(inserted.id)
                .cloned()
                .ok_or_else(|| EngineError::Fatal("inserted orbit vanished".to_string()))?;
            db.record_adjacency(face.clone(), child);
        }
        db.mark_done(id)?;
        log::debug!(
            "orbit {id} done; {} orbits total, {} undone",
            db.number_orbits(),
            db.number_undone(),
        );
    }
    Ok(())
}

/// Re-derives adjacency edges for orbits that were already done when the
/// store was loaded.
///
/// Edges are recorded in memory as orbits are decomposed, so a resumed run
/// knows nothing about the adjacencies of orbits finished in earlier runs.
/// Before certifying connectedness, decompose those orbits again (the bank
/// absorbs most of the cost) purely to record their edges; no orbit state
/// changes and nothing needs to be routed anywhere, so the distributed driver
/// can do this even after its termination notice.
pub fn ensure_adjacency_recorded(
    ext: &QMatrix,
    db: &mut DatabaseOrbits,
    bank: &dyn Bank,
    params: &RunParams,
    deadline: Option<Instant>,
) -> EngineResult<()> {
    let with_edges: FxHashSet<Face> = db
        .adjacency_edges()
        .iter()
        .map(|(source, _)| source.clone())
        .collect();
    let decomposer = Decomposer::new(ext, bank, params, deadline, 0);
    for (position, face) in db.representatives().into_iter().enumerate() {
        let id = OrbitId(position as u64);
        if db.is_done(id) != Some(true) || with_edges.contains(&face) {
            continue;
        }
        log::debug!("re-deriving adjacencies of orbit {id} finished in an earlier run");
        let stabilizer = db.group().stabilizer(&face)?;
        for neighbor in decomposer.decompose(&face, &stabilizer)? {
            let canonical = db.group().canonical_image(&neighbor)?;
            db.record_adjacency(face.clone(), canonical);
        }
    }
    Ok(())
}

/// Nested run for one sub-cone: fresh in-memory database, same bank, same
/// deadline. Returns the sub-cone's facet orbit representatives.
pub(crate) fn run_nested(
    sub: &QMatrix,
    group: &PermGroup,
    bank: &dyn Bank,
    params: &RunParams,
    deadline: Option<Instant>,
    depth: usize,
) -> EngineResult<Vec<Face>> {
    log::debug!(
        "nested dual description: {} rays, {} columns, depth {depth}",
        sub.rows(),
        sub.cols(),
    );
    let store = Box::new(MemStore::new(sub.rows()));
    let mut db = DatabaseOrbits::open(group.clone(), store)?;
    drive_to_completion(sub, &mut db, bank, params, deadline, depth)?;
    Ok(db.representatives())
}
