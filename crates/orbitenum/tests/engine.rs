//! End-to-end runs of the single-process driver on small cones with known
//! facet structure.

use orbitenum::bank::MemoryBank;
use orbitenum::decompose::Decomposer;
use orbitenum::driver::{self, run_dual_desc};
use orbitenum::{DatabaseOrbits, EngineError, RunParams};
use orbitmath::{Perm, PermGroup, QMatrix};
use orbitstore::MemStore;
use pretty_assertions::assert_eq;

/// The standard simplex's 4 extreme rays: the identity matrix.
fn simplex_cone() -> QMatrix {
    QMatrix::from_int_rows(&[
        vec![1, 0, 0, 0],
        vec![0, 1, 0, 0],
        vec![0, 0, 1, 0],
        vec![0, 0, 0, 1],
    ])
}

/// Cone over the 3-cube: 8 rays in 4 dimensions. Vertex `i` has coordinates
/// read off the bits of `i` (bit 2 → x, bit 1 → y, bit 0 → z).
fn cube_cone() -> QMatrix {
    let mut rows = vec![];
    for i in 0..8u32 {
        let c = |bit: u32| if i >> bit & 1 == 1 { 1 } else { -1 };
        rows.push(vec![1, c(2), c(1), c(0)]);
    }
    QMatrix::from_int_rows(&rows)
}

/// Symmetries of the cube as vertex permutations: the axis 3-cycle and the
/// x-flip, which together act transitively on the 6 facets.
fn cube_group() -> PermGroup {
    let cycle: Vec<u32> = (0..8)
        .map(|i| {
            let (x, y, z) = (i >> 2 & 1, i >> 1 & 1, i & 1);
            // (x, y, z) → (y, z, x)
            (y << 2 | z << 1 | x) as u32
        })
        .collect();
    let flip_x: Vec<u32> = (0..8u32).map(|i| i ^ 4).collect();
    PermGroup::from_generators(
        8,
        vec![
            Perm::try_from_images(cycle).unwrap(),
            Perm::try_from_images(flip_x).unwrap(),
        ],
    )
    .unwrap()
}

#[test]
fn simplex_under_trivial_group_has_four_orbits() {
    let orbits = run_dual_desc(
        &simplex_cone(),
        &PermGroup::trivial(4),
        &RunParams::default(),
    )
    .unwrap();
    assert_eq!(orbits.len(), 4);
    for orbit in &orbits {
        assert_eq!(orbit.count(), 3);
    }
}

#[test]
fn simplex_under_s4_has_one_orbit() {
    let orbits = run_dual_desc(&simplex_cone(), &PermGroup::symmetric(4), &RunParams::default())
        .unwrap();
    assert_eq!(orbits.len(), 1);
    assert_eq!(orbits[0].count(), 3);
}

#[test]
fn cube_under_trivial_group_has_six_orbits() {
    let orbits = run_dual_desc(&cube_cone(), &PermGroup::trivial(8), &RunParams::default())
        .unwrap();
    assert_eq!(orbits.len(), 6);
    for orbit in &orbits {
        assert_eq!(orbit.count(), 4);
    }
}

#[test]
fn cube_under_its_symmetries_has_one_orbit() {
    let orbits =
        run_dual_desc(&cube_cone(), &cube_group(), &RunParams::default()).unwrap();
    assert_eq!(orbits.len(), 1);
}

#[test]
fn nested_recursion_agrees_with_direct_leaves() {
    // Force the sub-cone enumeration through nested orbit-database runs.
    let params = RunParams {
        direct_threshold: 3,
        ..RunParams::default()
    };
    let orbits = run_dual_desc(&cube_cone(), &PermGroup::trivial(8), &params).unwrap();
    assert_eq!(orbits.len(), 6);
}

#[test]
fn zero_budget_is_runtime_exhausted() {
    let params = RunParams {
        max_runtime: Some(0),
        ..RunParams::default()
    };
    assert_eq!(
        run_dual_desc(&cube_cone(), &PermGroup::trivial(8), &params),
        Err(EngineError::RuntimeExhausted),
    );
}

#[test]
fn exhausted_run_resumes_from_its_shard() {
    let tmp = tempfile::tempdir().unwrap();
    let prefix = tmp.path().join("db");
    let exhausted = RunParams {
        max_runtime: Some(0),
        saving: true,
        db_prefix: prefix.clone(),
        ..RunParams::default()
    };
    assert_eq!(
        run_dual_desc(&cube_cone(), &PermGroup::trivial(8), &exhausted),
        Err(EngineError::RuntimeExhausted),
    );

    // The store now holds the seeded orbits, all undone; a re-invocation with
    // a real budget finishes the job.
    let resumed = RunParams {
        max_runtime: None,
        saving: true,
        db_prefix: prefix,
        ..RunParams::default()
    };
    let orbits = run_dual_desc(&cube_cone(), &PermGroup::trivial(8), &resumed).unwrap();
    assert_eq!(orbits.len(), 6);
}

#[test]
fn finished_run_is_closed_under_decomposition() {
    // Termination soundness: decomposing every done orbit of a finished run
    // discovers nothing new.
    let ext = cube_cone();
    let group = cube_group();
    let params = RunParams::default();
    let (red, _) = ext.column_reduction();

    let mut db = DatabaseOrbits::open(group, Box::new(MemStore::new(8))).unwrap();
    let bank = MemoryBank::new(params.bank_capacity);
    driver::drive_to_completion(&red, &mut db, &bank, &params, None, 0).unwrap();
    assert!(db.is_finished());
    let before = db.number_orbits();

    let decomposer = Decomposer::new(&red, &bank, &params, None, 0);
    for face in db.representatives() {
        let stabilizer = db.group().stabilizer(&face).unwrap();
        for neighbor in decomposer.decompose(&face, &stabilizer).unwrap() {
            let inserted = db.insert(&neighbor).unwrap();
            assert!(!inserted.is_new, "new orbit found after completion");
        }
    }
    assert_eq!(db.number_orbits(), before);
}

#[test]
fn mismatched_group_degree_is_fatal() {
    let result = run_dual_desc(
        &simplex_cone(),
        &PermGroup::trivial(5),
        &RunParams::default(),
    );
    assert!(matches!(result, Err(EngineError::Fatal(_))));
}
