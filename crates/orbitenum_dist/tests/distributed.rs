//! Distributed/single-process equivalence on small cones.
//!
//! Orbit *sets* must agree across worker counts; indices and discovery order
//! are explicitly not reproducible. An inconclusive outcome (a worker went
//! quiescent just before new work arrived) is not a failure: the shards are
//! resumable, so the harness re-invokes the run until it certifies, which is
//! exactly the production workflow.

use orbitenum::{EngineError, RunParams, run_dual_desc};
use orbitenum_dist::run_on_local_cluster;
use orbitmath::{Face, Perm, PermGroup, QMatrix};

fn cube_cone() -> QMatrix {
    let mut rows = vec![];
    for i in 0..8u32 {
        let c = |bit: u32| if i >> bit & 1 == 1 { 1 } else { -1 };
        rows.push(vec![1, c(2), c(1), c(0)]);
    }
    QMatrix::from_int_rows(&rows)
}

fn cube_group() -> PermGroup {
    let cycle: Vec<u32> = (0..8)
        .map(|i| {
            let (x, y, z) = (i >> 2 & 1, i >> 1 & 1, i & 1);
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

/// Runs the cluster, resuming from the persisted shards until the run
/// certifies complete.
fn run_until_complete(
    n_proc: usize,
    ext: &QMatrix,
    group: &PermGroup,
    params: &RunParams,
) -> Vec<Face> {
    for _ in 0..32 {
        match run_on_local_cluster(n_proc, ext, group, params) {
            Ok(faces) => return faces,
            Err(EngineError::RuntimeExhausted) => continue,
            Err(fatal) => panic!("fatal error from cluster: {fatal}"),
        }
    }
    panic!("cluster did not certify completion within 32 resumes");
}

fn dist_params(prefix: &std::path::Path) -> RunParams {
    RunParams {
        max_runtime: Some(60),
        saving: true,
        db_prefix: prefix.to_path_buf(),
        idle_sleep_ms: 5,
        ..RunParams::default()
    }
}

fn sorted(mut faces: Vec<Face>) -> Vec<Face> {
    faces.sort();
    faces
}

#[test]
fn cluster_sizes_agree_with_serial_on_the_cube() {
    let ext = cube_cone();
    let group = PermGroup::trivial(8);
    let serial = sorted(run_dual_desc(&ext, &group, &RunParams::default()).unwrap());
    assert_eq!(serial.len(), 6);

    for n_proc in [1usize, 2, 3] {
        let tmp = tempfile::tempdir().unwrap();
        let params = dist_params(&tmp.path().join("db"));
        let distributed = sorted(run_until_complete(n_proc, &ext, &group, &params));
        assert_eq!(distributed, serial, "orbit set mismatch at n_proc={n_proc}");
    }
}

#[test]
fn cluster_respects_the_group_action() {
    let ext = cube_cone();
    let group = cube_group();
    let serial = run_dual_desc(&ext, &group, &RunParams::default()).unwrap();
    assert_eq!(serial.len(), 1);

    let tmp = tempfile::tempdir().unwrap();
    let params = dist_params(&tmp.path().join("db"));
    let distributed = run_until_complete(2, &ext, &group, &params);
    assert_eq!(distributed.len(), 1);
    // Same equivalence class: canonical representatives coincide.
    assert_eq!(
        group.canonical_image(&distributed[0]).unwrap(),
        group.canonical_image(&serial[0]).unwrap(),
    );
}

#[test]
fn simplex_orbit_counts_track_the_group() {
    let ext = QMatrix::from_int_rows(&[
        vec![1, 0, 0, 0],
        vec![0, 1, 0, 0],
        vec![0, 0, 1, 0],
        vec![0, 0, 0, 1],
    ]);

    let tmp = tempfile::tempdir().unwrap();
    let trivial = run_until_complete(
        2,
        &ext,
        &PermGroup::trivial(4),
        &dist_params(&tmp.path().join("trivial")),
    );
    assert_eq!(trivial.len(), 4);

    let symmetric = run_until_complete(
        2,
        &ext,
        &PermGroup::symmetric(4),
        &dist_params(&tmp.path().join("s4")),
    );
    assert_eq!(symmetric.len(), 1);
}

#[test]
fn distributed_run_requires_a_budget() {
    let params = RunParams {
        max_runtime: None,
        ..RunParams::default()
    };
    let result = run_on_local_cluster(1, &cube_cone(), &PermGroup::trivial(8), &params);
    assert!(matches!(result, Err(EngineError::Fatal(_))));
}

#[test]
fn memory_backed_cluster_completes_too() {
    // Without shards there is nothing to resume, but a single worker cannot
    // go prematurely quiescent, so one attempt suffices.
    let params = RunParams {
        max_runtime: Some(60),
        saving: false,
        idle_sleep_ms: 5,
        ..RunParams::default()
    };
    let faces = run_on_local_cluster(1, &cube_cone(), &PermGroup::trivial(8), &params).unwrap();
    assert_eq!(faces.len(), 6);
}
