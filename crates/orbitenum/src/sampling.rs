//! Initial facet heuristics.
//!
//! An empty database needs at least one facet orbit before the adjacency
//! decomposition can walk anywhere. Which bootstrap to use is a configuration
//! string:
//!
//! - `direct` — complete dual description of the cone; exact and expensive.
//! - `direct_limited[:upperlimit_<k>]` — direct enumeration cut off after `k`
//!   facets (default 100).
//! - `full_rank` — one facet plus the flips of its ridges, giving a sample
//!   whose supporting functionals span the full dual space.
//! - `sampling[:critlevel_<k>][:maxnbcall_<k>][:maxnbsize_<k>]` — bounded
//!   recursive flip sampling, deliberately keeping at most one facet per
//!   incidence count for diversity.
//!
//! The `lp_cdd` / `lp_cdd_min` strategies of the wider toolkit need a linear
//! programming collaborator and are reported as unsupported rather than
//! silently remapped.

use orbitmath::{Face, MathResult, QMatrix, dual_description, dual_description_limited, flip};

use crate::{EngineError, EngineResult};

/// Computes the bootstrap facet set for `ext` according to `selector`.
///
/// Unknown selectors and empty samples are fatal: a run that cannot seed its
/// database has nothing meaningful to resume from.
pub fn compute_initial_set(ext: &QMatrix, selector: &str) -> EngineResult<Vec<Face>> {
    let mut parts = selector.split(':');
    let head = parts.next().unwrap_or("");
    let options: Vec<&str> = parts.collect();
    log::info!("computing initial facet set with heuristic {selector:?}");
    let faces = match head {
        "direct" => dual_description(ext)?,
        "direct_limited" => {
            let limit = parse_option(&options, "upperlimit").unwrap_or(100);
            dual_description_limited(ext, Some(limit))?
        }
        "full_rank" => full_rank_facet_set(ext)?,
        "sampling" => {
            let opts = SamplingOptions {
                critlevel: parse_option(&options, "critlevel").unwrap_or(50),
                max_calls: parse_option(&options, "maxnbcall"),
                max_size: parse_option(&options, "maxnbsize").or(Some(20)),
            };
            let mut calls = 0;
            sampling_procedure(ext, &opts, &mut calls)?
        }
        "lp_cdd" | "lp_cdd_min" => {
            return Err(EngineError::Fatal(format!(
                "heuristic {head:?} requires a linear-programming collaborator; \
                 use direct, direct_limited, full_rank, or sampling",
            )));
        }
        other => {
            return Err(EngineError::Fatal(format!(
                "unknown initial facet heuristic {other:?}",
            )));
        }
    };
    if faces.is_empty() {
        return Err(EngineError::Fatal(format!(
            "heuristic {selector:?} found no facets",
        )));
    }
    log::info!("initial facet set has {} faces", faces.len());
    Ok(faces)
}

/// Parses a `name_<value>` entry out of the selector options.
fn parse_option(options: &[&str], name: &str) -> Option<usize> {
    options.iter().find_map(|opt| {
        let (key, value) = opt.split_once('_')?;
        (key == name).then(|| value.parse().ok())?
    })
}

/// One facet plus the flips of its ridges.
///
/// The supporting functionals of the result span the dual space, which makes
/// it a good cheap seed: every other facet is reachable from it by flips.
pub fn full_rank_facet_set(ext: &QMatrix) -> MathResult<Vec<Face>> {
    let (red, _) = ext.column_reduction();
    if red.cols() <= 2 {
        return dual_description(&red);
    }
    let first = dual_description_limited(&red, Some(1))?;
    let Some(facet) = first.into_iter().next() else {
        return Ok(vec![]);
    };
    let sub = red.select_face_rows(&facet);
    let ridges = full_rank_facet_set(&sub)?;
    let mut out = vec![facet.clone()];
    for ridge in &ridges {
        out.push(flip(&red, &facet, ridge)?);
    }
    Ok(out)
}

struct SamplingOptions {
    critlevel: usize,
    max_calls: Option<usize>,
    max_size: Option<usize>,
}

/// Bounded recursive flip sampling.
///
/// Keeps at most one facet per incidence count; the point of the sample is
/// diversity of incidence, not completeness, and the engine fills in the rest.
fn sampling_procedure(
    ext: &QMatrix,
    opts: &SamplingOptions,
    calls: &mut usize,
) -> EngineResult<Vec<Face>> {
    let (red, _) = ext.column_reduction();
    let dim = red.cols();
    let len = red.rows();
    let recurse = len >= opts.critlevel && dim >= 15;

    let mut list: Vec<Face> = vec![];
    let mut unprocessed: Vec<Face> = vec![];
    let insert = |list: &mut Vec<Face>, unprocessed: &mut Vec<Face>, face: Face| {
        if list.iter().any(|known| known.count() == face.count()) {
            return;
        }
        unprocessed.push(face.clone());
        list.push(face);
    };

    if !recurse {
        *calls += 1;
        for face in dual_description(&red)? {
            insert(&mut list, &mut unprocessed, face);
        }
        return Ok(list);
    }

    let first = dual_description_limited(&red, Some(1))?;
    let Some(seed) = first.into_iter().next() else {
        return Ok(list);
    };
    insert(&mut list, &mut unprocessed, seed);
    while let Some(facet) = unprocessed.pop() {
        *calls += 1;
        let sub = red.select_face_rows(&facet);
        let ridges = sampling_procedure(&sub, opts, calls)?;
        for ridge in &ridges {
            let adjacent = flip(&red, &facet, ridge)?;
            insert(&mut list, &mut unprocessed, adjacent);
        }
        if opts.max_size.is_some_and(|m| list.len() >= m) {
            log::debug!("sampling stopped by maxnbsize at {} facets", list.len());
            return Ok(list);
        }
        if opts.max_calls.is_some_and(|m| *calls > m) {
            log::debug!("sampling stopped by maxnbcall at {calls} calls");
            return Ok(list);
        }
    }
    Ok(list)
}
