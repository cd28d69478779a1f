//! Offline re-sharding of a persisted orbit database.
//!
//! Changing the worker count invalidates the `hash % n_proc` routing of every
//! stored record, so a database written by `n_in` workers has to be migrated
//! before a run with `n_out` workers can resume from it. The migration is a
//! one-shot, single-threaded pass: no run may be active on either database
//! while it executes.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use orbitmath::Face;

use crate::file::FileStore;
use crate::{OrbitStore, StoreError, StoreResult, shard_dir};

/// One output shard mid-migration: data files open, count deferred.
struct ShardWriter {
    dir: PathBuf,
    ff: File,
    status_bits: Vec<u8>,
    shift: u64,
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl ShardWriter {
    fn create(dir: PathBuf) -> StoreResult<Self> {
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let ff_path = dir.join("database.ff");
        let ff = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&ff_path)
            .map_err(|e| io_err(&ff_path, e))?;
        Ok(ShardWriter {
            dir,
            ff,
            status_bits: vec![],
            shift: 0,
        })
    }

    fn push(&mut self, face: &Face, done: bool) -> StoreResult<()> {
        let ff_path = self.dir.join("database.ff");
        self.ff
            .write_all(&face.to_bytes())
            .map_err(|e| io_err(&ff_path, e))?;
        let bit = self.shift;
        if bit % 8 == 0 {
            self.status_bits.push(0);
        }
        if done {
            let last = self.status_bits.len() - 1;
            self.status_bits[last] |= 1 << (bit % 8);
        }
        self.shift += 1;
        Ok(())
    }

    /// Writes the status file, then the count scalar. The count goes last so
    /// no reader can observe more orbits than the shard actually holds.
    fn finish(mut self) -> StoreResult<u64> {
        let ff_path = self.dir.join("database.ff");
        self.ff.flush().map_err(|e| io_err(&ff_path, e))?;
        let fb_path = self.dir.join("database.fb");
        std::fs::write(&fb_path, &self.status_bits).map_err(|e| io_err(&fb_path, e))?;
        let nb_path = self.dir.join("database.nb");
        std::fs::write(&nb_path, self.shift.to_le_bytes()).map_err(|e| io_err(&nb_path, e))?;
        Ok(self.shift)
    }
}

/// Re-shards a database from `n_in` input shards under `in_prefix` to `n_out`
/// output shards under `out_prefix`.
///
/// `route` is the sharding hash of the run (a pure function of the incidence
/// bits); each record lands in shard `route(face) % n_out`. Record order
/// across shards is not preserved, only the set of `(face, status)` records.
pub fn restructure(
    in_prefix: &Path,
    n_in: usize,
    out_prefix: &Path,
    n_out: usize,
    n_vertex: usize,
    route: impl Fn(&Face) -> u64,
) -> StoreResult<u64> {
    let mut writers = vec![];
    for rank in 0..n_out {
        writers.push(ShardWriter::create(shard_dir(out_prefix, n_out, rank))?);
    }

    let mut total = 0u64;
    for rank in 0..n_in {
        let dir = shard_dir(in_prefix, n_in, rank);
        let mut store = FileStore::open(&dir, n_vertex, false)?;
        let count = store.orbit_count();
        log::info!("restructure: shard {} holds {count} orbits", dir.display());
        for pos in 0..count {
            let face = store.face(pos)?;
            let done = store.status(pos)?;
            let dest = (route(&face) % n_out as u64) as usize;
            writers[dest].push(&face, done)?;
            total += 1;
        }
    }

    for writer in writers {
        writer.finish()?;
    }
    log::info!("restructure: moved {total} orbits to {n_out} shards");
    Ok(total)
}
