//! Three-file shard backend.
//!
//! A shard directory holds exactly three files:
//!
//! - `database.nb` — one little-endian `u64`: the orbit count;
//! - `database.fb` — one status bit per orbit, packed LSB-first;
//! - `database.ff` — `delta = ceil(n_vertex/8)` bytes of packed incidence per
//!   orbit.
//!
//! Writes go data-files-first, count-file-last, so a reader (or a resumed run)
//! can never observe a count larger than the records actually present.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use orbitmath::Face;

use crate::{OrbitStore, StoreError, StoreResult};

const FILE_COUNT: &str = "database.nb";
const FILE_STATUS: &str = "database.fb";
const FILE_FACES: &str = "database.ff";

/// File-backed orbit store: one shard directory, three write-through files.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    n_vertex: usize,
    delta: usize,
    count: u64,
    nb: File,
    fb: File,
    ff: File,
}

fn io_err(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn open_rw(dir: &Path, name: &str, create: bool) -> StoreResult<File> {
    let path = dir.join(name);
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(create)
        .open(&path)
        .map_err(|e| io_err(&path, e))
}

impl FileStore {
    /// Opens the shard at `dir` for faces over `n_vertex` vertices.
    ///
    /// With `create` set, a missing directory or missing files are created
    /// (starting at zero orbits); existing files are resumed, never truncated.
    /// Without it, anything missing is an error.
    pub fn open(dir: &Path, n_vertex: usize, create: bool) -> StoreResult<Self> {
        if create {
            std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;
        }
        let mut nb = open_rw(dir, FILE_COUNT, create)?;
        let fb = open_rw(dir, FILE_STATUS, create)?;
        let ff = open_rw(dir, FILE_FACES, create)?;
        let delta = Face::packed_len(n_vertex);

        let nb_path = dir.join(FILE_COUNT);
        let nb_len = nb.metadata().map_err(|e| io_err(&nb_path, e))?.len();
        let count = if nb_len == 0 {
            // Fresh store.
            nb.write_all(&0u64.to_le_bytes())
                .map_err(|e| io_err(&nb_path, e))?;
            nb.flush().map_err(|e| io_err(&nb_path, e))?;
            0
        } else {
            let mut buf = [0u8; 8];
            nb.seek(SeekFrom::Start(0)).map_err(|e| io_err(&nb_path, e))?;
            nb.read_exact(&mut buf).map_err(|e| io_err(&nb_path, e))?;
            u64::from_le_bytes(buf)
        };

        let store = FileStore {
            dir: dir.to_path_buf(),
            n_vertex,
            delta,
            count,
            nb,
            fb,
            ff,
        };
        store.check_data_present()?;
        log::debug!(
            "opened store {} with {} orbits over {} vertices",
            store.dir.display(),
            store.count,
            n_vertex,
        );
        Ok(store)
    }

    /// Verifies that the data files hold at least `count` records.
    fn check_data_present(&self) -> StoreResult<()> {
        let ff_path = self.dir.join(FILE_FACES);
        let ff_len = self.ff.metadata().map_err(|e| io_err(&ff_path, e))?.len();
        let available_ff = if self.delta == 0 {
            u64::MAX
        } else {
            ff_len / self.delta as u64
        };
        if available_ff < self.count {
            return Err(StoreError::Truncated {
                path: ff_path,
                count: self.count,
                available: available_ff,
            });
        }
        let fb_path = self.dir.join(FILE_STATUS);
        let fb_len = self.fb.metadata().map_err(|e| io_err(&fb_path, e))?.len();
        if fb_len * 8 < self.count {
            return Err(StoreError::Truncated {
                path: fb_path,
                count: self.count,
                available: fb_len * 8,
            });
        }
        Ok(())
    }

    fn check_index(&self, index: u64) -> StoreResult<()> {
        if index >= self.count {
            return Err(StoreError::BadIndex {
                index,
                count: self.count,
            });
        }
        Ok(())
    }

    fn write_count(&mut self) -> StoreResult<()> {
        let path = self.dir.join(FILE_COUNT);
        self.nb
            .seek(SeekFrom::Start(0))
            .map_err(|e| io_err(&path, e))?;
        self.nb
            .write_all(&self.count.to_le_bytes())
            .map_err(|e| io_err(&path, e))?;
        self.nb.flush().map_err(|e| io_err(&path, e))
    }

    fn write_status_bit(&mut self, index: u64, done: bool) -> StoreResult<()> {
        let path = self.dir.join(FILE_STATUS);
        let byte_pos = index / 8;
        let bit = 1u8 << (index % 8);
        let mut byte = [0u8];
        let fb_len = self.fb.metadata().map_err(|e| io_err(&path, e))?.len();
        if byte_pos < fb_len {
            self.fb
                .seek(SeekFrom::Start(byte_pos))
                .map_err(|e| io_err(&path, e))?;
            self.fb
                .read_exact(&mut byte)
                .map_err(|e| io_err(&path, e))?;
        }
        if done {
            byte[0] |= bit;
        } else {
            byte[0] &= !bit;
        }
        self.fb
            .seek(SeekFrom::Start(byte_pos))
            .map_err(|e| io_err(&path, e))?;
        self.fb.write_all(&byte).map_err(|e| io_err(&path, e))?;
        self.fb.flush().map_err(|e| io_err(&path, e))
    }
}

impl OrbitStore for FileStore {
    fn n_vertex(&self) -> usize {
        self.n_vertex
    }

    fn orbit_count(&self) -> u64 {
        self.count
    }

    fn append(&mut self, face: &Face, done: bool) -> StoreResult<u64> {
        if face.len() != self.n_vertex {
            return Err(StoreError::BadFaceLength {
                expected: self.n_vertex,
                got: face.len(),
            });
        }
        let index = self.count;
        let ff_path = self.dir.join(FILE_FACES);
        self.ff
            .seek(SeekFrom::Start(index * self.delta as u64))
            .map_err(|e| io_err(&ff_path, e))?;
        self.ff
            .write_all(&face.to_bytes())
            .map_err(|e| io_err(&ff_path, e))?;
        self.ff.flush().map_err(|e| io_err(&ff_path, e))?;
        self.write_status_bit(index, done)?;
        // Count goes last; see module docs.
        self.count = index + 1;
        self.write_count()?;
        Ok(index)
    }

    fn face(&mut self, index: u64) -> StoreResult<Face> {
        self.check_index(index)?;
        let path = self.dir.join(FILE_FACES);
        let mut buf = vec![0u8; self.delta];
        self.ff
            .seek(SeekFrom::Start(index * self.delta as u64))
            .map_err(|e| io_err(&path, e))?;
        self.ff
            .read_exact(&mut buf)
            .map_err(|e| io_err(&path, e))?;
        Ok(Face::from_bytes(self.n_vertex, &buf))
    }

    fn status(&mut self, index: u64) -> StoreResult<bool> {
        self.check_index(index)?;
        let path = self.dir.join(FILE_STATUS);
        let mut byte = [0u8];
        self.fb
            .seek(SeekFrom::Start(index / 8))
            .map_err(|e| io_err(&path, e))?;
        self.fb
            .read_exact(&mut byte)
            .map_err(|e| io_err(&path, e))?;
        Ok(byte[0] & (1 << (index % 8)) != 0)
    }

    fn set_status(&mut self, index: u64, done: bool) -> StoreResult<()> {
        self.check_index(index)?;
        self.write_status_bit(index, done)
    }
}
