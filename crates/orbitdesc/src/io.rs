//! Text formats for ray matrices, groups, and orbit lists.
//!
//! Everything is whitespace-separated plain text. A ray matrix file holds one
//! integer row per line. A group file holds the degree on its first line and
//! one generator per line after that, each as the images of `0..n`. The orbit
//! output holds the orbit count on the first line and one `0`/`1` incidence
//! string per orbit after it.

use std::path::Path;

use orbitenum::{EngineError, EngineResult};
use orbitmath::{Face, Perm, PermGroup, QMatrix};

fn read_to_string(path: &Path) -> EngineResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| EngineError::Fatal(format!("cannot read {}: {e}", path.display())))
}

/// Reads a ray matrix: one row of integers per line, blank lines ignored.
pub fn read_ray_matrix(path: &Path) -> EngineResult<QMatrix> {
    let text = read_to_string(path)?;
    let mut rows: Vec<Vec<i64>> = vec![];
    for (lineno, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let row: Result<Vec<i64>, _> = line.split_whitespace().map(str::parse).collect();
        let row = row.map_err(|e| {
            EngineError::Fatal(format!(
                "{}:{}: bad matrix entry: {e}",
                path.display(),
                lineno + 1,
            ))
        })?;
        if let Some(first) = rows.first()
            && first.len() != row.len()
        {
            return Err(EngineError::Fatal(format!(
                "{}:{}: row has {} entries, expected {}",
                path.display(),
                lineno + 1,
                row.len(),
                first.len(),
            )));
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(EngineError::Fatal(format!(
            "{}: no rays in matrix file",
            path.display(),
        )));
    }
    Ok(QMatrix::from_int_rows(&rows))
}

/// Reads a permutation group: degree, then one generator per line.
pub fn read_group(path: &Path) -> EngineResult<PermGroup> {
    let text = read_to_string(path)?;
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let degree: usize = lines
        .next()
        .ok_or_else(|| EngineError::Fatal(format!("{}: empty group file", path.display())))?
        .trim()
        .parse()
        .map_err(|e| EngineError::Fatal(format!("{}: bad degree: {e}", path.display())))?;
    let mut generators = vec![];
    for line in lines {
        let images: Result<Vec<u32>, _> = line.split_whitespace().map(str::parse).collect();
        let images = images
            .map_err(|e| EngineError::Fatal(format!("{}: bad generator: {e}", path.display())))?;
        generators.push(Perm::try_from_images(images)?);
    }
    Ok(PermGroup::from_generators(degree, generators)?)
}

/// Writes the orbit list to `path`, or to stdout when `path` is `None`.
pub fn write_orbits(path: Option<&Path>, orbits: &[Face]) -> EngineResult<()> {
    let mut out = String::new();
    out.push_str(&format!("{}\n", orbits.len()));
    for orbit in orbits {
        out.push_str(&format!("{orbit}\n"));
    }
    match path {
        Some(path) => std::fs::write(path, out)
            .map_err(|e| EngineError::Fatal(format!("cannot write {}: {e}", path.display()))),
        None => {
            print!("{out}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_and_group_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let ext_path = tmp.path().join("ext.txt");
        std::fs::write(&ext_path, "1 0 0\n1 1 0\n\n1 0 1\n").unwrap();
        let ext = read_ray_matrix(&ext_path).unwrap();
        assert_eq!((ext.rows(), ext.cols()), (3, 3));

        let grp_path = tmp.path().join("grp.txt");
        std::fs::write(&grp_path, "3\n1 0 2\n").unwrap();
        let group = read_group(&grp_path).unwrap();
        assert_eq!(group.degree(), 3);
        assert_eq!(group.generators().len(), 1);
    }

    #[test]
    fn ragged_matrix_is_fatal() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("ext.txt");
        std::fs::write(&path, "1 0\n1 2 3\n").unwrap();
        assert!(matches!(
            read_ray_matrix(&path),
            Err(EngineError::Fatal(_)),
        ));
    }

    #[test]
    fn orbit_output_format() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.txt");
        let orbits = vec![Face::from_indices(4, [0, 2]), Face::from_indices(4, [3])];
        write_orbits(Some(&path), &orbits).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "2\n1010\n0001\n",
        );
    }
}
