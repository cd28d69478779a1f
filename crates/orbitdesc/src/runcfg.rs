//! Run parameter loading.
//!
//! Parameters come from an optional TOML file layered over the defaults;
//! anything not named in the file keeps its default.

use std::path::Path;

use orbitenum::{EngineError, EngineResult, RunParams};

/// Loads run parameters from `path`, or the defaults when no file is given.
pub fn load(path: Option<&Path>) -> EngineResult<RunParams> {
    let Some(path) = path else {
        return Ok(RunParams::default());
    };
    let source = config::File::from(path.to_path_buf()).format(config::FileFormat::Toml);
    let settings = config::Config::builder()
        .add_source(source)
        .build()
        .map_err(|e| EngineError::Fatal(format!("cannot load {}: {e}", path.display())))?;
    settings
        .try_deserialize()
        .map_err(|e| EngineError::Fatal(format!("bad run parameters in {}: {e}", path.display())))
}
