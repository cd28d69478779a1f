//! Argument parsing and command dispatch.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use orbitenum::key::{ROUTING_SEED, face_hash};
use orbitenum::{EngineError, EngineResult, run_dual_desc};
use orbitenum_dist::run_on_local_cluster;

use crate::io;
use crate::runcfg;

/// Facet orbit enumeration for polyhedral cones, with exact arithmetic and
/// orbit reduction under a permutation group.
#[derive(Debug, Parser)]
#[command(name = "orbitdesc", version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Enumerate facet orbits with the single-process driver.
    Serial {
        /// Ray matrix file: one row of integers per line.
        ext: PathBuf,
        /// Group file: degree on the first line, one generator per line after.
        group: PathBuf,
        /// Run parameter file (TOML); defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the orbit incidence list (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Enumerate facet orbits with the distributed driver on in-process
    /// workers.
    Dist {
        /// Ray matrix file.
        ext: PathBuf,
        /// Group file.
        group: PathBuf,
        /// Number of workers.
        #[arg(long, default_value_t = 2)]
        ranks: usize,
        /// Run parameter file (TOML).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Where to write the orbit incidence list (stdout when omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Re-shard a persisted database for a different worker count. No run may
    /// be active on either database.
    Restructure {
        /// Group file of the run that produced the database (for the vertex
        /// count).
        group: PathBuf,
        /// Input database prefix.
        input: PathBuf,
        /// Worker count of the input database.
        #[arg(long)]
        nproc_in: usize,
        /// Output database prefix.
        output: PathBuf,
        /// Worker count of the output database.
        #[arg(long)]
        nproc_out: usize,
    },
}

/// Executes a parsed command.
pub fn exec(args: Args) -> EngineResult<()> {
    match args.command {
        Command::Serial {
            ext,
            group,
            config,
            output,
        } => {
            let ext = io::read_ray_matrix(&ext)?;
            let group = io::read_group(&group)?;
            let params = runcfg::load(config.as_deref())?;
            let orbits = run_dual_desc(&ext, &group, &params)?;
            io::write_orbits(output.as_deref(), &orbits)
        }
        Command::Dist {
            ext,
            group,
            ranks,
            config,
            output,
        } => {
            let ext = io::read_ray_matrix(&ext)?;
            let group = io::read_group(&group)?;
            let params = runcfg::load(config.as_deref())?;
            let orbits = run_on_local_cluster(ranks, &ext, &group, &params)?;
            io::write_orbits(output.as_deref(), &orbits)
        }
        Command::Restructure {
            group,
            input,
            nproc_in,
            output,
            nproc_out,
        } => {
            let group = io::read_group(&group)?;
            let moved = orbitstore::restructure(
                &input,
                nproc_in,
                &output,
                nproc_out,
                group.degree(),
                |face| face_hash(face, ROUTING_SEED),
            )
            .map_err(|e| EngineError::Fatal(e.to_string()))?;
            log::info!("restructured {moved} orbits from {nproc_in} to {nproc_out} shards");
            Ok(())
        }
    }
}
