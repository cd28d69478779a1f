//! Command-line front end for the facet orbit enumerator.

use clap::Parser;

mod cli;
mod io;
mod runcfg;

/// Exit code for an inconclusive (but resumable) run, distinct from fatal
/// errors.
const EXIT_INCONCLUSIVE: i32 = 2;

fn main() -> eyre::Result<()> {
    color_eyre::install().expect("error initializing panic handler");
    env_logger::builder().init();

    let args = cli::Args::parse();
    match cli::exec(args) {
        Ok(()) => Ok(()),
        Err(orbitenum::EngineError::RuntimeExhausted) => {
            eprintln!(
                "runtime budget exhausted; the database holds partial progress \
                 and the run can be re-invoked"
            );
            std::process::exit(EXIT_INCONCLUSIVE);
        }
        Err(orbitenum::EngineError::Fatal(message)) => Err(eyre::eyre!(message)),
    }
}
