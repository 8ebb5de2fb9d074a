//! `pfield` command-line driver.
//!
//! Reads a parameter file, runs the simulation, and exits with status 0 on
//! normal termination or 1 after printing the error.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pfield::engine::{RunContext, Simulation, SimulationConfig, SimulationError};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Phase-field simulation driver.
#[derive(Parser)]
#[command(name = "pfield")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Matrix-free phase-field simulation driver", long_about = None)]
struct Cli {
    /// Parameter file (JSON).
    #[arg(default_value = "parameters.json")]
    params: PathBuf,

    /// Resume from a checkpoint; without a path, the newest one in the
    /// output directory.
    #[arg(long, num_args = 0..=1, default_missing_value = "", value_parser = clap::builder::TypedValueParser::map(clap::builder::OsStringValueParser::new(), PathBuf::from))]
    restart: Option<PathBuf>,

    /// Worker threads, overriding the parameter file.
    #[arg(short, long)]
    threads: Option<usize>,

    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes
    /// precedence.
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

fn run(cli: &Cli) -> Result<(), SimulationError> {
    let config = SimulationConfig::from_path(&cli.params)?;
    let ctx = RunContext::new(cli.threads.or(config.threads))?;
    info!(params = %cli.params.display(), threads = ctx.threads(), "starting");

    let mut sim = Simulation::new(config)?;
    sim.build_fields()?;
    sim.init(&ctx)?;
    match &cli.restart {
        Some(path) if path.as_os_str().is_empty() => sim.restore_latest()?,
        Some(path) => sim.restore(path)?,
        None => {}
    }
    let end = sim.solve(&ctx)?;
    info!(time = end.time, steps = %end.step, "done");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(kind = ?e.kind(), "{e}");
            eprintln!("Exception on processing: {e}\nAborting!");
            ExitCode::FAILURE
        }
    }
}
