use std::{io, process::ExitCode};

use clap::Parser;
use cuescan::cli::{Arguments, ExitStatus};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn init_logging(verbose: bool) {
    let default = if verbose { "cuescan=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let args = Arguments::parse();
    init_logging(args.verbose());

    match cuescan::cli::run_cli(args) {
        Ok(status) => status.into(),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitStatus::Error.into()
        }
    }
}
