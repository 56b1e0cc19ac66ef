//! Command-line interface layer.
//!
//! Parses arguments, runs the command, prints its result and maps it to an
//! exit status. Everything below this layer returns values instead of
//! printing.

use anyhow::Result;

mod args;
mod commands;
mod exit_status;
mod report;
mod run;

pub use args::{
    AnalyzeArgs, Arguments, CensusCommand, Command, CommonArgs, InputArgs, LexiconCommand, OcrArgs,
    RunCommand, UrlArgs,
};
pub use commands::{CommandKind, CommandResult, CommandSummary};
pub use exit_status::ExitStatus;
pub use run::run;

pub fn run_cli(args: Arguments) -> Result<ExitStatus> {
    let verbose = args.verbose();

    let Some(args) = args.with_command_or_help() else {
        return Ok(ExitStatus::Success);
    };

    let result = run::run(args)?;
    report::print(&result, verbose);

    Ok(result.exit_status())
}
