/// Main entry point for the cuescan CLI.
///
/// Dispatches to the appropriate command handler based on the parsed arguments.
///
/// # Returns
/// - `Ok(CommandResult)` with the command's summary and exit behavior
/// - `Err` if the command fails before analysis (e.g., invalid config, bad lexicon)
///
/// # Example
/// ```ignore
/// let args = Arguments::parse();
/// let result = cuescan::cli::run(args)?;
/// let code: ExitCode = result.exit_status().into();
/// ```
use anyhow::{Result, bail};

use super::{
    args::{Arguments, Command},
    commands::{CommandKind, CommandResult, analyze, census::census, init::init, lexicon::lexicon},
};
use crate::core::data::SourceType;

pub fn run(Arguments { command }: Arguments) -> Result<CommandResult> {
    match command {
        Some(Command::Run(cmd)) => analyze::run(cmd),
        Some(Command::Email(args)) => analyze::single(CommandKind::Email, args, SourceType::Email),
        Some(Command::Image(args)) => analyze::single(CommandKind::Image, args, SourceType::Image),
        Some(Command::Url(args)) => analyze::single(CommandKind::Url, args, SourceType::Url),
        Some(Command::Census(cmd)) => census(cmd),
        Some(Command::Init) => init(),
        Some(Command::Lexicon(cmd)) => lexicon(cmd),
        None => bail!("No command provided. Use --help to see available commands."),
    }
}
