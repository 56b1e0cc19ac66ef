use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::debug;

use super::{CensusOutcome, CommandKind, CommandResult, CommandSummary};
use crate::{
    analyzers::{EmailDirectory, EmailSource},
    cli::args::CensusCommand,
    config::{ConfigLoadResult, load_config},
    core::census::tally,
    output,
};

pub fn census(cmd: CensusCommand) -> Result<CommandResult> {
    let cwd = env::current_dir().context("Failed to read the current directory")?;
    let loaded = load_config(&cwd)?;
    if loaded.from_file {
        debug!("Using config from {}", loaded.root.display());
    }
    let (source, output_root) = resolve(&loaded, cmd);

    let records = source
        .records()
        .context("Failed to read the email corpus")?;
    debug!("Read {} email records", records.len());

    let census = tally(&records, Utc::now());
    let output = output::write_census(&census, source.root(), &output_root)
        .map_err(|err| err.to_string());

    Ok(CommandResult {
        kind: CommandKind::Census,
        summary: CommandSummary::Census(Box::new(CensusOutcome { census, output })),
    })
}

/// Email source and output root, flags first, then the config file.
fn resolve(loaded: &ConfigLoadResult, cmd: CensusCommand) -> (EmailDirectory, PathBuf) {
    let emails_root = cmd
        .emails_root
        .unwrap_or_else(|| loaded.resolve(&loaded.config.emails_root));
    let output_root = cmd
        .output_root
        .unwrap_or_else(|| loaded.resolve(&loaded.config.output_root));
    (
        EmailDirectory::new(emails_root, loaded.config.ignores.clone()),
        output_root,
    )
}
