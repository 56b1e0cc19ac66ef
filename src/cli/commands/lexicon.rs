use std::env;

use anyhow::{Context, Result};

use super::{CommandKind, CommandResult, CommandSummary, LexiconSummary, analyze::load_lexicon};
use crate::{
    cli::args::LexiconCommand,
    config::load_config,
    core::{LexiconSource, lexicon::Lexicon},
};

pub fn lexicon(cmd: LexiconCommand) -> Result<CommandResult> {
    let source = match cmd.lexicon {
        Some(path) => LexiconSource::File(path),
        None => {
            let cwd = env::current_dir().context("Failed to read the current directory")?;
            let loaded = load_config(&cwd)?;
            match &loaded.config.lexicon {
                Some(path) => LexiconSource::File(loaded.resolve(path)),
                None => LexiconSource::Builtin,
            }
        }
    };
    let lexicon = load_lexicon(&source)?;
    describe(&lexicon, cmd.json)
}

fn describe(lexicon: &Lexicon, json: bool) -> Result<CommandResult> {
    let categories = lexicon
        .categories()
        .iter()
        .map(|c| (c.clone(), lexicon.entries_for(c).count()))
        .collect();
    let json = if json {
        Some(lexicon.to_json().context("Failed to encode lexicon")?)
    } else {
        None
    };

    Ok(CommandResult {
        kind: CommandKind::Lexicon,
        summary: CommandSummary::Lexicon(LexiconSummary {
            version: lexicon.version().to_string(),
            categories,
            json,
        }),
    })
}
