use std::path::PathBuf;

use super::super::exit_status::ExitStatus;
use crate::core::{
    CensusSummary, SessionSummary,
    data::{Category, SourceType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Run,
    Email,
    Image,
    Url,
    Census,
    Init,
    Lexicon,
}

#[derive(Debug)]
pub enum CommandSummary {
    Analyze(Box<AnalyzeSummary>),
    Census(Box<CensusOutcome>),
    Init(InitSummary),
    Lexicon(LexiconSummary),
}

#[derive(Debug)]
pub struct AnalyzeSummary {
    /// Sources that were asked to run, in report order.
    pub sources: Vec<SourceType>,
    pub summary: SessionSummary,
    /// Run directory, or the reason the report could not be written.
    pub output: Result<PathBuf, String>,
}

#[derive(Debug)]
pub struct CensusOutcome {
    pub census: CensusSummary,
    /// Census directory, or the reason it could not be written.
    pub output: Result<PathBuf, String>,
}

#[derive(Debug)]
pub struct InitSummary {
    pub created: bool,
}

#[derive(Debug)]
pub struct LexiconSummary {
    pub version: String,
    /// Category and number of entries, in lexicon order.
    pub categories: Vec<(Category, usize)>,
    /// Canonical JSON when requested with `--json`.
    pub json: Option<String>,
}

/// Result of running cuescan commands
#[derive(Debug)]
pub struct CommandResult {
    pub kind: CommandKind,
    pub summary: CommandSummary,
}

impl CommandResult {
    pub fn exit_status(&self) -> ExitStatus {
        match &self.summary {
            CommandSummary::Analyze(analyze) if analyze.output.is_err() => ExitStatus::Failure,
            CommandSummary::Census(census) if census.output.is_err() => ExitStatus::Failure,
            CommandSummary::Init(init) if !init.created => ExitStatus::Failure,
            _ => ExitStatus::Success,
        }
    }
}
