//! CLI argument definitions using clap.
//!
//! ## Commands
//!
//! - `run`: Run every analyzer concurrently and write the combined report
//! - `email` / `image` / `url`: Run a single analyzer and write its report
//! - `census`: Count unique emails per year in the email corpus
//! - `init`: Initialize cuescan configuration file
//! - `lexicon`: Validate and print the lexicon

use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::{analyzers::DedupeMode, core::data::SourceType};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Arguments {
    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Arguments {
    /// Check if a command was provided, otherwise print help and return None.
    pub fn with_command_or_help(self) -> Option<Self> {
        if self.command.is_none() {
            Self::command().print_help().ok();
            None
        } else {
            Some(self)
        }
    }

    /// Get the verbose flag from the command's common args.
    pub fn verbose(&self) -> bool {
        match &self.command {
            Some(Command::Run(cmd)) => cmd.args.common.verbose,
            Some(Command::Email(args) | Command::Image(args) | Command::Url(args)) => {
                args.common.verbose
            }
            Some(Command::Lexicon(cmd)) => cmd.verbose,
            Some(Command::Census(cmd)) => cmd.verbose,
            Some(Command::Init) | None => false,
        }
    }
}

/// Common arguments shared by the analysis commands.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Lexicon JSON file (overrides config file, default: built-in lexicon)
    #[arg(long)]
    pub lexicon: Option<PathBuf>,

    /// Directory run reports are written under (overrides config file)
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Input locations (override config file).
#[derive(Debug, Clone, Default, Args)]
pub struct InputArgs {
    /// Directory of .csv / .mbox email corpora
    #[arg(long)]
    pub emails_root: Option<PathBuf>,

    /// Directory of images to OCR
    #[arg(long)]
    pub images_root: Option<PathBuf>,

    /// CSV file with a `url` column
    #[arg(long)]
    pub urls_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct UrlArgs {
    /// Maximum number of URLs to analyze (0 = all)
    #[arg(long)]
    pub limit: Option<usize>,

    /// Seed for the random URL sample
    #[arg(long)]
    pub seed: Option<u64>,

    /// Take the first URLs instead of a random sample
    #[arg(long)]
    pub first: bool,

    /// How to dedupe URLs before sampling
    #[arg(long, value_enum)]
    pub dedupe: Option<DedupeMode>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct OcrArgs {
    /// Seconds before a single OCR invocation is abandoned
    #[arg(long)]
    pub ocr_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Parser)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    #[command(flatten)]
    pub inputs: InputArgs,

    #[command(flatten)]
    pub url: UrlArgs,

    #[command(flatten)]
    pub ocr: OcrArgs,
}

#[derive(Debug, Args)]
pub struct RunCommand {
    /// Sources to leave out (can be repeated: --skip image --skip url)
    #[arg(long, value_enum)]
    pub skip: Vec<SourceType>,

    #[command(flatten)]
    pub args: AnalyzeArgs,
}

impl RunCommand {
    /// Sources that will run, in report order.
    pub fn sources(&self) -> Vec<SourceType> {
        SourceType::ALL
            .into_iter()
            .filter(|s| !self.skip.contains(s))
            .collect()
    }
}

#[derive(Debug, Args)]
pub struct LexiconCommand {
    /// Lexicon JSON file (overrides config file, default: built-in lexicon)
    #[arg(long)]
    pub lexicon: Option<PathBuf>,

    /// Print the canonical lexicon JSON instead of a summary
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Default, Args)]
pub struct CensusCommand {
    /// Directory of .csv / .mbox email corpora (overrides config file)
    #[arg(long)]
    pub emails_root: Option<PathBuf>,

    /// Directory the census is written under (overrides config file)
    #[arg(long)]
    pub output_root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze emails, images and URLs and write the combined report
    Run(RunCommand),
    /// Analyze the email corpus only
    Email(AnalyzeArgs),
    /// Analyze OCR'd images only
    Image(AnalyzeArgs),
    /// Analyze the sampled URL list only
    Url(AnalyzeArgs),
    /// Count unique and duplicate emails per year in the email corpus
    Census(CensusCommand),
    /// Initialize a new .cuescanrc.json configuration file
    Init,
    /// Validate the lexicon and list its categories
    Lexicon(LexiconCommand),
}
