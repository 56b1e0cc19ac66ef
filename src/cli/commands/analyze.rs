use std::{env, path::PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use super::super::args::{AnalyzeArgs, RunCommand};
use super::{AnalyzeSummary, CommandKind, CommandResult, CommandSummary};
use crate::{
    analyzers::{
        Analyzer, CsvUrlSampler, EmailAnalyzer, EmailDirectory, ImageAnalyzer, SampleMode,
        TesseractOcr, UrlAnalyzer,
    },
    config::{Config, ConfigLoadResult, load_config},
    core::{LexiconSource, Session, data::SourceType, lexicon::Lexicon},
};

pub fn run(cmd: RunCommand) -> Result<CommandResult> {
    let sources = cmd.sources();
    analyze(CommandKind::Run, cmd.args, sources)
}

pub fn single(kind: CommandKind, args: AnalyzeArgs, source: SourceType) -> Result<CommandResult> {
    analyze(kind, args, vec![source])
}

/// Everything an analysis run needs, after config file and flags are merged.
struct AnalyzeContext {
    config: Config,
    lexicon: LexiconSource,
    emails_root: PathBuf,
    images_root: PathBuf,
    urls_file: PathBuf,
    output_root: PathBuf,
}

impl AnalyzeContext {
    fn new(args: AnalyzeArgs) -> Result<Self> {
        let cwd = env::current_dir().context("Failed to read the current directory")?;
        let loaded = load_config(&cwd)?;
        if loaded.from_file {
            debug!("Using config from {}", loaded.root.display());
        }
        Self::from_loaded(loaded, args)
    }

    fn from_loaded(loaded: ConfigLoadResult, args: AnalyzeArgs) -> Result<Self> {
        let lexicon = match (&args.common.lexicon, &loaded.config.lexicon) {
            (Some(path), _) => LexiconSource::File(path.clone()),
            (None, Some(path)) => LexiconSource::File(loaded.resolve(path)),
            (None, None) => LexiconSource::Builtin,
        };
        let emails_root = args
            .inputs
            .emails_root
            .unwrap_or_else(|| loaded.resolve(&loaded.config.emails_root));
        let images_root = args
            .inputs
            .images_root
            .unwrap_or_else(|| loaded.resolve(&loaded.config.images_root));
        let urls_file = args
            .inputs
            .urls_file
            .unwrap_or_else(|| loaded.resolve(&loaded.config.urls_file));
        let output_root = args
            .common
            .output_root
            .unwrap_or_else(|| loaded.resolve(&loaded.config.output_root));

        let mut config = loaded.config;
        if let Some(limit) = args.url.limit {
            config.urls.limit = limit;
        }
        if let Some(seed) = args.url.seed {
            config.urls.seed = seed;
        }
        if args.url.first {
            config.urls.mode = SampleMode::First;
        }
        if let Some(dedupe) = args.url.dedupe {
            config.urls.dedupe = dedupe;
        }
        if let Some(timeout) = args.ocr.ocr_timeout {
            config.ocr.timeout_secs = timeout;
        }
        config.validate()?;

        Ok(Self {
            config,
            lexicon,
            emails_root,
            images_root,
            urls_file,
            output_root,
        })
    }

    fn analyzer(&self, source: SourceType) -> Analyzer {
        let config = &self.config;
        match source {
            SourceType::Email => Analyzer::Email(EmailAnalyzer::new(EmailDirectory::new(
                &self.emails_root,
                config.ignores.clone(),
            ))),
            SourceType::Image => Analyzer::Image(ImageAnalyzer::new(
                &self.images_root,
                config.ocr.extensions.clone(),
                config.ignores.clone(),
                TesseractOcr::new(
                    config.ocr.command.clone(),
                    config.ocr.args.clone(),
                    config.ocr.timeout_secs,
                ),
            )),
            SourceType::Url => Analyzer::Url(UrlAnalyzer::new(CsvUrlSampler::new(
                &self.urls_file,
                config.urls.limit,
                config.urls.seed,
                config.urls.mode,
                config.urls.dedupe,
            ))),
        }
    }
}

pub fn load_lexicon(source: &LexiconSource) -> Result<Lexicon> {
    source.load().with_context(|| match source {
        LexiconSource::Builtin => "Failed to load the built-in lexicon".to_string(),
        LexiconSource::File(path) => format!("Failed to load lexicon {:?}", path),
    })
}

fn analyze(kind: CommandKind, args: AnalyzeArgs, sources: Vec<SourceType>) -> Result<CommandResult> {
    let ctx = AnalyzeContext::new(args)?;
    let lexicon = load_lexicon(&ctx.lexicon)?;
    debug!(
        "Lexicon {} with {} categories, {} entries",
        lexicon.version(),
        lexicon.categories().len(),
        lexicon.len()
    );

    let analyzers: Vec<Analyzer> = sources.iter().map(|&s| ctx.analyzer(s)).collect();

    let mut session = Session::new(&lexicon, &ctx.config.signals);
    session.analyze_all(&analyzers)?;
    let summary = session.summarize()?.clone();
    let output = session
        .write(&ctx.output_root)
        .map_err(|err| err.to_string());

    Ok(CommandResult {
        kind,
        summary: CommandSummary::Analyze(Box::new(AnalyzeSummary {
            sources,
            summary,
            output,
        })),
    })
}
