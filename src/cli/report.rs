//! Report formatting and printing utilities.
//!
//! Renders command results for the terminal. Kept apart from the engine so
//! cuescan can be used as a library.

use std::io::{self, Write};

use colored::Colorize;
use unicode_width::UnicodeWidthStr;

use super::commands::{
    AnalyzeSummary, CensusOutcome, CommandResult, CommandSummary, InitSummary, LexiconSummary,
};
use crate::{
    config::CONFIG_FILE_NAME,
    core::{SessionSummary, data::SourceType},
};

/// Success mark for consistent output formatting.
pub const SUCCESS_MARK: &str = "\u{2713}"; // ✓

/// Failure mark for consistent output formatting.
pub const FAILURE_MARK: &str = "\u{2718}"; // ✘

const TOTAL_LABEL: &str = "total";

pub fn print(result: &CommandResult, verbose: bool) {
    let mut stdout = io::stdout().lock();
    let mut stderr = io::stderr().lock();
    print_to(result, verbose, &mut stdout, &mut stderr);
}

/// Print a command result to custom writers.
pub fn print_to<O: Write, E: Write>(result: &CommandResult, verbose: bool, out: &mut O, err: &mut E) {
    match &result.summary {
        CommandSummary::Analyze(summary) => print_analyze(summary, verbose, out, err),
        CommandSummary::Census(outcome) => print_census(outcome, verbose, out, err),
        CommandSummary::Init(summary) => print_init(summary, out, err),
        CommandSummary::Lexicon(summary) => print_lexicon(summary, out),
    }
}

// ============================================================
// Analyze
// ============================================================

fn print_analyze<O: Write, E: Write>(
    result: &AnalyzeSummary,
    verbose: bool,
    out: &mut O,
    err: &mut E,
) {
    let summary = &result.summary;
    let _ = writeln!(
        out,
        "Analyzed {} {} ({} {})",
        summary.total_documents,
        plural(summary.total_documents, "document", "documents"),
        summary.total_errors,
        plural(summary.total_errors, "error", "errors"),
    );
    let _ = writeln!(out);

    print_table(summary, &result.sources, out);
    print_statistics(summary, &result.sources, verbose, out);

    for failure in &summary.module_errors {
        let _ = writeln!(
            err,
            "{} {} analyzer did not run: {}",
            "warning:".bold().yellow(),
            failure.source,
            failure.message
        );
    }
    if summary.total_errors > 0 && !verbose {
        let _ = writeln!(
            err,
            "{} {} record(s) could not be analyzed (see the error column of the detail files, or use {})",
            "warning:".bold().yellow(),
            summary.total_errors,
            "-v".cyan()
        );
    }

    match &result.output {
        Ok(dir) => {
            let _ = writeln!(
                out,
                "\n{} {}",
                SUCCESS_MARK.green(),
                format!("Report written to {}", dir.display()).green()
            );
        }
        Err(message) => {
            let _ = writeln!(
                err,
                "\n{} {} {}",
                FAILURE_MARK.red(),
                "Failed to write report:".bold().red(),
                message
            );
        }
    }
}

fn print_table<W: Write>(summary: &SessionSummary, sources: &[SourceType], out: &mut W) {
    let label_width = summary
        .categories
        .iter()
        .map(|c| UnicodeWidthStr::width(c.as_str()))
        .chain([UnicodeWidthStr::width("category"), TOTAL_LABEL.len()])
        .max()
        .unwrap_or(0);

    let mut header = format!("{:<label_width$}", "category");
    for source in sources {
        header.push_str(&format!("  {:>6}", source.as_str()));
    }
    header.push_str(&format!("  {:>6}", TOTAL_LABEL));
    let _ = writeln!(out, "{}", header.bold());

    for category in &summary.categories {
        let name = category.as_str();
        let padding = label_width - UnicodeWidthStr::width(name);
        let mut row = format!("{}{}", name.cyan(), " ".repeat(padding));
        let mut total = 0;
        for &source in sources {
            let count = summary.count(category, source);
            total += count;
            row.push_str(&format!("  {:>6}", count));
        }
        row.push_str(&format!("  {:>6}", total));
        let _ = writeln!(out, "{}", row);
    }

    let mut footer = format!("{:<label_width$}", TOTAL_LABEL);
    let mut grand_total = 0;
    for &source in sources {
        let cues = summary.source(source).cues;
        grand_total += cues;
        footer.push_str(&format!("  {:>6}", cues));
    }
    footer.push_str(&format!("  {:>6}", grand_total));
    let _ = writeln!(out, "{}", footer.bold());
}

fn print_statistics<W: Write>(
    summary: &SessionSummary,
    sources: &[SourceType],
    verbose: bool,
    out: &mut W,
) {
    let stats = &summary.statistics;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} {:.1}%  {} {:.2}  {} {:.1}%",
        "cue rate".dimmed(),
        stats.cue_rate * 100.0,
        "cues/document".dimmed(),
        stats.mean_cues_per_document,
        "error rate".dimmed(),
        stats.error_rate * 100.0
    );

    if verbose {
        for &source in sources {
            let totals = summary.source(source);
            let _ = writeln!(
                out,
                "  {}: {} documents, {} errors, weighted {:.2}",
                source, totals.documents, totals.errors, totals.weighted
            );
        }
        let extras = &summary.extras;
        let _ = writeln!(
            out,
            "  extras: {} all-caps words, {} exclamations, {} money symbols, {} links",
            extras.all_caps_words, extras.exclamations, extras.money_symbols, extras.links
        );
        let _ = writeln!(out, "  lexicon: {}", summary.lexicon_version);
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}

// ============================================================
// Census
// ============================================================

fn print_census<O: Write, E: Write>(
    outcome: &CensusOutcome,
    verbose: bool,
    out: &mut O,
    err: &mut E,
) {
    let census = &outcome.census;
    let _ = writeln!(
        out,
        "Scanned {} {} ({} rows, {} email-like)",
        census.files.len(),
        plural(census.files.len(), "file", "files"),
        census.rows_total,
        census.email_like_rows
    );
    let _ = writeln!(
        out,
        "{} {}  {} {} ({:.2}%)",
        "unique emails".dimmed(),
        census.unique_emails(),
        "estimated duplicates".dimmed(),
        census.estimated_duplicates(),
        census.duplicate_rate_percent()
    );

    let years = census.years();
    if !years.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", format!("{:<4}  {:>8}  {:>8}", "year", "emails", "unique").bold());
        for year in years {
            let _ = writeln!(
                out,
                "{}  {:>8}  {:>8}",
                year.to_string().cyan(),
                census.per_year_raw.get(&year).copied().unwrap_or(0),
                census.per_year_unique.get(&year).copied().unwrap_or(0)
            );
        }
    }

    if verbose {
        let audit = &census.year_audit;
        let _ = writeln!(
            out,
            "  years: {} from date, {} from file name, {} unknown, {} dates out of range",
            audit.date_valid, audit.fallback_file, audit.unknown, audit.date_out_of_range
        );
    }

    match &outcome.output {
        Ok(dir) => {
            let _ = writeln!(
                out,
                "\n{} {}",
                SUCCESS_MARK.green(),
                format!("Census written to {}", dir.display()).green()
            );
        }
        Err(message) => {
            let _ = writeln!(
                err,
                "\n{} {} {}",
                FAILURE_MARK.red(),
                "Failed to write census:".bold().red(),
                message
            );
        }
    }
}

// ============================================================
// Init / Lexicon
// ============================================================

fn print_init<O: Write, E: Write>(summary: &InitSummary, out: &mut O, err: &mut E) {
    if summary.created {
        let _ = writeln!(
            out,
            "{} {}",
            SUCCESS_MARK.green(),
            format!("Created {}", CONFIG_FILE_NAME).green()
        );
    } else {
        let _ = writeln!(err, "Error: {} already exists", CONFIG_FILE_NAME);
    }
}

fn print_lexicon<W: Write>(summary: &LexiconSummary, out: &mut W) {
    if let Some(json) = &summary.json {
        let _ = writeln!(out, "{}", json);
        return;
    }

    let entries: usize = summary.categories.iter().map(|(_, n)| n).sum();
    let _ = writeln!(
        out,
        "{} {}",
        SUCCESS_MARK.green(),
        format!(
            "Lexicon {}: {} categories, {} entries",
            summary.version,
            summary.categories.len(),
            entries
        )
        .green()
    );
    let width = summary
        .categories
        .iter()
        .map(|(c, _)| UnicodeWidthStr::width(c.as_str()))
        .max()
        .unwrap_or(0);
    for (category, count) in &summary.categories {
        let padding = width - UnicodeWidthStr::width(category.as_str());
        let _ = writeln!(
            out,
            "  {}{}  {}",
            category.as_str().cyan(),
            " ".repeat(padding),
            count
        );
    }
}
