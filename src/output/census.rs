//! Census report files.
//!
//! - `per_year_counts.csv`: email-like rows, unique emails and duplicates per year
//! - `files_summary.csv`: one row per corpus file
//! - `duplicates_top.csv`: the largest duplicate clusters
//! - `unique_examples.csv`: a sample of unique emails
//! - `overall.json`: totals, per-year maps and the year audit

use std::{
    collections::BTreeMap,
    fmt,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;

use super::{publish_files, run_name};
use crate::core::{
    census::{CensusSummary, Cluster, FileCensus, YEAR_MAX, YEAR_MIN, YearAudit},
    error::WriteError,
};

/// Subdirectory of the output root that holds census runs.
pub const CENSUS_DIR: &str = "census";

const PER_YEAR_CSV: &str = "per_year_counts.csv";
const FILES_CSV: &str = "files_summary.csv";
const DUPLICATES_CSV: &str = "duplicates_top.csv";
const UNIQUE_CSV: &str = "unique_examples.csv";
const OVERALL_JSON: &str = "overall.json";

const TOP_DUPLICATE_CLUSTERS: usize = 50;
const UNIQUE_EXAMPLE_ROWS: usize = 200;

fn encode_error(file: &'static str, err: impl fmt::Display) -> WriteError {
    WriteError::Encode {
        file,
        message: err.to_string(),
    }
}

/// Write a census of `input_dir` to `<output_root>/census/<timestamp>/`.
pub fn write_census(
    census: &CensusSummary,
    input_dir: &Path,
    output_root: &Path,
) -> Result<PathBuf, WriteError> {
    let files = vec![
        (PER_YEAR_CSV.to_string(), render_per_year(census)?),
        (FILES_CSV.to_string(), render_files(census)?),
        (DUPLICATES_CSV.to_string(), render_duplicates(census)?),
        (UNIQUE_CSV.to_string(), render_unique(census)?),
        (OVERALL_JSON.to_string(), render_overall(census, input_dir)?),
    ];
    publish_files(
        &output_root.join(CENSUS_DIR),
        &run_name(census.timestamp),
        &files,
    )
}

fn render_table(
    file: &'static str,
    header: &[&str],
    rows: impl IntoIterator<Item = Vec<String>>,
) -> Result<String, WriteError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer
        .write_record(header)
        .map_err(|e| encode_error(file, e))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| encode_error(file, e))?;
    }
    let bytes = writer.into_inner().map_err(|e| encode_error(file, e))?;
    String::from_utf8(bytes).map_err(|e| encode_error(file, e))
}

fn render_per_year(census: &CensusSummary) -> Result<String, WriteError> {
    let rows = census.years().into_iter().map(|year| {
        let raw = census.per_year_raw.get(&year).copied().unwrap_or(0);
        let unique = census.per_year_unique.get(&year).copied().unwrap_or(0);
        vec![
            year.to_string(),
            raw.to_string(),
            unique.to_string(),
            raw.saturating_sub(unique).to_string(),
        ]
    });
    render_table(
        PER_YEAR_CSV,
        &["year", "email_like_rows", "unique_emails", "estimated_duplicates"],
        rows,
    )
}

fn render_files(census: &CensusSummary) -> Result<String, WriteError> {
    let rows = census.files.iter().map(|f: &FileCensus| {
        vec![
            f.file.clone(),
            f.rows_total.to_string(),
            f.email_like_rows.to_string(),
            f.unique_signatures_in_file.to_string(),
        ]
    });
    render_table(
        FILES_CSV,
        &["file", "rows_total", "email_like_rows", "unique_signatures_in_file"],
        rows,
    )
}

/// `-` stands in for an empty key part.
fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

fn year_cell(cluster: &Cluster) -> String {
    cluster.earliest_year.map(|y| y.to_string()).unwrap_or_default()
}

fn render_duplicates(census: &CensusSummary) -> Result<String, WriteError> {
    let rows = census
        .top_duplicates(TOP_DUPLICATE_CLUSTERS)
        .into_iter()
        .map(|cluster| {
            let examples = cluster
                .examples
                .iter()
                .map(|e| format!("{} :: {}", e.file_name, e.subject))
                .collect::<Vec<_>>()
                .join(" | ");
            vec![
                cluster.count.to_string(),
                or_dash(&cluster.signature.from_domain),
                or_dash(&cluster.signature.subject),
                cluster.signature.hash_prefix().to_string(),
                year_cell(cluster),
                examples,
            ]
        });
    render_table(
        DUPLICATES_CSV,
        &[
            "count",
            "from_domain",
            "normalized_subject",
            "content_hash_prefix",
            "earliest_year",
            "examples",
        ],
        rows,
    )
}

fn render_unique(census: &CensusSummary) -> Result<String, WriteError> {
    let rows = census
        .clusters
        .iter()
        .take(UNIQUE_EXAMPLE_ROWS)
        .map(|cluster| {
            let subjects = cluster
                .examples
                .iter()
                .map(|e| e.subject.as_str())
                .collect::<Vec<_>>()
                .join(" | ");
            vec![
                or_dash(&cluster.signature.from_domain),
                or_dash(&cluster.signature.subject),
                cluster.signature.hash_prefix().to_string(),
                year_cell(cluster),
                subjects,
            ]
        });
    render_table(
        UNIQUE_CSV,
        &[
            "from_domain",
            "normalized_subject",
            "content_hash_prefix",
            "earliest_year",
            "example_subjects",
        ],
        rows,
    )
}

#[derive(Debug, Serialize)]
struct YearWindow {
    min: u16,
    max: u16,
}

#[derive(Debug, Serialize)]
struct Overall<'a> {
    input_dir: String,
    files_scanned: usize,
    rows_total: usize,
    email_like_rows: usize,
    unique_emails: usize,
    estimated_duplicates: usize,
    duplicate_rate_percent: f64,
    years: Vec<u16>,
    per_year_raw: &'a BTreeMap<u16, usize>,
    per_year_unique: &'a BTreeMap<u16, usize>,
    year_window: YearWindow,
    year_audit: YearAudit,
    timestamp: DateTime<Utc>,
}

fn render_overall(census: &CensusSummary, input_dir: &Path) -> Result<String, WriteError> {
    let overall = Overall {
        input_dir: input_dir.display().to_string(),
        files_scanned: census.files.len(),
        rows_total: census.rows_total,
        email_like_rows: census.email_like_rows,
        unique_emails: census.unique_emails(),
        estimated_duplicates: census.estimated_duplicates(),
        duplicate_rate_percent: census.duplicate_rate_percent(),
        years: census.years(),
        per_year_raw: &census.per_year_raw,
        per_year_unique: &census.per_year_unique,
        year_window: YearWindow {
            min: YEAR_MIN,
            max: YEAR_MAX,
        },
        year_audit: census.year_audit,
        timestamp: census.timestamp,
    };
    let json = serde_json::to_string_pretty(&overall).map_err(|e| encode_error(OVERALL_JSON, e))?;
    Ok(format!("{}\n", json))
}
