//! Report writer.
//!
//! Every run gets its own directory under the output root, named by the
//! run's local timestamp (`YYYYmmdd_HHMMSS`, with `_1`, `_2`, ... appended
//! when that name is taken):
//!
//! - `combined_summary.csv`: category x source table plus statistics
//! - `combined_summary.json`: the full `SessionSummary`
//! - `<source>_results.csv`: one row per record, for each source that ran
//!
//! A corpus census goes to `<output root>/census/<timestamp>/` instead
//! (see `write_census`).
//!
//! Files are rendered in memory, written into a hidden staging directory
//! and published with a single rename. A failure at any step removes the
//! staging directory, so a run directory either holds the complete report
//! or does not exist.

mod census;
mod json;
mod tables;

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Local, Utc};
use tracing::debug;

pub use census::{CENSUS_DIR, write_census};
pub use json::parse_summary;
pub use tables::{CombinedRow, CombinedTable, parse_combined};

use crate::core::{
    aggregate::{SessionResults, SessionSummary},
    data::SourceType,
    error::WriteError,
};

pub const COMBINED_CSV: &str = "combined_summary.csv";
pub const COMBINED_JSON: &str = "combined_summary.json";

const MAX_NAME_ATTEMPTS: usize = 1000;

/// Write the combined report only.
pub fn write(summary: &SessionSummary, output_root: &Path) -> Result<PathBuf, WriteError> {
    write_run(summary, None, output_root)
}

/// Write the combined report plus one detail file per source that ran.
pub fn write_session(
    summary: &SessionSummary,
    results: &SessionResults,
    output_root: &Path,
) -> Result<PathBuf, WriteError> {
    write_run(summary, Some(results), output_root)
}

/// File name of a source's detail table.
pub fn details_file_name(source: SourceType) -> String {
    format!("{}_results.csv", source)
}

fn write_run(
    summary: &SessionSummary,
    results: Option<&SessionResults>,
    output_root: &Path,
) -> Result<PathBuf, WriteError> {
    let files = render_files(summary, results)?;
    publish_files(output_root, &run_name(summary.timestamp), &files)
}

/// Local time directory name, `YYYYmmdd_HHMMSS`.
fn run_name(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y%m%d_%H%M%S")
        .to_string()
}

/// Write `files` into a fresh directory `<output_root>/<name>` (or a
/// suffixed variant) through a staging directory.
fn publish_files(
    output_root: &Path,
    name: &str,
    files: &[(String, String)],
) -> Result<PathBuf, WriteError> {
    fs::create_dir_all(output_root).map_err(|source| WriteError::CreateRoot {
        path: output_root.to_path_buf(),
        source,
    })?;

    let staging = output_root.join(format!(".{}.partial-{}", name, std::process::id()));
    if staging.exists() {
        let _ = fs::remove_dir_all(&staging);
    }
    fs::create_dir(&staging).map_err(|source| WriteError::Stage {
        path: staging.clone(),
        source,
    })?;

    let published = write_files(&staging, files).and_then(|_| publish(&staging, output_root, name));
    if published.is_err() {
        let _ = fs::remove_dir_all(&staging);
    }
    published
}

fn render_files(
    summary: &SessionSummary,
    results: Option<&SessionResults>,
) -> Result<Vec<(String, String)>, WriteError> {
    let mut files = vec![
        (COMBINED_CSV.to_string(), tables::render_combined(summary)?),
        (COMBINED_JSON.to_string(), json::render(summary)?),
    ];
    if let Some(results) = results {
        for source in results.sources() {
            let table = tables::render_details(&summary.categories, source, results.results(source))?;
            files.push((details_file_name(source), table));
        }
    }
    Ok(files)
}

fn write_files(dir: &Path, files: &[(String, String)]) -> Result<(), WriteError> {
    for (name, content) in files {
        let path = dir.join(name);
        fs::write(&path, content).map_err(|source| WriteError::File { path, source })?;
    }
    Ok(())
}

fn publish(staging: &Path, output_root: &Path, name: &str) -> Result<PathBuf, WriteError> {
    for attempt in 0..MAX_NAME_ATTEMPTS {
        let target = if attempt == 0 {
            output_root.join(name)
        } else {
            output_root.join(format!("{}_{}", name, attempt))
        };
        if target.exists() {
            continue;
        }
        match fs::rename(staging, &target) {
            Ok(()) => {
                debug!("Published {}", target.display());
                return Ok(target);
            }
            // Lost a race for this name; try the next one.
            Err(_) if target.exists() => continue,
            Err(source) => return Err(WriteError::Publish { path: target, source }),
        }
    }
    Err(WriteError::Publish {
        path: output_root.join(name),
        source: io::Error::new(io::ErrorKind::AlreadyExists, "no free run directory name"),
    })
}
