use std::path::{Path, PathBuf};

use glob::Pattern;
use tracing::warn;
use walkdir::WalkDir;

/// Check if a pattern contains glob wildcards (* or ?).
/// Patterns without wildcards are treated as literal paths under the root.
fn is_glob_pattern(pattern: &str) -> bool {
    pattern.contains('*') || pattern.contains('?')
}

/// Result of scanning an input directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Matching files, sorted so record order is stable between runs.
    pub files: Vec<PathBuf>,
    pub skipped_count: usize,
}

/// Collect files under `root` whose extension is one of `extensions`
/// (case-insensitive), skipping anything matched by `ignore_patterns`.
pub fn scan_files(root: &Path, extensions: &[String], ignore_patterns: &[String]) -> ScanResult {
    let mut files = Vec::new();
    let mut skipped_count = 0;

    let mut literal_ignore_paths: Vec<PathBuf> = Vec::new();
    let mut glob_patterns: Vec<Pattern> = Vec::new();
    for p in ignore_patterns {
        if is_glob_pattern(p) {
            match Pattern::new(p) {
                Ok(pattern) => glob_patterns.push(pattern),
                Err(e) => warn!("Invalid ignore pattern '{}': {}", p, e),
            }
        } else {
            literal_ignore_paths.push(root.join(p));
        }
    }

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                skipped_count += 1;
                warn!("Cannot access path: {}", e);
                continue;
            }
        };
        let path = entry.path();

        if literal_ignore_paths
            .iter()
            .any(|ignore_path| path.starts_with(ignore_path))
        {
            continue;
        }
        let path_str = path.to_string_lossy();
        if glob_patterns.iter().any(|p| p.matches(&path_str)) {
            continue;
        }

        if entry.file_type().is_file() && has_extension(path, extensions) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    ScanResult {
        files,
        skipped_count,
    }
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}
