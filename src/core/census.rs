//! Email corpus census.
//!
//! Estimates how many distinct emails a corpus holds and when they were
//! sent. Every email-like record gets a `Signature` (sender domain,
//! normalized subject, SHA-256 of its normalized text); records sharing a
//! signature are counted as duplicates. Records are dated from their `date`
//! field, falling back to a year in the file name. Only years inside
//! `YEAR_MIN..=YEAR_MAX` are accepted.

use std::{
    collections::{BTreeMap, BTreeSet, HashMap, HashSet},
    path::Path,
    sync::LazyLock,
};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::analyzers::{EmailRecord, FailedRecord, email::redact_addresses};

pub const YEAR_MIN: u16 = 2005;
pub const YEAR_MAX: u16 = 2024;

/// Examples kept per signature.
pub const MAX_EXAMPLES: usize = 3;

/// Normalized text shorter than this is hashed as empty.
const MIN_CONTENT_CHARS: usize = 5;
const EXAMPLE_SUBJECT_CHARS: usize = 200;
const HASH_PREFIX_CHARS: usize = 10;

static YEAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19|20)\d{2}\b").unwrap());

static REPLY_PREFIX_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(re|fw|fwd)\s*:\s*").unwrap());

static NON_ALPHANUMERIC_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").unwrap());

// ============================================================
// Signatures
// ============================================================

/// Dedupe key of one email.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub from_domain: String,
    pub subject: String,
    /// Hex SHA-256 of the normalized text, empty for near-empty bodies.
    pub content_hash: String,
}

impl Signature {
    pub fn of(record: &EmailRecord) -> Self {
        let content = normalize_content(&record.body);
        let content_hash = if content.chars().count() < MIN_CONTENT_CHARS {
            String::new()
        } else {
            let mut hasher = Sha256::new();
            hasher.update(content.as_bytes());
            hex::encode(hasher.finalize())
        };
        Self {
            from_domain: record.metadata.from_domain.trim().to_lowercase(),
            subject: normalize_subject(&record.subject),
            content_hash,
        }
    }

    pub fn hash_prefix(&self) -> &str {
        let end = self.content_hash.len().min(HASH_PREFIX_CHARS);
        &self.content_hash[..end]
    }
}

/// Lowercase, drop one `re:` / `fw:` / `fwd:` prefix, collapse whitespace.
pub fn normalize_subject(subject: &str) -> String {
    let lower = subject.trim().to_lowercase();
    let stripped = REPLY_PREFIX_REGEX.replace(&lower, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase, keep ASCII letters and digits, collapse everything else to
/// single spaces.
pub fn normalize_content(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_ALPHANUMERIC_REGEX
        .replace_all(&lower, " ")
        .trim()
        .to_string()
}

// ============================================================
// Years
// ============================================================

/// How each email-like record got (or failed to get) its year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearAudit {
    /// The date field held a year inside the window.
    pub date_valid: usize,
    /// The year came from the file name.
    pub fallback_file: usize,
    pub unknown: usize,
    /// The date field held a year outside the window.
    pub date_out_of_range: usize,
}

fn first_year(text: &str) -> Option<u16> {
    YEAR_REGEX
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

fn in_window(year: u16) -> bool {
    (YEAR_MIN..=YEAR_MAX).contains(&year)
}

/// Year of a record: the first year in `date` when it is inside the window,
/// else the first year in `file_name` when that is. Only the first year of
/// each text is considered.
pub fn guess_year(date: &str, file_name: &str, audit: &mut YearAudit) -> Option<u16> {
    match first_year(date) {
        Some(year) if in_window(year) => {
            audit.date_valid += 1;
            return Some(year);
        }
        Some(_) => audit.date_out_of_range += 1,
        None => {}
    }
    match first_year(file_name).filter(|&y| in_window(y)) {
        Some(year) => {
            audit.fallback_file += 1;
            Some(year)
        }
        None => {
            audit.unknown += 1;
            None
        }
    }
}

// ============================================================
// Tally
// ============================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileCensus {
    pub file: String,
    pub rows_total: usize,
    pub email_like_rows: usize,
    pub unique_signatures_in_file: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Example {
    pub file_name: String,
    /// Redacted, truncated.
    pub subject: String,
}

/// All records sharing one signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cluster {
    pub signature: Signature,
    pub count: usize,
    pub earliest_year: Option<u16>,
    pub examples: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CensusSummary {
    pub timestamp: DateTime<Utc>,
    /// In the order records were read.
    pub files: Vec<FileCensus>,
    pub rows_total: usize,
    pub email_like_rows: usize,
    /// In first-seen order.
    pub clusters: Vec<Cluster>,
    pub per_year_raw: BTreeMap<u16, usize>,
    /// Unique emails counted under their earliest year.
    pub per_year_unique: BTreeMap<u16, usize>,
    pub year_audit: YearAudit,
}

impl CensusSummary {
    pub fn unique_emails(&self) -> usize {
        self.clusters.len()
    }

    pub fn estimated_duplicates(&self) -> usize {
        self.email_like_rows.saturating_sub(self.unique_emails())
    }

    /// Duplicates as a share of email-like rows, rounded to two decimals.
    pub fn duplicate_rate_percent(&self) -> f64 {
        if self.email_like_rows == 0 {
            return 0.0;
        }
        let rate = self.estimated_duplicates() as f64 / self.email_like_rows as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }

    pub fn years(&self) -> Vec<u16> {
        self.per_year_raw
            .keys()
            .chain(self.per_year_unique.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Largest clusters with at least two members, biggest first. Ties keep
    /// first-seen order.
    pub fn top_duplicates(&self, limit: usize) -> Vec<&Cluster> {
        let mut clusters: Vec<&Cluster> = self.clusters.iter().filter(|c| c.count >= 2).collect();
        clusters.sort_by(|a, b| b.count.cmp(&a.count));
        clusters.truncate(limit);
        clusters
    }
}

/// File part of a record id (`<path>#row=<n>` or `<path>#msg=<n>`).
fn source_file(id: &str) -> &str {
    ["#row=", "#msg="]
        .iter()
        .find_map(|marker| id.rfind(marker))
        .map_or(id, |i| &id[..i])
}

fn file_name(file: &str) -> String {
    Path::new(file)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.to_string())
}

fn is_email_like(record: &EmailRecord) -> bool {
    !record.subject.trim().is_empty() || !record.body.trim().is_empty()
}

/// Reduce the records of a corpus to a census. Failed records count as
/// rows and nothing else.
pub fn tally(
    records: &[Result<EmailRecord, FailedRecord>],
    timestamp: DateTime<Utc>,
) -> CensusSummary {
    let mut files: Vec<FileCensus> = Vec::new();
    let mut file_index: HashMap<String, usize> = HashMap::new();
    let mut file_signatures: Vec<HashSet<usize>> = Vec::new();
    let mut clusters: Vec<Cluster> = Vec::new();
    let mut cluster_index: HashMap<Signature, usize> = HashMap::new();
    let mut per_year_raw: BTreeMap<u16, usize> = BTreeMap::new();
    let mut year_audit = YearAudit::default();
    let mut email_like_rows = 0;

    for record in records {
        let id = match record {
            Ok(email) => email.id.as_str(),
            Err(failed) => failed.id.as_str(),
        };
        let file = source_file(id);
        let f = *file_index.entry(file.to_string()).or_insert_with(|| {
            files.push(FileCensus {
                file: file.to_string(),
                ..FileCensus::default()
            });
            file_signatures.push(HashSet::new());
            files.len() - 1
        });
        files[f].rows_total += 1;

        let Ok(email) = record else {
            continue;
        };
        if !is_email_like(email) {
            continue;
        }
        files[f].email_like_rows += 1;
        email_like_rows += 1;

        let signature = Signature::of(email);
        let c = *cluster_index.entry(signature.clone()).or_insert_with(|| {
            clusters.push(Cluster {
                signature,
                count: 0,
                earliest_year: None,
                examples: Vec::new(),
            });
            clusters.len() - 1
        });
        let cluster = &mut clusters[c];
        cluster.count += 1;

        let name = file_name(file);
        if let Some(year) = guess_year(&email.metadata.date, &name, &mut year_audit) {
            *per_year_raw.entry(year).or_default() += 1;
            cluster.earliest_year = Some(cluster.earliest_year.map_or(year, |y| y.min(year)));
        }
        if cluster.examples.len() < MAX_EXAMPLES {
            cluster.examples.push(Example {
                file_name: name,
                subject: redact_addresses(&email.subject)
                    .chars()
                    .take(EXAMPLE_SUBJECT_CHARS)
                    .collect(),
            });
        }
        file_signatures[f].insert(c);
    }

    for (file, signatures) in files.iter_mut().zip(&file_signatures) {
        file.unique_signatures_in_file = signatures.len();
    }
    let mut per_year_unique: BTreeMap<u16, usize> = BTreeMap::new();
    for year in clusters.iter().filter_map(|c| c.earliest_year) {
        *per_year_unique.entry(year).or_default() += 1;
    }

    CensusSummary {
        timestamp,
        files,
        rows_total: records.len(),
        email_like_rows,
        clusters,
        per_year_raw,
        per_year_unique,
        year_audit,
    }
}
