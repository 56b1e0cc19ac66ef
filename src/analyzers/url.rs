//! URL analyzer.
//!
//! URLs come from a CSV list (a PhishTank export by default), are deduped by
//! apex domain and sampled reproducibly. Only the URL string is analyzed;
//! pages are never fetched. Reports carry `url#<n>` ids and a masked label,
//! never the raw URL.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::PathBuf,
};

use clap::ValueEnum;
use ::url::{Host, ParseError, Url};
use csv::ReaderBuilder;
use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{SourceAnalyzer, mime::decode_text};
use crate::core::{
    data::{DocumentResult, SourceType},
    error::CollaboratorError,
    matcher::Matcher,
    normalizer::{SUSPICIOUS_URL_TOKENS, normalize},
};

pub const DEFAULT_URL_LIMIT: usize = 50;
pub const DEFAULT_URL_SEED: u64 = 2025;
const URL_COLUMN: &str = "url";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SampleMode {
    #[default]
    Random,
    First,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DedupeMode {
    /// Keep one URL per apex domain.
    #[default]
    Apex,
    None,
}

/// Produces the finite, ordered list of URLs to analyze.
pub trait UrlSampler: Send + Sync {
    fn sample(&self) -> Result<Vec<String>, CollaboratorError>;
}

// ============================================================
// CSV Sampler
// ============================================================

#[derive(Debug, Clone)]
pub struct CsvUrlSampler {
    path: PathBuf,
    /// 0 keeps every URL.
    limit: usize,
    seed: u64,
    mode: SampleMode,
    dedupe: DedupeMode,
}

impl CsvUrlSampler {
    pub fn new(
        path: impl Into<PathBuf>,
        limit: usize,
        seed: u64,
        mode: SampleMode,
        dedupe: DedupeMode,
    ) -> Self {
        Self {
            path: path.into(),
            limit,
            seed,
            mode,
            dedupe,
        }
    }

    fn read_urls(&self) -> Result<UrlList, CollaboratorError> {
        if !self.path.is_file() {
            return Err(CollaboratorError::InputMissing {
                what: "URL list",
                path: self.path.clone(),
            });
        }
        let bytes = fs::read(&self.path).map_err(|source| CollaboratorError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_reader(bytes.as_slice());
        let headers = reader
            .byte_headers()
            .map_err(|e| CollaboratorError::Io {
                path: self.path.clone(),
                source: e.into(),
            })?
            .clone();
        let column = headers
            .iter()
            .position(|h| {
                decode_text(h)
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .eq_ignore_ascii_case(URL_COLUMN)
            })
            .ok_or_else(|| CollaboratorError::MissingColumn {
                path: self.path.clone(),
                column: URL_COLUMN,
            })?;

        let mut list = UrlList::default();
        for (index, record) in reader.byte_records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    warn!("Skipping row {} of {}: {}", index + 1, self.path.display(), e);
                    list.skipped += 1;
                    continue;
                }
            };
            let url = record
                .get(column)
                .and_then(|field| with_scheme(&decode_text(field)))
                .filter(|url| Url::parse(url).is_ok());
            match url {
                Some(url) => list.urls.push(url),
                None => list.skipped += 1,
            }
        }
        Ok(list)
    }
}

/// URLs read from the list, plus the rows that had no usable URL.
#[derive(Debug, Default)]
struct UrlList {
    urls: Vec<String>,
    skipped: usize,
}

impl UrlSampler for CsvUrlSampler {
    fn sample(&self) -> Result<Vec<String>, CollaboratorError> {
        let UrlList { urls, skipped } = self.read_urls()?;
        let read = urls.len();
        let urls = dedupe(urls, self.dedupe);
        let urls = sample(urls, self.limit, self.mode, self.seed);
        debug!(
            "Sampled {} of {} URLs from {} ({} rows skipped)",
            urls.len(),
            read,
            self.path.display(),
            skipped
        );
        Ok(urls)
    }
}

/// Trimmed URL with `http://` prepended when it has no scheme.
fn with_scheme(raw: &str) -> Option<String> {
    let url = raw.trim();
    if url.is_empty() {
        return None;
    }
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("http://{}", url))
    }
}

fn dedupe(urls: Vec<String>, mode: DedupeMode) -> Vec<String> {
    match mode {
        DedupeMode::None => urls,
        DedupeMode::Apex => {
            let mut seen = HashSet::new();
            urls.into_iter()
                .filter(|u| {
                    let key = match UrlParts::parse(u) {
                        Ok(parts) => apex(&parts.host),
                        Err(_) => u.clone(),
                    };
                    seen.insert(key)
                })
                .collect()
        }
    }
}

fn sample(mut urls: Vec<String>, limit: usize, mode: SampleMode, seed: u64) -> Vec<String> {
    if limit == 0 || limit >= urls.len() {
        return urls;
    }
    if mode == SampleMode::Random {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        urls.shuffle(&mut rng);
    }
    urls.truncate(limit);
    urls
}

// ============================================================
// URL Parts and Features
// ============================================================

/// Label for URLs that do not parse; the raw string is never reported.
const UNPARSEABLE_LABEL: &str = "[unparseable-url]";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct UrlParts {
    scheme: String,
    /// Lowercased ASCII (IDNA) form, without userinfo, port or IPv6 brackets.
    host: String,
    ip_host: bool,
    path: String,
    query: String,
}

impl UrlParts {
    fn parse(raw: &str) -> Result<Self, ParseError> {
        let url = Url::parse(raw.trim())?;
        let (host, ip_host) = match url.host() {
            Some(Host::Domain(domain)) => (domain.to_string(), false),
            Some(Host::Ipv4(addr)) => (addr.to_string(), true),
            Some(Host::Ipv6(addr)) => (addr.to_string(), true),
            None => (String::new(), false),
        };
        Ok(Self {
            scheme: url.scheme().to_string(),
            host,
            ip_host,
            path: url.path().to_string(),
            query: url.query().unwrap_or_default().to_string(),
        })
    }
}

/// Last two labels of `host` (`mail.example.co.uk` -> `co.uk`).
pub fn apex(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() >= 2 {
        labels[labels.len() - 2..].join(".")
    } else {
        host.to_string()
    }
}

/// Redacted form used in reports: `<apex>:/<first path segment>`.
pub fn mask_url(url: &str) -> String {
    let Ok(parts) = UrlParts::parse(url) else {
        return UNPARSEABLE_LABEL.to_string();
    };
    let first = parts
        .path
        .split('/')
        .nth(1)
        .filter(|s| !s.is_empty())
        .unwrap_or_default();
    let host = if parts.ip_host {
        parts.host.clone()
    } else {
        apex(&parts.host)
    };
    format!("{}:/{}", host, first)
}

/// Lexical heuristics over the URL string.
pub fn url_features(url: &str) -> BTreeMap<&'static str, f64> {
    let parts = UrlParts::parse(url).unwrap_or_default();
    let host = &parts.host;
    let labels: Vec<&str> = if parts.ip_host {
        Vec::new()
    } else {
        host.split('.').filter(|l| !l.is_empty()).collect()
    };

    let digits = host.chars().filter(char::is_ascii_digit).count();
    let alphanumeric = host.chars().filter(|c| c.is_alphanumeric()).count().max(1);
    let digit_ratio = (digits as f64 / alphanumeric as f64 * 1000.0).round() / 1000.0;

    let searchable = format!("{} {} {}", host, parts.path, parts.query).to_lowercase();
    let suspicious = SUSPICIOUS_URL_TOKENS
        .iter()
        .filter(|token| searchable.contains(*token))
        .count();

    let flag = |b: bool| if b { 1.0 } else { 0.0 };
    BTreeMap::from([
        ("uses_https", flag(parts.scheme == "https")),
        ("has_ip_host", flag(parts.ip_host)),
        ("has_punycode", flag(labels.iter().any(|l| l.starts_with("xn--")))),
        ("at_symbol", flag(url.contains('@'))),
        ("subdomain_count", labels.len().saturating_sub(2) as f64),
        ("hyphen_count", host.matches('-').count() as f64),
        ("digit_ratio_host", digit_ratio),
        ("url_length", url.chars().count() as f64),
        ("path_length", parts.path.chars().count() as f64),
        ("query_length", parts.query.chars().count() as f64),
        ("suspicious_tokens", suspicious as f64),
    ])
}

// ============================================================
// Analyzer
// ============================================================

pub struct UrlAnalyzer {
    sampler: Box<dyn UrlSampler>,
}

impl UrlAnalyzer {
    pub fn new(sampler: impl UrlSampler + 'static) -> Self {
        Self {
            sampler: Box::new(sampler),
        }
    }
}

impl SourceAnalyzer for UrlAnalyzer {
    fn source_type(&self) -> SourceType {
        SourceType::Url
    }

    fn analyze(&self, matcher: &Matcher) -> Result<Vec<DocumentResult>, CollaboratorError> {
        let urls = self.sampler.sample()?;
        Ok(urls
            .par_iter()
            .enumerate()
            .map(|(index, url)| {
                let id = format!("url#{}", index + 1);
                let mut result = matcher
                    .evaluate(&normalize(url, SourceType::Url, id))
                    .with_label(mask_url(url));
                result.features = url_features(url);
                result
            })
            .collect())
    }
}
