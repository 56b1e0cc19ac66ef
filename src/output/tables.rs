//! CSV tables: the combined category x source table and the per-source
//! detail files.

use std::{collections::BTreeMap, fmt};

use anyhow::{Context, Result, anyhow};
use csv::{ReaderBuilder, WriterBuilder};

use super::COMBINED_CSV;
use crate::core::{
    aggregate::SessionSummary,
    data::{Category, DocumentResult, SourceType},
    error::WriteError,
};

const STATISTICS_HEADER: &str = "statistic";

fn encode_error(file: &'static str, err: impl fmt::Display) -> WriteError {
    WriteError::Encode {
        file,
        message: err.to_string(),
    }
}

fn format_float(value: f64) -> String {
    format!("{:.4}", value)
}

/// Whole numbers print without decimals, everything else with four.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format_float(value)
    }
}

fn finish(writer: csv::Writer<Vec<u8>>, file: &'static str) -> Result<String, WriteError> {
    let bytes = writer.into_inner().map_err(|e| encode_error(file, e))?;
    String::from_utf8(bytes).map_err(|e| encode_error(file, e))
}

// ============================================================
// Combined Table
// ============================================================

/// ```text
/// category,email,image,url,total
/// urgency,3,0,1,4
/// ...
/// statistic,value
/// total_documents,12
/// ...
/// ```
pub fn render_combined(summary: &SessionSummary) -> Result<String, WriteError> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(Vec::new());
    let mut write = |record: Vec<String>| {
        writer
            .write_record(&record)
            .map_err(|e| encode_error(COMBINED_CSV, e))
    };

    let mut header = vec!["category".to_string()];
    header.extend(SourceType::ALL.iter().map(|s| s.to_string()));
    header.push("total".to_string());
    write(header)?;

    for category in &summary.categories {
        let mut row = vec![category.to_string()];
        row.extend(
            SourceType::ALL
                .iter()
                .map(|&s| summary.count(category, s).to_string()),
        );
        row.push(summary.total(category).to_string());
        write(row)?;
    }

    write(vec![STATISTICS_HEADER.to_string(), "value".to_string()])?;
    for (name, value) in statistics_rows(summary) {
        write(vec![name, value])?;
    }

    finish(writer, COMBINED_CSV)
}

fn statistics_rows(summary: &SessionSummary) -> Vec<(String, String)> {
    let stats = &summary.statistics;
    let mut rows = vec![
        ("total_documents".to_string(), summary.total_documents.to_string()),
        ("total_errors".to_string(), summary.total_errors.to_string()),
        (
            "documents_with_cues".to_string(),
            stats.documents_with_cues.to_string(),
        ),
        ("cue_rate".to_string(), format_float(stats.cue_rate)),
        (
            "mean_cues_per_document".to_string(),
            format_float(stats.mean_cues_per_document),
        ),
        ("error_rate".to_string(), format_float(stats.error_rate)),
    ];
    for source in SourceType::ALL {
        let totals = summary.source(source);
        rows.push((format!("{}_documents", source), totals.documents.to_string()));
        rows.push((format!("{}_errors", source), totals.errors.to_string()));
    }
    let extras = &summary.extras;
    rows.extend([
        ("all_caps_words".to_string(), extras.all_caps_words.to_string()),
        ("exclamations".to_string(), extras.exclamations.to_string()),
        ("money_symbols".to_string(), extras.money_symbols.to_string()),
        ("links".to_string(), extras.links.to_string()),
        ("lexicon_version".to_string(), summary.lexicon_version.clone()),
        ("timestamp".to_string(), summary.timestamp.to_rfc3339()),
    ]);
    rows
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinedRow {
    pub category: Category,
    pub by_source: BTreeMap<SourceType, usize>,
    pub total: usize,
}

/// A parsed `combined_summary.csv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedTable {
    pub rows: Vec<CombinedRow>,
    pub statistics: BTreeMap<String, String>,
}

impl CombinedTable {
    fn row(&self, category: &Category) -> Option<&CombinedRow> {
        self.rows.iter().find(|r| &r.category == category)
    }

    pub fn total(&self, category: &Category) -> Option<usize> {
        self.row(category).map(|r| r.total)
    }

    pub fn count(&self, category: &Category, source: SourceType) -> Option<usize> {
        self.row(category)
            .and_then(|r| r.by_source.get(&source))
            .copied()
    }
}

/// Read back a `combined_summary.csv`.
pub fn parse_combined(content: &str) -> Result<CombinedTable> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());
    let mut records = reader.records();

    let header = records
        .next()
        .ok_or_else(|| anyhow!("empty table"))?
        .context("Failed to read header")?;
    let sources = header
        .iter()
        .skip(1)
        .take(header.len().saturating_sub(2))
        .map(|name| {
            SourceType::ALL
                .into_iter()
                .find(|s| s.as_str() == name)
                .ok_or_else(|| anyhow!("unknown source column '{}'", name))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = CombinedTable::default();
    let mut in_statistics = false;
    for record in records {
        let record = record.context("Failed to read row")?;
        let Some(first) = record.get(0) else {
            continue;
        };
        if in_statistics {
            let value = record.get(1).unwrap_or_default();
            table.statistics.insert(first.to_string(), value.to_string());
            continue;
        }
        if first == STATISTICS_HEADER {
            in_statistics = true;
            continue;
        }

        let numbers = record
            .iter()
            .skip(1)
            .map(|v| v.parse::<usize>().with_context(|| format!("bad count '{}'", v)))
            .collect::<Result<Vec<_>>>()?;
        if numbers.len() != sources.len() + 1 {
            return Err(anyhow!("row '{}' has {} values", first, numbers.len()));
        }
        table.rows.push(CombinedRow {
            category: Category::new(first),
            by_source: sources.iter().copied().zip(numbers.iter().copied()).collect(),
            total: numbers[sources.len()],
        });
    }
    Ok(table)
}

// ============================================================
// Detail Tables
// ============================================================

/// Metadata columns, in report order.
const METADATA_ORDER: &[&str] = &["subject", "from", "to", "date"];

/// One row per record of `source`. Errored records keep their row with
/// zero counts and the error message.
pub fn render_details(
    categories: &[Category],
    source: SourceType,
    results: &[DocumentResult],
) -> Result<String, WriteError> {
    let file = match source {
        SourceType::Email => "email_results.csv",
        SourceType::Image => "image_results.csv",
        SourceType::Url => "url_results.csv",
    };
    let feature_names: Vec<&'static str> = {
        let mut names: Vec<_> = results
            .iter()
            .flat_map(|r| r.features.keys().copied())
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    };

    let metadata_names: Vec<&str> = METADATA_ORDER
        .iter()
        .copied()
        .filter(|name| results.iter().any(|r| r.metadata.contains_key(name)))
        .collect();

    let mut writer = WriterBuilder::new().from_writer(Vec::new());

    let mut header: Vec<String> = vec!["id".to_string(), "error".to_string()];
    header.extend(metadata_names.iter().map(|n| n.to_string()));
    header.extend(categories.iter().map(|c| c.to_string()));
    header.extend(
        [
            "weighted_total",
            "capitalization_ratio",
            "exclamation_count",
            "all_caps_words",
            "money_symbols",
            "links",
            "replaced_bytes",
        ]
        .map(String::from),
    );
    if source == SourceType::Url {
        header.push("punctuation_density".to_string());
        header.push("suspicious_tokens".to_string());
    }
    header.extend(feature_names.iter().map(|n| format!("feature_{}", n)));
    writer
        .write_record(&header)
        .map_err(|e| encode_error(file, e))?;

    for result in results {
        let signals = &result.signals;
        let mut row = vec![
            result.display_name().to_string(),
            result
                .error
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        ];
        row.extend(
            metadata_names
                .iter()
                .map(|name| result.metadata.get(name).cloned().unwrap_or_default()),
        );
        row.extend(categories.iter().map(|c| result.count(c).to_string()));
        row.push(format_float(result.total_score()));
        row.push(format_float(signals.capitalization_ratio));
        row.push(signals.exclamation_count.to_string());
        row.push(signals.all_caps_words.to_string());
        row.push(signals.money_symbols.to_string());
        row.push(signals.links.to_string());
        row.push(signals.replaced_bytes.to_string());
        if source == SourceType::Url {
            row.push(format_float(signals.punctuation_density));
            row.push(signals.suspicious_tokens.to_string());
        }
        row.extend(feature_names.iter().map(|name| {
            result
                .features
                .get(name)
                .map(|&v| format_number(v))
                .unwrap_or_default()
        }));
        writer
            .write_record(&row)
            .map_err(|e| encode_error(file, e))?;
    }

    finish(writer, file)
}
