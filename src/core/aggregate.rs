//! Session aggregation.
//!
//! Reduces the per-record results of every analyzer that ran into one
//! `SessionSummary`. The reduction is pure: the same results always give
//! the same summary, whatever order analyzers finished in.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    data::{Category, DocumentResult, SourceType},
    lexicon::Lexicon,
};

// ============================================================
// Session Results
// ============================================================

/// An analyzer that could not run at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleFailure {
    pub source: SourceType,
    pub message: String,
}

/// Results collected during the analyzing phase, grouped by source.
#[derive(Debug, Clone, Default)]
pub struct SessionResults {
    by_source: BTreeMap<SourceType, Vec<DocumentResult>>,
    module_errors: Vec<ModuleFailure>,
}

impl SessionResults {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append results for `source`. Calling this again for the same source
    /// adds to what is already there.
    pub fn extend(&mut self, source: SourceType, results: Vec<DocumentResult>) {
        self.by_source.entry(source).or_default().extend(results);
    }

    pub fn record_failure(&mut self, source: SourceType, message: impl Into<String>) {
        // A failed analyzer still counts as having run.
        self.by_source.entry(source).or_default();
        self.module_errors.push(ModuleFailure {
            source,
            message: message.into(),
        });
    }

    pub fn results(&self, source: SourceType) -> &[DocumentResult] {
        self.by_source.get(&source).map(Vec::as_slice).unwrap_or_default()
    }

    /// Whether an analyzer for `source` was invoked this session.
    pub fn ran(&self, source: SourceType) -> bool {
        self.by_source.contains_key(&source)
    }

    pub fn sources(&self) -> impl Iterator<Item = SourceType> + '_ {
        self.by_source.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentResult> {
        self.by_source.values().flatten()
    }

    pub fn module_errors(&self) -> &[ModuleFailure] {
        &self.module_errors
    }

    pub fn len(&self) -> usize {
        self.by_source.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================
// Summary
// ============================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SourceTotals {
    /// Records processed, errored ones included.
    pub documents: usize,
    pub errors: usize,
    /// Hits across all categories.
    pub cues: usize,
    pub weighted: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub documents_with_cues: usize,
    /// Share of documents with at least one hit.
    pub cue_rate: f64,
    pub mean_cues_per_document: f64,
    pub error_rate: f64,
}

/// Heuristic counters summed over every successful document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extras {
    pub all_caps_words: usize,
    pub exclamations: usize,
    pub money_symbols: usize,
    pub links: usize,
}

/// The combined outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub timestamp: DateTime<Utc>,
    pub lexicon_version: String,
    /// Categories in lexicon order; report rows follow this order.
    pub categories: Vec<Category>,
    pub total_documents: usize,
    pub total_errors: usize,
    pub totals_by_source: BTreeMap<SourceType, SourceTotals>,
    pub totals_by_category: BTreeMap<Category, usize>,
    pub weighted_by_category: BTreeMap<Category, f64>,
    pub category_by_source: BTreeMap<Category, BTreeMap<SourceType, usize>>,
    pub weighted_category_by_source: BTreeMap<Category, BTreeMap<SourceType, f64>>,
    pub statistics: Statistics,
    pub extras: Extras,
    #[serde(default)]
    pub module_errors: Vec<ModuleFailure>,
}

impl SessionSummary {
    pub fn count(&self, category: &Category, source: SourceType) -> usize {
        self.category_by_source
            .get(category)
            .and_then(|row| row.get(&source))
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self, category: &Category) -> usize {
        self.totals_by_category.get(category).copied().unwrap_or(0)
    }

    pub fn source(&self, source: SourceType) -> SourceTotals {
        self.totals_by_source.get(&source).cloned().unwrap_or_default()
    }
}

/// Reduce `results` into a summary stamped with `timestamp`.
///
/// Errored records count towards `total_documents` and `total_errors` but
/// contribute nothing to the category totals. Every lexicon category and
/// every source type appears in the output, with zeros where nothing ran.
pub fn summarize(
    lexicon: &Lexicon,
    results: &SessionResults,
    timestamp: DateTime<Utc>,
) -> SessionSummary {
    let categories = lexicon.categories().to_vec();

    let mut totals_by_source: BTreeMap<SourceType, SourceTotals> = SourceType::ALL
        .iter()
        .map(|&s| (s, SourceTotals::default()))
        .collect();
    let mut category_by_source: BTreeMap<Category, BTreeMap<SourceType, usize>> = categories
        .iter()
        .map(|c| (c.clone(), zero_row(0)))
        .collect();
    let mut weighted_category_by_source: BTreeMap<Category, BTreeMap<SourceType, f64>> =
        categories
            .iter()
            .map(|c| (c.clone(), zero_row(0.0)))
            .collect();

    // Float sums depend on addition order, so reduce in a canonical order.
    let mut ordered: Vec<&DocumentResult> = results.iter().collect();
    ordered.sort_by(|a, b| {
        a.source_type
            .cmp(&b.source_type)
            .then_with(|| a.document_id.cmp(&b.document_id))
            .then_with(|| a.total_score().total_cmp(&b.total_score()))
            .then_with(|| a.total_count().cmp(&b.total_count()))
    });

    let mut total_documents = 0;
    let mut total_errors = 0;
    let mut documents_with_cues = 0;
    let mut total_cues = 0;
    let mut extras = Extras::default();

    for result in ordered {
        total_documents += 1;
        let source = totals_by_source.entry(result.source_type).or_default();
        source.documents += 1;

        if result.is_error() {
            total_errors += 1;
            source.errors += 1;
            continue;
        }

        let cues = result.total_count();
        source.cues += cues;
        source.weighted += result.total_score();
        total_cues += cues;
        if cues > 0 {
            documents_with_cues += 1;
        }

        for (category, &count) in &result.counts {
            *category_by_source
                .entry(category.clone())
                .or_insert_with(|| zero_row(0))
                .entry(result.source_type)
                .or_default() += count;
        }
        for (category, &score) in &result.weighted {
            *weighted_category_by_source
                .entry(category.clone())
                .or_insert_with(|| zero_row(0.0))
                .entry(result.source_type)
                .or_default() += score;
        }

        extras.all_caps_words += result.signals.all_caps_words;
        extras.exclamations += result.signals.exclamation_count;
        extras.money_symbols += result.signals.money_symbols;
        extras.links += result.signals.links;
    }

    let totals_by_category = category_by_source
        .iter()
        .map(|(c, row)| (c.clone(), row.values().sum()))
        .collect();
    let weighted_by_category = weighted_category_by_source
        .iter()
        .map(|(c, row)| (c.clone(), row.values().sum()))
        .collect();

    let rate = |n: usize| {
        if total_documents == 0 {
            0.0
        } else {
            n as f64 / total_documents as f64
        }
    };
    let statistics = Statistics {
        documents_with_cues,
        cue_rate: rate(documents_with_cues),
        mean_cues_per_document: rate(total_cues),
        error_rate: rate(total_errors),
    };

    SessionSummary {
        timestamp,
        lexicon_version: lexicon.version().to_string(),
        categories,
        total_documents,
        total_errors,
        totals_by_source,
        totals_by_category,
        weighted_by_category,
        category_by_source,
        weighted_category_by_source,
        statistics,
        extras,
        module_errors: results.module_errors().to_vec(),
    }
}

fn zero_row<T: Copy>(zero: T) -> BTreeMap<SourceType, T> {
    SourceType::ALL.iter().map(|&s| (s, zero)).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::{
        error::RecordError,
        matcher::{Matcher, SignalPolicy},
        normalizer::normalize,
    };

    fn fixed_time() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn evaluate(lexicon: &Lexicon, source: SourceType, id: &str, text: &str) -> DocumentResult {
        let policy = SignalPolicy::default();
        Matcher::new(lexicon, &policy).evaluate(&normalize(text, source, id))
    }

    fn sample(lexicon: &Lexicon) -> SessionResults {
        let mut results = SessionResults::new();
        results.extend(
            SourceType::Email,
            vec![
                evaluate(lexicon, SourceType::Email, "e1", "Act now to confirm your verified account"),
                evaluate(lexicon, SourceType::Email, "e2", "Nothing to see here"),
                DocumentResult::failed(
                    "e3",
                    SourceType::Email,
                    RecordError::Malformed("bad row".to_string()),
                ),
            ],
        );
        results.extend(
            SourceType::Url,
            vec![evaluate(lexicon, SourceType::Url, "url#1", "http://act-now.example/verified-account")],
        );
        results
    }

    fn lexicon() -> Lexicon {
        Lexicon::from_json(
            r#"{"categories": {"urgency": ["act now"], "authority": [{"pattern": "verified account", "weight": 0.5}]}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_totals() {
        let lex = lexicon();
        let summary = summarize(&lex, &sample(&lex), fixed_time());

        let urgency = Category::new("urgency");
        let authority = Category::new("authority");
        assert_eq!(summary.total_documents, 4);
        assert_eq!(summary.total_errors, 1);
        assert_eq!(summary.total(&urgency), 2);
        assert_eq!(summary.total(&authority), 2);
        assert_eq!(summary.count(&urgency, SourceType::Email), 1);
        assert_eq!(summary.count(&urgency, SourceType::Url), 1);
        assert_eq!(summary.count(&urgency, SourceType::Image), 0);
        assert!((summary.weighted_by_category[&authority] - 1.0).abs() < 1e-9);

        let email = summary.source(SourceType::Email);
        assert_eq!(email.documents, 3);
        assert_eq!(email.errors, 1);
        assert_eq!(email.cues, 2);
    }

    #[test]
    fn test_skipped_source_contributes_zeros() {
        let lex = lexicon();
        let summary = summarize(&lex, &sample(&lex), fixed_time());
        assert_eq!(summary.source(SourceType::Image), SourceTotals::default());
        assert_eq!(summary.totals_by_source.len(), 3);
        for row in summary.category_by_source.values() {
            assert_eq!(row[&SourceType::Image], 0);
        }
    }

    #[test]
    fn test_errors_stay_in_denominator() {
        let lex = lexicon();
        let summary = summarize(&lex, &sample(&lex), fixed_time());
        assert_eq!(summary.statistics.documents_with_cues, 2);
        assert!((summary.statistics.cue_rate - 0.5).abs() < 1e-9);
        assert!((summary.statistics.error_rate - 0.25).abs() < 1e-9);
        assert!((summary.statistics.mean_cues_per_document - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_records_are_excluded_from_totals() {
        let lex = lexicon();
        let mut results = SessionResults::new();
        let mut records = Vec::new();
        for i in 0..10 {
            if i % 3 == 0 {
                records.push(DocumentResult::failed(
                    format!("e{i}"),
                    SourceType::Email,
                    RecordError::Malformed("x".to_string()),
                ));
            } else {
                records.push(evaluate(&lex, SourceType::Email, &format!("e{i}"), "act now"));
            }
        }
        results.extend(SourceType::Email, records);

        let summary = summarize(&lex, &results, fixed_time());
        assert_eq!(summary.total_documents, 10);
        assert_eq!(summary.total_errors, 4);
        assert_eq!(summary.total(&Category::new("urgency")), 6);
    }

    #[test]
    fn test_order_independence() {
        let lex = Lexicon::builtin().unwrap();
        let texts = [
            "URGENT!!! verify your account now",
            "Security alert from PayPal",
            "claim your reward, limited slots",
            "",
            "popular choice, trending now",
        ];
        let docs: Vec<DocumentResult> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| evaluate(&lex, SourceType::Email, &format!("e{i}"), t))
            .collect();
        let urls: Vec<DocumentResult> = texts
            .iter()
            .enumerate()
            .map(|(i, t)| evaluate(&lex, SourceType::Url, &format!("url#{i}"), t))
            .collect();

        let mut forward = SessionResults::new();
        forward.extend(SourceType::Email, docs.clone());
        forward.extend(SourceType::Url, urls.clone());

        let mut backward = SessionResults::new();
        backward.extend(SourceType::Url, urls.into_iter().rev().collect());
        let mut reversed = docs;
        reversed.reverse();
        let (tail, head) = reversed.split_at(2);
        backward.extend(SourceType::Email, head.to_vec());
        backward.extend(SourceType::Email, tail.to_vec());

        assert_eq!(
            summarize(&lex, &forward, fixed_time()),
            summarize(&lex, &backward, fixed_time())
        );
    }

    #[test]
    fn test_empty_session() {
        let lex = lexicon();
        let summary = summarize(&lex, &SessionResults::new(), fixed_time());
        assert_eq!(summary.total_documents, 0);
        assert_eq!(summary.statistics, Statistics::default());
        assert_eq!(summary.categories.len(), 2);
        assert!(summary.totals_by_category.values().all(|&n| n == 0));
    }

    #[test]
    fn test_module_failures_are_carried() {
        let lex = lexicon();
        let mut results = SessionResults::new();
        results.record_failure(SourceType::Image, "tesseract not found");
        assert!(results.ran(SourceType::Image));
        assert!(results.results(SourceType::Image).is_empty());

        let summary = summarize(&lex, &results, fixed_time());
        assert_eq!(summary.module_errors.len(), 1);
        assert_eq!(summary.module_errors[0].source, SourceType::Image);
    }

    #[test]
    fn test_extras_are_summed() {
        let lex = lexicon();
        let mut results = SessionResults::new();
        results.extend(
            SourceType::Email,
            vec![
                evaluate(&lex, SourceType::Email, "a", "WIN $100 now! www.x.example"),
                evaluate(&lex, SourceType::Email, "b", "FREE £5!!"),
            ],
        );
        let summary = summarize(&lex, &results, fixed_time());
        assert_eq!(
            summary.extras,
            Extras {
                all_caps_words: 2,
                exclamations: 3,
                money_symbols: 2,
                links: 1,
            }
        );
    }
}
