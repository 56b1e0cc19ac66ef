use std::collections::BTreeMap;

use serde::Serialize;

use super::document::{AuxSignals, Category, SignalKind, SourceType};
use crate::core::error::RecordError;

/// Category -> raw hit count.
pub type CategoryCounts = BTreeMap<Category, usize>;

/// Category -> summed hit weight.
pub type CategoryScores = BTreeMap<Category, f64>;

// ============================================================
// Match Hit
// ============================================================

/// Why a hit was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "signal")]
pub enum HitReason {
    /// A lexicon pattern occurred in the text.
    Pattern,
    /// An auxiliary signal crossed its threshold.
    Signal(SignalKind),
}

/// One occurrence of a cue in a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchHit {
    pub document_id: String,
    pub category: Category,
    /// The lexicon pattern, or `signal:<kind>` for signal hits.
    pub pattern: String,
    pub weight: f64,
    /// Byte offset into the document's normalized text (0 for signal hits).
    pub start_offset: usize,
    pub reason: HitReason,
}

// ============================================================
// Document Result
// ============================================================

/// Outcome of analyzing one input record.
///
/// A failed record carries `error` and no counts; it still counts as a
/// processed document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentResult {
    pub document_id: String,
    pub source_type: SourceType,
    pub counts: CategoryCounts,
    pub weighted: CategoryScores,
    pub signals: AuxSignals,
    /// Display form used in reports instead of the id (redacted URLs).
    pub label: Option<String>,
    /// Source specific numeric features (URL heuristics).
    pub features: BTreeMap<&'static str, f64>,
    /// Redacted record metadata (email subject, sender, recipient, date).
    pub metadata: BTreeMap<&'static str, String>,
    pub error: Option<RecordError>,
}

impl DocumentResult {
    /// A result for a record that could not be processed.
    pub fn failed(
        document_id: impl Into<String>,
        source_type: SourceType,
        error: RecordError,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            source_type,
            counts: CategoryCounts::new(),
            weighted: CategoryScores::new(),
            signals: AuxSignals::default(),
            label: None,
            features: BTreeMap::new(),
            metadata: BTreeMap::new(),
            error: Some(error),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    pub fn count(&self, category: &Category) -> usize {
        self.counts.get(category).copied().unwrap_or(0)
    }

    pub fn score(&self, category: &Category) -> f64 {
        self.weighted.get(category).copied().unwrap_or(0.0)
    }

    /// Total hits across categories.
    pub fn total_count(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn total_score(&self) -> f64 {
        self.weighted.values().sum()
    }

    /// Name shown in reports.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.document_id)
    }
}
