//! Cue matching.
//!
//! Scans a `NormalizedDocument` with every lexicon entry and folds the
//! auxiliary signals in as bonus hits. The matcher is a pure function of
//! the document, the lexicon and the signal policy: scoring the same
//! document twice gives identical results.

use serde::{Deserialize, Serialize};

use super::{
    data::{
        CategoryCounts, CategoryScores, DocumentResult, HitReason, MatchHit, NormalizedDocument,
        SignalKind,
    },
    lexicon::Lexicon,
};

// ============================================================
// Signal Policy
// ============================================================

/// Thresholds that turn auxiliary signals into bonus hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignalPolicy {
    /// Capitalization ratio strictly above this fires the signal.
    pub caps_ratio_threshold: f64,
    /// Short texts ("OK", "IRS") are too noisy to judge.
    pub caps_min_letters: usize,
    pub caps_bonus: f64,
    /// Exclamation marks per word at or above this fires the signal.
    pub exclamation_density_threshold: f64,
    pub exclamation_min_count: usize,
    pub exclamation_bonus: f64,
}

impl Default for SignalPolicy {
    fn default() -> Self {
        Self {
            caps_ratio_threshold: 0.3,
            caps_min_letters: 20,
            caps_bonus: 1.0,
            exclamation_density_threshold: 0.05,
            exclamation_min_count: 2,
            exclamation_bonus: 1.0,
        }
    }
}

impl SignalPolicy {
    /// Returns the names of invalid fields.
    pub fn invalid_fields(&self) -> Vec<&'static str> {
        let mut invalid = Vec::new();
        let numbers = [
            ("caps_ratio_threshold", self.caps_ratio_threshold),
            ("caps_bonus", self.caps_bonus),
            ("exclamation_density_threshold", self.exclamation_density_threshold),
            ("exclamation_bonus", self.exclamation_bonus),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                invalid.push(name);
            }
        }
        invalid
    }

    /// Signals that fire for `doc`, with their bonus weight.
    fn fired(&self, doc: &NormalizedDocument) -> Vec<(SignalKind, f64)> {
        let signals = doc.signals();
        let mut fired = Vec::new();

        if signals.letter_count >= self.caps_min_letters
            && signals.capitalization_ratio > self.caps_ratio_threshold
        {
            fired.push((SignalKind::Capitalization, self.caps_bonus));
        }

        let words = signals.word_count.max(1) as f64;
        let density = signals.exclamation_count as f64 / words;
        if signals.exclamation_count >= self.exclamation_min_count
            && density >= self.exclamation_density_threshold
        {
            fired.push((SignalKind::Exclamation, self.exclamation_bonus));
        }

        fired
    }
}

// ============================================================
// Matcher
// ============================================================

/// Per-document scoring output.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentScore {
    pub counts: CategoryCounts,
    pub weighted: CategoryScores,
    pub hits: Vec<MatchHit>,
}

impl DocumentScore {
    /// Turn the score into a successful `DocumentResult` for `doc`.
    pub fn into_result(self, doc: &NormalizedDocument) -> DocumentResult {
        DocumentResult {
            document_id: doc.source_id().to_string(),
            source_type: doc.source_type(),
            counts: self.counts,
            weighted: self.weighted,
            signals: doc.signals().clone(),
            label: None,
            features: Default::default(),
            metadata: Default::default(),
            error: None,
        }
    }
}

/// Scores documents against one lexicon. Cheap to copy and safe to share
/// across threads.
#[derive(Debug, Clone, Copy)]
pub struct Matcher<'a> {
    lexicon: &'a Lexicon,
    policy: &'a SignalPolicy,
}

impl<'a> Matcher<'a> {
    pub fn new(lexicon: &'a Lexicon, policy: &'a SignalPolicy) -> Self {
        Self { lexicon, policy }
    }

    pub fn lexicon(&self) -> &'a Lexicon {
        self.lexicon
    }

    pub fn score(&self, doc: &NormalizedDocument) -> DocumentScore {
        let mut counts: CategoryCounts = self
            .lexicon
            .categories()
            .iter()
            .map(|c| (c.clone(), 0))
            .collect();
        let mut weighted: CategoryScores = self
            .lexicon
            .categories()
            .iter()
            .map(|c| (c.clone(), 0.0))
            .collect();
        let mut hits = Vec::new();

        for entry in self.lexicon.entries() {
            let text = if entry.case_sensitive() {
                doc.cased_text()
            } else {
                doc.normalized_text()
            };
            for m in entry.find_iter(text) {
                hits.push(MatchHit {
                    document_id: doc.source_id().to_string(),
                    category: entry.category().clone(),
                    pattern: entry.pattern().to_string(),
                    weight: entry.weight(),
                    start_offset: m.start(),
                    reason: HitReason::Pattern,
                });
            }
        }

        for (signal, bonus) in self.policy.fired(doc) {
            let Some(category) = self.lexicon.signal_route(signal) else {
                continue;
            };
            hits.push(MatchHit {
                document_id: doc.source_id().to_string(),
                category: category.clone(),
                pattern: format!("signal:{}", signal),
                weight: bonus,
                start_offset: 0,
                reason: HitReason::Signal(signal),
            });
        }

        for hit in &hits {
            *counts.entry(hit.category.clone()).or_default() += 1;
            *weighted.entry(hit.category.clone()).or_default() += hit.weight;
        }

        DocumentScore {
            counts,
            weighted,
            hits,
        }
    }

    /// Score `doc` and wrap the outcome as a `DocumentResult`.
    pub fn evaluate(&self, doc: &NormalizedDocument) -> DocumentResult {
        self.score(doc).into_result(doc)
    }
}

/// Score `doc` with the default signal policy.
pub fn score(doc: &NormalizedDocument, lexicon: &Lexicon) -> DocumentScore {
    let policy = SignalPolicy::default();
    Matcher::new(lexicon, &policy).score(doc)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::{
        data::{Category, SourceType},
        normalizer::normalize,
    };

    fn lexicon(json: &str) -> Lexicon {
        Lexicon::from_json(json).unwrap()
    }

    fn email(text: &str) -> NormalizedDocument {
        normalize(text, SourceType::Email, "doc")
    }

    #[test]
    fn test_basic_scenario() {
        let lex = lexicon(
            r#"{"categories": {"urgency": ["act now"], "authority": ["verified account"]}}"#,
        );
        let score = score(&email("Act now to confirm your verified account"), &lex);

        assert_eq!(score.counts[&Category::new("urgency")], 1);
        assert_eq!(score.counts[&Category::new("authority")], 1);
        assert_eq!(score.hits.len(), 2);
        assert_eq!(score.hits[0].start_offset, 0);
    }

    #[test]
    fn test_empty_document_has_zero_counts_for_every_category() {
        let lex = Lexicon::builtin().unwrap();
        let score = score(&email(""), &lex);
        assert!(score.hits.is_empty());
        assert_eq!(score.counts.len(), lex.categories().len());
        assert!(score.counts.values().all(|&n| n == 0));
        assert!(score.weighted.values().all(|&w| w == 0.0));
    }

    #[test]
    fn test_count_sum_equals_hit_count() {
        let lex = Lexicon::builtin().unwrap();
        let doc = email(
            "URGENT!!! Your PayPal account is locked. Verify your account now or it will be \
             suspended. Security team, customer service. Claim your reward today!",
        );
        let score = score(&doc, &lex);
        assert_eq!(score.counts.values().sum::<usize>(), score.hits.len());
        let weighted: f64 = score.weighted.values().sum();
        let hit_weight: f64 = score.hits.iter().map(|h| h.weight).sum();
        assert!((weighted - hit_weight).abs() < 1e-9);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let lex = Lexicon::builtin().unwrap();
        let doc = email("Final notice: verify your account immediately!!");
        assert_eq!(score(&doc, &lex), score(&doc, &lex));
    }

    #[test]
    fn test_overlapping_patterns_both_count() {
        let lex = lexicon(r#"{"categories": {"urgency": ["act now", "now"]}}"#);
        let score = score(&email("act now"), &lex);
        assert_eq!(score.counts[&Category::new("urgency")], 2);
    }

    #[test]
    fn test_same_pattern_is_non_overlapping() {
        let lex = lexicon(r#"{"categories": {"fear": [{"pattern": "aa", "regex": true}]}}"#);
        let score = score(&email("aaaa aaa"), &lex);
        // "aaaa" -> 2, "aaa" -> 1
        assert_eq!(score.counts[&Category::new("fear")], 3);
    }

    #[test]
    fn test_literals_respect_word_boundaries() {
        let lex = lexicon(r#"{"categories": {"reciprocity": ["gift"]}}"#);
        assert_eq!(score(&email("a giftcard"), &lex).hits.len(), 0);
        assert_eq!(score(&email("a gift, card"), &lex).hits.len(), 1);
    }

    #[test]
    fn test_case_sensitive_entries_use_original_case() {
        let lex = lexicon(
            r#"{"categories": {"authority": [{"pattern": "IRS", "caseSensitive": true}]}}"#,
        );
        assert_eq!(score(&email("The IRS wants you"), &lex).hits.len(), 1);
        assert_eq!(score(&email("the irs wants you"), &lex).hits.len(), 0);
    }

    #[test]
    fn test_weights_are_summed() {
        let lex = lexicon(
            r#"{"categories": {"urgency": [{"pattern": "deadline", "weight": 2.5}, "now"]}}"#,
        );
        let score = score(&email("deadline now deadline"), &lex);
        let urgency = Category::new("urgency");
        assert_eq!(score.counts[&urgency], 3);
        assert!((score.weighted[&urgency] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_signals_add_bonus_hits() {
        let lex = lexicon(
            r#"{
                "categories": {"urgency": ["hurry"], "fear": ["locked"]},
                "signals": {"capitalization": "fear", "exclamation": "urgency"}
            }"#,
        );
        let doc = email("YOUR ACCOUNT HAS BEEN LOCKED!!! HURRY!!");
        let score = score(&doc, &lex);

        let signal_hits: Vec<_> = score
            .hits
            .iter()
            .filter(|h| matches!(h.reason, HitReason::Signal(_)))
            .collect();
        assert_eq!(signal_hits.len(), 2);
        assert!(signal_hits.iter().any(|h| h.pattern == "signal:capitalization"
            && h.category == Category::new("fear")));
        assert!(signal_hits.iter().any(|h| h.pattern == "signal:exclamation"
            && h.category == Category::new("urgency")));
        assert_eq!(score.counts[&Category::new("fear")], 2);
        assert_eq!(score.counts[&Category::new("urgency")], 2);
    }

    #[test]
    fn test_unrouted_signal_is_ignored() {
        let lex = lexicon(r#"{"categories": {"urgency": ["hurry"]}}"#);
        let score = score(&email("THIS IS ALL CAPITALS TEXT!!!"), &lex);
        assert!(score.hits.is_empty());
    }

    #[test]
    fn test_short_shouting_does_not_fire() {
        let lex = Lexicon::builtin().unwrap();
        let score = score(&email("OK"), &lex);
        assert!(score.hits.is_empty());
    }

    #[test]
    fn test_policy_thresholds() {
        let lex = lexicon(
            r#"{"categories": {"urgency": ["x"]}, "signals": {"exclamation": "urgency"}}"#,
        );
        let strict = SignalPolicy {
            exclamation_min_count: 10,
            ..Default::default()
        };
        let doc = email("wow!! wow!!");
        assert_eq!(Matcher::new(&lex, &strict).score(&doc).hits.len(), 0);
        assert_eq!(
            Matcher::new(&lex, &SignalPolicy::default()).score(&doc).hits.len(),
            1
        );
    }

    #[test]
    fn test_invalid_policy_fields() {
        let policy = SignalPolicy {
            caps_ratio_threshold: f64::NAN,
            exclamation_bonus: -1.0,
            ..Default::default()
        };
        assert_eq!(
            policy.invalid_fields(),
            vec!["caps_ratio_threshold", "exclamation_bonus"]
        );
        assert!(SignalPolicy::default().invalid_fields().is_empty());
    }

    #[test]
    fn test_evaluate_builds_result() {
        let lex = Lexicon::builtin().unwrap();
        let policy = SignalPolicy::default();
        let doc = email("Security alert: confirm your identity");
        let result = Matcher::new(&lex, &policy).evaluate(&doc);
        assert_eq!(result.document_id, "doc");
        assert!(!result.is_error());
        assert!(result.count(&Category::new("fear")) >= 2);
        assert_eq!(result.total_count(), score(&doc, &lex).hits.len());
    }
}
