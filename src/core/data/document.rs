use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// ============================================================
// Source Type
// ============================================================

/// Kind of artifact a document was extracted from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Email,
    Image,
    Url,
}

impl SourceType {
    /// All source types in report column order.
    pub const ALL: [SourceType; 3] = [SourceType::Email, SourceType::Image, SourceType::Url];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Email => "email",
            SourceType::Image => "image",
            SourceType::Url => "url",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================
// Category
// ============================================================

/// A bias category name (e.g. `urgency`, `authority`).
///
/// The set of categories is owned by the lexicon, so this is a validated
/// name rather than a closed enum: adding a category is a lexicon update.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Category(String);

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Category keys are lowercase identifiers: `[a-z][a-z0-9_]*`.
    pub fn is_valid_key(key: &str) -> bool {
        let mut chars = key.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

// ============================================================
// Auxiliary Signals
// ============================================================

/// Signals that are not lexicon patterns and that the matcher can fold into
/// a category as a bonus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    /// Share of uppercase letters among alphabetic letters.
    Capitalization,
    /// Exclamation marks per word.
    Exclamation,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalKind::Capitalization => write!(f, "capitalization"),
            SignalKind::Exclamation => write!(f, "exclamation"),
        }
    }
}

/// Measurements taken from the original text, before case folding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuxSignals {
    /// Uppercase letters / alphabetic letters (0.0 when there are no letters).
    pub capitalization_ratio: f64,
    /// Number of alphabetic letters the ratio was computed from.
    pub letter_count: usize,
    /// Literal count of `!`.
    pub exclamation_count: usize,
    /// Whitespace separated tokens.
    pub word_count: usize,
    /// Tokens made of two or more uppercase ASCII letters.
    pub all_caps_words: usize,
    /// Occurrences of `£`, `$` and `€`.
    pub money_symbols: usize,
    /// Occurrences of `http://`, `https://` and `www.`.
    pub links: usize,
    /// Input bytes that were not valid UTF-8 and got replaced.
    pub replaced_bytes: usize,
    /// ASCII punctuation per character (URL documents only).
    pub punctuation_density: f64,
    /// Known phishing keywords inside the URL (URL documents only).
    pub suspicious_tokens: usize,
}

// ============================================================
// Normalized Document
// ============================================================

/// One unit of analyzed text: an email, an OCR output or a URL.
///
/// Built once by the normalizer and immutable afterwards. Two views of the
/// text are kept with identical byte layout: `cased_text` (whitespace
/// collapsed, original case) for case-sensitive patterns and
/// `normalized_text` (additionally case folded) for everything else, so a
/// byte offset means the same thing in both.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    source_type: SourceType,
    source_id: String,
    raw_length: usize,
    cased_text: String,
    normalized_text: String,
    signals: AuxSignals,
}

impl NormalizedDocument {
    pub(crate) fn new(
        source_type: SourceType,
        source_id: String,
        raw_length: usize,
        cased_text: String,
        normalized_text: String,
        signals: AuxSignals,
    ) -> Self {
        debug_assert_eq!(cased_text.len(), normalized_text.len());
        Self {
            source_type,
            source_id,
            raw_length,
            cased_text,
            normalized_text,
            signals,
        }
    }

    pub fn source_type(&self) -> SourceType {
        self.source_type
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Length of the raw input in bytes.
    pub fn raw_length(&self) -> usize {
        self.raw_length
    }

    pub fn normalized_text(&self) -> &str {
        &self.normalized_text
    }

    pub fn cased_text(&self) -> &str {
        &self.cased_text
    }

    pub fn signals(&self) -> &AuxSignals {
        &self.signals
    }

    pub fn is_empty(&self) -> bool {
        self.normalized_text.is_empty()
    }
}
