//! Text normalization.
//!
//! Turns raw record text into a `NormalizedDocument`:
//!
//! 1. decode the input, replacing undecodable bytes instead of failing;
//! 2. measure auxiliary signals on the original text (before folding);
//! 3. repair and collapse whitespace, then case fold for matching.
//!
//! Prose (emails) only gets whitespace collapsing. OCR output first goes
//! through a repair pass for control characters, exotic spaces and
//! ligatures. URLs are short tokens rather than prose: separators become
//! spaces so that `verify-account` reads as two words.
//!
//! Case folding never changes a character's UTF-8 width, so byte offsets in
//! the folded text are valid in the cased text as well.

use std::sync::LazyLock;

use regex::Regex;

use super::data::{AuxSignals, NormalizedDocument, SourceType};

static ALL_CAPS_WORD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{2,}\b").unwrap());

static LINK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(https?://|www\.)").unwrap());

/// Keywords frequently seen in phishing URLs.
pub const SUSPICIOUS_URL_TOKENS: &[&str] = &[
    "login",
    "verify",
    "update",
    "secure",
    "account",
    "wallet",
    "bank",
    "password",
    "billing",
    "invoice",
    "appeal",
    "case",
    "support",
    "help",
    "gift",
    "prize",
    "bonus",
    "urgent",
    "suspend",
    "limited",
    "verify-now",
];

const MONEY_SYMBOLS: &[char] = &['£', '$', '€'];

/// Normalize UTF-8 text.
pub fn normalize(
    raw_text: &str,
    source_type: SourceType,
    source_id: impl Into<String>,
) -> NormalizedDocument {
    build(raw_text, raw_text.len(), 0, source_type, source_id.into())
}

/// Normalize raw bytes, replacing invalid UTF-8 sequences with U+FFFD.
pub fn normalize_bytes(
    raw: &[u8],
    source_type: SourceType,
    source_id: impl Into<String>,
) -> NormalizedDocument {
    let (text, replaced) = decode_lossy(raw);
    build(&text, raw.len(), replaced, source_type, source_id.into())
}

/// Decode bytes as UTF-8, returning the text and the number of bytes that
/// had to be replaced.
pub fn decode_lossy(raw: &[u8]) -> (String, usize) {
    let mut text = String::with_capacity(raw.len());
    let mut replaced = 0;
    for chunk in raw.utf8_chunks() {
        text.push_str(chunk.valid());
        if !chunk.invalid().is_empty() {
            replaced += chunk.invalid().len();
            text.push(char::REPLACEMENT_CHARACTER);
        }
    }
    (text, replaced)
}

fn build(
    text: &str,
    raw_length: usize,
    replaced_bytes: usize,
    source_type: SourceType,
    source_id: String,
) -> NormalizedDocument {
    let mut signals = measure_signals(text, source_type);
    signals.replaced_bytes = replaced_bytes;

    let cased = match source_type {
        SourceType::Email => collapse_whitespace(text),
        SourceType::Image => collapse_whitespace(&repair_ocr_text(text)),
        SourceType::Url => collapse_whitespace(&split_url_separators(text)),
    };
    let folded = fold_case(&cased);

    NormalizedDocument::new(source_type, source_id, raw_length, cased, folded, signals)
}

// ============================================================
// Signals
// ============================================================

fn measure_signals(text: &str, source_type: SourceType) -> AuxSignals {
    let mut letters = 0;
    let mut uppercase = 0;
    let mut exclamations = 0;
    let mut money = 0;
    for c in text.chars() {
        if c.is_alphabetic() {
            letters += 1;
            if c.is_uppercase() {
                uppercase += 1;
            }
        }
        if c == '!' {
            exclamations += 1;
        }
        if MONEY_SYMBOLS.contains(&c) {
            money += 1;
        }
    }

    let mut signals = AuxSignals {
        capitalization_ratio: if letters == 0 {
            0.0
        } else {
            uppercase as f64 / letters as f64
        },
        letter_count: letters,
        exclamation_count: exclamations,
        word_count: text.split_whitespace().count(),
        all_caps_words: ALL_CAPS_WORD_REGEX.find_iter(text).count(),
        money_symbols: money,
        links: LINK_REGEX.find_iter(text).count(),
        ..Default::default()
    };

    if source_type == SourceType::Url {
        let chars = text.chars().count();
        let punctuation = text.chars().filter(|c| c.is_ascii_punctuation()).count();
        signals.punctuation_density = if chars == 0 {
            0.0
        } else {
            punctuation as f64 / chars as f64
        };
        let lower = text.to_lowercase();
        signals.suspicious_tokens = SUSPICIOUS_URL_TOKENS
            .iter()
            .filter(|token| lower.contains(*token))
            .count();
    }

    signals
}

// ============================================================
// Text Passes
// ============================================================

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase each character whose lowercase form is a single character of
/// the same UTF-8 width; leave the rest untouched.
fn fold_case(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut lower = c.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) if l.len_utf8() == c.len_utf8() => l,
                _ => c,
            }
        })
        .collect()
}

/// Clean up characters OCR engines emit that are not part of the text.
fn repair_ocr_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{FEFF}' => {}
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB00}' => out.push_str("ff"),
            c if c.is_control() && !c.is_whitespace() => out.push(' '),
            c if c.is_whitespace() => out.push(' '),
            c => out.push(c),
        }
    }
    out
}

fn split_url_separators(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect()
}
