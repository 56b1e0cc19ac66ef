//! cuescan - persuasion cue scanner for phishing artifacts
//!
//! cuescan is a CLI tool and library that counts persuasion cues (urgency,
//! authority, scarcity, fear, ...) in phishing emails, OCR'd screenshots and
//! URL lists, using one shared, validated lexicon, and writes a combined
//! per-category, per-source report.
//!
//! ## Module Structure
//!
//! - `analyzers`: Source adapters (email corpora, OCR, URL sampling)
//! - `cli`: Command-line interface layer
//! - `config`: Configuration file loading and parsing
//! - `core`: Normalization, matching and aggregation engine
//! - `output`: Report directory writer (CSV and JSON)

pub mod analyzers;
pub mod cli;
pub mod config;
pub mod core;
pub mod output;
