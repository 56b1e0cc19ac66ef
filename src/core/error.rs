//! Error taxonomy for the analysis engine.
//!
//! Errors are layered by how far they are allowed to travel:
//!
//! - `LexiconError`: configuration failure, aborts before any analysis.
//! - `RecordError`: a single record failed; stored in its `DocumentResult`.
//! - `CollaboratorError`: an analyzer's data source or engine is unusable;
//!   reported once for that analyzer, siblings keep running.
//! - `WriteError`: the report could not be written; the in-memory summary
//!   stays valid.
//! - `SessionError`: a session operation was called out of order.

use std::{io, path::PathBuf};

use thiserror::Error;

use super::session::SessionState;

/// The lexicon definition is unusable.
#[derive(Debug, Error)]
pub enum LexiconError {
    #[error("failed to read lexicon {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid lexicon JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("lexicon defines no categories")]
    NoCategories,

    #[error("unknown category key '{0}'")]
    UnknownCategory(String),

    #[error("category '{0}' defines no patterns")]
    EmptyCategory(String),

    #[error("malformed entries for category '{category}': {message}")]
    MalformedCategory { category: String, message: String },

    #[error("category '{category}' has an empty pattern")]
    EmptyPattern { category: String },

    #[error("duplicate pattern '{pattern}' in category '{category}'")]
    DuplicatePattern { category: String, pattern: String },

    #[error("invalid regex '{pattern}' in category '{category}': {message}")]
    InvalidRegex {
        category: String,
        pattern: String,
        message: String,
    },

    #[error("pattern '{pattern}' in category '{category}' matches empty text")]
    EmptyMatch { category: String, pattern: String },

    #[error("invalid weight {weight} for '{pattern}' in category '{category}'")]
    InvalidWeight {
        category: String,
        pattern: String,
        weight: f64,
    },
}

/// A single record could not be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("cannot read {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("no text detected")]
    NoText,

    #[error("OCR timed out after {0}s")]
    TimedOut(u64),

    #[error("OCR failed: {0}")]
    Ocr(String),
}

/// An analyzer's collaborator (input location, OCR engine, ...) is unusable.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("{what} not found: {}", path.display())]
    InputMissing { what: &'static str, path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{} has no '{column}' column", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{0}")]
    Unavailable(String),
}

/// The report for a run could not be written.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("cannot create output root {}: {source}", path.display())]
    CreateRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot stage report in {}: {source}", path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot encode {file}: {message}")]
    Encode { file: &'static str, message: String },

    #[error("cannot publish report to {}: {source}", path.display())]
    Publish {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A session operation was invalid for the current state.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("cannot {action} a session in state {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error(transparent)]
    Write(#[from] WriteError),
}
