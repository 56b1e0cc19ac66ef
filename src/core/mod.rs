//! Cue detection and aggregation engine.
//!
//! ## Pipeline
//!
//! 1. **Normalize** (`normalizer`): raw record text to `NormalizedDocument`
//! 2. **Match** (`matcher`): document + `Lexicon` to per-category hits
//! 3. **Aggregate** (`aggregate`): per-record results to `SessionSummary`
//!
//! `session` drives a run through these phases and guards the order in
//! which they may be called. `census` is a separate pass over an email
//! corpus that estimates unique emails per year.

pub mod aggregate;
pub mod census;
pub mod data;
pub mod error;
pub mod lexicon;
pub mod matcher;
pub mod normalizer;
pub mod session;

pub use aggregate::{ModuleFailure, SessionResults, SessionSummary, summarize};
pub use census::CensusSummary;
pub use lexicon::{Lexicon, LexiconSource};
pub use matcher::{DocumentScore, Matcher, SignalPolicy};
pub use normalizer::{normalize, normalize_bytes};
pub use session::{Session, SessionState};
