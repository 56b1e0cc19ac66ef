//! Core data types shared by the normalizer, matcher, analyzers and
//! aggregator.
//!
//! ## Module Structure
//!
//! - `document`: SourceType, Category, AuxSignals and NormalizedDocument
//! - `result`: MatchHit and DocumentResult

pub mod document;
pub mod result;

pub use document::{AuxSignals, Category, NormalizedDocument, SignalKind, SourceType};
pub use result::{CategoryCounts, CategoryScores, DocumentResult, HitReason, MatchHit};
