//! A single analysis run.
//!
//! ```text
//! Idle -> Analyzing (any subset of sources, any order, re-entrant)
//!      -> Aggregating -> Written
//! ```
//!
//! `Written` is terminal: a new run needs a new `Session`. A failed write
//! leaves the session in `Aggregating` with its summary intact, so the
//! write can be retried.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info};

use super::{
    aggregate::{SessionResults, SessionSummary, summarize},
    data::{DocumentResult, SourceType},
    error::{CollaboratorError, SessionError},
    lexicon::Lexicon,
    matcher::{Matcher, SignalPolicy},
};
use crate::{
    analyzers::{Analyzer, SourceAnalyzer},
    output,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Analyzing,
    Aggregating,
    Written,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Analyzing => write!(f, "analyzing"),
            SessionState::Aggregating => write!(f, "aggregating"),
            SessionState::Written => write!(f, "written"),
        }
    }
}

pub struct Session<'a> {
    matcher: Matcher<'a>,
    state: SessionState,
    results: SessionResults,
    summary: Option<SessionSummary>,
    output: Option<PathBuf>,
}

impl<'a> Session<'a> {
    pub fn new(lexicon: &'a Lexicon, policy: &'a SignalPolicy) -> Self {
        Self {
            matcher: Matcher::new(lexicon, policy),
            state: SessionState::Idle,
            results: SessionResults::new(),
            summary: None,
            output: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn results(&self) -> &SessionResults {
        &self.results
    }

    pub fn summary(&self) -> Option<&SessionSummary> {
        self.summary.as_ref()
    }

    /// Directory of the written report, once `Written`.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output.as_deref()
    }

    fn ensure_analyzing(&mut self, action: &'static str) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Analyzing => {
                self.state = SessionState::Analyzing;
                Ok(())
            }
            state => Err(SessionError::InvalidState { action, state }),
        }
    }

    /// Run one analyzer and keep its results. Returns the number of records
    /// it produced. An unusable collaborator is recorded as a module failure,
    /// not returned as an error.
    pub fn analyze<A: SourceAnalyzer>(&mut self, analyzer: &A) -> Result<usize, SessionError> {
        self.ensure_analyzing("analyze")?;
        let source = analyzer.source_type();
        let outcome = analyzer.analyze(&self.matcher);
        Ok(self.record(source, outcome))
    }

    /// Run several analyzers concurrently and keep all their results.
    pub fn analyze_all(&mut self, analyzers: &[Analyzer]) -> Result<usize, SessionError> {
        self.ensure_analyzing("analyze")?;
        let matcher = self.matcher;
        let outcomes: Vec<_> = analyzers
            .par_iter()
            .map(|analyzer| (analyzer.source_type(), analyzer.analyze(&matcher)))
            .collect();

        Ok(outcomes
            .into_iter()
            .map(|(source, outcome)| self.record(source, outcome))
            .sum())
    }

    fn record(
        &mut self,
        source: SourceType,
        outcome: Result<Vec<DocumentResult>, CollaboratorError>,
    ) -> usize {
        match outcome {
            Ok(results) => {
                let count = results.len();
                let errors = results.iter().filter(|r| r.is_error()).count();
                info!("{} analyzer: {} records ({} errors)", source, count, errors);
                self.results.extend(source, results);
                count
            }
            Err(err) => {
                debug!("{} analyzer unavailable: {}", source, err);
                self.results.record_failure(source, err.to_string());
                0
            }
        }
    }

    /// Reduce everything analyzed so far. Calling it again returns the same
    /// summary.
    pub fn summarize(&mut self) -> Result<&SessionSummary, SessionError> {
        match self.state {
            SessionState::Idle | SessionState::Analyzing => {
                let summary = summarize(self.matcher.lexicon(), &self.results, Utc::now());
                debug!(
                    "Summarized {} documents ({} errors)",
                    summary.total_documents, summary.total_errors
                );
                self.state = SessionState::Aggregating;
                Ok(self.summary.insert(summary))
            }
            SessionState::Aggregating => match &self.summary {
                Some(summary) => Ok(summary),
                None => Err(SessionError::InvalidState {
                    action: "summarize",
                    state: self.state,
                }),
            },
            state => Err(SessionError::InvalidState {
                action: "summarize",
                state,
            }),
        }
    }

    /// Write the report under `output_root` and return the run directory.
    pub fn write(&mut self, output_root: &Path) -> Result<PathBuf, SessionError> {
        let summary = match (&self.state, &self.summary) {
            (SessionState::Aggregating, Some(summary)) => summary,
            (state, _) => {
                return Err(SessionError::InvalidState {
                    action: "write",
                    state: *state,
                });
            }
        };

        let dir = output::write_session(summary, &self.results, output_root)?;
        info!("Report written to {}", dir.display());
        self.state = SessionState::Written;
        self.output = Some(dir.clone());
        Ok(dir)
    }
}
