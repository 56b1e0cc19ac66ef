//! Categorized cue lexicon.
//!
//! A lexicon maps bias categories to trigger patterns. It is loaded once per
//! run, validated up front (a malformed definition fails the load, never a
//! later match) and then shared read-only by every analyzer.
//!
//! ## File Format
//!
//! ```json
//! {
//!   "version": "2024.1",
//!   "categories": {
//!     "urgency": ["act now", {"pattern": "within \\d+ hours", "regex": true, "weight": 2.0}],
//!     "authority": [{"pattern": "IRS", "caseSensitive": true}]
//!   },
//!   "signals": {"capitalization": "urgency", "exclamation": "urgency"}
//! }
//! ```
//!
//! Literal phrases match on word boundaries; regex patterns are used as
//! written. Case sensitivity is a per-entry property because attacker text
//! in capitals is itself a cue.

use std::{
    collections::{BTreeMap, HashSet},
    fs,
    path::{Path, PathBuf},
};

use regex::{Matches, Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::core::{
    data::{Category, SignalKind},
    error::LexiconError,
};

/// The lexicon compiled into the binary.
pub const BUILTIN_LEXICON_JSON: &str = include_str!("builtin.json");

const UNVERSIONED: &str = "unversioned";

/// Where the lexicon for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexiconSource {
    Builtin,
    File(PathBuf),
}

impl LexiconSource {
    pub fn load(&self) -> Result<Lexicon, LexiconError> {
        match self {
            LexiconSource::Builtin => Lexicon::builtin(),
            LexiconSource::File(path) => Lexicon::from_path(path),
        }
    }
}

// ============================================================
// Entries
// ============================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Literal,
    Regex,
}

/// A single compiled trigger pattern.
#[derive(Debug, Clone)]
pub struct LexiconEntry {
    category: Category,
    pattern: String,
    kind: PatternKind,
    weight: f64,
    case_sensitive: bool,
    compiled: Regex,
}

impl LexiconEntry {
    fn compile(category: &Category, raw: DetailedEntry) -> Result<Self, LexiconError> {
        let kind = if raw.regex {
            PatternKind::Regex
        } else {
            PatternKind::Literal
        };
        let pattern = match kind {
            // Documents are whitespace collapsed, so literals are too.
            PatternKind::Literal => raw.pattern.split_whitespace().collect::<Vec<_>>().join(" "),
            PatternKind::Regex => raw.pattern,
        };

        if pattern.trim().is_empty() {
            return Err(LexiconError::EmptyPattern {
                category: category.to_string(),
            });
        }
        if !raw.weight.is_finite() || raw.weight <= 0.0 {
            return Err(LexiconError::InvalidWeight {
                category: category.to_string(),
                pattern,
                weight: raw.weight,
            });
        }

        let source = match kind {
            PatternKind::Literal => literal_regex(&pattern),
            PatternKind::Regex => pattern.clone(),
        };
        let compiled = RegexBuilder::new(&source)
            .case_insensitive(!raw.case_sensitive)
            .build()
            .map_err(|e| LexiconError::InvalidRegex {
                category: category.to_string(),
                pattern: pattern.clone(),
                message: e.to_string(),
            })?;

        if compiled.is_match("") {
            return Err(LexiconError::EmptyMatch {
                category: category.to_string(),
                pattern,
            });
        }

        Ok(Self {
            category: category.clone(),
            pattern,
            kind,
            weight: raw.weight,
            case_sensitive: raw.case_sensitive,
            compiled,
        })
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    /// All non-overlapping occurrences of this pattern in `text`.
    pub fn find_iter<'r, 't>(&'r self, text: &'t str) -> Matches<'r, 't> {
        self.compiled.find_iter(text)
    }

    /// Two entries with the same identity in one category are duplicates.
    fn identity(&self) -> (PatternKind, String) {
        let key = if self.case_sensitive {
            self.pattern.clone()
        } else {
            self.pattern.to_lowercase()
        };
        (self.kind, key)
    }

    fn to_spec(&self) -> EntrySpec {
        let is_plain = self.kind == PatternKind::Literal && !self.case_sensitive && self.weight == 1.0;
        if is_plain {
            EntrySpec::Phrase(self.pattern.clone())
        } else {
            EntrySpec::Detailed(DetailedEntry {
                pattern: self.pattern.clone(),
                regex: self.kind == PatternKind::Regex,
                weight: self.weight,
                case_sensitive: self.case_sensitive,
            })
        }
    }
}

/// Escape a literal phrase and anchor it on word boundaries where the
/// phrase starts or ends with a word character.
fn literal_regex(phrase: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if phrase.chars().next().is_some_and(is_word) {
        r"\b"
    } else {
        ""
    };
    let end = if phrase.chars().last().is_some_and(is_word) {
        r"\b"
    } else {
        ""
    };
    format!("{}{}{}", start, regex::escape(phrase), end)
}

// ============================================================
// Lexicon
// ============================================================

/// A validated, compiled lexicon.
#[derive(Debug, Clone)]
pub struct Lexicon {
    version: String,
    categories: Vec<Category>,
    entries: Vec<LexiconEntry>,
    by_category: BTreeMap<Category, Vec<usize>>,
    signal_routes: BTreeMap<SignalKind, Category>,
}

impl Lexicon {
    pub fn builtin() -> Result<Self, LexiconError> {
        Self::from_json(BUILTIN_LEXICON_JSON)
    }

    pub fn from_path(path: &Path) -> Result<Self, LexiconError> {
        let content = fs::read_to_string(path).map_err(|source| LexiconError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let lexicon = Self::from_json(&content)?;
        debug!(
            "Loaded lexicon {} from {} ({} entries)",
            lexicon.version,
            path.display(),
            lexicon.len()
        );
        Ok(lexicon)
    }

    pub fn from_json(content: &str) -> Result<Self, LexiconError> {
        let file: LexiconFile = serde_json::from_str(content)?;
        Self::build(file)
    }

    fn build(file: LexiconFile) -> Result<Self, LexiconError> {
        if file.categories.is_empty() {
            return Err(LexiconError::NoCategories);
        }

        let mut categories = Vec::with_capacity(file.categories.len());
        let mut entries: Vec<LexiconEntry> = Vec::new();
        let mut by_category = BTreeMap::new();

        for (key, value) in file.categories {
            if !Category::is_valid_key(&key) {
                return Err(LexiconError::UnknownCategory(key));
            }
            let specs: Vec<EntrySpec> =
                serde_json::from_value(value).map_err(|e| LexiconError::MalformedCategory {
                    category: key.clone(),
                    message: e.to_string(),
                })?;
            if specs.is_empty() {
                return Err(LexiconError::EmptyCategory(key));
            }

            let category = Category::new(key);
            let mut seen = HashSet::new();
            let mut indices = Vec::with_capacity(specs.len());
            for raw in specs {
                let entry = LexiconEntry::compile(&category, raw.into_detailed())?;
                if !seen.insert(entry.identity()) {
                    return Err(LexiconError::DuplicatePattern {
                        category: category.to_string(),
                        pattern: entry.pattern,
                    });
                }
                indices.push(entries.len());
                entries.push(entry);
            }

            by_category.insert(category.clone(), indices);
            categories.push(category);
        }

        let mut signal_routes = BTreeMap::new();
        for (signal, target) in file.signals {
            let category = Category::new(target);
            if !by_category.contains_key(&category) {
                return Err(LexiconError::UnknownCategory(category.to_string()));
            }
            signal_routes.insert(signal, category);
        }

        Ok(Self {
            version: file.version.unwrap_or_else(|| UNVERSIONED.to_string()),
            categories,
            entries,
            by_category,
            signal_routes,
        })
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Categories in declaration order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Entries of one category, in declaration order.
    pub fn entries_for<'a>(
        &'a self,
        category: &Category,
    ) -> impl Iterator<Item = &'a LexiconEntry> + use<'a> {
        let indices = self
            .by_category
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or_default();
        indices.iter().map(|&i| &self.entries[i])
    }

    pub fn contains(&self, category: &Category) -> bool {
        self.by_category.contains_key(category)
    }

    /// Category an auxiliary signal contributes to, if routed.
    pub fn signal_route(&self, signal: SignalKind) -> Option<&Category> {
        self.signal_routes.get(&signal)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Canonical JSON form; loading it yields an equivalent lexicon.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut categories = Map::new();
        for category in &self.categories {
            let specs: Vec<EntrySpec> = self.entries_for(category).map(|e| e.to_spec()).collect();
            categories.insert(category.to_string(), serde_json::to_value(specs)?);
        }
        let signals: BTreeMap<SignalKind, String> = self
            .signal_routes
            .iter()
            .map(|(signal, category)| (*signal, category.to_string()))
            .collect();

        serde_json::to_string_pretty(&serde_json::json!({
            "version": self.version,
            "categories": categories,
            "signals": signals,
        }))
    }
}

// ============================================================
// File Model
// ============================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct LexiconFile {
    #[serde(default)]
    version: Option<String>,
    categories: Map<String, Value>,
    #[serde(default)]
    signals: BTreeMap<SignalKind, String>,
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum EntrySpec {
    Phrase(String),
    Detailed(DetailedEntry),
}

impl EntrySpec {
    fn into_detailed(self) -> DetailedEntry {
        match self {
            EntrySpec::Phrase(pattern) => DetailedEntry {
                pattern,
                regex: false,
                weight: default_weight(),
                case_sensitive: false,
            },
            EntrySpec::Detailed(entry) => entry,
        }
    }
}

#[derive(Deserialize, Serialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DetailedEntry {
    pattern: String,
    #[serde(default)]
    regex: bool,
    #[serde(default = "default_weight")]
    weight: f64,
    #[serde(default)]
    case_sensitive: bool,
}

fn default_weight() -> f64 {
    1.0
}
