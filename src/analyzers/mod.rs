//! Source analyzers.
//!
//! Each analyzer adapts one external data source into normalized documents,
//! scores them with the shared `Matcher` and returns one `DocumentResult`
//! per input record. A record that cannot be read becomes an errored result;
//! only an unusable collaborator (missing input, missing OCR engine) fails
//! the analyzer as a whole.
//!
//! ## Module Structure
//!
//! - `email`: mbox / CSV email corpora
//! - `image`: OCR'd screenshots
//! - `url`: sampled URL lists
//! - `scanner`: directory walking shared by the file based sources
//! - `mime`: header words, transfer encodings and charsets for mail

pub mod email;
pub mod image;
pub mod mime;
pub mod scanner;
pub mod url;

use enum_dispatch::enum_dispatch;

pub use email::{EmailAnalyzer, EmailDirectory, EmailRecord, EmailSource};
pub use image::{ImageAnalyzer, OcrEngine, OcrError, TesseractOcr};
pub use self::url::{CsvUrlSampler, DedupeMode, SampleMode, UrlAnalyzer, UrlSampler};

use crate::core::{
    data::{DocumentResult, SourceType},
    error::{CollaboratorError, RecordError},
    matcher::Matcher,
};

/// A record a collaborator could not turn into text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedRecord {
    pub id: String,
    pub error: RecordError,
}

impl FailedRecord {
    pub fn new(id: impl Into<String>, error: RecordError) -> Self {
        Self {
            id: id.into(),
            error,
        }
    }

    pub fn into_result(self, source_type: SourceType) -> DocumentResult {
        DocumentResult::failed(self.id, source_type, self.error)
    }
}

/// Trait implemented by every source analyzer. Uses `enum_dispatch` for
/// dispatch on the `Analyzer` enum.
#[enum_dispatch]
pub trait SourceAnalyzer {
    fn source_type(&self) -> SourceType;

    /// Analyze every record of the source.
    fn analyze(&self, matcher: &Matcher) -> Result<Vec<DocumentResult>, CollaboratorError>;
}

#[enum_dispatch(SourceAnalyzer)]
pub enum Analyzer {
    Email(EmailAnalyzer),
    Image(ImageAnalyzer),
    Url(UrlAnalyzer),
}
