//! Image analyzer.
//!
//! Pixels are turned into text by an `OcrEngine`. The default engine shells
//! out to the `tesseract` executable with a per-image timeout; the engine is
//! probed once per run so a missing install is reported once instead of
//! once per image.

use std::{
    io::{self, Read},
    path::{Path, PathBuf},
    process::{Child, Command, ExitStatus, Stdio},
    thread,
    time::{Duration, Instant},
};

use rayon::prelude::*;
use thiserror::Error;
use tracing::debug;

use super::{SourceAnalyzer, scanner::scan_files};
use crate::core::{
    data::{DocumentResult, SourceType},
    error::{CollaboratorError, RecordError},
    matcher::Matcher,
    normalizer::normalize_bytes,
};

pub const DEFAULT_OCR_COMMAND: &str = "tesseract";
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OcrError {
    #[error("{0}")]
    Unavailable(String),

    #[error("no text detected")]
    NoText,

    #[error("OCR timed out after {0}s")]
    TimedOut(u64),

    #[error("{0}")]
    Failed(String),
}

impl From<OcrError> for RecordError {
    fn from(err: OcrError) -> Self {
        match err {
            OcrError::NoText => RecordError::NoText,
            OcrError::TimedOut(secs) => RecordError::TimedOut(secs),
            OcrError::Unavailable(message) | OcrError::Failed(message) => RecordError::Ocr(message),
        }
    }
}

/// Turns an image into text.
pub trait OcrEngine: Send + Sync {
    /// Check that the engine can run at all.
    fn probe(&self) -> Result<(), OcrError>;

    /// Raw text bytes recognized in `image`.
    fn extract_text(&self, image: &Path) -> Result<Vec<u8>, OcrError>;
}

// ============================================================
// Tesseract
// ============================================================

#[derive(Debug, Clone)]
pub struct TesseractOcr {
    command: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self {
            command: DEFAULT_OCR_COMMAND.to_string(),
            args: default_ocr_args(),
            timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
        }
    }
}

pub fn default_ocr_args() -> Vec<String> {
    ["--oem", "3", "--psm", "6"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl TesseractOcr {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            args,
            timeout_secs,
        }
    }

    fn spawn_error(&self, err: io::Error) -> OcrError {
        if err.kind() == io::ErrorKind::NotFound {
            OcrError::Unavailable(format!(
                "{} not found. Please install it first.",
                self.command
            ))
        } else {
            OcrError::Unavailable(format!("Failed to run {}: {}", self.command, err))
        }
    }
}

impl OcrEngine for TesseractOcr {
    fn probe(&self) -> Result<(), OcrError> {
        let status = Command::new(&self.command)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| self.spawn_error(e))?;
        if status.success() {
            Ok(())
        } else {
            Err(OcrError::Unavailable(format!(
                "{} --version exited with {}",
                self.command, status
            )))
        }
    }

    fn extract_text(&self, image: &Path) -> Result<Vec<u8>, OcrError> {
        let child = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let output = run_with_timeout(child, self.timeout_secs)?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| format!("{} exited with {}", self.command, output.status));
            return Err(OcrError::Failed(reason));
        }
        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Err(OcrError::NoText);
        }
        Ok(output.stdout)
    }
}

struct ProcessOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        buf
    })
}

/// Wait for `child`, killing it once `timeout_secs` have passed. Output
/// pipes are drained on their own threads so a chatty process cannot block
/// on a full pipe.
fn run_with_timeout(mut child: Child, timeout_secs: u64) -> Result<ProcessOutput, OcrError> {
    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let start = Instant::now();
    let timeout = Duration::from_secs(timeout_secs);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(OcrError::TimedOut(timeout_secs));
                }
                thread::sleep(Duration::from_millis(100));
            }
            Err(e) => return Err(OcrError::Failed(format!("Failed to wait for OCR: {}", e))),
        }
    };

    Ok(ProcessOutput {
        status,
        stdout: stdout.join().unwrap_or_default(),
        stderr: stderr.join().unwrap_or_default(),
    })
}

// ============================================================
// Analyzer
// ============================================================

pub struct ImageAnalyzer {
    root: PathBuf,
    extensions: Vec<String>,
    ignores: Vec<String>,
    engine: Box<dyn OcrEngine>,
}

impl ImageAnalyzer {
    pub fn new(
        root: impl Into<PathBuf>,
        extensions: Vec<String>,
        ignores: Vec<String>,
        engine: impl OcrEngine + 'static,
    ) -> Self {
        Self {
            root: root.into(),
            extensions,
            ignores,
            engine: Box::new(engine),
        }
    }
}

impl SourceAnalyzer for ImageAnalyzer {
    fn source_type(&self) -> SourceType {
        SourceType::Image
    }

    fn analyze(&self, matcher: &Matcher) -> Result<Vec<DocumentResult>, CollaboratorError> {
        if !self.root.is_dir() {
            return Err(CollaboratorError::InputMissing {
                what: "image directory",
                path: self.root.clone(),
            });
        }
        let scan = scan_files(&self.root, &self.extensions, &self.ignores);
        if scan.files.is_empty() {
            debug!("No images under {}", self.root.display());
            return Ok(Vec::new());
        }
        self.engine
            .probe()
            .map_err(|e| CollaboratorError::Unavailable(e.to_string()))?;

        Ok(scan
            .files
            .par_iter()
            .map(|path| {
                let id = path.display().to_string();
                match self.engine.extract_text(path) {
                    Ok(text) => matcher.evaluate(&normalize_bytes(&text, SourceType::Image, id)),
                    Err(err) => {
                        debug!("OCR failed for {}: {}", id, err);
                        DocumentResult::failed(id, SourceType::Image, err.into())
                    }
                }
            })
            .collect())
    }
}
