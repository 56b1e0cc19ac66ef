use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::{
    analyzers::{
        image::{DEFAULT_OCR_COMMAND, DEFAULT_OCR_TIMEOUT_SECS, default_ocr_args},
        url::{DEFAULT_URL_LIMIT, DEFAULT_URL_SEED, DedupeMode, SampleMode},
    },
    core::matcher::SignalPolicy,
};

pub const CONFIG_FILE_NAME: &str = ".cuescanrc.json";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub ignores: Vec<String>,
    /// Lexicon file; the built-in lexicon is used when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lexicon: Option<String>,
    #[serde(default = "default_emails_root")]
    pub emails_root: String,
    #[serde(default = "default_images_root")]
    pub images_root: String,
    #[serde(default = "default_urls_file")]
    pub urls_file: String,
    #[serde(default = "default_output_root")]
    pub output_root: String,
    #[serde(default)]
    pub signals: SignalPolicy,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub urls: UrlConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OcrConfig {
    pub command: String,
    pub args: Vec<String>,
    pub timeout_secs: u64,
    pub extensions: Vec<String>,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_OCR_COMMAND.to_string(),
            args: default_ocr_args(),
            timeout_secs: DEFAULT_OCR_TIMEOUT_SECS,
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UrlConfig {
    /// 0 analyzes every URL in the list.
    pub limit: usize,
    pub seed: u64,
    pub mode: SampleMode,
    pub dedupe: DedupeMode,
}

impl Default for UrlConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_URL_LIMIT,
            seed: DEFAULT_URL_SEED,
            mode: SampleMode::Random,
            dedupe: DedupeMode::Apex,
        }
    }
}

fn default_emails_root() -> String {
    "./data/emails".to_string()
}

fn default_images_root() -> String {
    "./data/images".to_string()
}

fn default_urls_file() -> String {
    "./data/urls/phishtank.csv".to_string()
}

fn default_output_root() -> String {
    "./outputs".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ignores: Vec::new(),
            lexicon: None,
            emails_root: default_emails_root(),
            images_root: default_images_root(),
            urls_file: default_urls_file(),
            output_root: default_output_root(),
            signals: SignalPolicy::default(),
            ocr: OcrConfig::default(),
            urls: UrlConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Rejects invalid glob patterns in `ignores`, negative or non-finite
    /// signal thresholds, an empty OCR command and a zero OCR timeout.
    pub fn validate(&self) -> Result<()> {
        for pattern in &self.ignores {
            Pattern::new(pattern)
                .with_context(|| format!("Invalid glob pattern in 'ignores': \"{}\"", pattern))?;
        }

        let invalid = self.signals.invalid_fields();
        if !invalid.is_empty() {
            bail!(
                "Invalid value in 'signals': {} must be finite and non-negative",
                invalid.join(", ")
            );
        }

        if self.ocr.command.trim().is_empty() {
            bail!("Invalid value in 'ocr': command must not be empty");
        }
        if self.ocr.timeout_secs == 0 {
            bail!("Invalid value in 'ocr': timeoutSecs must be greater than 0");
        }

        Ok(())
    }
}

pub fn default_config_json() -> Result<String> {
    let config = Config::default();
    serde_json::to_string_pretty(&config).context("Failed to generate default config.")
}

pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current = start_dir.to_path_buf();

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }
        if current.join(".git").exists() {
            return None;
        }
        if !current.pop() {
            return None;
        }
    }
}

/// Result of loading configuration.
pub struct ConfigLoadResult {
    pub config: Config,
    /// True if config was loaded from a file, false if using defaults.
    pub from_file: bool,
    /// Directory relative config paths resolve against: the config file's
    /// directory, or the start directory when using defaults.
    pub root: PathBuf,
}

impl ConfigLoadResult {
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

pub fn load_config(start_dir: &Path) -> Result<ConfigLoadResult> {
    match find_config_file(start_dir) {
        Some(path) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            config.validate()?;
            let root = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| start_dir.to_path_buf());
            Ok(ConfigLoadResult {
                config,
                from_file: true,
                root,
            })
        }
        None => Ok(ConfigLoadResult {
            config: Config::default(),
            from_file: false,
            root: start_dir.to_path_buf(),
        }),
    }
}
