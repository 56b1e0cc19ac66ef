use std::{
    fs,
    path::{Path, PathBuf},
    process::Command,
};

use anyhow::{Context, Ok, Result, bail};
use insta_cmd::get_cargo_bin;
use tempfile::TempDir;

mod analyze;
mod census;
mod init;
mod lexicon;
mod run;

const BIN_NAME: &str = "cuescan";

/// Lexicon used by tests that assert exact counts.
pub const TEST_LEXICON: &str = r#"{
  "version": "test-1",
  "categories": {
    "urgency": ["act now"],
    "fear": ["locked"]
  }
}"#;

/// Config that keeps every test away from a real OCR install.
pub const TEST_CONFIG: &str = r#"{
  "lexicon": "./lexicon.json",
  "ocr": { "command": "cuescan-missing-ocr" }
}"#;

pub struct CliTest {
    _temp_dir: TempDir,
    project_dir: PathBuf,
}

impl CliTest {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let project_dir = temp_dir.path().canonicalize()?;
        // Stop config discovery at the project root.
        fs::create_dir(project_dir.join(".git"))?;
        Ok(Self {
            _temp_dir: temp_dir,
            project_dir,
        })
    }

    /// A project with the test config and lexicon in place.
    pub fn project() -> Result<Self> {
        let test = Self::new()?;
        test.write_file(".cuescanrc.json", TEST_CONFIG)?;
        test.write_file("lexicon.json", TEST_LEXICON)?;
        Ok(test)
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.project_dir.join(path);

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory:{}", parent.display()))?;
        }

        fs::write(&file_path, content)
            .with_context(|| format!("Failed to write file: {}", file_path.display()))?;

        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.project_dir
    }

    pub fn command(&self) -> Command {
        let mut cmd = Command::new(get_cargo_bin(BIN_NAME));
        cmd.current_dir(&self.project_dir);
        cmd.env_clear();
        cmd.env("NO_COLOR", "1"); // Disable colors for consistent test output
        cmd
    }

    pub fn read_file(&self, path: &str) -> Result<String> {
        let file_path = self.project_dir.join(path);
        fs::read_to_string(&file_path)
            .with_context(|| format!("Failed to read file: {}", file_path.display()))
    }

    /// The single run directory under `outputs/`.
    pub fn run_dir(&self) -> Result<PathBuf> {
        let outputs = self.project_dir.join("outputs");
        let dirs: Vec<PathBuf> = fs::read_dir(&outputs)
            .with_context(|| format!("Failed to list {}", outputs.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<_>>()?;
        if dirs.len() != 1 {
            bail!("expected one run directory, found {:?}", dirs);
        }
        Ok(dirs[0].clone())
    }
}
