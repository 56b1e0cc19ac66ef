use std::process::ExitCode;

/// Exit status for CLI commands.
///
/// - `Success` (0): Command completed, with or without per-record errors
/// - `Failure` (1): Command completed but its output could not be written
/// - `Error` (2): Command failed before analysis (config error, lexicon error, etc.)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExitStatus {
    /// Command completed.
    Success,
    /// Command completed but its output could not be written.
    Failure,
    /// Command failed due to a configuration or lexicon error.
    Error,
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        match status {
            ExitStatus::Success => ExitCode::from(0),
            ExitStatus::Failure => ExitCode::from(1),
            ExitStatus::Error => ExitCode::from(2),
        }
    }
}
