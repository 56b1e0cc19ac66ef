//! JSON rendering of the combined summary.

use crate::core::{aggregate::SessionSummary, error::WriteError};

use super::COMBINED_JSON;

pub fn render(summary: &SessionSummary) -> Result<String, WriteError> {
    let json = serde_json::to_string_pretty(summary).map_err(|e| WriteError::Encode {
        file: COMBINED_JSON,
        message: e.to_string(),
    })?;
    Ok(format!("{}\n", json))
}

/// Read back a `combined_summary.json`.
pub fn parse_summary(content: &str) -> Result<SessionSummary, serde_json::Error> {
    serde_json::from_str(content)
}
