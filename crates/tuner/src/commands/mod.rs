//! Command implementations.

pub mod evaluate;
pub mod history;
pub mod optimize;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::warn;
use tuner_core::oracle::HttpOracle;
use tuner_core::{Settings, SharedOracle, TestCase};

use crate::error::TunerError;

/// Build the HTTP completion oracle from `AI_*` settings
pub(crate) fn build_oracle() -> Result<SharedOracle> {
    let settings = Settings::load();
    let oracle = HttpOracle::from_settings(&settings).context("Failed to create completion client")?;
    if oracle.config().api_key.is_none() {
        warn!("AI_API_KEY is not set; every completion will be empty");
    }
    Ok(Arc::new(oracle))
}

/// Read a file that must exist
pub(crate) fn read_required(path: &Path) -> Result<String, TunerError> {
    if !path.exists() {
        return Err(TunerError::MissingInput(path.to_path_buf()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Read a file if it exists
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, TunerError> {
    if !path.exists() {
        return Ok(None);
    }
    Ok(Some(std::fs::read_to_string(path)?))
}

/// Read a JSON array of test cases
pub(crate) fn read_test_cases(path: &Path) -> Result<Vec<TestCase>, TunerError> {
    let content = read_required(path)?;
    serde_json::from_str(&content).map_err(|e| TunerError::invalid_input(path, e))
}

/// First line of `text`, cut to `max` characters
pub(crate) fn preview(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() > max {
        let cut: String = line.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", cut)
    } else {
        line.to_string()
    }
}
