//! Step artifacts and result files.
//!
//! Each [`OptimizationStep`] can be persisted as a pretty-printed JSON file
//! named `step-<iteration>-<unix_millis>.json`. Artifact writing is best
//! effort: failures are logged and never interrupt the loop.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, error, info};

use crate::error::Result;
use crate::types::{OptimizationResult, OptimizationStep};

/// Subdirectory of the output dir holding step artifacts
pub const STEPS_DIR: &str = "optimization-steps";
/// Accumulated test cases of a run
pub const TEST_CASES_FILE: &str = "test-cases.json";
/// Final prompt of a run
pub const OPTIMIZED_PROMPT_FILE: &str = "optimized-prompt.txt";

/// Receives every step the loop records.
#[async_trait]
pub trait StepSink: Send + Sync {
    async fn record(&self, step: &OptimizationStep);
}

/// Discards steps.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullStepSink;

#[async_trait]
impl StepSink for NullStepSink {
    async fn record(&self, _step: &OptimizationStep) {}
}

/// Writes each step to `<output>/optimization-steps/`.
#[derive(Debug, Clone)]
pub struct FileStepSink {
    dir: PathBuf,
}

impl FileStepSink {
    /// Sink rooted at `output_dir`.
    pub fn new(output_dir: impl AsRef<Path>) -> Self {
        Self {
            dir: output_dir.as_ref().join(STEPS_DIR),
        }
    }

    /// Directory the step files are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn write(&self, step: &OptimizationStep) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let filename = format!(
            "step-{}-{}.json",
            step.iteration,
            Utc::now().timestamp_millis()
        );
        let path = self.dir.join(filename);
        tokio::fs::write(&path, serde_json::to_string_pretty(step)?).await?;
        Ok(path)
    }
}

#[async_trait]
impl StepSink for FileStepSink {
    async fn record(&self, step: &OptimizationStep) {
        match self.write(step).await {
            Ok(path) => debug!("Saved optimization step to {}", path.display()),
            Err(e) => error!("Failed to save optimization step {}: {}", step.iteration, e),
        }
    }
}

/// Write `test-cases.json` and `optimized-prompt.txt` for a finished run.
pub fn write_result_files(output_dir: &Path, result: &OptimizationResult) -> Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let test_cases_path = output_dir.join(TEST_CASES_FILE);
    std::fs::write(
        &test_cases_path,
        serde_json::to_string_pretty(&result.test_cases)?,
    )?;
    info!("Saved test cases to {}", test_cases_path.display());

    let prompt_path = output_dir.join(OPTIMIZED_PROMPT_FILE);
    std::fs::write(&prompt_path, &result.optimized_prompt)?;
    info!("Saved optimized prompt to {}", prompt_path.display());

    Ok(())
}
