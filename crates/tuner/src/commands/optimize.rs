//! Optimize command: run the loop over an input directory.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;
use tuner_core::artifacts::write_result_files;
use tuner_core::{
    FileStepSink, HistoryStore, LoopOptions, MemoryHistoryStore, OptimizationResult,
    OptimizeRequest, Optimizer, SharedOracle, TestCaseOptions,
};

use super::{build_oracle, preview, read_optional, read_required, read_test_cases};
use crate::cli::OptimizeArgs;
use crate::config::Config;
use crate::error::TunerError;

pub const GLOBAL_PROMPT_FILE: &str = "global-prompt.txt";
pub const PROMPT_FILE: &str = "prompt-to-optimize.txt";
pub const TEST_CASE_PROMPT_FILE: &str = "test-case-prompt.txt";
pub const EXAMPLE_TEST_CASES_FILE: &str = "example-test-cases.json";
/// Session history written next to the result files
pub const HISTORY_FILE: &str = "session-history.json";
/// Full optimization result
pub const RESULT_FILE: &str = "optimization-result.json";

pub async fn execute(args: OptimizeArgs, config: &Config) -> Result<()> {
    let input_dir = args.input_dir.clone().unwrap_or_else(|| config.paths.input_dir.clone());
    let output_dir = args.output_dir.clone().unwrap_or_else(|| config.paths.output_dir.clone());
    let options = loop_options(&args, config);

    let request = read_request(&input_dir)?;
    info!("Loaded prompts from {}", input_dir.display());

    println!("{}", "Prompt Optimization".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Input:      {}", input_dir.display());
    println!("  Output:     {}", output_dir.display());
    println!("  Iterations: {}", options.max_iterations);
    println!();

    let result = run(build_oracle()?, &request, &options, &output_dir).await?;
    print_summary(&result, &output_dir);
    Ok(())
}

fn loop_options(args: &OptimizeArgs, config: &Config) -> LoopOptions {
    let options = if args.single {
        LoopOptions::single()
    } else {
        LoopOptions::bounded(
            args.max_iterations
                .unwrap_or(config.optimization.max_iterations),
        )
    };
    options.with_cross_check(args.cross_check || config.optimization.cross_check)
}

/// Build the request from the files in `input_dir`
pub(crate) fn read_request(input_dir: &Path) -> Result<OptimizeRequest, TunerError> {
    let global_prompt = read_required(&input_dir.join(GLOBAL_PROMPT_FILE))?;
    let prompt = read_required(&input_dir.join(PROMPT_FILE))?;

    let test_case_prompt = read_optional(&input_dir.join(TEST_CASE_PROMPT_FILE))?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let examples_path = input_dir.join(EXAMPLE_TEST_CASES_FILE);
    let example_test_cases = if examples_path.exists() {
        Some(read_test_cases(&examples_path)?)
    } else {
        None
    };

    let request = OptimizeRequest::new(global_prompt.trim(), prompt.trim());
    if test_case_prompt.is_none() && example_test_cases.is_none() {
        return Ok(request);
    }
    Ok(request.with_test_case_options(TestCaseOptions {
        example_test_cases,
        test_case_prompt,
    }))
}

/// Run the loop and write every output file
pub(crate) async fn run(
    oracle: SharedOracle,
    request: &OptimizeRequest,
    options: &LoopOptions,
    output_dir: &Path,
) -> Result<OptimizationResult> {
    let history = Arc::new(MemoryHistoryStore::new());
    let optimizer = Optimizer::new(oracle, history.clone())
        .with_step_sink(Arc::new(FileStepSink::new(output_dir)));

    let outcome = optimizer.optimize(request, options).await;

    // The session history is saved even when the run fails
    for id in history.list_ids()? {
        if let Some(session) = history.get(&id)? {
            write_json(&output_dir.join(HISTORY_FILE), &session)?;
        }
    }

    let result = outcome?;
    write_result_files(output_dir, &result)?;
    write_json(&output_dir.join(RESULT_FILE), &result)?;
    Ok(result)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn print_summary(result: &OptimizationResult, output_dir: &Path) {
    println!("{}", "Result".cyan().bold());
    println!("{}", "─".repeat(50));

    let improved = result.optimized_prompt != result.original_prompt;
    let marker = if improved { "✓".green() } else { "○".yellow() };
    println!("  {} {}", marker, result.convergence_reason);
    println!("  Rounds:     {}", result.iterations);
    println!("  Test cases: {}", result.test_cases.len());

    for step in &result.optimization_steps {
        println!(
            "    #{} self-reported pass rate {:.0}%  {}",
            step.iteration,
            step.evaluation.pass_rate,
            preview(&step.prompt, 48).dimmed()
        );
    }

    println!();
    println!("  Optimized prompt written to {}", output_dir.display().to_string().bold());
}
