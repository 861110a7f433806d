//! Evaluate command: score a prompt against a test case file.

use anyhow::Result;
use colored::Colorize;
use tuner_core::evaluator::PASS_THRESHOLD;
use tuner_core::{EvaluationReport, PromptEvaluator, TestCase};

use super::{build_oracle, preview, read_optional, read_required, read_test_cases};
use super::optimize::GLOBAL_PROMPT_FILE;
use crate::cli::EvaluateArgs;
use crate::config::Config;

pub async fn execute(args: EvaluateArgs, config: &Config) -> Result<()> {
    let prompt = read_required(&args.prompt)?;
    let test_cases = read_test_cases(&args.test_cases)?;

    // Fall back to the configured input dir's global prompt
    let global_prompt = match &args.global_prompt {
        Some(path) => read_required(path)?,
        None => read_optional(&config.paths.input_dir.join(GLOBAL_PROMPT_FILE))?.unwrap_or_default(),
    };

    let evaluator = PromptEvaluator::new(build_oracle()?);
    let report = evaluator
        .evaluate(global_prompt.trim(), prompt.trim(), &test_cases)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, &test_cases);
    }
    Ok(())
}

fn print_report(report: &EvaluationReport, test_cases: &[TestCase]) {
    println!("{}", "Evaluation".cyan().bold());
    println!("{}", "─".repeat(50));

    for (i, case) in test_cases.iter().enumerate() {
        let Some(result) = report.results.get(&format!("test_{}", i + 1)) else {
            continue;
        };
        let marker = if result.passed { "✓".green() } else { "✗".red() };
        println!(
            "  {} test_{}  similarity {:.2}  {}",
            marker,
            i + 1,
            result.similarity,
            preview(&case.input, 40).dimmed()
        );
        if !result.passed {
            println!("      expected: {}", preview(&case.expected_output, 60));
            println!("      actual:   {}", preview(&result.actual_output, 60));
        }
    }

    println!();
    println!(
        "  Passed {}/{} ({:.0}%, threshold {:.2})",
        report.passed_count(),
        report.results.len(),
        report.pass_rate * 100.0,
        PASS_THRESHOLD
    );
}
