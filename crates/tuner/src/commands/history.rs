//! History command: pretty-print a saved result or session history.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use serde_json::Value;
use tuner_core::{OptimizationResult, PromptHistory};

use super::{preview, read_required};
use crate::error::TunerError;

/// A document the history command knows how to display
#[derive(Debug)]
pub(crate) enum Document {
    Result(OptimizationResult),
    History(PromptHistory),
}

pub fn execute(file: &Path) -> Result<()> {
    let content = read_required(file)?;
    match parse_document(file, &content)? {
        Document::Result(result) => print_result(&result),
        Document::History(history) => print_history(&history),
    }
    Ok(())
}

/// Detect the document kind by its distinguishing fields
pub(crate) fn parse_document(file: &Path, content: &str) -> Result<Document, TunerError> {
    let value: Value =
        serde_json::from_str(content).map_err(|e| TunerError::invalid_input(file, e))?;

    if value.get("optimizationSteps").is_some() {
        let result = serde_json::from_value(value).map_err(|e| TunerError::invalid_input(file, e))?;
        return Ok(Document::Result(result));
    }
    if value.get("finalPrompt").is_some() && value.get("createdAt").is_some() {
        let history = serde_json::from_value(value).map_err(|e| TunerError::invalid_input(file, e))?;
        return Ok(Document::History(history));
    }

    Err(TunerError::UnknownDocument(file.display().to_string()))
}

fn print_result(result: &OptimizationResult) {
    println!("{}", "Optimization Result".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Outcome:    {}", result.convergence_reason);
    println!("  Rounds:     {}", result.iterations);
    println!("  Test cases: {}", result.test_cases.len());
    println!();

    for step in &result.optimization_steps {
        println!(
            "  {} round {}  pass rate {:.0}%  {}",
            "•".cyan(),
            step.iteration,
            step.evaluation.pass_rate,
            step.timestamp.dimmed()
        );
        for improvement in &step.evaluation.improvements {
            println!("      {} {}", "+".green(), improvement);
        }
        for issue in &step.evaluation.issues {
            println!("      {} {}", "-".red(), issue);
        }
    }

    println!();
    println!("{}", "Original prompt".bold());
    println!("{}", result.original_prompt);
    println!();
    println!("{}", "Optimized prompt".bold());
    println!("{}", result.optimized_prompt);
}

fn print_history(history: &PromptHistory) {
    println!("{}", "Session History".cyan().bold());
    println!("{}", "─".repeat(50));
    println!("  Session:   {}", history.id);
    println!("  Started:   {}", history.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    match history.completed_at {
        Some(at) => {
            let elapsed: chrono::TimeDelta = at - history.created_at;
            println!(
                "  Completed: {} ({}s)",
                at.format("%Y-%m-%d %H:%M:%S UTC"),
                elapsed.num_seconds()
            );
        }
        None => println!("  Completed: {}", "in progress".yellow()),
    }
    println!();

    for iteration in &history.iterations {
        println!(
            "  {} #{}  {} test cases  {}",
            "•".cyan(),
            iteration.iteration_number,
            iteration.test_cases.len(),
            preview(&iteration.prompt, 48).dimmed()
        );
    }
    if history.iterations.is_empty() {
        println!("  {} no rewrites recorded", "○".yellow());
    }

    println!();
    println!("{}", "Final prompt".bold());
    println!("{}", history.final_prompt);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_result() {
        let content = json!({
            "originalPrompt": "p",
            "optimizedPrompt": "better p",
            "iterations": 1,
            "testCases": [],
            "convergenceReason": "No further improvement",
            "optimizationSteps": []
        })
        .to_string();

        let doc = parse_document(Path::new("result.json"), &content).unwrap();
        assert!(matches!(doc, Document::Result(r) if r.optimized_prompt == "better p"));
    }

    #[test]
    fn test_parse_history() {
        let history = PromptHistory::start("session-1", "ctx", "p");
        let content = serde_json::to_string(&history).unwrap();

        let doc = parse_document(Path::new("history.json"), &content).unwrap();
        assert!(matches!(doc, Document::History(h) if h.id == "session-1"));
    }

    #[test]
    fn test_parse_unknown() {
        let err = parse_document(Path::new("x.json"), r#"{"hello": "world"}"#).unwrap_err();
        assert!(matches!(err, TunerError::UnknownDocument(_)));

        let err = parse_document(Path::new("x.json"), "not json").unwrap_err();
        assert!(matches!(err, TunerError::InvalidInput { .. }));
    }
}
