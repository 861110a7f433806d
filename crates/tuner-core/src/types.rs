//! Core types shared by the optimization loop, stores and API surfaces.
//!
//! All wire types serialize with camelCase field names.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// Test Cases
// ─────────────────────────────────────────────────────────────────────────────

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(deserialize_with = "lenient_string")]
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// A synthetic multi-turn test case.
///
/// Decoding is lenient per field: oracle batches often omit fields or use
/// the wrong shape. Missing and `null` fields take their empty value,
/// non-string text fields are kept as compact JSON, and unusable
/// conversation turns are dropped, so a case is never rejected for its
/// contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestCase {
    #[serde(deserialize_with = "lenient_string")]
    pub input: String,
    #[serde(deserialize_with = "lenient_string")]
    pub expected_output: String,
    #[serde(deserialize_with = "lenient_turns")]
    pub conversation: Vec<Message>,
    #[serde(deserialize_with = "lenient_object")]
    pub final_output: Map<String, Value>,
}

impl TestCase {
    /// A case carrying only its opening user message.
    pub fn from_input(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Self::default()
        }
    }
}

/// Text field: `null` is empty, other non-strings become compact JSON.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Conversation turns, skipping any that do not decode.
fn lenient_turns<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Message>, D::Error> {
    let Value::Array(turns) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(turns
        .into_iter()
        .filter_map(|turn| match serde_json::from_value(turn) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Dropping conversation turn: {}", e);
                None
            }
        })
        .collect())
}

/// Parameter object: anything but an object is empty.
fn lenient_object<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Map<String, Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => map,
        _ => Map::new(),
    })
}

/// Options controlling test case generation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example_test_cases: Option<Vec<TestCase>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_prompt: Option<String>,
}

impl TestCaseOptions {
    /// Examples supplied by the caller, or an empty slice.
    pub fn examples(&self) -> &[TestCase] {
        self.example_test_cases.as_deref().unwrap_or(&[])
    }

    /// Auxiliary instruction fragment, or an empty string.
    pub fn instruction(&self) -> &str {
        self.test_case_prompt.as_deref().unwrap_or("")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Optimization
// ─────────────────────────────────────────────────────────────────────────────

/// Request to optimize a prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeRequest {
    pub global_prompt: String,
    pub prompt_to_optimize: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_case_options: Option<TestCaseOptions>,
}

impl OptimizeRequest {
    pub fn new(global_prompt: impl Into<String>, prompt_to_optimize: impl Into<String>) -> Self {
        Self {
            global_prompt: global_prompt.into(),
            prompt_to_optimize: prompt_to_optimize.into(),
            test_case_options: None,
        }
    }

    pub fn with_test_case_options(mut self, options: TestCaseOptions) -> Self {
        self.test_case_options = Some(options);
        self
    }

    /// Reject requests whose required prompts are blank.
    pub fn validate(&self) -> crate::Result<()> {
        if self.global_prompt.trim().is_empty() {
            return Err(crate::Error::invalid_request("globalPrompt must not be empty"));
        }
        if self.prompt_to_optimize.trim().is_empty() {
            return Err(crate::Error::invalid_request(
                "promptToOptimize must not be empty",
            ));
        }
        Ok(())
    }
}

/// Evaluation self-reported by the oracle while rewriting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvaluation {
    /// Percentage of test cases handled correctly (0-100)
    #[serde(default)]
    pub pass_rate: f64,
    #[serde(default)]
    pub improvements: Vec<String>,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// One entry in the append-only step log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationStep {
    pub iteration: usize,
    pub prompt: String,
    pub evaluation: StepEvaluation,
    pub timestamp: String,
}

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConvergenceReason {
    #[serde(rename = "No further improvement")]
    NoFurtherImprovement,
    #[serde(rename = "Reached convergence threshold")]
    ReachedThreshold,
    #[serde(rename = "Maximum iterations reached")]
    MaxIterations,
}

impl ConvergenceReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoFurtherImprovement => "No further improvement",
            Self::ReachedThreshold => "Reached convergence threshold",
            Self::MaxIterations => "Maximum iterations reached",
        }
    }
}

impl fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal output of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub original_prompt: String,
    pub optimized_prompt: String,
    pub iterations: usize,
    pub test_cases: Vec<TestCase>,
    pub convergence_reason: ConvergenceReason,
    pub optimization_steps: Vec<OptimizationStep>,
}

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

/// A rewrite recorded against a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptIteration {
    pub iteration_number: usize,
    pub prompt: String,
    pub test_cases: Vec<TestCase>,
    pub timestamp: DateTime<Utc>,
}

/// Full trace of one optimization session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptHistory {
    pub id: String,
    pub global_prompt: String,
    pub original_prompt: String,
    pub iterations: Vec<PromptIteration>,
    pub final_prompt: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

impl PromptHistory {
    /// Open a history for a new session.
    pub fn start(id: impl Into<String>, global_prompt: &str, original_prompt: &str) -> Self {
        Self {
            id: id.into(),
            global_prompt: global_prompt.to_string(),
            original_prompt: original_prompt.to_string(),
            iterations: Vec::new(),
            final_prompt: original_prompt.to_string(),
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Set the final prompt and completion time.
    pub fn finalize(&mut self, final_prompt: &str) {
        self.final_prompt = final_prompt.to_string();
        self.completed_at = Some(Utc::now());
    }

    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Evaluation
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of running one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationResult {
    pub passed: bool,
    pub actual_output: String,
    pub similarity: f64,
}

/// Outcome of running a prompt against a test case set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationReport {
    /// Keyed `test_<n>`, 1-based in input order
    pub results: BTreeMap<String, EvaluationResult>,
    /// Fraction of passing cases (0-1)
    pub pass_rate: f64,
}

impl EvaluationReport {
    pub fn passed_count(&self) -> usize {
        self.results.values().filter(|r| r.passed).count()
    }
}
