//! Pass-rate evaluation of a prompt against a test case set.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::Result;
use crate::oracle::SharedOracle;
use crate::similarity::similarity;
use crate::types::{EvaluationReport, EvaluationResult, TestCase};

/// A reply passes when its similarity is strictly above this value.
pub const PASS_THRESHOLD: f64 = 0.7;

/// Runs a prompt against test cases and scores each reply.
#[derive(Clone)]
pub struct PromptEvaluator {
    oracle: SharedOracle,
}

impl PromptEvaluator {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }

    /// Evaluate `candidate_prompt` against each test case, in order.
    ///
    /// One oracle call per case; the first oracle error aborts the run.
    pub async fn evaluate(
        &self,
        global_prompt: &str,
        candidate_prompt: &str,
        test_cases: &[TestCase],
    ) -> Result<EvaluationReport> {
        let system_prompt = format!("{}\n\n{}", global_prompt, candidate_prompt);
        let total = test_cases.len();

        let mut results = BTreeMap::new();
        let mut passed_count = 0;

        for (i, case) in test_cases.iter().enumerate() {
            info!("Evaluating test case {}/{}", i + 1, total);

            let actual_output = self.oracle.complete(&system_prompt, &case.input).await?;
            let score = similarity(&actual_output, &case.expected_output);
            let passed = score > PASS_THRESHOLD;
            if passed {
                passed_count += 1;
            }

            debug!(similarity = score, passed, "Scored test case {}", i + 1);

            results.insert(
                format!("test_{}", i + 1),
                EvaluationResult {
                    passed,
                    actual_output,
                    similarity: score,
                },
            );
        }

        let pass_rate = if total > 0 {
            passed_count as f64 / total as f64
        } else {
            0.0
        };

        Ok(EvaluationReport { results, pass_rate })
    }
}
