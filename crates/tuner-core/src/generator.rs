//! Synthetic test case generation.
//!
//! Asks the oracle for a batch of multi-turn conversations and decodes the
//! reply. Generation never fails: an oracle error or an unusable reply
//! falls back to the caller's example test cases.

use tracing::{error, info, warn};

use crate::decode::{self, Decoded};
use crate::oracle::SharedOracle;
use crate::types::{TestCase, TestCaseOptions};

const BATCH_INSTRUCTIONS: &str = "\
Create 5 diverse test cases that simulate real user conversations. Each test case should:
1. Start with a user message that contains partial information
2. Include expected assistant responses that ask for missing information
3. Include follow-up user messages that provide the missing information
4. End with a final JSON output containing all parameters

Format each test case as a conversation with multiple turns, ending with the JSON output.

IMPORTANT: Return your response as a valid JSON array of test cases. Make sure the JSON is properly formatted and can be parsed.";

/// Generates conversational test cases for a candidate prompt.
#[derive(Clone)]
pub struct TestCaseGenerator {
    oracle: SharedOracle,
}

impl TestCaseGenerator {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }

    /// Generate a batch of test cases.
    ///
    /// Returns the decoded batch, or the examples from `options` (possibly
    /// empty) when no usable batch could be obtained.
    pub async fn generate(
        &self,
        global_prompt: &str,
        candidate_prompt: &str,
        options: Option<&TestCaseOptions>,
    ) -> Vec<TestCase> {
        info!("Generating test cases...");

        let default_options = TestCaseOptions::default();
        let options = options.unwrap_or(&default_options);

        let system_prompt = system_prompt(options);
        let user_prompt = user_prompt(global_prompt, candidate_prompt);

        let reply = match self.oracle.complete(&system_prompt, &user_prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                error!("Error generating test cases: {}", e);
                return options.examples().to_vec();
            }
        };

        match decode::decode_test_cases(&reply) {
            Decoded::Parsed(cases) => {
                info!("Generated {} test cases", cases.len());
                cases
            }
            Decoded::Repaired(cases) => {
                info!("Generated {} test cases after repairing JSON", cases.len());
                cases
            }
            Decoded::Rejected(reason) => {
                warn!(
                    "Could not decode test cases ({}), using {} example test cases",
                    reason,
                    options.examples().len()
                );
                options.examples().to_vec()
            }
        }
    }
}

fn system_prompt(options: &TestCaseOptions) -> String {
    let mut prompt = String::new();

    let instruction = options.instruction().trim();
    if !instruction.is_empty() {
        prompt.push_str(instruction);
        prompt.push_str("\n\n");
    }
    prompt.push_str(BATCH_INSTRUCTIONS);

    if let Some(example) = options.examples().first() {
        let rendered = serde_json::to_string_pretty(example).unwrap_or_default();
        prompt.push_str(&format!("\n\nExample test case:\n[{}]", rendered));
    }

    prompt
}

fn user_prompt(global_prompt: &str, candidate_prompt: &str) -> String {
    format!(
        "Global Context: {}\n\n\
         Create test cases for this prompt:\n\n\
         {}\n\n\
         Return ONLY a valid JSON array of test cases. Do not include any explanations or additional text.",
        global_prompt, candidate_prompt
    )
}
