//! Prompt rewriting and the better/worse judge.

use tracing::{info, warn};

use crate::decode::{self, Decoded, Rejection, RewriteReply};
use crate::error::Result;
use crate::oracle::SharedOracle;
use crate::types::{StepEvaluation, TestCase};

const REWRITE_SYSTEM_PROMPT: &str = "\
You are an expert prompt engineer. Your task is to optimize a prompt based on test cases.

The prompt is used in a conversational AI system where:
1. The user provides some input
2. The AI responds based on the prompt
3. The conversation continues until all required information is collected

Your goal is to improve the prompt so that:
1. The AI correctly understands the user's intent
2. The AI asks for any missing information in a natural, conversational way
3. The AI provides the expected output format when all information is collected

Analyze the test cases to identify patterns and issues with the current prompt.
Then, provide an improved version of the prompt that addresses these issues.";

const REWRITE_DIRECTIVE: &str = "\
Please optimize the prompt to better handle these test cases. The prompt should guide the assistant to:
1. Identify missing information
2. Ask for missing information in a conversational way
3. Confirm all details before finalizing
4. Output a JSON object with all parameters when confirmed

Also provide an evaluation of the current prompt with:
1. Pass rate (percentage of test cases handled correctly)
2. List of improvements made in this iteration
3. List of remaining issues to address

Format your response as:

EVALUATION:
{
  \"passRate\": 70,
  \"improvements\": [\"Improved handling of partial information\", \"Better confirmation step\"],
  \"issues\": [\"Doesn't handle ambiguous inputs well\"]
}

OPTIMIZED_PROMPT:
Your optimized prompt here...";

const JUDGE_SYSTEM_PROMPT: &str = "\
You are an impartial judge evaluating prompt quality. Compare the original and
optimized prompts based on how well they would handle the provided test cases.

Consider clarity, specificity, robustness, and effectiveness.";

/// An improved prompt with the oracle's self-reported evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub optimized_prompt: String,
    pub evaluation: StepEvaluation,
}

/// Rewrites candidate prompts and judges rewrites.
#[derive(Clone)]
pub struct PromptRewriter {
    oracle: SharedOracle,
}

impl PromptRewriter {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }

    /// Ask the oracle for an improved prompt.
    ///
    /// Protocol deviations fall back to a zeroed evaluation; only an oracle
    /// error is returned as `Err`.
    pub async fn optimize(
        &self,
        global_prompt: &str,
        candidate_prompt: &str,
        test_cases: &[TestCase],
        iteration: usize,
    ) -> Result<Rewrite> {
        info!("Optimizing prompt (iteration {})...", iteration);

        let user_prompt = format!(
            "Global Context: {}\n\nOriginal Prompt:\n{}\n\nTest Cases:\n{}\n\n{}",
            global_prompt,
            candidate_prompt,
            serde_json::to_string_pretty(test_cases)?,
            REWRITE_DIRECTIVE
        );

        let reply = self.oracle.complete(REWRITE_SYSTEM_PROMPT, &user_prompt).await?;
        Ok(interpret(reply, candidate_prompt))
    }

    /// Ask the oracle whether `optimized` beats `original`.
    ///
    /// True only for a reply of exactly "yes" (trimmed, any case).
    pub async fn judge(
        &self,
        global_prompt: &str,
        original: &str,
        optimized: &str,
        test_cases: &[TestCase],
    ) -> Result<bool> {
        let user_prompt = format!(
            "Global Context: {}\n\nOriginal Prompt: {}\n\nOptimized Prompt: {}\n\nTest Cases:\n{}\n\n\
             Is the optimized prompt better than the original? Answer with ONLY \"yes\" or \"no\".",
            global_prompt,
            original,
            optimized,
            serde_json::to_string_pretty(test_cases)?
        );

        let reply = self.oracle.complete(JUDGE_SYSTEM_PROMPT, &user_prompt).await?;
        let better = decode::is_affirmative(&reply);
        info!(better, "Judged rewrite");
        Ok(better)
    }
}

/// Map a raw rewrite reply onto a [`Rewrite`].
///
/// A blank reply keeps `candidate_prompt` rather than adopting the empty
/// text; every other unusable reply becomes the prompt verbatim.
fn interpret(reply: String, candidate_prompt: &str) -> Rewrite {
    if reply.trim().is_empty() {
        warn!("Empty rewrite reply, keeping the current prompt");
        return Rewrite {
            optimized_prompt: candidate_prompt.to_string(),
            evaluation: StepEvaluation::default(),
        };
    }

    match decode::decode_rewrite(&reply) {
        Decoded::Parsed(RewriteReply { evaluation, prompt }) => Rewrite {
            optimized_prompt: prompt,
            evaluation,
        },
        Decoded::Repaired(RewriteReply { evaluation, prompt }) => {
            warn!("Rewrite reply has no evaluation object, using a zeroed evaluation");
            Rewrite {
                optimized_prompt: prompt,
                evaluation,
            }
        }
        Decoded::Rejected(reason) => {
            match reason {
                Rejection::Malformed(err) => warn!("Failed to parse evaluation: {}", err),
                other => warn!("Rewrite reply did not follow the format ({})", other),
            }
            Rewrite {
                optimized_prompt: reply,
                evaluation: StepEvaluation::default(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::oracle::ScriptedOracle;

    const REPLY: &str = "EVALUATION:\n{\"passRate\": 80, \"improvements\": [\"Confirms details\"], \"issues\": [\"Ambiguous tickers\"]}\n\
                         OPTIMIZED_PROMPT:\nAsk for symbol, side and quantity, then confirm.";

    #[tokio::test]
    async fn test_optimize_parses_protocol() {
        let oracle = Arc::new(ScriptedOracle::new().reply(REPLY));
        let rewriter = PromptRewriter::new(oracle.clone());
        let cases = vec![TestCase {
            input: "buy AAPL".into(),
            ..TestCase::default()
        }];

        let rewrite = rewriter.optimize("global", "extract orders", &cases, 1).await.unwrap();
        assert_eq!(rewrite.optimized_prompt, "Ask for symbol, side and quantity, then confirm.");
        assert_eq!(rewrite.evaluation.pass_rate, 80.0);
        assert_eq!(rewrite.evaluation.issues, vec!["Ambiguous tickers"]);

        let call = &oracle.calls()[0];
        assert!(call.system_prompt.contains("expert prompt engineer"));
        assert!(call.user_prompt.contains("Original Prompt:\nextract orders"));
        assert!(call.user_prompt.contains("\"input\": \"buy AAPL\""));
    }

    #[tokio::test]
    async fn test_optimize_missing_markers_uses_raw_reply() {
        let oracle = Arc::new(ScriptedOracle::new().reply("Just ask for the quantity."));
        let rewriter = PromptRewriter::new(oracle);

        let rewrite = rewriter.optimize("g", "p", &[], 1).await.unwrap();
        assert_eq!(rewrite.optimized_prompt, "Just ask for the quantity.");
        assert_eq!(rewrite.evaluation, StepEvaluation::default());
    }

    #[tokio::test]
    async fn test_optimize_malformed_evaluation_uses_raw_reply() {
        let reply = "EVALUATION:\n{passRate: 80}\nOPTIMIZED_PROMPT:\nNew prompt";
        let oracle = Arc::new(ScriptedOracle::new().reply(reply));
        let rewriter = PromptRewriter::new(oracle);

        let rewrite = rewriter.optimize("g", "p", &[], 1).await.unwrap();
        assert_eq!(rewrite.optimized_prompt, reply);
        assert_eq!(rewrite.evaluation.pass_rate, 0.0);
    }

    #[tokio::test]
    async fn test_optimize_without_evaluation_block() {
        let oracle = Arc::new(ScriptedOracle::new().reply("EVALUATION:\nn/a\nOPTIMIZED_PROMPT:\nNew prompt"));
        let rewriter = PromptRewriter::new(oracle);

        let rewrite = rewriter.optimize("g", "p", &[], 1).await.unwrap();
        assert_eq!(rewrite.optimized_prompt, "New prompt");
        assert_eq!(rewrite.evaluation, StepEvaluation::default());
    }

    #[tokio::test]
    async fn test_optimize_empty_reply_keeps_candidate() {
        let oracle = Arc::new(ScriptedOracle::new().reply("  "));
        let rewriter = PromptRewriter::new(oracle);

        let rewrite = rewriter.optimize("g", "current prompt", &[], 2).await.unwrap();
        assert_eq!(rewrite.optimized_prompt, "current prompt");
    }

    #[tokio::test]
    async fn test_optimize_propagates_oracle_error() {
        let oracle = Arc::new(ScriptedOracle::new().fail("unauthorized"));
        let rewriter = PromptRewriter::new(oracle);

        assert!(rewriter.optimize("g", "p", &[], 1).await.is_err());
    }

    #[tokio::test]
    async fn test_judge_casing() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply("YES")
                .reply(" yes\n")
                .reply("no")
                .reply("Yes, definitely"),
        );
        let rewriter = PromptRewriter::new(oracle.clone());

        assert!(rewriter.judge("g", "a", "b", &[]).await.unwrap());
        assert!(rewriter.judge("g", "a", "b", &[]).await.unwrap());
        assert!(!rewriter.judge("g", "a", "b", &[]).await.unwrap());
        assert!(!rewriter.judge("g", "a", "b", &[]).await.unwrap());

        assert!(oracle.calls()[0].user_prompt.contains("Optimized Prompt: b"));
    }

    #[tokio::test]
    async fn test_judge_propagates_oracle_error() {
        let oracle = Arc::new(ScriptedOracle::new().fail("boom"));
        let rewriter = PromptRewriter::new(oracle);
        assert!(rewriter.judge("g", "a", "b", &[]).await.is_err());
    }
}
