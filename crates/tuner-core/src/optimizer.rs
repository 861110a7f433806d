//! Optimization Loop
//!
//! Implements the GENERATE → REWRITE → JUDGE loop over a candidate prompt.
//!
//! Each round generates a fresh batch of test cases, asks the oracle for a
//! rewrite of the current candidate, and asks it again whether the rewrite
//! is better. A rejected rewrite stops the loop with the current candidate;
//! an accepted one replaces it wholesale.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::artifacts::{NullStepSink, StepSink};
use crate::error::Result;
use crate::evaluator::PromptEvaluator;
use crate::generator::TestCaseGenerator;
use crate::oracle::SharedOracle;
use crate::rewriter::{PromptRewriter, Rewrite};
use crate::store::SharedHistoryStore;
use crate::types::{
    ConvergenceReason, OptimizationResult, OptimizationStep, OptimizeRequest, PromptHistory,
    PromptIteration, TestCase,
};

/// Round limit of the bounded loop
pub const MAX_ITERATIONS: usize = 5;
/// Self-reported pass rate (as a fraction) at which the loop stops
pub const CONVERGENCE_THRESHOLD: f64 = 0.9;

/// Loop parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOptions {
    /// Maximum number of rounds; `1` is a single measured pass
    pub max_iterations: usize,
    /// Run the evaluator on each rewrite and log the measured pass rate.
    /// Never affects decisions.
    pub cross_check: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            max_iterations: MAX_ITERATIONS,
            cross_check: false,
        }
    }
}

impl LoopOptions {
    /// One generate → rewrite → judge pass.
    pub fn single() -> Self {
        Self::bounded(1)
    }

    /// Up to `max_iterations` rounds (at least one).
    pub fn bounded(max_iterations: usize) -> Self {
        Self {
            max_iterations: max_iterations.max(1),
            ..Self::default()
        }
    }

    pub fn with_cross_check(mut self, enabled: bool) -> Self {
        self.cross_check = enabled;
        self
    }
}

/// Mutable state of one session.
struct Session {
    history: PromptHistory,
    current_prompt: String,
    test_cases: Vec<TestCase>,
    steps: Vec<OptimizationStep>,
}

/// Drives optimization sessions.
pub struct Optimizer {
    generator: TestCaseGenerator,
    rewriter: PromptRewriter,
    evaluator: PromptEvaluator,
    history: SharedHistoryStore,
    steps: Arc<dyn StepSink>,
}

impl Optimizer {
    /// Create an optimizer that records sessions in `history`.
    ///
    /// Step artifacts are discarded unless a sink is set with
    /// [`Optimizer::with_step_sink`].
    pub fn new(oracle: SharedOracle, history: SharedHistoryStore) -> Self {
        Self {
            generator: TestCaseGenerator::new(oracle.clone()),
            rewriter: PromptRewriter::new(oracle.clone()),
            evaluator: PromptEvaluator::new(oracle),
            history,
            steps: Arc::new(NullStepSink),
        }
    }

    pub fn with_step_sink(mut self, sink: Arc<dyn StepSink>) -> Self {
        self.steps = sink;
        self
    }

    /// Store the sessions are recorded in.
    pub fn history(&self) -> &SharedHistoryStore {
        &self.history
    }

    /// Evaluator sharing this optimizer's oracle.
    pub fn evaluator(&self) -> &PromptEvaluator {
        &self.evaluator
    }

    /// Run one optimization session.
    ///
    /// The session history is saved whether the run succeeds or fails; on
    /// failure it is finalized with the last accepted prompt and the error
    /// is returned without a partial result.
    pub async fn optimize(
        &self,
        request: &OptimizeRequest,
        options: &LoopOptions,
    ) -> Result<OptimizationResult> {
        request.validate()?;

        let session_id = Uuid::new_v4().to_string();
        info!("Starting optimization session {}", session_id);

        let mut session = Session {
            history: PromptHistory::start(
                &session_id,
                &request.global_prompt,
                &request.prompt_to_optimize,
            ),
            current_prompt: request.prompt_to_optimize.clone(),
            test_cases: Vec::new(),
            steps: Vec::new(),
        };

        let outcome = self.run(request, options, &mut session).await;

        session.history.finalize(&session.current_prompt);
        let saved = self.history.save(&session.history);

        let reason = match outcome {
            Ok(reason) => reason,
            Err(e) => {
                error!("Error during optimization session {}: {}", session_id, e);
                if let Err(save_err) = saved {
                    error!("Failed to save history for session {}: {}", session_id, save_err);
                }
                return Err(e);
            }
        };
        saved?;

        info!(
            rounds = session.steps.len(),
            "Optimization session {} completed: {}", session_id, reason
        );

        Ok(OptimizationResult {
            original_prompt: request.prompt_to_optimize.clone(),
            optimized_prompt: session.current_prompt,
            iterations: session.steps.len(),
            test_cases: session.test_cases,
            convergence_reason: reason,
            optimization_steps: session.steps,
        })
    }

    async fn run(
        &self,
        request: &OptimizeRequest,
        options: &LoopOptions,
        session: &mut Session,
    ) -> Result<ConvergenceReason> {
        let global_prompt = request.global_prompt.as_str();
        let max_iterations = options.max_iterations.max(1);

        for round in 1..=max_iterations {
            debug!(round, max_iterations, "GENERATING");
            let cases = self
                .generator
                .generate(
                    global_prompt,
                    &session.current_prompt,
                    request.test_case_options.as_ref(),
                )
                .await;
            info!("Round {}: {} test cases", round, cases.len());
            session.test_cases.extend(cases.iter().cloned());

            debug!(round, "REWRITING");
            let Rewrite {
                optimized_prompt,
                evaluation,
            } = self
                .rewriter
                .optimize(global_prompt, &session.current_prompt, &cases, round)
                .await?;

            let reported_pass_rate = evaluation.pass_rate;
            let step = OptimizationStep {
                iteration: round,
                prompt: optimized_prompt.clone(),
                evaluation,
                timestamp: Utc::now().to_rfc3339(),
            };
            self.steps.record(&step).await;
            session.steps.push(step);
            session.history.iterations.push(PromptIteration {
                iteration_number: round,
                prompt: optimized_prompt.clone(),
                test_cases: cases.clone(),
                timestamp: Utc::now(),
            });

            if options.cross_check {
                self.cross_check(global_prompt, &optimized_prompt, &cases, reported_pass_rate)
                    .await;
            }

            debug!(round, "JUDGING");
            let better = self
                .rewriter
                .judge(global_prompt, &session.current_prompt, &optimized_prompt, &cases)
                .await?;

            if !better {
                info!("Rewrite judged no better, keeping the current prompt");
                return Ok(ConvergenceReason::NoFurtherImprovement);
            }

            session.current_prompt = optimized_prompt;

            if reported_pass_rate >= CONVERGENCE_THRESHOLD * 100.0 {
                info!("Reached convergence threshold ({}%)", reported_pass_rate);
                return Ok(ConvergenceReason::ReachedThreshold);
            }
        }

        Ok(ConvergenceReason::MaxIterations)
    }

    async fn cross_check(
        &self,
        global_prompt: &str,
        prompt: &str,
        cases: &[TestCase],
        reported_pass_rate: f64,
    ) {
        match self.evaluator.evaluate(global_prompt, prompt, cases).await {
            Ok(report) => info!(
                reported = reported_pass_rate,
                measured = report.pass_rate * 100.0,
                "Cross-checked pass rate"
            ),
            Err(e) => warn!("Cross-check evaluation failed: {}", e),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
