//! Application state.

use std::sync::Arc;
use std::time::Instant;

use tuner_core::{
    ConversationService, FileStepSink, LoopOptions, Optimizer, ParameterExtractor,
    SharedHistoryStore, SharedOracle,
};

use crate::config::Config;

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: Arc<Config>,
    /// Completion oracle shared by every service
    pub oracle: SharedOracle,
    /// Optimization loop and session history
    pub optimizer: Arc<Optimizer>,
    /// Open conversations
    pub conversations: Arc<ConversationService>,
    /// One-shot parameter extraction
    pub extractor: ParameterExtractor,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config, oracle: SharedOracle, history: SharedHistoryStore) -> Arc<Self> {
        let steps = FileStepSink::new(&config.output_dir);
        let optimizer = Optimizer::new(oracle.clone(), history).with_step_sink(Arc::new(steps));

        Arc::new(Self {
            config: Arc::new(config),
            optimizer: Arc::new(optimizer),
            conversations: Arc::new(ConversationService::new(oracle.clone())),
            extractor: ParameterExtractor::new(oracle.clone()),
            oracle,
            start_time: Instant::now(),
        })
    }

    /// Options for the bounded loop.
    pub fn loop_options(&self) -> LoopOptions {
        LoopOptions::bounded(self.config.max_iterations).with_cross_check(self.config.cross_check)
    }

    /// Options for the single measured pass.
    pub fn single_pass_options(&self) -> LoopOptions {
        LoopOptions::single().with_cross_check(self.config.cross_check)
    }
}
