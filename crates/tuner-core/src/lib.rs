//! tuner-core - Core library for tuner
//!
//! This crate provides the prompt optimization loop shared between the
//! tuner CLI and tuner-server:
//!
//! - **similarity**: Normalized edit-distance scoring
//! - **oracle**: Completion oracle trait and the HTTP chat-completions client
//! - **decode**: Parsers for semi-structured oracle replies
//! - **generator**: Synthetic conversational test case generation
//! - **evaluator**: Pass-rate evaluation of a prompt against test cases
//! - **rewriter**: Prompt rewriting and the better/worse judge
//! - **optimizer**: The GENERATE → REWRITE → JUDGE loop
//! - **store**: Session history stores (in-memory, SQLite)
//! - **artifacts**: Per-step artifact persistence
//! - **conversation**: Multi-turn conversations against a prompt
//! - **extractor**: One-shot parameter extraction

pub mod artifacts;
pub mod config;
pub mod conversation;
pub mod decode;
pub mod error;
pub mod evaluator;
pub mod extractor;
pub mod generator;
pub mod oracle;
pub mod optimizer;
pub mod rewriter;
pub mod similarity;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use artifacts::{FileStepSink, NullStepSink, StepSink};
pub use config::Settings;
pub use conversation::{Conversation, ConversationReply, ConversationService};
pub use error::{Error, Result};
pub use evaluator::PromptEvaluator;
pub use extractor::ParameterExtractor;
pub use optimizer::{LoopOptions, Optimizer};
pub use oracle::{CompletionOracle, SharedOracle};
pub use store::{HistoryStore, MemoryHistoryStore, SharedHistoryStore};
pub use types::*;
