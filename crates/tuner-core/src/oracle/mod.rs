//! Completion oracle.
//!
//! The oracle is the external text-completion service, invoked as a
//! stateless `(system prompt, user prompt) -> text` function. Every
//! component of the optimization loop talks to it through
//! [`CompletionOracle`], so tests can substitute a [`ScriptedOracle`].

#[cfg(feature = "client")]
mod http;
mod scripted;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

#[cfg(feature = "client")]
pub use http::{HttpOracle, OracleConfig};
pub use scripted::{OracleCall, ScriptedOracle};

/// Trait for text-completion backends.
///
/// Implementations that cannot reach their backend should prefer returning
/// an empty completion over an error; callers treat an empty reply as
/// "no usable output" and fall back accordingly. An `Err` is reserved for
/// failures the caller must see.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Produce a single completion for the prompt pair.
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Whether the backend has the credentials it needs.
    fn is_configured(&self) -> bool {
        true
    }
}

/// Shared handle to an oracle.
pub type SharedOracle = Arc<dyn CompletionOracle>;

