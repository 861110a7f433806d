//! Scripted oracle for tests and offline runs.
//!
//! Replays a queue of canned replies (or failures) in order and records
//! every call it receives.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::CompletionOracle;
use crate::error::{Error, Result};

/// A recorded oracle invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleCall {
    pub system_prompt: String,
    pub user_prompt: String,
}

#[derive(Debug)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Oracle that returns scripted replies in FIFO order.
///
/// Once the script is exhausted every call returns the fallback reply
/// (empty by default).
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<OracleCall>>,
    fallback: String,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.push(Scripted::Reply(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, message: impl Into<String>) -> Self {
        self.push(Scripted::Fail(message.into()));
        self
    }

    /// Reply used after the script runs out.
    pub fn with_fallback(mut self, text: impl Into<String>) -> Self {
        self.fallback = text.into();
        self
    }

    /// Calls received so far, in order.
    pub fn calls(&self) -> Vec<OracleCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Replies still queued.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or_default()
    }

    fn push(&self, entry: Scripted) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(entry);
        }
    }
}

#[async_trait]
impl CompletionOracle for ScriptedOracle {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.calls
            .lock()
            .map_err(|_| Error::LockPoisoned)?
            .push(OracleCall {
                system_prompt: system_prompt.to_string(),
                user_prompt: user_prompt.to_string(),
            });

        let next = self.script.lock().map_err(|_| Error::LockPoisoned)?.pop_front();

        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(Error::oracle(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order() {
        let oracle = ScriptedOracle::new().reply("first").fail("boom").reply("third");

        assert_eq!(oracle.complete("s", "u1").await.unwrap(), "first");
        assert!(oracle.complete("s", "u2").await.is_err());
        assert_eq!(oracle.complete("s", "u3").await.unwrap(), "third");
        assert_eq!(oracle.complete("s", "u4").await.unwrap(), "");

        let calls = oracle.calls();
        assert_eq!(calls.len(), 4);
        assert_eq!(calls[1].user_prompt, "u2");
        assert_eq!(oracle.remaining(), 0);
    }

    #[tokio::test]
    async fn test_fallback_reply() {
        let oracle = ScriptedOracle::new().with_fallback("no");
        assert_eq!(oracle.complete("s", "u").await.unwrap(), "no");
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn test_failure_does_not_consume_fallback() {
        let oracle = ScriptedOracle::new().fail("down").with_fallback("later");

        let first = tokio_test::block_on(oracle.complete("s", "u"));
        assert!(matches!(first, Err(Error::Oracle(_))));

        let second = tokio_test::block_on(oracle.complete("s", "u")).unwrap();
        assert_eq!(second, "later");
    }
}
