//! Multi-turn conversations against a prompt pair.
//!
//! Lets a caller talk to the prompt being optimized the way an end user
//! would. When the assistant answers with a bare JSON object, the object
//! is taken as the extracted parameters and the conversation is complete.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::decode::{self, Decoded, Rejection};
use crate::error::{Error, Result};
use crate::oracle::SharedOracle;
use crate::types::Message;

/// A conversation and its transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub messages: Vec<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
    pub is_complete: bool,
}

impl Conversation {
    fn new(id: String) -> Self {
        Self {
            id,
            messages: Vec::new(),
            parameters: None,
            is_complete: false,
        }
    }
}

/// The assistant's answer to one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationReply {
    pub response: String,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Map<String, Value>>,
}

/// Conversation registry backed by the completion oracle.
pub struct ConversationService {
    oracle: SharedOracle,
    conversations: RwLock<HashMap<String, Conversation>>,
}

impl ConversationService {
    pub fn new(oracle: SharedOracle) -> Self {
        Self {
            oracle,
            conversations: RwLock::new(HashMap::new()),
        }
    }

    /// Open a new, empty conversation.
    pub async fn start(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.conversations
            .write()
            .await
            .insert(id.clone(), Conversation::new(id.clone()));
        info!("Started conversation {}", id);
        id
    }

    /// Send a user message and record the assistant's reply.
    ///
    /// The oracle sees the whole transcript, one message per paragraph.
    pub async fn send(
        &self,
        id: &str,
        message: &str,
        global_prompt: &str,
        prompt: &str,
    ) -> Result<ConversationReply> {
        let transcript = {
            let mut conversations = self.conversations.write().await;
            let conversation = conversations
                .get_mut(id)
                .ok_or_else(|| Error::not_found("Conversation", id))?;

            conversation.messages.push(Message::user(message));
            conversation
                .messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let system_prompt = format!("{}\n\n{}", global_prompt, prompt);
        let response = self.oracle.complete(&system_prompt, &transcript).await?;

        let parameters = match decode::decode_object(&response) {
            Decoded::Parsed(map) | Decoded::Repaired(map) => Some(map),
            Decoded::Rejected(Rejection::Missing(_)) => None,
            Decoded::Rejected(reason) => {
                warn!("Failed to parse response as JSON: {}", reason);
                None
            }
        };

        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .ok_or_else(|| Error::not_found("Conversation", id))?;

        conversation.messages.push(Message::assistant(response.clone()));
        if let Some(params) = &parameters {
            debug!("Conversation {} produced parameters", id);
            conversation.parameters = Some(params.clone());
            conversation.is_complete = true;
        }

        Ok(ConversationReply {
            response,
            is_complete: conversation.is_complete,
            parameters,
        })
    }

    /// Snapshot of a conversation.
    pub async fn get(&self, id: &str) -> Result<Conversation> {
        self.conversations
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found("Conversation", id))
    }

    /// Number of open conversations.
    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::oracle::ScriptedOracle;
    use crate::types::Role;
    use serde_json::json;

    #[tokio::test]
    async fn test_conversation_flow() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply("How many shares of AAPL?")
                .reply("{\"symbol\": \"AAPL\", \"side\": \"buy\", \"quantity\": 10}"),
        );
        let service = ConversationService::new(oracle.clone());
        let id = service.start().await;

        let first = service.send(&id, "buy AAPL", "global", "prompt").await.unwrap();
        assert_eq!(first.response, "How many shares of AAPL?");
        assert!(!first.is_complete);
        assert!(first.parameters.is_none());

        let second = service.send(&id, "10", "global", "prompt").await.unwrap();
        assert!(second.is_complete);
        assert_eq!(second.parameters.as_ref().unwrap()["quantity"], json!(10));

        let calls = oracle.calls();
        assert_eq!(calls[1].system_prompt, "global\n\nprompt");
        assert_eq!(
            calls[1].user_prompt,
            "buy AAPL\n\nHow many shares of AAPL?\n\n10"
        );

        let conversation = service.get(&id).await.unwrap();
        assert_eq!(conversation.messages.len(), 4);
        assert_eq!(conversation.messages[3].role, Role::Assistant);
        assert!(conversation.is_complete);
        assert!(conversation.parameters.is_some());
    }

    #[tokio::test]
    async fn test_malformed_json_reply_is_not_parameters() {
        let oracle = Arc::new(ScriptedOracle::new().reply("{symbol: AAPL}"));
        let service = ConversationService::new(oracle);
        let id = service.start().await;

        let reply = service.send(&id, "buy", "g", "p").await.unwrap();
        assert!(!reply.is_complete);
        assert!(reply.parameters.is_none());
    }

    #[tokio::test]
    async fn test_unknown_conversation() {
        let oracle = Arc::new(ScriptedOracle::new());
        let service = ConversationService::new(oracle.clone());

        let err = service.send("nope", "hi", "g", "p").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(service.get("nope").await.unwrap_err().is_not_found());
        assert_eq!(oracle.call_count(), 0);
    }

    #[tokio::test]
    async fn test_oracle_error_propagates() {
        let oracle = Arc::new(ScriptedOracle::new().fail("unavailable"));
        let service = ConversationService::new(oracle);
        let id = service.start().await;

        assert!(service.send(&id, "hi", "g", "p").await.is_err());
        assert_eq!(service.len().await, 1);
    }
}
