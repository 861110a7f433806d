//! One-shot parameter extraction.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::decode::{self, Decoded, Rejection};
use crate::error::Result;
use crate::oracle::SharedOracle;

const EXTRACTION_DIRECTIVE: &str = "\
Extract parameters from the user input and return a JSON object.
If you can't extract all parameters, return what you can and indicate what's missing.";

/// Extracts a parameter object from free-form user input.
#[derive(Clone)]
pub struct ParameterExtractor {
    oracle: SharedOracle,
}

impl ParameterExtractor {
    pub fn new(oracle: SharedOracle) -> Self {
        Self { oracle }
    }

    /// Returns the parsed object, or `{}` when the reply is not one.
    pub async fn extract(
        &self,
        global_prompt: &str,
        extraction_prompt: &str,
        user_input: &str,
    ) -> Result<Value> {
        info!("Extracting parameters from user input...");

        let system_prompt = format!(
            "{}\n\n{}\n\n{}",
            global_prompt, extraction_prompt, EXTRACTION_DIRECTIVE
        );
        let reply = self.oracle.complete(&system_prompt, user_input).await?;

        let params = match decode::decode_object(&reply) {
            Decoded::Parsed(map) | Decoded::Repaired(map) => map,
            Decoded::Rejected(Rejection::Missing(_)) => Map::new(),
            Decoded::Rejected(reason) => {
                warn!("Failed to parse response as JSON: {}", reason);
                Map::new()
            }
        };

        Ok(Value::Object(params))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::oracle::ScriptedOracle;
    use serde_json::json;

    #[tokio::test]
    async fn test_extract_object() {
        let oracle = Arc::new(ScriptedOracle::new().reply("\n{\"symbol\": \"TSLA\", \"quantity\": 3}\n"));
        let extractor = ParameterExtractor::new(oracle.clone());

        let params = extractor.extract("global", "extract orders", "buy 3 TSLA").await.unwrap();
        assert_eq!(params, json!({ "symbol": "TSLA", "quantity": 3 }));

        let call = &oracle.calls()[0];
        assert!(call.system_prompt.starts_with("global\n\nextract orders"));
        assert_eq!(call.user_prompt, "buy 3 TSLA");
    }

    #[tokio::test]
    async fn test_extract_non_object_is_empty() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .reply("Which symbol?")
                .reply("{broken")
                .reply("{not: json}"),
        );
        let extractor = ParameterExtractor::new(oracle);

        for _ in 0..3 {
            let params = extractor.extract("g", "p", "buy").await.unwrap();
            assert_eq!(params, json!({}));
        }
    }
}
