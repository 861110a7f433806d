//! API route modules.

pub mod conversations;
pub mod extract;
pub mod health;
pub mod optimize;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

/// Create the main router with all routes
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = state.config.cors;

    let router = Router::new()
        .route("/health", get(health::health_check))
        .merge(optimize::router())
        .merge(conversations::router())
        .merge(extract::router())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use tuner_core::oracle::ScriptedOracle;
    use tuner_core::MemoryHistoryStore;

    fn test_app(oracle: ScriptedOracle) -> (Router, TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let config = Config {
            output_dir: temp.path().join("output"),
            data_dir: temp.path().to_path_buf(),
            ..Config::default()
        };
        let state = AppState::new(
            config,
            Arc::new(oracle),
            Arc::new(MemoryHistoryStore::new()),
        );
        (create_router(state), temp)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    const BATCH: &str = r#"[{"input": "buy AAPL", "expectedOutput": "How many shares?"}]"#;
    const REWRITE: &str = "EVALUATION:\n{\"passRate\": 95, \"improvements\": [\"Confirms\"], \"issues\": []}\nOPTIMIZED_PROMPT:\nBetter prompt";

    #[tokio::test]
    async fn test_health() {
        let (app, _temp) = test_app(ScriptedOracle::new());

        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["components"]["oracleConfigured"], true);
        assert_eq!(body["metrics"]["sessions"], 0);
        assert!(body.get("uptimeSeconds").is_some());
    }

    #[tokio::test]
    async fn test_service_status() {
        let (app, _temp) = test_app(ScriptedOracle::new());

        let (status, body) = send(&app, "POST", "/optimize/test", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "Optimization service is running" }));
    }

    #[tokio::test]
    async fn test_optimize_validation() {
        let (app, _temp) = test_app(ScriptedOracle::new());

        let (status, body) = send(
            &app,
            "POST",
            "/optimize",
            Some(json!({ "globalPrompt": "", "promptToOptimize": "p" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "INVALID_REQUEST");

        let (status, body) = send(&app, "POST", "/optimize", Some(json!({ "globalPrompt": "g" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("promptToOptimize"));
    }

    #[tokio::test]
    async fn test_optimize_and_history() {
        let (app, temp) = test_app(ScriptedOracle::new().reply(BATCH).reply(REWRITE).reply("yes"));

        let (status, body) = send(
            &app,
            "POST",
            "/optimize",
            Some(json!({
                "globalPrompt": "You are a trading assistant",
                "promptToOptimize": "Extract order parameters"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["convergenceReason"], "Reached convergence threshold");
        assert_eq!(body["optimizedPrompt"], "Better prompt");
        assert_eq!(body["iterations"], 1);
        assert_eq!(body["testCases"].as_array().unwrap().len(), 1);

        // Step artifact written under the configured output dir
        let steps = std::fs::read_dir(temp.path().join("output/optimization-steps")).unwrap();
        assert_eq!(steps.count(), 1);

        let (status, ids) = send(&app, "GET", "/optimize/history", None).await;
        assert_eq!(status, StatusCode::OK);
        let id = ids[0].as_str().unwrap().to_string();

        let (status, history) = send(&app, "GET", &format!("/optimize/history/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history["finalPrompt"], "Better prompt");
        assert_eq!(history["originalPrompt"], "Extract order parameters");

        let (status, body) = send(&app, "GET", "/optimize/history/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_optimize_failure_is_500() {
        let (app, _temp) = test_app(ScriptedOracle::new().reply(BATCH).fail("upstream unavailable"));

        let (status, body) = send(
            &app,
            "POST",
            "/optimize/single",
            Some(json!({ "globalPrompt": "g", "promptToOptimize": "p" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("upstream unavailable"));

        // History is still recorded
        let (_, ids) = send(&app, "GET", "/optimize/history", None).await;
        assert_eq!(ids.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_evaluate() {
        let (app, _temp) = test_app(ScriptedOracle::new().reply("How many shares?"));

        let (status, body) = send(
            &app,
            "POST",
            "/optimize/evaluate",
            Some(json!({
                "globalPrompt": "g",
                "prompt": "p",
                "testCases": [{ "input": "buy AAPL", "expectedOutput": "How many shares?" }]
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passRate"], 1.0);
        assert_eq!(body["results"]["test_1"]["passed"], true);
    }

    #[tokio::test]
    async fn test_conversation_routes() {
        let (app, _temp) = test_app(
            ScriptedOracle::new()
                .reply("How many shares?")
                .reply("{\"symbol\": \"AAPL\", \"quantity\": 10}"),
        );

        let (status, body) = send(&app, "POST", "/conversations", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["conversationId"].as_str().unwrap().to_string();

        let message = |text: &str| json!({ "message": text, "globalPrompt": "g", "prompt": "p" });
        let uri = format!("/conversations/{}/messages", id);

        let (status, reply) = send(&app, "POST", &uri, Some(message("buy AAPL"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["isComplete"], false);

        let (_, reply) = send(&app, "POST", &uri, Some(message("10"))).await;
        assert_eq!(reply["isComplete"], true);
        assert_eq!(reply["parameters"]["quantity"], 10);

        let (status, conversation) = send(&app, "GET", &format!("/conversations/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(conversation["messages"].as_array().unwrap().len(), 4);

        let (status, _) = send(&app, "POST", "/conversations/missing/messages", Some(message("hi"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_extract() {
        let (app, _temp) = test_app(ScriptedOracle::new().reply("{\"symbol\": \"MSFT\"}").reply("Which one?"));
        let body = json!({ "globalPrompt": "g", "extractionPrompt": "e", "userInput": "sell MSFT" });

        let (status, params) = send(&app, "POST", "/extract", Some(body.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(params, json!({ "symbol": "MSFT" }));

        let (_, params) = send(&app, "POST", "/extract", Some(body)).await;
        assert_eq!(params, json!({}));
    }
}
