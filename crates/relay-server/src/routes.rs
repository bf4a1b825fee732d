use std::time::Duration;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use relay_command_store::DEFAULT_HISTORY_LIMIT;
use relay_core_types::{catalog, Command, CommandId, CommandResult, ResultReport};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::RelayState;

const DEFAULT_RESULT_WAIT: Duration = Duration::from_secs(30);
const MAX_RESULT_WAIT: Duration = Duration::from_secs(120);

type ApiError = (StatusCode, Json<Value>);

pub(crate) fn router() -> Router<RelayState> {
    Router::new()
        .route("/command", post(enqueue_handler))
        .route("/commands", get(catalog_handler))
        .route("/commands/poll", get(poll_handler))
        .route("/commands/history", get(history_handler))
        .route(
            "/commands/:command_id/result",
            get(wait_result_handler).post(record_result_handler),
        )
        .route("/status", get(status_handler))
}

fn failure(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(json!({ "success": false, "error": error.into() })),
    )
}

#[derive(Deserialize)]
struct EnqueueRequest {
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    data: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueResponse {
    success: bool,
    command_id: CommandId,
    message: String,
}

async fn enqueue_handler(
    State(state): State<RelayState>,
    payload: Result<Json<EnqueueRequest>, JsonRejection>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    let kind = request.command.unwrap_or_default();
    let command_id = state
        .store()
        .enqueue(&kind, request.data)
        .map_err(|err| failure(StatusCode::BAD_REQUEST, err.to_string()))?;
    Ok(Json(EnqueueResponse {
        success: true,
        command_id,
        message: format!("Command '{}' queued successfully", kind.trim()),
    }))
}

#[derive(Serialize)]
struct PollResponse {
    success: bool,
    commands: Vec<Command>,
}

async fn poll_handler(State(state): State<RelayState>) -> Json<PollResponse> {
    let commands = state.store().drain_pending();
    debug!(count = commands.len(), "agent polled");
    Json(PollResponse {
        success: true,
        commands,
    })
}

async fn record_result_handler(
    State(state): State<RelayState>,
    Path(command_id): Path<String>,
    payload: Result<Json<ResultReport>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(report) =
        payload.map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    state.store().record_result(CommandId(command_id), report);
    Ok(Json(json!({ "success": true, "message": "Result recorded" })))
}

#[derive(Deserialize)]
struct WaitParams {
    timeout_ms: Option<u64>,
}

#[derive(Serialize)]
struct ResultResponse {
    success: bool,
    result: CommandResult,
}

async fn wait_result_handler(
    State(state): State<RelayState>,
    Path(command_id): Path<String>,
    params: Result<Query<WaitParams>, QueryRejection>,
) -> Result<Json<ResultResponse>, ApiError> {
    let Query(params) =
        params.map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    let timeout = params
        .timeout_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_RESULT_WAIT)
        .min(MAX_RESULT_WAIT);
    let command_id = CommandId(command_id);
    match state.store().wait_for_result(&command_id, timeout).await {
        Some(result) => Ok(Json(ResultResponse {
            success: true,
            result,
        })),
        None => Err(failure(StatusCode::NOT_FOUND, "Result not available")),
    }
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryResponse {
    success: bool,
    history: Vec<CommandResult>,
}

async fn history_handler(
    State(state): State<RelayState>,
    params: Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let Query(params) =
        params.map_err(|rejection| failure(StatusCode::BAD_REQUEST, rejection.body_text()))?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(HistoryResponse {
        success: true,
        history: state.store().history(limit),
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    success: bool,
    status: &'static str,
    queue_length: usize,
    history_length: usize,
    uptime: f64,
}

async fn status_handler(State(state): State<RelayState>) -> Json<StatusResponse> {
    let status = state.store().status();
    Json(StatusResponse {
        success: true,
        status: "running",
        queue_length: status.queue_length,
        history_length: status.history_length,
        uptime: status.uptime,
    })
}

#[derive(Serialize)]
struct CatalogResponse {
    success: bool,
    commands: Map<String, Value>,
}

async fn catalog_handler() -> Json<CatalogResponse> {
    Json(CatalogResponse {
        success: true,
        commands: catalog(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::response::Response;
    use relay_command_store::CommandStore;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::build_router;

    struct TestRelay {
        store: Arc<CommandStore>,
        router: Router,
    }

    impl TestRelay {
        fn new() -> Self {
            let store = Arc::new(CommandStore::new());
            let router = build_router(RelayState::new(Arc::clone(&store)));
            Self { store, router }
        }

        async fn get(&self, uri: &str) -> Response {
            self.router
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap()
        }

        async fn post(&self, uri: &str, body: impl Into<Body>) -> Response {
            self.router
                .clone()
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(uri)
                        .header("content-type", "application/json")
                        .body(body.into())
                        .unwrap(),
                )
                .await
                .unwrap()
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn enqueue_returns_command_id() {
        let relay = TestRelay::new();
        let response = relay
            .post(
                "/api/command",
                json!({"command": "search", "data": {"query": "cats"}}).to_string(),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Command 'search' queued successfully");
        assert!(body["commandId"].as_str().is_some_and(|id| !id.is_empty()));
        assert_eq!(relay.store.status().queue_length, 1);
    }

    #[tokio::test]
    async fn enqueue_without_command_is_rejected() {
        let relay = TestRelay::new();
        for payload in [json!({"data": {}}), json!({"command": ""})] {
            let response = relay.post("/api/command", payload.to_string()).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let body = body_json(response).await;
            assert_eq!(body["success"], false);
            assert_eq!(body["error"], "Command is required");
        }
        assert_eq!(relay.store.status().queue_length, 0);
    }

    #[tokio::test]
    async fn malformed_body_is_a_json_400() {
        let relay = TestRelay::new();
        let response = relay.post("/api/command", "{not json").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().is_some());
    }

    #[tokio::test]
    async fn poll_drains_queue() {
        let relay = TestRelay::new();
        relay.store.enqueue("scrollDown", json!({})).unwrap();
        relay.store.enqueue("goHome", Value::Null).unwrap();

        let body = body_json(relay.get("/api/commands/poll").await).await;
        let commands = body["commands"].as_array().unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0]["command"], "scrollDown");
        assert_eq!(commands[0]["status"], "delivered");
        assert_eq!(commands[1]["data"], json!({}));
        assert!(commands[1]["timestamp"].is_string());

        let body = body_json(relay.get("/api/commands/poll").await).await;
        assert_eq!(body["commands"], json!([]));
    }

    #[tokio::test]
    async fn results_show_up_in_history() {
        let relay = TestRelay::new();
        for index in 0..3 {
            let response = relay
                .post(
                    &format!("/api/commands/cmd-{index}/result"),
                    json!({"success": true, "message": format!("done {index}")}).to_string(),
                )
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(body_json(response).await["message"], "Result recorded");
        }

        let body = body_json(relay.get("/api/commands/history").await).await;
        assert_eq!(body["history"].as_array().unwrap().len(), 3);

        let body = body_json(relay.get("/api/commands/history?limit=1").await).await;
        let history = body["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["commandId"], "cmd-2");
        assert_eq!(history[0]["message"], "done 2");
        assert!(history[0]["completedAt"].is_string());
    }

    #[tokio::test]
    async fn status_reports_counts() {
        let relay = TestRelay::new();
        relay.store.enqueue("refresh", json!({})).unwrap();
        let body = body_json(relay.get("/api/status").await).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "running");
        assert_eq!(body["queueLength"], 1);
        assert_eq!(body["historyLength"], 0);
        assert!(body["uptime"].as_f64().is_some());
        assert_eq!(relay.store.status().queue_length, 1);
    }

    #[tokio::test]
    async fn catalog_lists_commands() {
        let relay = TestRelay::new();
        let body = body_json(relay.get("/api/commands").await).await;
        let commands = body["commands"].as_object().unwrap();
        assert_eq!(commands.len(), 12);
        assert_eq!(
            commands["login"]["parameters"]["password"],
            "Password"
        );
    }

    #[tokio::test]
    async fn result_wait_returns_recorded_result_or_404() {
        let relay = TestRelay::new();
        relay
            .store
            .record_result(CommandId::from("known"), ResultReport::ok("Scrolled down"));

        let response = relay.get("/api/commands/known/result?timeout_ms=10").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["message"], "Scrolled down");

        let response = relay.get("/api/commands/missing/result?timeout_ms=10").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "Result not available");
        assert_eq!(relay.store.pending_waiters(), 0);
    }

    #[tokio::test]
    async fn result_wait_sees_later_report() {
        let relay = TestRelay::new();
        let id = relay.store.enqueue("checkAuth", json!({})).unwrap();
        let waiting = {
            let router = relay.router.clone();
            let uri = format!("/api/commands/{id}/result?timeout_ms=5000");
            tokio::spawn(async move {
                router
                    .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                    .await
                    .unwrap()
            })
        };
        while relay.store.pending_waiters() == 0 {
            tokio::task::yield_now().await;
        }
        relay
            .store
            .record_result(id.clone(), ResultReport::ok("Not authenticated"));

        let response = waiting.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["result"]["commandId"], id.as_str());
    }
}
