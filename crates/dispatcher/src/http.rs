//! HTTP client for the relay surface, used by the agent and by controllers.

use std::time::Duration;

use async_trait::async_trait;
use relay_core_types::{Command, CommandId, CommandResult, ResultReport};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::errors::TransportError;
use crate::transport::RelayTransport;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
/// Slack added on top of a long-poll wait before the request itself times out.
const LONG_POLL_SLACK: Duration = Duration::from_secs(5);
/// The relay never holds a result request longer than this.
const MAX_RESULT_WAIT: Duration = Duration::from_secs(120);

#[derive(Debug, Deserialize)]
struct PollResponse {
    #[serde(default)]
    commands: Vec<Command>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueResponse {
    command_id: CommandId,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    history: Vec<CommandResult>,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    commands: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ResultResponse {
    result: CommandResult,
}

/// `GET /api/status` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayStatus {
    pub status: String,
    pub queue_length: usize,
    pub history_length: usize,
    pub uptime: f64,
}

#[derive(Clone)]
pub struct HttpRelayClient {
    client: Client,
    base_url: String,
}

impl HttpRelayClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| TransportError::Request(format!("failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    /// Queue a command on the relay.
    pub async fn send(&self, kind: &str, data: Value) -> Result<CommandId, TransportError> {
        let response = self
            .client
            .post(self.url("/command"))
            .json(&json!({ "command": kind, "data": data }))
            .send()
            .await?;
        let body: EnqueueResponse = decode(response).await?;
        Ok(body.command_id)
    }

    pub async fn status(&self) -> Result<RelayStatus, TransportError> {
        let response = self.client.get(self.url("/status")).send().await?;
        decode(response).await
    }

    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<CommandResult>, TransportError> {
        let url = match limit {
            Some(limit) => self.url(&format!("/commands/history?limit={limit}")),
            None => self.url("/commands/history"),
        };
        let response = self.client.get(url).send().await?;
        let body: HistoryResponse = decode(response).await?;
        Ok(body.history)
    }

    pub async fn catalog(&self) -> Result<Map<String, Value>, TransportError> {
        let response = self.client.get(self.url("/commands")).send().await?;
        let body: CatalogResponse = decode(response).await?;
        Ok(body.commands)
    }

    /// Long-poll for the result of one command; `None` once `timeout` passes.
    pub async fn wait_result(
        &self,
        command_id: &CommandId,
        timeout: Duration,
    ) -> Result<Option<CommandResult>, TransportError> {
        let timeout = timeout.min(MAX_RESULT_WAIT);
        let url = self.url(&format!(
            "/commands/{}/result?timeout_ms={}",
            command_id,
            timeout.as_millis()
        ));
        let response = self
            .client
            .get(url)
            .timeout(timeout.saturating_add(LONG_POLL_SLACK))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: ResultResponse = decode(response).await?;
        Ok(Some(body.result))
    }
}

#[async_trait]
impl RelayTransport for HttpRelayClient {
    async fn poll(&self) -> Result<Vec<Command>, TransportError> {
        let response = self.client.get(self.url("/commands/poll")).send().await?;
        let body: PollResponse = decode(response).await?;
        if !body.commands.is_empty() {
            debug!(count = body.commands.len(), "received commands");
        }
        Ok(body.commands)
    }

    async fn report(
        &self,
        command_id: &CommandId,
        report: &ResultReport,
    ) -> Result<(), TransportError> {
        let response = self
            .client
            .post(self.url(&format!("/commands/{command_id}/result")))
            .json(report)
            .send()
            .await?;
        let _: Value = decode(response).await?;
        Ok(())
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, TransportError> {
    let status = response.status();
    if !status.is_success() {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "<response unavailable>".to_string());
        let message = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|body| body.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        return Err(TransportError::Status {
            status: status.as_u16(),
            message,
        });
    }
    response
        .json::<T>()
        .await
        .map_err(|err| TransportError::Decode(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let client = HttpRelayClient::new("http://127.0.0.1:3000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:3000");
        assert_eq!(
            client.url("/commands/poll"),
            "http://127.0.0.1:3000/api/commands/poll"
        );
    }

    #[tokio::test]
    async fn oversized_result_wait_is_clamped() {
        let client = HttpRelayClient::new("http://127.0.0.1:9").unwrap();
        let err = client
            .wait_result(&CommandId::from("any"), Duration::MAX)
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Request(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unreachable_relay_is_a_request_error() {
        let client = HttpRelayClient::new("http://127.0.0.1:9").unwrap();
        let err = client.poll().await.unwrap_err();
        assert!(matches!(err, TransportError::Request(_)), "{err:?}");
    }
}
