// OpenAI-compatible backend
//
// Works against any endpoint speaking the OpenAI chat completion format,
// including self-hosted gateways that rename the standard wire fields.

use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::decode;
use super::types::{ConversationRequest, DeltaFragment, StreamHandle};
use super::LlmProvider;
use crate::config::LlmConfig;
use crate::errors::LlmError;

/// Channel capacity between the request task and the stream handle
pub(crate) const CHANNEL_CAPACITY: usize = 100;

/// OpenAI-compatible backend adapter.
///
/// Stateless; each call builds its own client, channel and cancellation
/// token, so concurrent calls never share mutable state.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiLikeProvider;

impl OpenAiLikeProvider {
    pub fn new() -> Self {
        Self
    }

    /// Build the wire request body, honoring the configured field names.
    ///
    /// Turn order is preserved exactly; roles map 1:1 onto the standard
    /// "system"/"user"/"assistant" values.
    fn build_body(
        messages: &ConversationRequest,
        config: &LlmConfig,
        stream: bool,
    ) -> Value {
        let turns: Vec<Value> = messages
            .iter()
            .map(|turn| {
                let mut obj = Map::new();
                obj.insert(
                    config.field_map.role.clone(),
                    Value::String(turn.role.as_str().to_string()),
                );
                obj.insert(
                    config.field_map.content.clone(),
                    Value::String(turn.content.clone()),
                );
                Value::Object(obj)
            })
            .collect();

        let mut body = Map::new();
        body.insert(config.field_map.messages.clone(), Value::Array(turns));
        body.insert("model".to_string(), json!(config.model));
        body.insert("temperature".to_string(), json!(config.temperature));
        if let Some(max_tokens) = config.max_tokens {
            body.insert("max_tokens".to_string(), json!(max_tokens));
        }
        body.insert("stream".to_string(), json!(stream));
        Value::Object(body)
    }

    fn build_request(client: &Client, config: &LlmConfig, body: &Value) -> RequestBuilder {
        let mut builder = client
            .post(&config.api_base)
            .header(header::CONTENT_TYPE, "application/json")
            .json(body);
        if !config.api_key.is_empty() {
            builder = builder.header(
                header::AUTHORIZATION,
                format!("Bearer {}", config.api_key),
            );
        }
        builder
    }
}

#[async_trait]
impl LlmProvider for OpenAiLikeProvider {
    async fn stream(
        &self,
        messages: &ConversationRequest,
        config: &LlmConfig,
    ) -> Result<StreamHandle, LlmError> {
        config.validate()?;

        let client = super::build_client(config.timeout_secs)?;
        let body = Self::build_body(messages, config, config.streaming);
        let request = Self::build_request(&client, config, &body);

        tracing::debug!(
            endpoint = %config.api_base,
            model = %config.model,
            streaming = config.streaming,
            "dispatching chat completion request"
        );

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        let task_token = token.clone();
        let streaming = config.streaming;
        let response_path = config.response_path.clone();

        tokio::spawn(async move {
            run_request(request, streaming, response_path, tx, task_token).await;
            tracing::debug!("request task finished");
        });

        Ok(StreamHandle::new(rx, token))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Issue the request and feed the channel until the terminal fragment.
///
/// Transport and decode failures become the error terminal; nothing raises
/// across the streaming boundary.
async fn run_request(
    request: RequestBuilder,
    streaming: bool,
    response_path: String,
    tx: mpsc::Sender<DeltaFragment>,
    cancel: CancellationToken,
) {
    let response = tokio::select! {
        _ = cancel.cancelled() => return,
        response = request.send() => response,
    };

    let response = match response {
        Ok(response) => response,
        Err(e) => {
            tracing::error!("request failed: {e}");
            let _ = tx
                .send(DeltaFragment::Error(format!("request failed: {e}")))
                .await;
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let body = tokio::select! {
            _ = cancel.cancelled() => return,
            body = response.text() => body.unwrap_or_default(),
        };
        tracing::error!(%status, "request rejected");
        let _ = tx
            .send(DeltaFragment::Error(format!(
                "request failed with status {status}: {body}"
            )))
            .await;
        return;
    }

    if streaming {
        if let Err(message) = decode::pump_sse(response, &tx, &cancel, false).await {
            tracing::error!("stream failed: {message}");
            let _ = tx.send(DeltaFragment::Error(message)).await;
        }
    } else {
        run_json(response, &response_path, tx, &cancel).await;
    }
}

/// Non-streaming path: read the whole body, extract the answer, emit it as a
/// single fragment.
async fn run_json(
    response: reqwest::Response,
    response_path: &str,
    tx: mpsc::Sender<DeltaFragment>,
    cancel: &CancellationToken,
) {
    // The body read is a suspension point too; a cancelled handle must not
    // wait out the client timeout before the connection drops.
    let body = tokio::select! {
        _ = cancel.cancelled() => return,
        body = response.text() => body,
    };
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            let _ = tx
                .send(DeltaFragment::Error(format!(
                    "failed to read response body: {e}"
                )))
                .await;
            return;
        }
    };

    tracing::debug!(bytes = body.len(), "received non-streaming response");

    // Empty path: the whole body is the answer
    if response_path.is_empty() {
        let _ = tx.send(DeltaFragment::Text(body)).await;
        let _ = tx.send(DeltaFragment::Done).await;
        return;
    }

    if body.trim().is_empty() {
        let _ = tx.send(DeltaFragment::Text(String::new())).await;
        let _ = tx.send(DeltaFragment::Done).await;
        return;
    }

    let root: Value = match serde_json::from_str(&body) {
        Ok(root) => root,
        Err(e) => {
            let _ = tx
                .send(DeltaFragment::Error(format!(
                    "malformed response body: {e}"
                )))
                .await;
            return;
        }
    };

    // A path miss yields an empty answer rather than an error; longstanding
    // lenient behavior, kept as documented.
    let text = decode::extract_path(&root, response_path).unwrap_or_default();
    let _ = tx.send(DeltaFragment::Text(text)).await;
    let _ = tx.send(DeltaFragment::Done).await;
}
