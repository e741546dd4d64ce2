// Azure OpenAI backend
//
// Talks to an Azure OpenAI deployment using the vendor's native credential
// header and chunked transport. The deployment is addressed by the endpoint
// URL, so no model field is sent.

use async_trait::async_trait;
use reqwest::{header, RequestBuilder};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::decode;
use super::openai_like::CHANNEL_CAPACITY;
use super::types::{ConversationRequest, DeltaFragment, StreamHandle};
use super::LlmProvider;
use crate::config::LlmConfig;
use crate::errors::LlmError;

const API_KEY_HEADER: &str = "api-key";

/// Azure OpenAI backend adapter.
///
/// Always requests a chunked response; the vendor transport is inherently
/// streamed, so `config.streaming` is not consulted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AzureProvider;

impl AzureProvider {
    pub fn new() -> Self {
        Self
    }

    fn build_body(messages: &ConversationRequest, config: &LlmConfig) -> Value {
        let turns: Vec<Value> = messages
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role.as_str(),
                    "content": turn.content,
                })
            })
            .collect();

        let mut body = json!({
            "messages": turns,
            "temperature": config.temperature,
            "stream": true,
        });
        if let Some(max_tokens) = config.max_tokens {
            body["max_tokens"] = json!(max_tokens);
        }
        body
    }
}

#[async_trait]
impl LlmProvider for AzureProvider {
    async fn stream(
        &self,
        messages: &ConversationRequest,
        config: &LlmConfig,
    ) -> Result<StreamHandle, LlmError> {
        config.validate()?;

        let client = super::build_client(config.timeout_secs)?;
        let body = Self::build_body(messages, config);
        let request = client
            .post(&config.api_base)
            .header(API_KEY_HEADER, config.api_key.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body);

        tracing::debug!(endpoint = %config.api_base, "dispatching Azure chat completion request");

        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let token = CancellationToken::new();
        let task_token = token.clone();

        tokio::spawn(async move {
            if let Err(message) = run_request(request, &tx, &task_token).await {
                // Failures are reported as in-band text, so a transcript shows
                // the partial answer followed by the error message. Callers
                // needing a structured error go through errors::parse_inband.
                tracing::error!("azure request failed: {message}");
                let _ = tx
                    .send(DeltaFragment::Text(format!("Error: {message}")))
                    .await;
                let _ = tx.send(DeltaFragment::Error(message)).await;
            }
            tracing::debug!("azure request task finished");
        });

        Ok(StreamHandle::new(rx, token))
    }

    fn name(&self) -> &str {
        "azure"
    }
}

async fn run_request(
    request: RequestBuilder,
    tx: &mpsc::Sender<DeltaFragment>,
    cancel: &CancellationToken,
) -> Result<(), String> {
    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(()),
        response = request.send() => response,
    };

    let response = response.map_err(|e| format!("request failed: {e}"))?;
    let status = response.status();
    if !status.is_success() {
        let body = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            body = response.text() => body.unwrap_or_default(),
        };
        return Err(format!("request failed with status {status}: {body}"));
    }

    // Vendor iterator semantics: stream exhaustion is completion, with or
    // without the sentinel frame.
    decode::pump_sse(response, tx, cancel, true).await
}
