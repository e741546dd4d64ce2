// Multi-backend LLM support
//
// This module provides an abstraction layer over chat completion backends
// (any OpenAI-compatible endpoint, Azure OpenAI), exposing a single
// streaming-call contract regardless of how each backend encodes its
// response.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::LlmConfig;
use crate::errors::LlmError;

pub(crate) mod decode;
pub mod types;

// Backend implementations
pub mod azure;
pub mod openai_like;

// Backend factory / dispatcher
pub mod factory;

// Re-export commonly used types
pub use factory::{create_provider, stream, stream_session};
pub use types::{ChatTurn, ConversationRequest, DeltaFragment, Role, StreamHandle};

/// Trait for LLM backends
///
/// Each backend turns one conversation snapshot into a cancellable, lazy
/// sequence of text fragments terminated by exactly one success or error
/// marker. Configuration problems surface synchronously; everything after a
/// handle exists arrives in-band through the stream.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Open a streaming chat completion call.
    async fn stream(
        &self,
        messages: &ConversationRequest,
        config: &LlmConfig,
    ) -> Result<StreamHandle, LlmError>;

    /// Get the backend name (e.g. "openai", "azure")
    fn name(&self) -> &str;

    /// Collect the full response as one string.
    ///
    /// Thin wrapper over the streaming contract for callers that do not care
    /// about incremental output.
    async fn prompt(
        &self,
        messages: &ConversationRequest,
        config: &LlmConfig,
    ) -> Result<String, LlmError> {
        let mut handle = self.stream(messages, config).await?;
        handle.collect_text().await
    }
}

/// Build the HTTP client for one call.
///
/// The timeout covers the whole request including the streamed body, so a
/// stalled stream terminates instead of hanging forever.
pub(crate) fn build_client(timeout_secs: u64) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| LlmError::Configuration(format!("failed to create HTTP client: {e}")))
}
