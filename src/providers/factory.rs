// Backend factory and dispatcher
//
// Selects the adapter for a configuration and exposes the single uniform
// streaming call.

use super::azure::AzureProvider;
use super::openai_like::OpenAiLikeProvider;
use super::types::{ConversationRequest, StreamHandle};
use super::LlmProvider;
use crate::config::{BackendKind, LlmConfig};
use crate::errors::LlmError;
use crate::session::ChatSession;

/// Create the adapter for a configuration.
///
/// Selection is purely on `config.backend`; invalid configuration fails here,
/// before any network activity.
pub fn create_provider(config: &LlmConfig) -> Result<Box<dyn LlmProvider>, LlmError> {
    config.validate()?;
    match config.backend {
        BackendKind::OpenAi => Ok(Box::new(OpenAiLikeProvider::new())),
        BackendKind::Azure => Ok(Box::new(AzureProvider::new())),
    }
}

/// Route one conversation snapshot to the configured backend.
///
/// Stateless and safe to call concurrently; every call yields an independent
/// handle. Configuration errors are returned synchronously; once a handle
/// exists, transport and decode failures arrive in-band as its terminal
/// fragment.
pub async fn stream(
    config: &LlmConfig,
    messages: &ConversationRequest,
) -> Result<StreamHandle, LlmError> {
    let provider = create_provider(config)?;
    provider.stream(messages, config).await
}

/// Snapshot a live session and stream it.
pub async fn stream_session(
    config: &LlmConfig,
    session: &ChatSession,
) -> Result<StreamHandle, LlmError> {
    let messages = session.snapshot();
    stream(config, &messages).await
}
