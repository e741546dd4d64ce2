// Configuration structs

use std::str::FromStr;

use serde::Deserialize;

use crate::errors::LlmError;

/// Default request timeout, in seconds.
pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 600;

/// Which backend a request is routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Any OpenAI-style chat completion HTTP endpoint
    OpenAi,
    /// Azure OpenAI deployment
    Azure,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Azure => "azure",
        }
    }
}

impl FromStr for BackendKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" => Ok(BackendKind::OpenAi),
            "azure" => Ok(BackendKind::Azure),
            other => Err(LlmError::Configuration(format!("unknown backend: {other}"))),
        }
    }
}

/// Wire field names for the OpenAI-compatible request body.
///
/// Some self-hosted gateways rename the standard fields; the defaults match
/// the OpenAI chat completion format.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub messages: String,
    pub role: String,
    pub content: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            messages: "messages".to_string(),
            role: "role".to_string(),
            content: "content".to_string(),
        }
    }
}

/// Per-call configuration for one backend.
///
/// Constructed by the caller (or loaded from the config file) and treated as
/// immutable for the duration of a call.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub backend: BackendKind,

    /// Full endpoint URL, e.g. "https://api.openai.com/v1/chat/completions"
    pub api_base: String,

    /// Opaque credential; sent as a bearer token (OpenAI) or api-key (Azure)
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Field-name remapping, only honored by the OpenAI-compatible backend
    #[serde(default)]
    pub field_map: FieldMap,

    /// Extraction path for the non-streaming response body,
    /// e.g. "$.choices[0].message.content". Empty = whole body is the answer.
    #[serde(default)]
    pub response_path: String,

    /// Request incremental (SSE) responses where the backend supports a choice
    #[serde(default)]
    pub streaming: bool,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f64 {
    1.0
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl LlmConfig {
    pub fn new(backend: BackendKind, api_base: impl Into<String>) -> Self {
        Self {
            backend,
            api_base: api_base.into(),
            api_key: String::new(),
            model: String::new(),
            temperature: default_temperature(),
            max_tokens: None,
            field_map: FieldMap::default(),
            response_path: String::new(),
            streaming: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_field_map(mut self, field_map: FieldMap) -> Self {
        self.field_map = field_map;
        self
    }

    pub fn with_response_path(mut self, path: impl Into<String>) -> Self {
        self.response_path = path.into();
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Check required fields before any network activity.
    pub fn validate(&self) -> Result<(), LlmError> {
        if self.api_base.is_empty() {
            return Err(LlmError::Configuration(
                "endpoint URL (api_base) is required".to_string(),
            ));
        }
        if self.backend == BackendKind::OpenAi && self.model.is_empty() {
            return Err(LlmError::Configuration("model id is required".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(LlmError::Configuration(
                "timeout_secs must be positive".to_string(),
            ));
        }
        if self.max_tokens == Some(0) {
            return Err(LlmError::Configuration(
                "max_tokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_round_trip() {
        assert_eq!("openai".parse::<BackendKind>().unwrap(), BackendKind::OpenAi);
        assert_eq!("azure".parse::<BackendKind>().unwrap(), BackendKind::Azure);
        assert_eq!(BackendKind::OpenAi.as_str(), "openai");
    }

    #[test]
    fn test_unknown_backend_fails_fast() {
        let err = "gemini".parse::<BackendKind>().unwrap_err();
        assert!(matches!(err, LlmError::Configuration(_)));
    }

    #[test]
    fn test_validate_requires_endpoint() {
        let config = LlmConfig::new(BackendKind::OpenAi, "").with_model("gpt-4o");
        assert!(matches!(
            config.validate(),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_requires_model_for_openai() {
        let config = LlmConfig::new(BackendKind::OpenAi, "https://example.com/v1/chat/completions");
        assert!(config.validate().is_err());

        let config = config.with_model("gpt-4o");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_azure_does_not_require_model() {
        // Azure carries the deployment in the endpoint URL
        let config = LlmConfig::new(BackendKind::Azure, "https://example.openai.azure.com/deploy");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_max_tokens() {
        let config = LlmConfig::new(BackendKind::OpenAi, "https://example.com/v1/chat/completions")
            .with_model("gpt-4o")
            .with_max_tokens(0);
        assert!(matches!(
            config.validate(),
            Err(LlmError::Configuration(_))
        ));

        let config = LlmConfig::new(BackendKind::OpenAi, "https://example.com/v1/chat/completions")
            .with_model("gpt-4o")
            .with_max_tokens(512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_field_map_defaults() {
        let map = FieldMap::default();
        assert_eq!(map.messages, "messages");
        assert_eq!(map.role, "role");
        assert_eq!(map.content, "content");
    }
}
