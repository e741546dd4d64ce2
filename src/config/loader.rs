// Configuration loader
// Loads backend settings from ~/.gpttools/config.toml or environment variables

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::settings::{BackendKind, LlmConfig};

/// Load configuration from the gpttools config file or environment.
pub fn load_config() -> Result<LlmConfig> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    let config_path = home.join(".gpttools/config.toml");

    if config_path.exists() {
        return load_config_from(&config_path);
    }

    // Fall back to environment variables
    if let (Ok(api_base), Ok(api_key)) = (
        std::env::var("GPTTOOLS_API_BASE"),
        std::env::var("GPTTOOLS_API_KEY"),
    ) {
        if !api_base.is_empty() {
            let model =
                std::env::var("GPTTOOLS_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
            return Ok(LlmConfig::new(BackendKind::OpenAi, api_base)
                .with_api_key(api_key)
                .with_model(model));
        }
    }

    bail!(
        "No configuration found. Create ~/.gpttools/config.toml, for example:\n\n\
        backend = \"openai\"\n\
        api_base = \"https://api.openai.com/v1/chat/completions\"\n\
        api_key = \"sk-...\"\n\
        model = \"gpt-4o\"\n\
        streaming = true\n\n\
        Alternatively, set GPTTOOLS_API_BASE and GPTTOOLS_API_KEY."
    );
}

/// Load and validate configuration from a specific TOML file.
pub fn load_config_from(path: &Path) -> Result<LlmConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let config: LlmConfig =
        toml::from_str(&contents).context("Failed to parse config.toml")?;

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_config_from_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            backend = "openai"
            api_base = "https://api.example.com/v1/chat/completions"
            api_key = "test-key"
            model = "gpt-4o"
            temperature = 0.3
            max_tokens = 1024
            streaming = true
            response_path = "$.choices[0].message.content"
            "#
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.backend, BackendKind::OpenAi);
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.temperature, 0.3);
        assert_eq!(config.max_tokens, Some(1024));
        assert!(config.streaming);
        assert_eq!(config.timeout_secs, 600);
    }

    #[test]
    fn test_load_config_with_field_map() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            backend = "openai"
            api_base = "https://gateway.internal/chat"
            model = "local-llama"

            [field_map]
            messages = "dialog"
            content = "text"
            "#
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.field_map.messages, "dialog");
        assert_eq!(config.field_map.role, "role");
        assert_eq!(config.field_map.content, "text");
    }

    #[test]
    fn test_load_config_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // Missing model for the openai backend
        writeln!(
            file,
            r#"
            backend = "openai"
            api_base = "https://api.example.com/v1/chat/completions"
            "#
        )
        .unwrap();

        assert!(load_config_from(file.path()).is_err());
    }

    #[test]
    fn test_load_config_rejects_unknown_backend() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            backend = "gemini"
            api_base = "https://api.example.com"
            "#
        )
        .unwrap();

        assert!(load_config_from(file.path()).is_err());
    }
}
