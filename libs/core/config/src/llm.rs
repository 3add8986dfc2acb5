use crate::{env_or_default, env_parse_or, ConfigError};

/// Configuration for the optional chat-completion client.
///
/// The recommendation generator works without one (deterministic fallback),
/// so `from_env` returns `None` when no API key is configured instead of
/// failing startup.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl LlmConfig {
    /// Load from the environment; `None` when LLM_API_KEY is unset.
    pub fn from_env_optional() -> Result<Option<Self>, ConfigError> {
        let api_key = match std::env::var("LLM_API_KEY") {
            Ok(key) if !key.is_empty() => key,
            _ => return Ok(None),
        };

        Ok(Some(Self {
            base_url: env_or_default("LLM_BASE_URL", "https://api.openai.com/v1"),
            api_key,
            model: env_or_default("LLM_MODEL", "gpt-4o-mini"),
            timeout_secs: env_parse_or("LLM_TIMEOUT_SECS", 15)?,
        }))
    }
}
