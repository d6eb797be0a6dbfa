//! Chat configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.
//! A missing provider or API key is not an error: it selects fallback mode,
//! where every LLM stage takes its deterministic path.

use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;

use crate::error::AgentError;

/// Default answer model.
const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Default answer temperature.
const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Default answer token budget.
const DEFAULT_MAX_TOKENS: u32 = 2000;
/// Default max retries (raw HTTP provider).
const DEFAULT_MAX_RETRIES: u32 = 3;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Default answer language.
const DEFAULT_LANGUAGE: &str = "en";

/// Temperature used for query parsing. Kept low and separate from the
/// answer temperature.
pub const PARSING_TEMPERATURE: f32 = 0.1;

/// Configuration for one orchestrator.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// LLM provider name (`openai`, `http`); `None` selects fallback mode.
    pub provider: Option<String>,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Base URL override (required by the `http` provider).
    pub base_url: Option<String>,
    /// Model for answer generation and the agentic loop.
    pub model: String,
    /// Model for query parsing.
    pub query_parsing_model: String,
    /// Answer sampling temperature.
    pub temperature: f32,
    /// Answer token budget.
    pub max_tokens: u32,
    /// Stream answer tokens as they arrive.
    pub enable_streaming: bool,
    /// Allow the agentic loop to call tools.
    pub enable_tool_use: bool,
    /// Retry attempts for transport failures, 429 and 5xx.
    pub max_retries: u32,
    /// Answer language (ISO 639-1).
    pub language: String,
    /// Directory containing prompt template files.
    pub prompt_dir: Option<PathBuf>,
    /// Fixed "today" for reproducible runs; local date when unset.
    pub reference_date: Option<NaiveDate>,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl ChatConfig {
    /// Creates a new builder for `ChatConfig`.
    #[must_use]
    pub fn builder() -> ChatConfigBuilder {
        ChatConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] for out-of-range values.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Whether an LLM provider is configured at all.
    #[must_use]
    pub fn has_provider(&self) -> bool {
        self.provider.is_some() && self.api_key.as_deref().is_some_and(|k| !k.is_empty())
    }

    /// Reference date: the configured one, else today's local date.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.reference_date
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: None,
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            query_parsing_model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            enable_streaming: true,
            enable_tool_use: true,
            max_retries: DEFAULT_MAX_RETRIES,
            language: DEFAULT_LANGUAGE.to_string(),
            prompt_dir: None,
            reference_date: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

fn env_bool(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

/// Builder for [`ChatConfig`].
#[derive(Debug, Clone, Default)]
pub struct ChatConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    query_parsing_model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    enable_streaming: Option<bool>,
    enable_tool_use: Option<bool>,
    max_retries: Option<u32>,
    language: Option<String>,
    prompt_dir: Option<PathBuf>,
    reference_date: Option<NaiveDate>,
    timeout: Option<Duration>,
}

impl ChatConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("INSIGHT_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("INSIGHT_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("INSIGHT_BASE_URL"))
                .ok();
        }
        if self.model.is_none() {
            self.model = std::env::var("INSIGHT_MODEL").ok();
        }
        if self.query_parsing_model.is_none() {
            self.query_parsing_model = std::env::var("INSIGHT_PARSING_MODEL").ok();
        }
        if self.temperature.is_none() {
            self.temperature = env_parse("INSIGHT_TEMPERATURE");
        }
        if self.max_tokens.is_none() {
            self.max_tokens = env_parse("INSIGHT_MAX_TOKENS");
        }
        if self.enable_streaming.is_none() {
            self.enable_streaming = env_bool("INSIGHT_STREAMING");
        }
        if self.enable_tool_use.is_none() {
            self.enable_tool_use = env_bool("INSIGHT_TOOL_USE");
        }
        if self.language.is_none() {
            self.language = std::env::var("INSIGHT_LANGUAGE").ok();
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("INSIGHT_PROMPT_DIR").ok().map(PathBuf::from);
        }
        if self.reference_date.is_none() {
            self.reference_date = std::env::var("INSIGHT_TODAY")
                .ok()
                .and_then(|v| NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok());
        }
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the answer model.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the query parsing model.
    #[must_use]
    pub fn query_parsing_model(mut self, model: impl Into<String>) -> Self {
        self.query_parsing_model = Some(model.into());
        self
    }

    /// Sets the answer temperature.
    #[must_use]
    pub const fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the answer token budget.
    #[must_use]
    pub const fn max_tokens(mut self, n: u32) -> Self {
        self.max_tokens = Some(n);
        self
    }

    /// Enables or disables token streaming.
    #[must_use]
    pub const fn enable_streaming(mut self, on: bool) -> Self {
        self.enable_streaming = Some(on);
        self
    }

    /// Enables or disables tool use in the agentic loop.
    #[must_use]
    pub const fn enable_tool_use(mut self, on: bool) -> Self {
        self.enable_tool_use = Some(on);
        self
    }

    /// Sets the max retries.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = Some(n);
        self
    }

    /// Sets the answer language.
    #[must_use]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Pins "today".
    #[must_use]
    pub const fn reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Builds the [`ChatConfig`].
    ///
    /// An API key without a provider name selects `openai`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidConfig`] if the temperature is outside
    /// `0.0..=2.0` or the token budget is zero.
    pub fn build(self) -> Result<ChatConfig, AgentError> {
        let defaults = ChatConfig::default();
        let temperature = self.temperature.unwrap_or(defaults.temperature);
        if !(0.0..=2.0).contains(&temperature) {
            return Err(AgentError::InvalidConfig {
                message: format!("temperature {temperature} is outside 0.0..=2.0"),
            });
        }
        let max_tokens = self.max_tokens.unwrap_or(defaults.max_tokens);
        if max_tokens == 0 {
            return Err(AgentError::InvalidConfig {
                message: "max_tokens must be positive".to_string(),
            });
        }

        let api_key = self.api_key.filter(|k| !k.trim().is_empty());
        let provider = self
            .provider
            .filter(|p| !p.trim().is_empty())
            .or_else(|| api_key.as_ref().map(|_| "openai".to_string()));
        let model = self.model.unwrap_or(defaults.model);

        Ok(ChatConfig {
            provider,
            api_key,
            base_url: self.base_url,
            query_parsing_model: self.query_parsing_model.unwrap_or_else(|| model.clone()),
            model,
            temperature,
            max_tokens,
            enable_streaming: self.enable_streaming.unwrap_or(defaults.enable_streaming),
            enable_tool_use: self.enable_tool_use.unwrap_or(defaults.enable_tool_use),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            language: self.language.unwrap_or(defaults.language),
            prompt_dir: self.prompt_dir,
            reference_date: self.reference_date,
            timeout: self.timeout.unwrap_or(defaults.timeout),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_fallback_mode() {
        let config = ChatConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(config.provider.is_none());
        assert!(!config.has_provider());
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert!((config.temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert!(config.enable_streaming);
        assert!(config.enable_tool_use);
        assert_eq!(config.language, "en");
    }

    #[test]
    fn test_api_key_implies_openai() {
        let config = ChatConfig::builder()
            .api_key("sk-test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider.as_deref(), Some("openai"));
        assert!(config.has_provider());
    }

    #[test]
    fn test_parsing_model_follows_model() {
        let config = ChatConfig::builder()
            .model("gpt-4.1")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.query_parsing_model, "gpt-4.1");

        let config = ChatConfig::builder()
            .model("gpt-4.1")
            .query_parsing_model("gpt-4.1-mini")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.query_parsing_model, "gpt-4.1-mini");
    }

    #[test]
    fn test_invalid_temperature() {
        let result = ChatConfig::builder().temperature(3.5).build();
        assert!(matches!(result, Err(AgentError::InvalidConfig { .. })));
    }

    #[test]
    fn test_reference_date_pins_today() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap_or_default();
        let config = ChatConfig::builder()
            .reference_date(date)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.today(), date);
    }
}
