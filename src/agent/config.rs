//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AgentError;

/// Default planner max tokens. The planner emits either a tool call or a
/// short clarifying question.
const DEFAULT_PLANNER_MAX_TOKENS: u32 = 1024;
/// Default synthesizer max tokens.
const DEFAULT_SYNTHESIZER_MAX_TOKENS: u32 = 2048;
/// Default judge max tokens. The judge returns a one-field JSON object.
const DEFAULT_JUDGE_MAX_TOKENS: u32 = 128;
/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default maximum planner hops per turn before forced synthesis.
const DEFAULT_MAX_PLANNER_HOPS: usize = 8;
/// Default maximum retained conversation messages.
const DEFAULT_MAX_HISTORY: usize = 20;
/// Default policy matches returned per search.
const DEFAULT_POLICY_TOP_K: usize = 3;

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model for the planner agent.
    pub planner_model: String,
    /// Model for the synthesizer agent.
    pub synthesizer_model: String,
    /// Model for the evaluation judge.
    pub judge_model: String,
    /// Maximum tokens for planner responses.
    pub planner_max_tokens: u32,
    /// Maximum tokens for synthesizer responses.
    pub synthesizer_max_tokens: u32,
    /// Maximum tokens for judge responses.
    pub judge_max_tokens: u32,
    /// Maximum planner invocations per turn before the loop stops
    /// executing tools and escalates to the synthesizer.
    pub max_planner_hops: usize,
    /// Maximum conversation messages retained between turns.
    pub max_history_messages: usize,
    /// Policy matches returned per search.
    pub policy_top_k: usize,
    /// Request timeout.
    pub timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for any missing
    /// files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    planner_model: Option<String>,
    synthesizer_model: Option<String>,
    judge_model: Option<String>,
    planner_max_tokens: Option<u32>,
    synthesizer_max_tokens: Option<u32>,
    judge_max_tokens: Option<u32>,
    max_planner_hops: Option<usize>,
    max_history_messages: Option<usize>,
    policy_top_k: Option<usize>,
    timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("ADVOCATE_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("ADVOCATE_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("ADVOCATE_BASE_URL"))
                .ok();
        }
        if self.planner_model.is_none() {
            self.planner_model = std::env::var("ADVOCATE_PLANNER_MODEL").ok();
        }
        if self.synthesizer_model.is_none() {
            self.synthesizer_model = std::env::var("ADVOCATE_SYNTHESIZER_MODEL").ok();
        }
        if self.judge_model.is_none() {
            self.judge_model = std::env::var("ADVOCATE_JUDGE_MODEL").ok();
        }
        if self.max_planner_hops.is_none() {
            self.max_planner_hops = std::env::var("ADVOCATE_MAX_PLANNER_HOPS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_history_messages.is_none() {
            self.max_history_messages = std::env::var("ADVOCATE_MAX_HISTORY")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.policy_top_k.is_none() {
            self.policy_top_k = std::env::var("ADVOCATE_POLICY_TOP_K")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("ADVOCATE_PROMPT_DIR").ok().map(PathBuf::from);
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

    /// Sets the planner model.
    #[must_use]
    pub fn planner_model(mut self, model: impl Into<String>) -> Self {
        self.planner_model = Some(model.into());
        self
    }

    /// Sets the synthesizer model.
    #[must_use]
    pub fn synthesizer_model(mut self, model: impl Into<String>) -> Self {
        self.synthesizer_model = Some(model.into());
        self
    }

    /// Sets the judge model.
    #[must_use]
    pub fn judge_model(mut self, model: impl Into<String>) -> Self {
        self.judge_model = Some(model.into());
        self
    }

    /// Sets the planner max tokens.
    #[must_use]
    pub const fn planner_max_tokens(mut self, n: u32) -> Self {
        self.planner_max_tokens = Some(n);
        self
    }

    /// Sets the synthesizer max tokens.
    #[must_use]
    pub const fn synthesizer_max_tokens(mut self, n: u32) -> Self {
        self.synthesizer_max_tokens = Some(n);
        self
    }

    /// Sets the judge max tokens.
    #[must_use]
    pub const fn judge_max_tokens(mut self, n: u32) -> Self {
        self.judge_max_tokens = Some(n);
        self
    }

    /// Sets the maximum planner hops per turn.
    #[must_use]
    pub const fn max_planner_hops(mut self, n: usize) -> Self {
        self.max_planner_hops = Some(n);
        self
    }

    /// Sets the maximum retained conversation messages.
    #[must_use]
    pub const fn max_history_messages(mut self, n: usize) -> Self {
        self.max_history_messages = Some(n);
        self
    }

    /// Sets the policy matches returned per search.
    #[must_use]
    pub const fn policy_top_k(mut self, n: usize) -> Self {
        self.policy_top_k = Some(n);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            planner_model: self
                .planner_model
                .unwrap_or_else(|| "gpt-5-nano".to_string()),
            synthesizer_model: self
                .synthesizer_model
                .unwrap_or_else(|| "gpt-5-nano".to_string()),
            judge_model: self.judge_model.unwrap_or_else(|| "gpt-5-nano".to_string()),
            planner_max_tokens: self.planner_max_tokens.unwrap_or(DEFAULT_PLANNER_MAX_TOKENS),
            synthesizer_max_tokens: self
                .synthesizer_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIZER_MAX_TOKENS),
            judge_max_tokens: self.judge_max_tokens.unwrap_or(DEFAULT_JUDGE_MAX_TOKENS),
            max_planner_hops: self.max_planner_hops.unwrap_or(DEFAULT_MAX_PLANNER_HOPS),
            max_history_messages: self.max_history_messages.unwrap_or(DEFAULT_MAX_HISTORY),
            policy_top_k: self.policy_top_k.unwrap_or(DEFAULT_POLICY_TOP_K),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        })
    }
}
