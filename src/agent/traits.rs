//! Agent trait definition.
//!
//! The planner, synthesizer and judge all implement this trait, which
//! pairs a fixed system prompt and model configuration with helpers for
//! building provider requests.

use async_trait::async_trait;

use super::message::{ChatMessage, ChatRequest, system_message, user_message};
use super::provider::LlmProvider;
use super::tool::ToolDefinition;
use crate::error::AgentError;

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Token usage for this call.
    pub usage: super::message::TokenUsage,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role (planning, synthesis, judging)
/// with a fixed system prompt and model configuration. The turn loop
/// calls [`Agent::build_request`] with the conversation history; the
/// judge uses the single-message [`Agent::execute`] convenience.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// Model identifier to use for this agent.
    fn model(&self) -> &str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Tool definitions available to this agent.
    ///
    /// Returns an empty vec by default (no tools). The planner overrides
    /// this with the two passenger-advocate tools.
    fn tools(&self) -> Vec<ToolDefinition> {
        Vec::new()
    }

    /// Builds a chat request from the conversation history.
    ///
    /// The agent's system prompt is prepended; the history is passed
    /// through unchanged.
    fn build_request(&self, history: &[ChatMessage]) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(system_message(self.system_prompt()));
        messages.extend_from_slice(history);

        ChatRequest {
            model: self.model().to_string(),
            messages,
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
            stream: false,
            tools: self.tools(),
        }
    }

    /// Executes the agent with a single user message and no prior history.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or response parsing errors.
    async fn execute(
        &self,
        provider: &dyn LlmProvider,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let request = self.build_request(&[user_message(user_msg)]);
        let response = provider.chat(&request).await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
