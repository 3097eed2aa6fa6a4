//! Provider-agnostic message types for LLM communication.
//!
//! These types decouple the turn loop from any specific LLM SDK. The
//! conversation state is an ordered message sequence: append-only during
//! a turn, trimmed from the front by the loop driver when it exceeds the
//! configured maximum.

use serde::{Deserialize, Serialize};

use super::tool::{ToolCall, ToolDefinition};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
    /// Tool result.
    Tool,
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
    /// Tool calls requested by the assistant (only for `Role::Assistant`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool call ID this message responds to (only for `Role::Tool`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// A chat completion request (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier.
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0-2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request JSON-formatted output.
    pub json_mode: bool,
    /// Stream the response.
    pub stream: bool,
    /// Tool definitions available to the model.
    pub tools: Vec<ToolDefinition>,
}

/// Token usage statistics from a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: u32,
    /// Tokens generated in the completion.
    pub completion_tokens: u32,
    /// Total tokens used.
    pub total_tokens: u32,
}

impl TokenUsage {
    /// Accumulates another usage record into this one (saturating).
    pub const fn add(&mut self, other: Self) {
        self.prompt_tokens = self.prompt_tokens.saturating_add(other.prompt_tokens);
        self.completion_tokens = self.completion_tokens.saturating_add(other.completion_tokens);
        self.total_tokens = self.total_tokens.saturating_add(other.total_tokens);
    }
}

/// A chat completion response (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated text content.
    pub content: String,
    /// Token usage statistics.
    pub usage: TokenUsage,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Finish reason from the model (e.g., `"stop"`, `"tool_calls"`).
    pub finish_reason: Option<String>,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::System,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::User,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates an assistant message (plain text).
#[must_use]
pub fn assistant_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: None,
    }
}

/// Creates an assistant message carrying tool calls.
#[must_use]
pub fn assistant_tool_calls_message(content: String, tool_calls: Vec<ToolCall>) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content,
        tool_calls,
        tool_call_id: None,
    }
}

/// Creates a tool result message.
#[must_use]
pub fn tool_message(tool_call_id: &str, content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Tool,
        content: content.to_string(),
        tool_calls: Vec::new(),
        tool_call_id: Some(tool_call_id.to_string()),
    }
}

/// Trims the history to its last `max` messages, dropping from the front.
///
/// A trim never starts the retained window on a tool-result message:
/// providers reject a `tool` message whose preceding assistant tool-call
/// message was dropped, so the window is advanced past any leading tool
/// results.
pub fn trim_history(messages: &mut Vec<ChatMessage>, max: usize) {
    if messages.len() <= max {
        return;
    }
    let mut start = messages.len() - max;
    while start < messages.len() && messages[start].role == Role::Tool {
        start += 1;
    }
    messages.drain(..start);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_message() {
        let msg = system_message("You are the planner.");
        assert_eq!(msg.role, Role::System);
        assert_eq!(msg.content, "You are the planner.");
        assert!(msg.tool_calls.is_empty());
        assert!(msg.tool_call_id.is_none());
    }

    #[test]
    fn test_user_message() {
        let msg = user_message("Was NK1200 delayed on 2023-12-24?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Was NK1200 delayed on 2023-12-24?");
    }

    #[test]
    fn test_tool_message() {
        let msg = tool_message("call_123", r#"{"status":"ok"}"#);
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_call_id.as_deref(), Some("call_123"));
    }

    #[test]
    fn test_assistant_tool_calls_message() {
        let calls = vec![ToolCall {
            id: "call_1".to_string(),
            name: "flight_query".to_string(),
            arguments: r#"{"question":"was UA351 late","flight":"UA351","date":"2023-12-24"}"#
                .to_string(),
        }];
        let msg = assistant_tool_calls_message(String::new(), calls);
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.content.is_empty());
        assert_eq!(msg.tool_calls.len(), 1);
        assert_eq!(msg.tool_calls[0].name, "flight_query");
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&Role::System).unwrap_or_default();
        assert_eq!(json, "\"system\"");

        let json = serde_json::to_string(&Role::Tool).unwrap_or_default();
        assert_eq!(json, "\"tool\"");
    }

    #[test]
    fn test_chat_message_serialization() {
        let msg = user_message("test");
        let json = serde_json::to_string(&msg).unwrap_or_default();
        assert!(json.contains("\"user\""));
        // tool_calls and tool_call_id are omitted when empty/None
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("tool_call_id"));
    }

    #[test]
    fn test_usage_accumulates() {
        let mut usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 10,
            total_tokens: 110,
        };
        usage.add(TokenUsage {
            prompt_tokens: 50,
            completion_tokens: 5,
            total_tokens: 55,
        });
        assert_eq!(usage.total_tokens, 165);
    }

    #[test]
    fn test_trim_history_noop_under_max() {
        let mut messages = vec![user_message("a"), assistant_message("b")];
        trim_history(&mut messages, 20);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn test_trim_history_drops_from_front() {
        let mut messages: Vec<ChatMessage> =
            (0..25).map(|i| user_message(&format!("m{i}"))).collect();
        trim_history(&mut messages, 20);
        assert_eq!(messages.len(), 20);
        assert_eq!(messages[0].content, "m5");
        assert_eq!(messages[19].content, "m24");
    }

    #[test]
    fn test_trim_history_skips_leading_tool_results() {
        let mut messages = vec![
            user_message("question"),
            assistant_tool_calls_message(
                String::new(),
                vec![ToolCall {
                    id: "call_1".to_string(),
                    name: "flight_query".to_string(),
                    arguments: "{}".to_string(),
                }],
            ),
            tool_message("call_1", "{}"),
            assistant_message("answer"),
        ];
        // A window of 2 would start on the tool result; it advances past it.
        trim_history(&mut messages, 2);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::Assistant);
        assert_eq!(messages[0].content, "answer");
    }
}
