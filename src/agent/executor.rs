//! Tool executor that dispatches planner tool calls.
//!
//! Maps tool names to direct Rust calls against the flight store and the
//! policy index. Validation failures and data-source failures become
//! error-flagged tool results — the planner is instructed to ask the
//! user for missing information rather than retry.

use serde::Deserialize;
use tracing::debug;

use crate::error::AgentError;
use crate::storage::FlightStore;
use crate::tools::flight::{FlightQueryInput, run_flight_query};
use crate::tools::policy::PolicySearchTool;

use super::tool::{ToolCall, ToolResult};

/// Maximum raw byte length of tool argument JSON from the LLM.
const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// Executes tool calls by dispatching to the two tools.
///
/// Holds references to the flight store and the policy search tool so
/// calls run as direct function invocations, no subprocess or transport
/// in between.
pub struct ToolExecutor<'a> {
    store: &'a FlightStore,
    policy: &'a PolicySearchTool,
}

impl<'a> ToolExecutor<'a> {
    /// Creates a new executor over the given data sources.
    #[must_use]
    pub const fn new(store: &'a FlightStore, policy: &'a PolicySearchTool) -> Self {
        Self { store, policy }
    }

    /// Dispatches a tool call to the appropriate tool.
    ///
    /// Validates raw argument size before dispatch to bound payloads
    /// from the model.
    #[must_use]
    pub fn execute(&self, call: &ToolCall) -> ToolResult {
        if call.arguments.len() > MAX_TOOL_ARGS_LEN {
            return ToolResult {
                tool_call_id: call.id.clone(),
                content: format!(
                    "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                    call.arguments.len()
                ),
                is_error: true,
            };
        }

        let result = match call.name.as_str() {
            "flight_query" => self.tool_flight_query(&call.arguments),
            "policy_search" => self.tool_policy_search(&call.arguments),
            other => Err(AgentError::ToolExecution {
                name: other.to_string(),
                message: "unknown tool".to_string(),
            }),
        };

        match result {
            Ok(content) => ToolResult {
                tool_call_id: call.id.clone(),
                content,
                is_error: false,
            },
            Err(e) => {
                debug!(tool = call.name, error = %e, "tool call failed");
                ToolResult {
                    tool_call_id: call.id.clone(),
                    content: e.to_string(),
                    is_error: true,
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Tool implementations
    // -----------------------------------------------------------------------

    /// Runs a validated flight query against the on-time store.
    fn tool_flight_query(&self, args: &str) -> Result<String, AgentError> {
        let input: FlightQueryInput =
            serde_json::from_str(args).map_err(|e| AgentError::ToolExecution {
                name: "flight_query".to_string(),
                message: format!("invalid arguments: {e}"),
            })?;

        let output = run_flight_query(self.store, &input).map_err(|e| {
            AgentError::ToolExecution {
                name: "flight_query".to_string(),
                message: e.to_string(),
            }
        })?;

        serde_json::to_string_pretty(&output).map_err(|e| AgentError::ToolExecution {
            name: "flight_query".to_string(),
            message: format!("serialization error: {e}"),
        })
    }

    /// Searches the policy index.
    fn tool_policy_search(&self, args: &str) -> Result<String, AgentError> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            airline: Option<String>,
        }
        let args: Args = serde_json::from_str(args).map_err(|e| AgentError::ToolExecution {
            name: "policy_search".to_string(),
            message: format!("invalid arguments: {e}"),
        })?;

        let output = self
            .policy
            .query(&args.query, args.airline.as_deref())
            .map_err(|e| AgentError::ToolExecution {
                name: "policy_search".to_string(),
                message: e.to_string(),
            })?;

        serde_json::to_string_pretty(&output).map_err(|e| AgentError::ToolExecution {
            name: "policy_search".to_string(),
            message: format!("serialization error: {e}"),
        })
    }
}

impl std::fmt::Debug for ToolExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolExecutor").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
pub(crate) mod tests {
    use super::*;
    use crate::embedding::HashedEmbedder;
    use crate::storage::tests::fixture_store;

    pub(crate) fn fixture_policy() -> PolicySearchTool {
        const POLICY: &str = "## Refunds\nRefunds to the original form of payment within seven \
            business days for credit card purchases.\n\n## Tarmac Delays\nFood and water must \
            be offered within two hours.";
        PolicySearchTool::new(POLICY, Box::new(HashedEmbedder::new()), 3)
            .unwrap_or_else(|e| panic!("policy tool: {e}"))
    }

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            name: name.to_string(),
            arguments: arguments.to_string(),
        }
    }

    #[test]
    fn test_flight_query_ok() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let result = executor.execute(&call(
            "flight_query",
            r#"{"question":"Was NK1200 delayed on 2023-12-24?","flight":"NK1200","date":"2023-12-24"}"#,
        ));
        assert!(!result.is_error, "expected success, got: {}", result.content);
        assert!(result.content.contains("\"status\": \"ok\""));
        assert!(result.content.contains("\"NK\""));
    }

    #[test]
    fn test_flight_query_validation_error_is_tool_error() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let result = executor.execute(&call(
            "flight_query",
            r#"{"question":"was my flight late?","flight":"NK1200"}"#,
        ));
        assert!(result.is_error);
        assert!(result.content.contains("flight+date"));
    }

    #[test]
    fn test_flight_query_malformed_json() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let result = executor.execute(&call("flight_query", "{not json"));
        assert!(result.is_error);
        assert!(result.content.contains("invalid arguments"));
    }

    #[test]
    fn test_policy_search_ok() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let result = executor.execute(&call(
            "policy_search",
            r#"{"query":"refund to credit card","airline":"UA"}"#,
        ));
        assert!(!result.is_error, "expected success, got: {}", result.content);
        assert!(result.content.contains("\"ok\": true"));
        assert!(result.content.contains("United Airlines"));
    }

    #[test]
    fn test_policy_search_empty_query() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let result = executor.execute(&call("policy_search", r#"{"query":"  "}"#));
        assert!(!result.is_error);
        assert!(result.content.contains("\"ok\": false"));
        assert!(result.content.contains("\"match_count\": 0"));
    }

    #[test]
    fn test_unknown_tool() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let result = executor.execute(&call("nonexistent_tool", "{}"));
        assert!(result.is_error);
        assert!(result.content.contains("unknown tool"));
    }

    #[test]
    fn test_oversized_arguments_rejected() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);

        let huge = format!(r#"{{"query":"{}"}}"#, "x".repeat(MAX_TOOL_ARGS_LEN + 1));
        let result = executor.execute(&call("policy_search", &huge));
        assert!(result.is_error);
        assert!(result.content.contains("too large"));
    }
}
