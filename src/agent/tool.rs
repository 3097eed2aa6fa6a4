//! Tool type definitions for function-calling.
//!
//! Provider-agnostic types for tool definitions, calls, and results.
//! Two tools are exposed to the planner: `flight_query` against the
//! on-time store and `policy_search` against the policy index.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match the dispatch table in the executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

/// A tool call requested by the LLM.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call (assigned by the provider).
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (JSON string on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
}

/// A set of tool definitions scoped to an agent role.
///
/// The planner gets both tools; the synthesizer and the judge get none
/// (they work from the accumulated history alone).
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Tool set for the planner agent: `flight_query` and `policy_search`.
    #[must_use]
    pub fn planner_tools() -> Self {
        Self {
            definitions: vec![def_flight_query(), def_policy_search()],
        }
    }

    /// Empty tool set (no tools available).
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

// ---------------------------------------------------------------------------
// Tool schema definitions
// ---------------------------------------------------------------------------

/// Defines the `flight_query` tool.
fn def_flight_query() -> ToolDefinition {
    ToolDefinition {
        name: "flight_query".to_string(),
        description: "Query flight operations data. Use for ANY question about flight status, \
                       delays, cancellations, origin/destination routes, how many flights \
                       (aggregates), or date / date-range queries. A valid call must include \
                       flight+date, OR origin+dest+date, OR start_date+end_date plus flight or \
                       origin+dest."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "question": {
                    "type": "string",
                    "description": "Exact user message."
                },
                "flight": {
                    "type": "string",
                    "description": "Flight designator, e.g. AA205, UA2726."
                },
                "date": {
                    "type": "string",
                    "description": "Date in YYYY-MM-DD."
                },
                "origin": {
                    "type": "string",
                    "description": "Origin airport code (3 letters like SEA)."
                },
                "dest": {
                    "type": "string",
                    "description": "Destination airport code."
                },
                "start_date": {
                    "type": "string",
                    "description": "Range start date in YYYY-MM-DD."
                },
                "end_date": {
                    "type": "string",
                    "description": "Range end date in YYYY-MM-DD."
                }
            },
            "required": ["question"],
            "additionalProperties": false
        }),
    }
}

/// Defines the `policy_search` tool.
fn def_policy_search() -> ToolDefinition {
    ToolDefinition {
        name: "policy_search".to_string(),
        description: "Search airline policies for passenger entitlements. Use for ANY question \
                       about vouchers, meals, refunds, cancellations, rebooking rights, DOT \
                       rules, overbooking, or tarmac delays. Returns the top matching policy \
                       snippets with their section paths."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Natural language policy question."
                },
                "airline": {
                    "type": "string",
                    "description": "Optional airline code like UA, AA, DL or airline name like \
                                    United Airlines, Alaska Airlines."
                }
            },
            "required": ["query"],
            "additionalProperties": false
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toolset_planner() {
        let ts = ToolSet::planner_tools();
        assert_eq!(ts.len(), 2);
        let names: Vec<&str> = ts.definitions().iter().map(|d| d.name.as_str()).collect();
        assert!(names.contains(&"flight_query"));
        assert!(names.contains(&"policy_search"));
    }

    #[test]
    fn test_toolset_none() {
        let ts = ToolSet::none();
        assert!(ts.is_empty());
        assert_eq!(ts.len(), 0);
    }

    #[test]
    fn test_flight_query_schema_fields() {
        let def = def_flight_query();
        assert_eq!(def.parameters["required"], json!(["question"]));
        let properties = &def.parameters["properties"];
        for field in [
            "question",
            "flight",
            "date",
            "origin",
            "dest",
            "start_date",
            "end_date",
        ] {
            assert!(properties.get(field).is_some(), "missing field: {field}");
        }
    }

    #[test]
    fn test_policy_search_schema_fields() {
        let def = def_policy_search();
        assert_eq!(def.parameters["required"], json!(["query"]));
        assert!(def.parameters["properties"].get("airline").is_some());
    }

    #[test]
    fn test_tool_call_serialization() {
        let call = ToolCall {
            id: "call_123".to_string(),
            name: "policy_search".to_string(),
            arguments: r#"{"query":"tarmac delay rules","airline":"UA"}"#.to_string(),
        };
        let json = serde_json::to_string(&call).unwrap_or_default();
        assert!(json.contains("call_123"));
        assert!(json.contains("policy_search"));
    }

    #[test]
    fn test_all_definitions_have_valid_schemas() {
        for def in ToolSet::planner_tools().definitions() {
            assert!(!def.name.is_empty());
            assert!(!def.description.is_empty());
            assert!(def.parameters.is_object());
            assert_eq!(def.parameters["type"], "object");
        }
    }
}
