//! The passenger-advocate agent loop.
//!
//! An LLM-driven turn pipeline over a growing message history, with two
//! tools and a pluggable provider abstraction backed by
//! OpenAI-compatible APIs.
//!
//! # Architecture
//!
//! ```text
//! User message → run_turn
//!   ├── PlannerAgent (tool-bound; picks the next action)
//!   │     ├── tool calls → ToolExecutor (flight_query / policy_search)
//!   │     │                  └── results appended → back to planner
//!   │     └── no tool calls → fall through
//!   └── SynthesizerAgent → final user-visible answer
//! ```
//!
//! The planner/tools cycle is bounded by `max_planner_hops`; at the cap
//! the turn escalates to the synthesizer with the accumulated context.
//! Everything is constructor-injected — the CLI owns the provider, the
//! data sources, and the configuration.

pub mod client;
pub mod config;
pub mod executor;
pub mod message;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod synthesizer;
pub mod tool;
pub mod traits;
pub mod turn;

// Re-export key types
pub use client::create_provider;
pub use config::AgentConfig;
pub use executor::ToolExecutor;
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, TokenUsage, trim_history};
pub use planner::PlannerAgent;
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use synthesizer::SynthesizerAgent;
pub use tool::{ToolCall, ToolDefinition, ToolResult, ToolSet};
pub use traits::{Agent, AgentResponse};
pub use turn::{TurnOutcome, run_turn, run_turn_streaming};
