//! The turn state machine: planner → tools → synthesizer.
//!
//! Drives one conversational turn over the growing message history:
//! the planner either requests tool calls (which are executed and fed
//! back, looping to the planner) or finishes, at which point the
//! synthesizer produces the user-visible answer.
//!
//! The tool-call cycle carries an explicit hop cap. When the planner
//! still wants tools at the cap, the loop stops executing them and
//! escalates straight to the synthesizer with whatever context has
//! accumulated — a bounded-degradation path instead of an unbounded
//! loop or a failed turn.

use futures_util::StreamExt;
use serde::Serialize;
use tracing::{debug, warn};

use super::executor::ToolExecutor;
use super::message::{
    ChatMessage, TokenUsage, assistant_message, assistant_tool_calls_message, tool_message,
};
use super::planner::PlannerAgent;
use super::provider::LlmProvider;
use super::synthesizer::SynthesizerAgent;
use super::traits::Agent;
use crate::error::AgentError;

/// Result of one conversational turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// The synthesizer's user-visible answer.
    pub answer: String,
    /// Names of the tools invoked, in execution order.
    pub tool_flow: Vec<String>,
    /// Accumulated token usage across planner and synthesizer calls.
    pub usage: TokenUsage,
    /// Number of planner invocations.
    pub planner_hops: usize,
    /// `true` if the hop cap forced synthesis while the planner still
    /// wanted tools.
    pub forced_synthesis: bool,
}

/// Outcome of the planner/tools cycle, before synthesis.
struct PlanPhase {
    tool_flow: Vec<String>,
    usage: TokenUsage,
    planner_hops: usize,
    forced_synthesis: bool,
}

/// Runs the planner/tools cycle, mutating `history` in place.
///
/// Loops until the planner responds without tool calls or the hop cap
/// is reached. Every executed tool call appends its result to the
/// history; at the cap, the pending tool requests are dropped entirely
/// (appending them without results would leave the history invalid for
/// the next provider call).
async fn plan_phase(
    provider: &dyn LlmProvider,
    planner: &PlannerAgent,
    executor: &ToolExecutor<'_>,
    history: &mut Vec<ChatMessage>,
    max_planner_hops: usize,
) -> Result<PlanPhase, AgentError> {
    let mut usage = TokenUsage::default();
    let mut tool_flow = Vec::new();
    let mut hops = 0usize;

    loop {
        hops += 1;
        let request = planner.build_request(history);
        let response = provider.chat(&request).await?;
        usage.add(response.usage);

        if response.tool_calls.is_empty() {
            // Terminal planner output: a clarifying question or a
            // stop. Either way it joins the history and the
            // synthesizer speaks next.
            history.push(assistant_message(&response.content));
            debug!(hops, "planner finished without tool calls");
            return Ok(PlanPhase {
                tool_flow,
                usage,
                planner_hops: hops,
                forced_synthesis: false,
            });
        }

        if hops >= max_planner_hops {
            warn!(
                max_planner_hops,
                requested = response.tool_calls.len(),
                "planner hop cap reached; escalating to synthesizer"
            );
            return Ok(PlanPhase {
                tool_flow,
                usage,
                planner_hops: hops,
                forced_synthesis: true,
            });
        }

        debug!(
            hops,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        history.push(assistant_tool_calls_message(
            response.content.clone(),
            response.tool_calls.clone(),
        ));

        for call in &response.tool_calls {
            tool_flow.push(call.name.clone());
            let result = executor.execute(call);
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            history.push(tool_message(&result.tool_call_id, &result.content));
        }
    }
}

/// Runs one full turn: planner/tools cycle, then synthesis.
///
/// The caller owns the history: the user's message must already be
/// appended, and the synthesizer's answer is appended before returning.
///
/// # Errors
///
/// Returns [`AgentError`] on provider failures. Tool failures do not
/// error the turn — they are surfaced to the planner as error-flagged
/// results.
#[allow(clippy::future_not_send)]
pub async fn run_turn(
    provider: &dyn LlmProvider,
    planner: &PlannerAgent,
    synthesizer: &SynthesizerAgent,
    executor: &ToolExecutor<'_>,
    history: &mut Vec<ChatMessage>,
    max_planner_hops: usize,
) -> Result<TurnOutcome, AgentError> {
    let plan = plan_phase(provider, planner, executor, history, max_planner_hops).await?;

    let request = synthesizer.build_request(history);
    let response = provider.chat(&request).await?;
    let mut usage = plan.usage;
    usage.add(response.usage);

    history.push(assistant_message(&response.content));

    Ok(TurnOutcome {
        answer: response.content,
        tool_flow: plan.tool_flow,
        usage,
        planner_hops: plan.planner_hops,
        forced_synthesis: plan.forced_synthesis,
    })
}

/// Runs one full turn, streaming the synthesizer's answer.
///
/// Identical to [`run_turn`] except the final answer is delivered
/// incrementally through `sink` as chunks arrive. Token usage covers
/// the planner cycle only — streaming responses don't report usage.
///
/// # Errors
///
/// Returns [`AgentError`] on provider or stream failures.
#[allow(clippy::future_not_send)]
pub async fn run_turn_streaming(
    provider: &dyn LlmProvider,
    planner: &PlannerAgent,
    synthesizer: &SynthesizerAgent,
    executor: &ToolExecutor<'_>,
    history: &mut Vec<ChatMessage>,
    max_planner_hops: usize,
    sink: &mut (dyn FnMut(&str) + Send),
) -> Result<TurnOutcome, AgentError> {
    let plan = plan_phase(provider, planner, executor, history, max_planner_hops).await?;

    let mut request = synthesizer.build_request(history);
    request.stream = true;
    let mut stream = provider.chat_stream(&request).await?;

    let mut answer = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if !chunk.is_empty() {
            sink(&chunk);
            answer.push_str(&chunk);
        }
    }

    history.push(assistant_message(&answer));

    Ok(TurnOutcome {
        answer,
        tool_flow: plan.tool_flow,
        usage: plan.usage,
        planner_hops: plan.planner_hops,
        forced_synthesis: plan.forced_synthesis,
    })
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::executor::tests::fixture_policy;
    use crate::agent::message::{ChatRequest, ChatResponse, user_message};
    use crate::agent::prompt::PromptSet;
    use crate::agent::tool::ToolCall;
    use crate::agent::config::AgentConfig;
    use crate::storage::tests::fixture_store;

    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use futures_util::Stream;

    /// Mock provider: planner requests (tool-bound) get a tool call for
    /// the first N rounds, then plain text; synthesizer requests (no
    /// tools) always get plain text.
    struct MockToolProvider {
        call_count: AtomicUsize,
        tool_rounds: usize,
    }

    impl MockToolProvider {
        fn new(tool_rounds: usize) -> Self {
            Self {
                call_count: AtomicUsize::new(0),
                tool_rounds,
            }
        }
    }

    #[async_trait]
    impl LlmProvider for MockToolProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let is_planner = !request.tools.is_empty();
            let count = if is_planner {
                self.call_count.fetch_add(1, Ordering::SeqCst)
            } else {
                usize::MAX
            };

            if is_planner && count < self.tool_rounds {
                Ok(ChatResponse {
                    content: String::new(),
                    usage: TokenUsage::default(),
                    tool_calls: vec![ToolCall {
                        id: format!("call_{count}"),
                        name: "policy_search".to_string(),
                        arguments: r#"{"query":"refund rules"}"#.to_string(),
                    }],
                    finish_reason: Some("tool_calls".to_string()),
                })
            } else {
                Ok(ChatResponse {
                    content: "Final answer based on tool results.".to_string(),
                    usage: TokenUsage {
                        prompt_tokens: 100,
                        completion_tokens: 20,
                        total_tokens: 120,
                    },
                    tool_calls: Vec::new(),
                    finish_reason: Some("stop".to_string()),
                })
            }
        }

        async fn chat_stream(
            &self,
            _request: &ChatRequest,
        ) -> Result<Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>, AgentError>
        {
            let chunks = vec![Ok("Streamed ".to_string()), Ok("answer.".to_string())];
            Ok(Box::pin(futures_util::stream::iter(chunks)))
        }
    }

    fn agents() -> (PlannerAgent, SynthesizerAgent) {
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let prompts = PromptSet::defaults();
        (
            PlannerAgent::new(&config, prompts.planner),
            SynthesizerAgent::new(&config, prompts.synthesizer),
        )
    }

    #[tokio::test]
    async fn test_turn_without_tools() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);
        let provider = MockToolProvider::new(0);
        let (planner, synthesizer) = agents();

        let mut history = vec![user_message("What date is NK1200 scheduled for?")];
        let outcome = run_turn(&provider, &planner, &synthesizer, &executor, &mut history, 8)
            .await
            .unwrap_or_else(|e| panic!("run_turn failed: {e}"));

        assert_eq!(outcome.answer, "Final answer based on tool results.");
        assert!(outcome.tool_flow.is_empty());
        assert_eq!(outcome.planner_hops, 1);
        assert!(!outcome.forced_synthesis);
        // user + planner text + synthesizer answer
        assert_eq!(history.len(), 3);
    }

    #[tokio::test]
    async fn test_turn_single_tool_round() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);
        let provider = MockToolProvider::new(1);
        let (planner, synthesizer) = agents();

        let mut history = vec![user_message("Do I get a refund?")];
        let outcome = run_turn(&provider, &planner, &synthesizer, &executor, &mut history, 8)
            .await
            .unwrap_or_else(|e| panic!("run_turn failed: {e}"));

        assert_eq!(outcome.tool_flow, vec!["policy_search".to_string()]);
        assert_eq!(outcome.planner_hops, 2);
        // user + assistant(tool_calls) + tool + planner text + answer
        assert_eq!(history.len(), 5);
        // The tool result actually ran against the policy index.
        assert!(history[2].content.contains("\"ok\": true"));
    }

    #[tokio::test]
    async fn test_turn_multiple_tool_rounds() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);
        let provider = MockToolProvider::new(3);
        let (planner, synthesizer) = agents();

        let mut history = vec![user_message("query")];
        let outcome = run_turn(&provider, &planner, &synthesizer, &executor, &mut history, 8)
            .await
            .unwrap_or_else(|e| panic!("run_turn failed: {e}"));

        assert_eq!(outcome.tool_flow.len(), 3);
        assert_eq!(outcome.planner_hops, 4);
        // 1 + 3 rounds * 2 + planner text + answer = 9 messages
        assert_eq!(history.len(), 9);
    }

    #[tokio::test]
    async fn test_hop_cap_forces_synthesis() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);
        // Provider wants tools forever; cap at 2 hops.
        let provider = MockToolProvider::new(100);
        let (planner, synthesizer) = agents();

        let mut history = vec![user_message("query")];
        let outcome = run_turn(&provider, &planner, &synthesizer, &executor, &mut history, 2)
            .await
            .unwrap_or_else(|e| panic!("run_turn failed: {e}"));

        assert!(outcome.forced_synthesis);
        assert_eq!(outcome.planner_hops, 2);
        // Only the first hop's tools executed.
        assert_eq!(outcome.tool_flow.len(), 1);
        // 1 + 1 round * 2 + answer = 4 messages; the capped hop's
        // pending tool requests never reach the history.
        assert_eq!(history.len(), 4);
        assert_eq!(history[3].content, "Final answer based on tool results.");
    }

    #[tokio::test]
    async fn test_streaming_turn_collects_chunks() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);
        let provider = MockToolProvider::new(0);
        let (planner, synthesizer) = agents();

        let mut history = vec![user_message("question")];
        let mut seen = String::new();
        let mut sink = |chunk: &str| seen.push_str(chunk);
        let outcome = run_turn_streaming(
            &provider,
            &planner,
            &synthesizer,
            &executor,
            &mut history,
            8,
            &mut sink,
        )
        .await
        .unwrap_or_else(|e| panic!("run_turn_streaming failed: {e}"));

        assert_eq!(outcome.answer, "Streamed answer.");
        assert_eq!(seen, "Streamed answer.");
        assert_eq!(
            history.last().map(|m| m.content.as_str()),
            Some("Streamed answer.")
        );
    }
}
