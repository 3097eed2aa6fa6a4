//! Batch evaluation harness.
//!
//! Drives the full agent loop over newline-delimited JSON test cases,
//! grades each answer with an independent judge model, and aggregates
//! per-case metrics (judge score, latency, tool-call sequence) into
//! means. Cases run sequentially; a failed turn scores 0 and records
//! the error without aborting the batch. Metrics are emitted through
//! `tracing` as they are produced.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::config::AgentConfig;
use crate::agent::executor::ToolExecutor;
use crate::agent::message::user_message;
use crate::agent::planner::PlannerAgent;
use crate::agent::prompt::build_judge_prompt;
use crate::agent::provider::LlmProvider;
use crate::agent::synthesizer::SynthesizerAgent;
use crate::agent::traits::Agent;
use crate::agent::turn::run_turn;
use crate::error::EvalError;

/// Maximum judge score on the rubric.
pub const MAX_JUDGE_SCORE: u8 = 5;

/// One evaluation case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    /// The user question to run through the agent.
    pub question: String,
    /// Ground-truth answer for the judge.
    pub expected_answer: String,
}

/// Loads cases from newline-delimited JSON content.
///
/// Blank lines are skipped.
///
/// # Errors
///
/// Returns [`EvalError::Case`] naming the first malformed line, or
/// [`EvalError::Empty`] if no cases remain.
pub fn load_cases(content: &str) -> Result<Vec<EvalCase>, EvalError> {
    let mut cases = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let case: EvalCase = serde_json::from_str(line).map_err(|e| EvalError::Case {
            line: i + 1,
            message: e.to_string(),
        })?;
        cases.push(case);
    }
    if cases.is_empty() {
        return Err(EvalError::Empty);
    }
    Ok(cases)
}

/// Loads cases from a JSONL file.
///
/// # Errors
///
/// Returns [`EvalError::Io`] if the file can't be read, plus the
/// [`load_cases`] errors.
pub fn load_cases_from_path(path: &Path) -> Result<Vec<EvalCase>, EvalError> {
    let content = std::fs::read_to_string(path).map_err(|source| EvalError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_cases(&content)
}

/// The evaluation judge agent.
///
/// An independent model prompted to return strict JSON
/// `{"score": 0-5}`. Responses that fail to parse score 0.
pub struct JudgeAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl JudgeAgent {
    /// Creates a new judge with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.judge_model.clone(),
            max_tokens: config.judge_max_tokens,
            system_prompt,
        }
    }

    /// Grades a prediction against the ground truth.
    ///
    /// Never fails: judge errors and unparseable responses score 0.
    pub async fn score(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        ground_truth: &str,
        prediction: &str,
    ) -> u8 {
        let prompt = build_judge_prompt(question, ground_truth, prediction);
        match self.execute(provider, &prompt).await {
            Ok(response) => Self::parse_score(&response.content),
            Err(e) => {
                warn!(error = %e, "judge call failed; scoring 0");
                0
            }
        }
    }

    /// Parses `{"score": n}` from the judge's response, unwrapping
    /// markdown code fences. Anything unparseable scores 0; parsed
    /// scores are clamped to the rubric range.
    fn parse_score(content: &str) -> u8 {
        let trimmed = content.trim();
        let json_str = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        let parsed = serde_json::from_str::<serde_json::Value>(json_str)
            .ok()
            .and_then(|v| {
                let score = v.get("score")?;
                score
                    .as_i64()
                    .or_else(|| score.as_f64().map(|f| f as i64))
            });

        match parsed {
            Some(score) => u8::try_from(score.clamp(0, i64::from(MAX_JUDGE_SCORE))).unwrap_or(0),
            None => {
                warn!(content = json_str, "judge response not parseable; scoring 0");
                0
            }
        }
    }
}

#[async_trait]
impl Agent for JudgeAgent {
    fn name(&self) -> &'static str {
        "judge"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Per-case evaluation result.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    /// The question as asked.
    pub question: String,
    /// The agent's final answer (empty when the turn failed).
    pub answer: String,
    /// Names of the tools invoked, in execution order.
    pub tool_flow: Vec<String>,
    /// Judge score on the 0-5 rubric.
    pub judge_score: u8,
    /// Wall-clock latency of the agent turn in milliseconds.
    pub latency_ms: u64,
    /// Turn error, when the case failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated evaluation report.
#[derive(Debug, Clone, Serialize)]
pub struct EvalReport {
    /// Per-case results in input order.
    pub cases: Vec<CaseResult>,
    /// Mean judge score.
    pub avg_judge_score: f64,
    /// Mean turn latency in milliseconds.
    pub avg_latency_ms: f64,
    /// Mean tool calls per case.
    pub avg_tool_calls: f64,
}

impl EvalReport {
    /// Computes aggregate means from per-case results.
    #[must_use]
    pub fn from_cases(cases: Vec<CaseResult>) -> Self {
        #[allow(clippy::cast_precision_loss)]
        let n = cases.len().max(1) as f64;
        let avg_judge_score = cases.iter().map(|c| f64::from(c.judge_score)).sum::<f64>() / n;
        #[allow(clippy::cast_precision_loss)]
        let avg_latency_ms = cases.iter().map(|c| c.latency_ms as f64).sum::<f64>() / n;
        #[allow(clippy::cast_precision_loss)]
        let avg_tool_calls = cases.iter().map(|c| c.tool_flow.len() as f64).sum::<f64>() / n;
        Self {
            cases,
            avg_judge_score,
            avg_latency_ms,
            avg_tool_calls,
        }
    }
}

/// Everything the batch runner needs, constructor-injected.
pub struct EvalHarness<'a> {
    /// Provider serving the planner and synthesizer.
    pub provider: &'a dyn LlmProvider,
    /// Provider serving the judge (may be the same instance).
    pub judge_provider: &'a dyn LlmProvider,
    /// The planner agent.
    pub planner: &'a PlannerAgent,
    /// The synthesizer agent.
    pub synthesizer: &'a SynthesizerAgent,
    /// The judge agent.
    pub judge: &'a JudgeAgent,
    /// Tool executor over the data sources.
    pub executor: &'a ToolExecutor<'a>,
    /// Planner hop cap per turn.
    pub max_planner_hops: usize,
}

impl EvalHarness<'_> {
    /// Runs every case sequentially and aggregates the report.
    ///
    /// Each case starts from an empty history. A turn error records a
    /// score of 0 with the error string; the batch continues.
    #[allow(clippy::future_not_send)]
    pub async fn run(&self, cases: &[EvalCase]) -> EvalReport {
        let mut results = Vec::with_capacity(cases.len());

        for (i, case) in cases.iter().enumerate() {
            let start = Instant::now();
            let mut history = vec![user_message(&case.question)];

            let result = match run_turn(
                self.provider,
                self.planner,
                self.synthesizer,
                self.executor,
                &mut history,
                self.max_planner_hops,
            )
            .await
            {
                Ok(outcome) => {
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    let judge_score = self
                        .judge
                        .score(
                            self.judge_provider,
                            &case.question,
                            &case.expected_answer,
                            &outcome.answer,
                        )
                        .await;
                    info!(
                        case = i,
                        judge_score,
                        latency_ms,
                        tool_flow = outcome.tool_flow.join(" -> "),
                        "case evaluated"
                    );
                    CaseResult {
                        question: case.question.clone(),
                        answer: outcome.answer,
                        tool_flow: outcome.tool_flow,
                        judge_score,
                        latency_ms,
                        error: None,
                    }
                }
                Err(e) => {
                    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                    warn!(case = i, error = %e, "case turn failed; scoring 0");
                    CaseResult {
                        question: case.question.clone(),
                        answer: String::new(),
                        tool_flow: Vec::new(),
                        judge_score: 0,
                        latency_ms,
                        error: Some(e.to_string()),
                    }
                }
            };
            results.push(result);
        }

        let report = EvalReport::from_cases(results);
        info!(
            cases = report.cases.len(),
            avg_judge_score = report.avg_judge_score,
            avg_latency_ms = report.avg_latency_ms,
            avg_tool_calls = report.avg_tool_calls,
            "evaluation complete"
        );
        report
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::executor::tests::fixture_policy;
    use crate::agent::message::{ChatRequest, ChatResponse, TokenUsage};
    use crate::agent::prompt::PromptSet;
    use crate::error::AgentError;
    use crate::storage::tests::fixture_store;

    use std::pin::Pin;

    use async_trait::async_trait;
    use futures_util::Stream;
    use test_case::test_case;

    #[test]
    fn test_load_cases() {
        let content = r#"{"question":"Was NK1200 delayed on 2023-12-24?","expected_answer":"It departed on time."}

{"question":"Do I get a refund?","expected_answer":"Yes, within 7 days."}
"#;
        let cases = load_cases(content).unwrap_or_else(|e| panic!("load: {e}"));
        assert_eq!(cases.len(), 2);
        assert!(cases[0].question.contains("NK1200"));
    }

    #[test]
    fn test_load_cases_reports_bad_line() {
        let content = "{\"question\":\"q\",\"expected_answer\":\"a\"}\nnot json\n";
        let result = load_cases(content);
        let message = result.map(|_| String::new()).unwrap_or_else(|e| e.to_string());
        assert!(message.contains("line 2"), "got: {message}");
    }

    #[test]
    fn test_load_cases_empty() {
        assert!(matches!(load_cases("\n\n"), Err(EvalError::Empty)));
    }

    #[test_case(r#"{"score": 4}"#, 4; "plain json")]
    #[test_case("```json\n{\"score\": 3}\n```", 3; "fenced json")]
    #[test_case(r#"{"score": 4.0}"#, 4; "float score")]
    #[test_case(r#"{"score": 99}"#, 5; "clamped high")]
    #[test_case(r#"{"score": -2}"#, 0; "clamped low")]
    #[test_case("the answer is good", 0; "prose fails to 0")]
    #[test_case(r#"{"grade": 4}"#, 0; "missing field fails to 0")]
    #[test_case("", 0; "empty fails to 0")]
    fn test_parse_score(content: &str, expected: u8) {
        assert_eq!(JudgeAgent::parse_score(content), expected);
    }

    #[test]
    fn test_report_aggregates() {
        let cases = vec![
            CaseResult {
                question: "a".to_string(),
                answer: "x".to_string(),
                tool_flow: vec!["flight_query".to_string()],
                judge_score: 5,
                latency_ms: 100,
                error: None,
            },
            CaseResult {
                question: "b".to_string(),
                answer: "y".to_string(),
                tool_flow: vec!["flight_query".to_string(), "policy_search".to_string()],
                judge_score: 3,
                latency_ms: 300,
                error: None,
            },
        ];
        let report = EvalReport::from_cases(cases);
        assert!((report.avg_judge_score - 4.0).abs() < f64::EPSILON);
        assert!((report.avg_latency_ms - 200.0).abs() < f64::EPSILON);
        assert!((report.avg_tool_calls - 1.5).abs() < f64::EPSILON);
    }

    /// Mock provider: text answers for the agent, strict JSON for the
    /// judge (json_mode requests).
    struct MockEvalProvider;

    #[async_trait]
    impl LlmProvider for MockEvalProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
            let content = if request.json_mode {
                r#"{"score": 4}"#.to_string()
            } else {
                "The flight departed on time.".to_string()
            };
            Ok(ChatResponse {
                content,
                usage: TokenUsage::default(),
                tool_calls: Vec::new(),
                finish_reason: Some("stop".to_string()),
            })
        }

        async fn chat_stream(
            &self,
            _request: &ChatRequest,
        ) -> Result<Pin<Box<dyn Stream<Item = Result<String, AgentError>> + Send>>, AgentError>
        {
            Err(AgentError::Stream {
                message: "not implemented".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_harness_runs_all_cases() {
        let store = fixture_store();
        let policy = fixture_policy();
        let executor = ToolExecutor::new(&store, &policy);
        let provider = MockEvalProvider;
        let config = AgentConfig::builder()
            .api_key("test")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let prompts = PromptSet::defaults();
        let planner = PlannerAgent::new(&config, prompts.planner);
        let synthesizer = SynthesizerAgent::new(&config, prompts.synthesizer);
        let judge = JudgeAgent::new(&config, prompts.judge);

        let harness = EvalHarness {
            provider: &provider,
            judge_provider: &provider,
            planner: &planner,
            synthesizer: &synthesizer,
            judge: &judge,
            executor: &executor,
            max_planner_hops: 8,
        };

        let cases = vec![
            EvalCase {
                question: "Was NK1200 delayed on 2023-12-24?".to_string(),
                expected_answer: "It departed on time.".to_string(),
            },
            EvalCase {
                question: "Do I get a refund for a cancelled flight?".to_string(),
                expected_answer: "Yes, within seven business days.".to_string(),
            },
        ];

        let report = harness.run(&cases).await;
        assert_eq!(report.cases.len(), 2);
        assert!((report.avg_judge_score - 4.0).abs() < f64::EPSILON);
        assert!(report.cases.iter().all(|c| c.error.is_none()));
        assert!(report.cases.iter().all(|c| c.judge_score == 4));
    }
}
