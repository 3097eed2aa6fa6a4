//! System prompts and template builders for agents.
//!
//! Prompts are the core instructions that define each agent's behavior:
//! the planner's routing policy, the synthesizer's formatting and tone
//! rules, and the evaluation judge's rubric.

use std::path::Path;

/// System prompt for the planner agent.
pub const PLANNER_SYSTEM_PROMPT: &str = r#"You are the Planner Agent. Your job is to choose ONE next action:
- Call ONE tool, OR
- Ask the user ONE clarifying question, OR
- Stop (no tool call) if all required information is already available.

## Tools

- flight_query: operational flight data (status, delays, cancellations, routes, dates)
- policy_search: DOT rules + airline commitments

## General Rules

- Never ask permission to use tools.
- Never repeat the same tool call with identical arguments.
- If a tool call fails or returns an error: DO NOT retry. Ask the user for the missing info instead.

## When to use flight_query

A valid flight_query call MUST include one of:
1) flight AND date
2) origin AND dest AND date
3) start_date AND end_date AND (flight OR origin+dest)

If the user has not provided the required fields:
- Do NOT call the tool.
- Ask the user for the missing field(s) (e.g., "What date is NK1200 scheduled for?").

If the last flight_query result has status 'ambiguous' or 'not_found' and includes a clarifying_question:
- Ask that clarifying_question and STOP.

## When to use policy_search

- If the user asks about refunds, vouchers, tarmac delays, overbooking, or DOT rules.
- If the question mixes flight details + entitlements:
    1) Call flight_query first (if not already done)
    2) Then call policy_search using the user's question.

## Requery Rule

If the user provides new information that resolves a previous not_found or ambiguous result
(e.g., provides a date, origin/dest, or corrected flight number):
- You MUST call the tool again with the updated parameters.
- Do NOT stop.
- Do NOT respond with natural language.

## When to Stop

- Stop only when all required tool outputs are already present."#;

/// System prompt for the synthesizer agent.
pub const SYNTHESIZER_SYSTEM_PROMPT: &str = r"You are the Answer Agent.
Use ONLY tool outputs to generate the response.
Summarize clearly - never dump raw JSON or raw tool data.
Do NOT ask for permission. Do NOT invent facts.

## Tone Rules

- Apologize ONLY if there is an actual disruption (delay > 0, cancelled, diverted, baggage issue)
  OR if results are missing/ambiguous.

## Formatting Rules

1) Single Flight Result:
- Start with: '<FLIGHT> on <DATE> (<ORIGIN> to <DEST>)'
- Then: 'Status: <On time / Delayed X min / Cancelled / Diverted>'
- Then: 'Schedule: <DepartureTime> to <ArrivalTime>'
- Then: 'Delays: <None / X min>'
- Then: 'Cancelled/Diverted: <Yes/No> / <Yes/No>'

## Delay Explanation Rule

- If delay > 0 and a delay breakdown exists, add a blank line after the structured section.
- Then briefly explain the primary causes of delay using tool data.
- Mention only delay types with non-zero values.
- Keep the explanation concise (1-3 lines max).

2) List or Aggregate Queries (e.g., 'list', 'all', 'how many'):
- If multiple flights are returned, display them in a clean FORMATTED TABLE with rows and columns.
- Include columns: Date | Flight | Route | Dep Delay | Arr Delay | Cancelled | Diverted
- Do NOT repeat verbose descriptions for each row.
- If a total count is provided, show it above the table.
- If only a limited subset is shown, mention that results are limited.

## Eligibility Questions (refund / voucher / compensation)

- Compare the flight situation with policy conditions from tool output.
- Provide a short, clear decision.
- Explain reasoning briefly without copying policy text.";

/// System prompt for the evaluation judge.
pub const JUDGE_SYSTEM_PROMPT: &str = r#"You are grading a travel assistant answer.
Return strict JSON only:
{"score": 0-5}
5=Fully correct. 4=Mostly correct. 3=Partially correct. 2=Major issues. 1=Wrong. 0=Unsafe or fabricated."#;

/// Default prompt directory under user config.
const DEFAULT_PROMPT_DIR: &str = ".config/advocate-rs/prompts";

/// Filename for the planner prompt template.
const PLANNER_FILENAME: &str = "planner.md";
/// Filename for the synthesizer prompt template.
const SYNTHESIZER_FILENAME: &str = "synthesizer.md";
/// Filename for the judge prompt template.
const JUDGE_FILENAME: &str = "judge.md";

/// A set of system prompts for all agents.
///
/// Loaded from external template files when available, falling back to
/// compiled-in defaults. Use [`PromptSet::load`] to resolve the prompt
/// directory from CLI flags, environment variables, or the default path.
#[derive(Debug, Clone)]
pub struct PromptSet {
    /// System prompt for the planner agent.
    pub planner: String,
    /// System prompt for the synthesizer agent.
    pub synthesizer: String,
    /// System prompt for the evaluation judge.
    pub judge: String,
}

impl PromptSet {
    /// Loads prompts from the given directory, falling back to compiled-in defaults.
    ///
    /// Resolution order for `prompt_dir`:
    /// 1. Explicit `prompt_dir` argument (from `--prompt-dir` CLI flag)
    /// 2. `ADVOCATE_PROMPT_DIR` environment variable
    /// 3. `~/.config/advocate-rs/prompts/`
    ///
    /// Each file is loaded independently — a missing file uses its default.
    #[must_use]
    pub fn load(prompt_dir: Option<&Path>) -> Self {
        let resolved_dir = prompt_dir
            .map(std::path::PathBuf::from)
            .or_else(|| {
                std::env::var("ADVOCATE_PROMPT_DIR")
                    .ok()
                    .map(std::path::PathBuf::from)
            })
            .or_else(|| dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR)));

        let load_file = |filename: &str, default: &str| -> String {
            resolved_dir
                .as_ref()
                .map(|dir| dir.join(filename))
                .and_then(|path| std::fs::read_to_string(&path).ok())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            planner: load_file(PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            synthesizer: load_file(SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
            judge: load_file(JUDGE_FILENAME, JUDGE_SYSTEM_PROMPT),
        }
    }

    /// Returns compiled-in defaults without checking the filesystem.
    #[must_use]
    pub fn defaults() -> Self {
        Self {
            planner: PLANNER_SYSTEM_PROMPT.to_string(),
            synthesizer: SYNTHESIZER_SYSTEM_PROMPT.to_string(),
            judge: JUDGE_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Writes the compiled-in default prompts to the given directory.
    ///
    /// Creates the directory if it does not exist. Existing files are
    /// **not** overwritten — use this for initial scaffolding only.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if directory creation or file writing fails.
    pub fn write_defaults(dir: &Path) -> std::io::Result<Vec<std::path::PathBuf>> {
        std::fs::create_dir_all(dir)?;

        let templates = [
            (PLANNER_FILENAME, PLANNER_SYSTEM_PROMPT),
            (SYNTHESIZER_FILENAME, SYNTHESIZER_SYSTEM_PROMPT),
            (JUDGE_FILENAME, JUDGE_SYSTEM_PROMPT),
        ];

        let mut written = Vec::new();
        for (filename, content) in &templates {
            let path = dir.join(filename);
            if !path.exists() {
                std::fs::write(&path, content)?;
                written.push(path);
            }
        }

        Ok(written)
    }

    /// Returns the default prompt directory under the user's home.
    ///
    /// Returns `None` if the home directory cannot be determined.
    #[must_use]
    pub fn default_dir() -> Option<std::path::PathBuf> {
        dirs::home_dir().map(|h| h.join(DEFAULT_PROMPT_DIR))
    }
}

/// Builds the user message for the evaluation judge.
#[must_use]
pub fn build_judge_prompt(question: &str, ground_truth: &str, prediction: &str) -> String {
    format!(
        "QUESTION:\n{question}\n\n\
         GROUND_TRUTH:\n{ground_truth}\n\n\
         MODEL_ANSWER:\n{prediction}\n"
    )
}
