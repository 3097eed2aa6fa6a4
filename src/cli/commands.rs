//! CLI command implementations.
//!
//! Contains the business logic for each CLI command. Commands return a
//! rendered string that `main` prints; the interactive chat session and
//! streaming ask write to the console directly as they go.

#![allow(clippy::too_many_lines)]

use std::io::Write as IoWrite;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::agent::client::create_provider;
use crate::agent::config::{AgentConfig, AgentConfigBuilder};
use crate::agent::executor::ToolExecutor;
use crate::agent::message::{ChatMessage, trim_history, user_message};
use crate::agent::planner::PlannerAgent;
use crate::agent::prompt::PromptSet;
use crate::agent::provider::LlmProvider;
use crate::agent::synthesizer::SynthesizerAgent;
use crate::agent::turn::{TurnOutcome, run_turn, run_turn_streaming};
use crate::chunking::{ChunkConfig, chunk_markdown};
use crate::cli::input::{read_line, read_line_with_timeout};
use crate::cli::output::{
    OutputFormat, format_eval_report, format_flight_output, format_policy_output, to_json,
};
use crate::cli::parser::{Cli, Commands};
use crate::embedding::create_embedder;
use crate::error::{CommandError, Result};
use crate::eval::{EvalHarness, JudgeAgent, load_cases_from_path};
use crate::io::read_file;
use crate::storage::FlightStore;
use crate::tools::flight::{FlightQueryInput, run_flight_query};
use crate::tools::policy::PolicySearchTool;

/// Executes the CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    let db_path = cli.resolve_db_path();

    match &cli.command {
        Commands::Init { force } => cmd_init(&db_path, *force),
        Commands::Ingest { file } => cmd_ingest(&db_path, file),
        Commands::Status => cmd_status(&db_path, &cli.policies, format),
        Commands::Flight {
            question,
            flight,
            date,
            origin,
            dest,
            start_date,
            end_date,
        } => {
            let input = FlightQueryInput {
                question: question.clone(),
                flight: flight.clone(),
                date: date.clone(),
                origin: origin.clone(),
                dest: dest.clone(),
                start_date: start_date.clone(),
                end_date: end_date.clone(),
            };
            cmd_flight(&db_path, &input, format)
        }
        Commands::Policy {
            query,
            airline,
            top_k,
        } => cmd_policy(&cli.policies, query, airline.as_deref(), *top_k, format),
        Commands::Ask {
            question,
            trace,
            stream,
            prompt_dir,
        } => cmd_ask(
            &db_path,
            &cli.policies,
            question,
            *trace,
            *stream,
            prompt_dir.as_deref(),
            format,
        ),
        Commands::Chat {
            input_timeout,
            stream,
            prompt_dir,
        } => cmd_chat(
            &db_path,
            &cli.policies,
            *input_timeout,
            *stream,
            prompt_dir.as_deref(),
            cli.verbose,
        ),
        Commands::Eval {
            cases,
            judge_model,
            prompt_dir,
        } => cmd_eval(
            &db_path,
            &cli.policies,
            cases,
            judge_model.as_deref(),
            prompt_dir.as_deref(),
            format,
        ),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref()),
    }
}

// ==================== Data commands ====================

fn cmd_init(db_path: &Path, force: bool) -> Result<String> {
    if db_path.exists() {
        if force {
            std::fs::remove_file(db_path)?;
        } else {
            return Ok(format!(
                "Database already initialized at {} (use --force to re-initialize)",
                db_path.display()
            ));
        }
    }
    let store = FlightStore::open(db_path)?;
    store.init()?;
    Ok(format!("Initialized flights database at {}", db_path.display()))
}

fn cmd_ingest(db_path: &Path, file: &Path) -> Result<String> {
    let mut store = FlightStore::open(db_path)?;
    store.init()?;
    let content = read_file(file)?;
    let inserted = store.ingest_jsonl(&content)?;
    let total = store.count()?;
    Ok(format!(
        "Ingested {inserted} record(s) from {} ({total} total)",
        file.display()
    ))
}

fn cmd_status(db_path: &Path, policies: &Path, format: OutputFormat) -> Result<String> {
    #[derive(serde::Serialize)]
    struct Status {
        db_path: PathBuf,
        db_initialized: bool,
        flight_records: u64,
        policies_path: PathBuf,
        policies_present: bool,
        policy_chunks: usize,
    }

    let (db_initialized, flight_records) = if db_path.exists() {
        let store = FlightStore::open(db_path)?;
        store.init()?;
        (true, store.count()?)
    } else {
        (false, 0)
    };

    let (policies_present, policy_chunks) = if policies.exists() {
        let text = read_file(policies)?;
        (true, chunk_markdown(&text, &ChunkConfig::default()).len())
    } else {
        (false, 0)
    };

    let status = Status {
        db_path: db_path.to_path_buf(),
        db_initialized,
        flight_records,
        policies_path: policies.to_path_buf(),
        policies_present,
        policy_chunks,
    };

    if format == OutputFormat::Json {
        return to_json(&status);
    }
    Ok(format!(
        "Database: {} ({})\nFlight records: {}\nPolicies: {} ({})\nPolicy chunks: {}",
        status.db_path.display(),
        if status.db_initialized {
            "initialized"
        } else {
            "missing - run `advocate-rs init`"
        },
        status.flight_records,
        status.policies_path.display(),
        if status.policies_present {
            "present"
        } else {
            "missing"
        },
        status.policy_chunks,
    ))
}

// ==================== Direct tool commands ====================

fn cmd_flight(db_path: &Path, input: &FlightQueryInput, format: OutputFormat) -> Result<String> {
    let store = FlightStore::open(db_path)?;
    store.init()?;
    let output = run_flight_query(&store, input)?;
    format_flight_output(&output, format)
}

fn cmd_policy(
    policies: &Path,
    query: &str,
    airline: Option<&str>,
    top_k: usize,
    format: OutputFormat,
) -> Result<String> {
    let tool = build_policy_tool(policies, top_k)?;
    let output = tool.query(query, airline)?;
    format_policy_output(&output, format)
}

// ==================== Agent commands ====================

/// Everything a turn needs, built once per command.
struct AgentStack {
    config: AgentConfig,
    provider: std::sync::Arc<dyn LlmProvider>,
    planner: PlannerAgent,
    synthesizer: SynthesizerAgent,
    prompts: PromptSet,
}

fn build_agent_stack(
    prompt_dir: Option<&Path>,
    judge_model: Option<&str>,
) -> Result<AgentStack> {
    let mut builder: AgentConfigBuilder = AgentConfig::builder().from_env();
    if let Some(dir) = prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    if let Some(model) = judge_model {
        builder = builder.judge_model(model);
    }
    let config = builder.build()?;

    let prompts = PromptSet::load(config.prompt_dir.as_deref());
    let provider = create_provider(&config)?;
    let planner = PlannerAgent::new(&config, prompts.planner.clone());
    let synthesizer = SynthesizerAgent::new(&config, prompts.synthesizer.clone());

    Ok(AgentStack {
        config,
        provider,
        planner,
        synthesizer,
        prompts,
    })
}

fn build_policy_tool(policies: &Path, top_k: usize) -> Result<PolicySearchTool> {
    let text = read_file(policies)?;
    let embedder = create_embedder()?;
    let tool = PolicySearchTool::new(&text, embedder, top_k)?;
    info!(
        chunks = tool.chunk_count(),
        path = %policies.display(),
        "policy index ready"
    );
    Ok(tool)
}

fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CommandError::Io)
}

#[allow(clippy::print_stdout)]
fn cmd_ask(
    db_path: &Path,
    policies: &Path,
    question: &str,
    trace: bool,
    stream: bool,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let stack = build_agent_stack(prompt_dir, None)?;
    let store = FlightStore::open(db_path)?;
    store.init()?;
    let policy_tool = build_policy_tool(policies, stack.config.policy_top_k)?;
    let executor = ToolExecutor::new(&store, &policy_tool);
    let runtime = build_runtime()?;

    let mut history = vec![user_message(question)];

    let outcome = if stream {
        let mut sink = |chunk: &str| {
            print!("{chunk}");
            let _ = std::io::stdout().flush();
        };
        let outcome = runtime.block_on(run_turn_streaming(
            &*stack.provider,
            &stack.planner,
            &stack.synthesizer,
            &executor,
            &mut history,
            stack.config.max_planner_hops,
            &mut sink,
        ))?;
        println!();
        outcome
    } else {
        runtime.block_on(run_turn(
            &*stack.provider,
            &stack.planner,
            &stack.synthesizer,
            &executor,
            &mut history,
            stack.config.max_planner_hops,
        ))?
    };

    if format == OutputFormat::Json {
        return to_json(&outcome);
    }

    let mut text = if stream {
        // Already printed while streaming.
        String::new()
    } else {
        outcome.answer.clone()
    };
    if trace {
        let flow = if outcome.tool_flow.is_empty() {
            "-".to_string()
        } else {
            outcome.tool_flow.join(" -> ")
        };
        text.push_str(&format!(
            "\n\n[tool flow: {flow} | planner hops: {} | forced synthesis: {}]",
            outcome.planner_hops, outcome.forced_synthesis
        ));
    }
    Ok(text)
}

#[allow(clippy::print_stdout, clippy::print_stderr)]
fn cmd_chat(
    db_path: &Path,
    policies: &Path,
    input_timeout: Option<u64>,
    stream: bool,
    prompt_dir: Option<&Path>,
    verbose: bool,
) -> Result<String> {
    let stack = build_agent_stack(prompt_dir, None)?;
    let store = FlightStore::open(db_path)?;
    store.init()?;
    let policy_tool = build_policy_tool(policies, stack.config.policy_top_k)?;
    let executor = ToolExecutor::new(&store, &policy_tool);
    let runtime = build_runtime()?;

    println!("--- Passenger Advocate ---");
    println!("Type 'quit' to exit.\n");

    let mut history: Vec<ChatMessage> = Vec::new();

    loop {
        print!("User: ");
        std::io::stdout().flush()?;

        let line = match input_timeout {
            Some(secs) => match read_line_with_timeout(Duration::from_secs(secs))? {
                Some(line) => line,
                None => {
                    println!("\nNo input for {secs} seconds. Exiting...");
                    break;
                }
            },
            None => match read_line()? {
                Some(line) => line,
                None => break,
            },
        };

        let user_input = line.trim();
        if user_input.is_empty() {
            continue;
        }
        if user_input.eq_ignore_ascii_case("quit") || user_input.eq_ignore_ascii_case("exit") {
            println!("\nSession ended.");
            break;
        }

        history.push(user_message(user_input));
        trim_history(&mut history, stack.config.max_history_messages);

        let result: std::result::Result<TurnOutcome, _> = if stream {
            print!("Agent: ");
            std::io::stdout().flush()?;
            let mut sink = |chunk: &str| {
                print!("{chunk}");
                let _ = std::io::stdout().flush();
            };
            let outcome = runtime.block_on(run_turn_streaming(
                &*stack.provider,
                &stack.planner,
                &stack.synthesizer,
                &executor,
                &mut history,
                stack.config.max_planner_hops,
                &mut sink,
            ));
            if outcome.is_ok() {
                println!("\n");
            }
            outcome
        } else {
            let outcome = runtime.block_on(run_turn(
                &*stack.provider,
                &stack.planner,
                &stack.synthesizer,
                &executor,
                &mut history,
                stack.config.max_planner_hops,
            ));
            if let Ok(ref outcome) = outcome {
                println!("Agent: {}\n", outcome.answer);
            }
            outcome
        };

        // A failed turn is printed and the session continues.
        match result {
            Ok(outcome) => {
                if verbose && !outcome.tool_flow.is_empty() {
                    eprintln!(
                        "[tool flow: {} | hops: {}]",
                        outcome.tool_flow.join(" -> "),
                        outcome.planner_hops
                    );
                }
                trim_history(&mut history, stack.config.max_history_messages);
            }
            Err(e) => {
                println!("\nAgent error: {e}\n");
            }
        }
    }

    Ok(String::new())
}

fn cmd_eval(
    db_path: &Path,
    policies: &Path,
    cases_path: &Path,
    judge_model: Option<&str>,
    prompt_dir: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let cases = load_cases_from_path(cases_path)?;
    let stack = build_agent_stack(prompt_dir, judge_model)?;
    let store = FlightStore::open(db_path)?;
    store.init()?;
    let policy_tool = build_policy_tool(policies, stack.config.policy_top_k)?;
    let executor = ToolExecutor::new(&store, &policy_tool);
    let judge = JudgeAgent::new(&stack.config, stack.prompts.judge.clone());
    let runtime = build_runtime()?;

    info!(cases = cases.len(), "starting batch evaluation");

    let harness = EvalHarness {
        provider: &*stack.provider,
        judge_provider: &*stack.provider,
        planner: &stack.planner,
        synthesizer: &stack.synthesizer,
        judge: &judge,
        executor: &executor,
        max_planner_hops: stack.config.max_planner_hops,
    };
    let report = runtime.block_on(harness.run(&cases));

    format_eval_report(&report, format)
}

fn cmd_init_prompts(dir: Option<&Path>) -> Result<String> {
    let target = dir
        .map(Path::to_path_buf)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| CommandError::InvalidArgument {
            message: "cannot determine prompt directory; pass one explicitly".to_string(),
        })?;

    let written = PromptSet::write_defaults(&target)?;
    if written.is_empty() {
        Ok(format!(
            "Prompt templates already present in {}",
            target.display()
        ))
    } else {
        let names: Vec<String> = written
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Ok(format!("Wrote prompt templates:\n{}", names.join("\n")))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(args: &[&str]) -> Result<String> {
        let cli = Cli::parse_from(args);
        execute(&cli)
    }

    #[test]
    fn test_init_ingest_flight_roundtrip() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("flights.db");
        let db_str = db.to_string_lossy().to_string();

        let out = run(&["advocate-rs", "--db-path", &db_str, "init"])
            .unwrap_or_else(|e| panic!("init: {e}"));
        assert!(out.contains("Initialized"));

        let jsonl = dir.path().join("flights.jsonl");
        std::fs::write(
            &jsonl,
            r#"{"flight_date":"2023-12-24","airline":"NK","flight_number":"1200","origin":"LAX","dest":"LAS","dep_delay_minutes":0.0,"arr_delay_minutes":-5.0,"dep_time":905,"arr_time":1010}"#,
        )
        .unwrap_or_else(|e| panic!("write: {e}"));
        let out = run(&[
            "advocate-rs",
            "--db-path",
            &db_str,
            "ingest",
            &jsonl.to_string_lossy(),
        ])
        .unwrap_or_else(|e| panic!("ingest: {e}"));
        assert!(out.contains("Ingested 1 record(s)"));

        let out = run(&[
            "advocate-rs",
            "--db-path",
            &db_str,
            "flight",
            "Was NK1200 delayed?",
            "--flight",
            "NK1200",
            "--date",
            "2023-12-24",
        ])
        .unwrap_or_else(|e| panic!("flight: {e}"));
        assert!(out.contains("Status: ok"));
        assert!(out.contains("NK1200"));
    }

    #[test]
    fn test_init_twice_without_force() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("flights.db");
        let db_str = db.to_string_lossy().to_string();

        run(&["advocate-rs", "--db-path", &db_str, "init"])
            .unwrap_or_else(|e| panic!("init: {e}"));
        let out = run(&["advocate-rs", "--db-path", &db_str, "init"])
            .unwrap_or_else(|e| panic!("re-init: {e}"));
        assert!(out.contains("already initialized"));
    }

    #[test]
    fn test_flight_missing_fields_is_error() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("flights.db");
        let db_str = db.to_string_lossy().to_string();
        run(&["advocate-rs", "--db-path", &db_str, "init"])
            .unwrap_or_else(|e| panic!("init: {e}"));

        let result = run(&[
            "advocate-rs",
            "--db-path",
            &db_str,
            "flight",
            "Was NK1200 delayed?",
            "--flight",
            "NK1200",
        ]);
        let message = result.map(|_| String::new()).unwrap_or_else(|e| e.to_string());
        assert!(message.contains("flight+date"), "got: {message}");
    }

    #[test]
    fn test_policy_command_over_temp_document() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let policies = dir.path().join("policies.md");
        std::fs::write(
            &policies,
            "## Refunds\nRefunds within seven business days for credit card purchases.",
        )
        .unwrap_or_else(|e| panic!("write: {e}"));

        let out = run(&[
            "advocate-rs",
            "--policies",
            &policies.to_string_lossy(),
            "policy",
            "credit card refund timing",
        ])
        .unwrap_or_else(|e| panic!("policy: {e}"));
        assert!(out.contains("Refunds"));
        assert!(out.contains("match(es)"));
    }

    #[test]
    fn test_status_on_empty_workspace() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let db = dir.path().join("missing.db");
        let out = run(&[
            "advocate-rs",
            "--db-path",
            &db.to_string_lossy(),
            "--policies",
            &dir.path().join("none.md").to_string_lossy(),
            "status",
        ])
        .unwrap_or_else(|e| panic!("status: {e}"));
        assert!(out.contains("missing"));
    }

    #[test]
    fn test_init_prompts_writes_templates() {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let target = dir.path().join("prompts");
        let out = run(&[
            "advocate-rs",
            "init-prompts",
            &target.to_string_lossy(),
        ])
        .unwrap_or_else(|e| panic!("init-prompts: {e}"));
        assert!(out.contains("planner.md"));
        assert!(target.join("synthesizer.md").exists());
        assert!(target.join("judge.md").exists());
    }
}
