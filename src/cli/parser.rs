//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::storage::{DEFAULT_DB_DIR, DEFAULT_DB_FILE};

/// advocate-rs: passenger advocate agent.
///
/// Answers airline-policy and flight-status questions by orchestrating
/// an LLM planner, a policy retrieval tool, a flight on-time database,
/// and a response synthesizer.
#[derive(Parser, Debug)]
#[command(name = "advocate-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the flights database file.
    ///
    /// Defaults to `.advocate/flights.db` in the current directory.
    #[arg(short, long, env = "ADVOCATE_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Path to the policy markdown document.
    #[arg(
        short,
        long,
        env = "ADVOCATE_POLICIES",
        default_value = "data/policies.md",
        global = true
    )]
    pub policies: PathBuf,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolves the database path: flag/env value or the default.
    #[must_use]
    pub fn resolve_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_DIR).join(DEFAULT_DB_FILE))
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the flights database.
    ///
    /// Creates the database file and schema if they don't exist.
    #[command(after_help = r#"Examples:
  advocate-rs init                     # Initialize in current directory
  advocate-rs init --force             # Re-initialize (destroys existing data)
  advocate-rs --db-path ./my.db init   # Initialize with custom path
"#)]
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Load on-time flight records from a JSONL file.
    #[command(after_help = r#"Examples:
  advocate-rs ingest flights.jsonl

Each line is one JSON object:
  {"flight_date":"2023-12-24","airline":"UA","flight_number":"351",
   "origin":"ORD","dest":"SFO","dep_delay_minutes":62.0,...}
"#)]
    Ingest {
        /// Path to the JSONL file.
        file: PathBuf,
    },

    /// Show database and policy document status.
    Status,

    /// Query flight operations data directly (no LLM).
    #[command(after_help = r#"Examples:
  advocate-rs flight "Was NK1200 delayed?" --flight NK1200 --date 2023-12-24
  advocate-rs flight "list all flights from LAX to DFW" --origin LAX --dest DFW --date 2023-12-24
  advocate-rs flight "how often was UA351 late" --flight UA351 --start-date 2023-12-01 --end-date 2023-12-31
"#)]
    Flight {
        /// The question (drives the aggregate-intent row cap).
        question: String,

        /// Flight designator, e.g. AA205, UA2726.
        #[arg(long)]
        flight: Option<String>,

        /// Date in YYYY-MM-DD.
        #[arg(long)]
        date: Option<String>,

        /// Origin airport code.
        #[arg(long)]
        origin: Option<String>,

        /// Destination airport code.
        #[arg(long)]
        dest: Option<String>,

        /// Range start date in YYYY-MM-DD.
        #[arg(long)]
        start_date: Option<String>,

        /// Range end date in YYYY-MM-DD.
        #[arg(long)]
        end_date: Option<String>,
    },

    /// Search the policy document directly (no LLM).
    #[command(after_help = r#"Examples:
  advocate-rs policy "hotel and meal vouchers for overnight delays" --airline NK
  advocate-rs policy "tarmac delay food and water" -k 5
  advocate-rs --format json policy "refund timing" | jq '.matches[].path'
"#)]
    Policy {
        /// Natural language policy question.
        query: String,

        /// Airline code (UA) or name (United Airlines).
        #[arg(long)]
        airline: Option<String>,

        /// Maximum number of matches.
        #[arg(short = 'k', long, default_value = "3")]
        top_k: usize,
    },

    /// Ask one question through the full agent loop.
    #[command(after_help = r#"Examples:
  advocate-rs ask "Why was flight UA0351 delayed on 2023-12-24?"
  advocate-rs ask "Was NK1200 delayed on 2023-12-24?" --trace
  advocate-rs ask "Do I get a refund for a cancelled flight?" --stream
"#)]
    Ask {
        /// The question.
        question: String,

        /// Print the tool-call sequence after the answer.
        #[arg(long)]
        trace: bool,

        /// Stream the answer as it is generated.
        #[arg(long)]
        stream: bool,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Start an interactive chat session.
    ///
    /// Reads lines from standard input; 'quit' or 'exit' ends the
    /// session.
    Chat {
        /// Exit after this many seconds without input.
        #[arg(long)]
        input_timeout: Option<u64>,

        /// Stream answers as they are generated.
        #[arg(long)]
        stream: bool,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Run batch evaluation over JSONL test cases.
    #[command(after_help = r#"Examples:
  advocate-rs eval testcases.jsonl
  advocate-rs eval testcases.jsonl --judge-model gpt-5-nano
  advocate-rs --format json eval testcases.jsonl > report.json

Each case line: {"question": "...", "expected_answer": "..."}
"#)]
    Eval {
        /// Path to the JSONL case file.
        cases: PathBuf,

        /// Model for the evaluation judge.
        #[arg(long)]
        judge_model: Option<String>,

        /// Directory containing prompt template files.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Write the default prompt templates for customization.
    InitPrompts {
        /// Target directory (defaults to ~/.config/advocate-rs/prompts).
        dir: Option<PathBuf>,
    },
}
