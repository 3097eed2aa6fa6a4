//! Error types for advocate-rs.
//!
//! Each subsystem has its own `thiserror` enum; everything converges on
//! [`CommandError`] at the CLI boundary via `#[from]` conversions.

use std::path::PathBuf;

use thiserror::Error;

/// Crate-wide result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors from the flight on-time store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying SQLite error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// File I/O failure, tagged with the offending path.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A malformed record in a JSONL ingest file.
    #[error("bad ingest record on line {line}: {message}")]
    Ingest {
        /// 1-based line number.
        line: usize,
        /// Parse failure detail.
        message: String,
    },
}

/// Errors from embedding and the policy index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The embedding backend failed.
    #[error("embedding failed: {message}")]
    Embedding {
        /// Backend failure detail.
        message: String,
    },

    /// An embedding came back with the wrong dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension the index was built with.
        expected: usize,
        /// Dimension actually returned.
        got: usize,
    },
}

/// Tool input validation errors.
///
/// Raised before any data access and surfaced to the planner as an
/// error-flagged tool result. The planner is instructed to ask the user
/// for the missing information rather than retry.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Flight designator did not match `<2-3 letters><1-4 digits>`.
    #[error("flight must look like 'UA123' (airline code + number), got '{value}'")]
    InvalidFlight {
        /// The rejected input.
        value: String,
    },

    /// Date was not in strict `YYYY-MM-DD` shape.
    #[error("date must be in YYYY-MM-DD format (e.g. 2023-12-29), got '{value}'")]
    InvalidDate {
        /// The rejected input.
        value: String,
    },

    /// None of the three acceptable field combinations was supplied.
    #[error(
        "provide flight+date OR origin+dest+date OR (start_date+end_date plus flight/route)"
    )]
    MissingQueryFields,

    /// The data source failed while executing a validated query.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors from the agent loop and LLM providers.
#[derive(Debug, Error)]
pub enum AgentError {
    /// No API key was found in the environment or configuration.
    #[error("no API key found; set OPENAI_API_KEY or ADVOCATE_API_KEY")]
    ApiKeyMissing,

    /// An API request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error detail.
        message: String,
        /// HTTP status, when available.
        status: Option<u16>,
    },

    /// A streaming response failed mid-stream.
    #[error("streaming failed: {message}")]
    Stream {
        /// Stream failure detail.
        message: String,
    },

    /// The model's response could not be parsed as expected.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Parse failure detail.
        message: String,
        /// The raw content that failed to parse.
        content: String,
    },

    /// A tool call failed during execution.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Name of the tool that failed.
        name: String,
        /// Failure detail.
        message: String,
    },

    /// The configured provider name is not supported.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// The unknown provider name.
        name: String,
    },

    /// A conversational turn failed outside of provider or tool calls.
    #[error("turn failed: {message}")]
    Turn {
        /// Failure detail.
        message: String,
    },
}

/// Errors from the batch evaluation harness.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The case file could not be read.
    #[error("failed to read cases from {path}: {source}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A malformed record in the JSONL case file.
    #[error("bad case record on line {line}: {message}")]
    Case {
        /// 1-based line number.
        line: usize,
        /// Parse failure detail.
        message: String,
    },

    /// The case file contained no cases.
    #[error("no evaluation cases found")]
    Empty,
}

/// Top-level error type returned by CLI command implementations.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Flight store failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Embedding or index failure.
    #[error(transparent)]
    Index(#[from] IndexError),

    /// Tool validation or execution failure.
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// Agent loop or provider failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Evaluation harness failure.
    #[error(transparent)]
    Eval(#[from] EvalError),

    /// Plain I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid command-line argument combination.
    #[error("{message}")]
    InvalidArgument {
        /// What was wrong.
        message: String,
    },
}
