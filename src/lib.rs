//! # advocate-rs
//!
//! A conversational passenger-advocate assistant. Answers airline-policy
//! and flight-status questions by orchestrating an LLM planner, two
//! tools, and a response synthesizer:
//!
//! - **flight_query** — validated, parameter-bound queries against a
//!   SQLite table of on-time flight records, classified as
//!   `ok` / `ambiguous` / `not_found`.
//! - **policy_search** — semantic retrieval over a chunked markdown
//!   policy document (header-scoped, size-bounded chunks with section
//!   paths for citation).
//!
//! The turn loop ([`agent::turn::run_turn`]) alternates planner → tools
//! until the planner stops requesting tools (or a hop cap forces
//! escalation), then the synthesizer produces the user-visible answer.
//! A batch [`eval`] harness grades the full loop with an LLM judge.
//!
//! The binary (`advocate-rs`) exposes the data commands (`init`,
//! `ingest`, `status`), the direct tool commands (`flight`, `policy`),
//! the agent commands (`ask`, `chat`), and `eval`.

pub mod agent;
pub mod chunking;
pub mod cli;
pub mod embedding;
pub mod error;
pub mod eval;
pub mod index;
pub mod io;
pub mod storage;
pub mod tools;

pub use error::{CommandError, Result};
