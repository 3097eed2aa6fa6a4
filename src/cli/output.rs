//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or JSON, selected
//! by the global `--format` flag.

use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::error::{CommandError, Result};
use crate::eval::EvalReport;
use crate::tools::flight::{FlightQueryOutput, FlightQueryStatus};
use crate::tools::policy::PolicySearchOutput;

/// Output format for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text (default).
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name; anything other than `json` is text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Serializes a value as pretty JSON.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| CommandError::InvalidArgument {
        message: format!("JSON serialization failed: {e}"),
    })
}

/// Renders a flight query outcome.
pub fn format_flight_output(output: &FlightQueryOutput, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(output);
    }

    let mut text = String::new();
    let status = match output.status {
        FlightQueryStatus::Ok => "ok",
        FlightQueryStatus::Ambiguous => "ambiguous",
        FlightQueryStatus::NotFound => "not_found",
    };
    let _ = writeln!(text, "Status: {status} ({} rows)", output.row_count);
    if let Some(ref question) = output.clarifying_question {
        let _ = writeln!(text, "Clarification needed: {question}");
    }
    if !output.rows.is_empty() {
        text.push('\n');
        text.push_str(&flight_table(output));
    }
    Ok(text.trim_end().to_string())
}

/// Renders matched rows as a fixed-width table.
fn flight_table(output: &FlightQueryOutput) -> String {
    let mut text = String::new();
    let _ = writeln!(
        text,
        "{:<12} {:<8} {:<9} {:>9} {:>9} {:<9} {:<8}",
        "Date", "Flight", "Route", "Dep Delay", "Arr Delay", "Cancelled", "Diverted"
    );
    for row in &output.rows {
        let route = format!("{}-{}", row.origin, row.dest);
        let flight = format!("{}{}", row.airline, row.flight_number);
        let _ = writeln!(
            text,
            "{:<12} {:<8} {:<9} {:>9} {:>9} {:<9} {:<8}",
            row.flight_date,
            flight,
            route,
            delay_cell(row.dep_delay_minutes),
            delay_cell(row.arr_delay_minutes),
            yes_no(row.cancelled),
            yes_no(row.diverted),
        );
    }
    text
}

fn delay_cell(minutes: Option<f64>) -> String {
    minutes.map_or_else(|| "-".to_string(), |m| format!("{m:.0}"))
}

const fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

/// Renders a policy search outcome.
pub fn format_policy_output(output: &PolicySearchOutput, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(output);
    }

    if !output.ok {
        return Ok("No query provided.".to_string());
    }

    let mut text = String::new();
    let _ = writeln!(text, "Query: {}", output.query);
    if let Some(ref code) = output.airline_code {
        let _ = writeln!(
            text,
            "Airline: {code}{}",
            output
                .airline_name
                .as_deref()
                .map(|n| format!(" ({n})"))
                .unwrap_or_default()
        );
    }
    let _ = writeln!(text, "{} match(es)\n", output.match_count);

    for (i, matched) in output.matches.iter().enumerate() {
        let path = matched.path.as_deref().unwrap_or("(no section)");
        let _ = writeln!(
            text,
            "{}. score={:.4} | {path} [chunk {}]",
            i + 1,
            matched.score,
            matched.chunk
        );
        let _ = writeln!(text, "   {}", preview(&matched.text, 240));
    }
    Ok(text.trim_end().to_string())
}

/// Truncates text to a character budget on a whitespace boundary.
fn preview(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let truncated: String = flattened.chars().take(max_chars).collect();
    let cut = truncated.rfind(' ').unwrap_or(truncated.len());
    format!("{}...", &truncated[..cut])
}

/// Renders an evaluation report.
pub fn format_eval_report(report: &EvalReport, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return to_json(report);
    }

    let mut text = String::new();
    let _ = writeln!(
        text,
        "{:<4} {:>5} {:>10}  {:<30} {}",
        "Case", "Score", "Latency", "Tool flow", "Question"
    );
    for (i, case) in report.cases.iter().enumerate() {
        let flow = if case.tool_flow.is_empty() {
            "-".to_string()
        } else {
            case.tool_flow.join(" -> ")
        };
        let _ = writeln!(
            text,
            "{:<4} {:>5} {:>8}ms  {:<30} {}",
            i + 1,
            case.judge_score,
            case.latency_ms,
            preview(&flow, 30),
            preview(&case.question, 60),
        );
        if let Some(ref error) = case.error {
            let _ = writeln!(text, "     error: {error}");
        }
    }
    let _ = writeln!(
        text,
        "\navg judge score: {:.2} / 5\navg latency: {:.0}ms\navg tool calls: {:.2}",
        report.avg_judge_score, report.avg_latency_ms, report.avg_tool_calls
    );
    Ok(text.trim_end().to_string())
}
