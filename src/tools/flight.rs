//! Flight operations query tool.
//!
//! Validates a structured parameter set, builds a parameter-bound filter
//! over the on-time table, and classifies the result as `ok`,
//! `ambiguous` or `not_found`. The non-`ok` outcomes carry a clarifying
//! question for the planner to relay verbatim.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ToolError;
use crate::storage::{FlightFilter, FlightRecord, FlightStore};

/// Row cap when the question carries an aggregate cue word.
pub const AGGREGATE_ROW_CAP: usize = 50;
/// Row cap for point queries.
pub const POINT_ROW_CAP: usize = 5;

/// Cue words that mark a question as expecting a multi-row answer.
const AGGREGATE_CUES: [&str; 5] = ["how many", "count", "total", "list", "all"];

#[allow(clippy::unwrap_used)]
static FLIGHT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z]{2,3})\s*0*([0-9]{1,4})\s*$").unwrap());

#[allow(clippy::unwrap_used)]
static DATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

/// A flight designator split into airline code and number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFlight {
    /// Uppercase 2-3 letter airline code.
    pub airline: String,
    /// Flight number with leading zeros stripped.
    pub flight_number: String,
}

/// Parses a flight designator like `UA123` or `ua0351`.
///
/// Accepts 2-3 letters followed by 1-4 digits, optionally zero-padded,
/// case-insensitive. The airline code is uppercased and leading zeros
/// are stripped from the number.
///
/// # Errors
///
/// Returns [`ToolError::InvalidFlight`] for any other shape.
pub fn parse_flight(flight: &str) -> Result<ParsedFlight, ToolError> {
    let captures = FLIGHT_RE
        .captures(flight)
        .ok_or_else(|| ToolError::InvalidFlight {
            value: flight.to_string(),
        })?;
    Ok(ParsedFlight {
        airline: captures[1].to_uppercase(),
        flight_number: captures[2].to_string(),
    })
}

/// Validates a date string against the strict `YYYY-MM-DD` shape.
///
/// Returns the trimmed date on success. Shape-only: no calendar
/// validation, matching the upstream data source's expectations.
///
/// # Errors
///
/// Returns [`ToolError::InvalidDate`] for any other shape.
pub fn parse_date(date: &str) -> Result<String, ToolError> {
    let trimmed = date.trim();
    if DATE_RE.is_match(trimmed) {
        Ok(trimmed.to_string())
    } else {
        Err(ToolError::InvalidDate {
            value: date.to_string(),
        })
    }
}

/// Formats an `HHMM` clock value as `HH:MM`.
///
/// Values that don't fit four digits are passed through as raw digits.
#[must_use]
pub fn format_time(time: Option<u32>) -> Option<String> {
    time.map(|t| {
        let digits = format!("{t:04}");
        if digits.len() == 4 {
            format!("{}:{}", &digits[0..2], &digits[2..4])
        } else {
            digits
        }
    })
}

/// Returns `true` if the question implies a multi-row answer.
fn is_aggregate(question: &str) -> bool {
    let lowered = question.to_lowercase();
    AGGREGATE_CUES.iter().any(|cue| lowered.contains(cue))
}

/// Structured input for the `flight_query` tool.
///
/// Valid inputs satisfy one of:
/// 1. `flight` and `date`
/// 2. `origin`, `dest` and `date`
/// 3. `start_date` and `end_date`, plus `flight` or `origin`+`dest`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlightQueryInput {
    /// The exact user message, used for aggregate-intent detection.
    pub question: String,
    /// Flight designator, e.g. `AA205`, `UA2726`.
    #[serde(default)]
    pub flight: Option<String>,
    /// Date, `YYYY-MM-DD`.
    #[serde(default)]
    pub date: Option<String>,
    /// Origin airport code.
    #[serde(default)]
    pub origin: Option<String>,
    /// Destination airport code.
    #[serde(default)]
    pub dest: Option<String>,
    /// Range start date, `YYYY-MM-DD`.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Range end date, `YYYY-MM-DD`.
    #[serde(default)]
    pub end_date: Option<String>,
}

impl FlightQueryInput {
    /// Checks that at least one usable query pattern is present.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::MissingQueryFields`] otherwise.
    pub fn validate(&self) -> Result<(), ToolError> {
        let has_single = self.flight.is_some() && self.date.is_some();
        let has_route_day = self.origin.is_some() && self.dest.is_some() && self.date.is_some();
        let has_range = self.start_date.is_some()
            && self.end_date.is_some()
            && (self.flight.is_some() || (self.origin.is_some() && self.dest.is_some()));

        if has_single || has_route_day || has_range {
            Ok(())
        } else {
            Err(ToolError::MissingQueryFields)
        }
    }
}

/// Outcome classification for a flight query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightQueryStatus {
    /// One row for a point query, or any number for an aggregate one.
    Ok,
    /// Multiple rows for a non-aggregate question.
    Ambiguous,
    /// Zero rows.
    NotFound,
}

/// One result row as surfaced to the planner and synthesizer.
#[derive(Debug, Clone, Serialize)]
pub struct FlightRowView {
    /// Flight date.
    pub flight_date: String,
    /// Airline code.
    pub airline: String,
    /// Flight number.
    pub flight_number: String,
    /// Origin airport code.
    pub origin: String,
    /// Destination airport code.
    pub dest: String,
    /// Departure delay minutes.
    pub dep_delay_minutes: Option<f64>,
    /// Arrival delay minutes.
    pub arr_delay_minutes: Option<f64>,
    /// Departure clock time, `HH:MM`.
    pub dep_time: Option<String>,
    /// Arrival clock time, `HH:MM`.
    pub arr_time: Option<String>,
    /// Cancelled flag.
    pub cancelled: bool,
    /// Diverted flag.
    pub diverted: bool,
    /// Weather delay minutes.
    pub weather_delay: Option<f64>,
    /// NAS delay minutes.
    pub nas_delay: Option<f64>,
    /// Carrier delay minutes.
    pub carrier_delay: Option<f64>,
    /// Security delay minutes.
    pub security_delay: Option<f64>,
    /// Late-aircraft delay minutes.
    pub late_aircraft_delay: Option<f64>,
}

impl From<FlightRecord> for FlightRowView {
    fn from(r: FlightRecord) -> Self {
        Self {
            flight_date: r.flight_date,
            airline: r.airline,
            flight_number: r.flight_number,
            origin: r.origin,
            dest: r.dest,
            dep_delay_minutes: r.dep_delay_minutes,
            arr_delay_minutes: r.arr_delay_minutes,
            dep_time: format_time(r.dep_time),
            arr_time: format_time(r.arr_time),
            cancelled: r.cancelled,
            diverted: r.diverted,
            weather_delay: r.weather_delay,
            nas_delay: r.nas_delay,
            carrier_delay: r.carrier_delay,
            security_delay: r.security_delay,
            late_aircraft_delay: r.late_aircraft_delay,
        }
    }
}

/// Structured output of the `flight_query` tool.
#[derive(Debug, Clone, Serialize)]
pub struct FlightQueryOutput {
    /// Outcome classification.
    pub status: FlightQueryStatus,
    /// The question as asked.
    pub question: String,
    /// Question for the planner to relay when not `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clarifying_question: Option<String>,
    /// Number of rows returned.
    pub row_count: usize,
    /// Matched rows, up to the applicable cap.
    pub rows: Vec<FlightRowView>,
}

const NOT_FOUND_CLARIFICATION: &str = "I couldn't find any rows for that query. Can you confirm \
    the flight (e.g., OO3400) and date (YYYY-MM-DD), or provide origin/destination airport codes \
    (3 letters like SEA)?";

const AMBIGUOUS_CLARIFICATION: &str =
    "I found multiple matching flight records. Which one do you mean?";

/// Validates the input, queries the on-time store, and classifies the
/// result.
///
/// Validation and parsing happen before any data access; the data source
/// is only reached with already-narrowed values, and even those are
/// parameter-bound. No retries on failure — errors propagate to the
/// planner, which asks the user instead.
///
/// # Errors
///
/// Returns [`ToolError`] on validation failure or a data-source failure.
pub fn run_flight_query(
    store: &FlightStore,
    input: &FlightQueryInput,
) -> Result<FlightQueryOutput, ToolError> {
    input.validate()?;

    let mut filter = FlightFilter::default();
    if let Some(ref flight) = input.flight {
        let parsed = parse_flight(flight)?;
        filter.airline = Some(parsed.airline);
        filter.flight_number = Some(parsed.flight_number);
    }
    if let Some(ref date) = input.date {
        filter.date = Some(parse_date(date)?);
    }
    if let (Some(start), Some(end)) = (&input.start_date, &input.end_date) {
        filter.date_range = Some((parse_date(start)?, parse_date(end)?));
    }
    if let Some(ref origin) = input.origin {
        filter.origin = Some(origin.clone());
    }
    if let Some(ref dest) = input.dest {
        filter.dest = Some(dest.clone());
    }

    let aggregate = is_aggregate(&input.question);
    let limit = if aggregate {
        AGGREGATE_ROW_CAP
    } else {
        POINT_ROW_CAP
    };

    let records = store.query(&filter, limit)?;
    debug!(
        rows = records.len(),
        aggregate,
        "flight query executed"
    );
    let rows: Vec<FlightRowView> = records.into_iter().map(FlightRowView::from).collect();
    let row_count = rows.len();

    let (status, clarifying_question) = if row_count == 0 {
        (
            FlightQueryStatus::NotFound,
            Some(NOT_FOUND_CLARIFICATION.to_string()),
        )
    } else if !aggregate && row_count > 1 {
        (
            FlightQueryStatus::Ambiguous,
            Some(AMBIGUOUS_CLARIFICATION.to_string()),
        )
    } else {
        (FlightQueryStatus::Ok, None)
    };

    Ok(FlightQueryOutput {
        status,
        question: input.question.clone(),
        clarifying_question,
        row_count,
        rows,
    })
}
