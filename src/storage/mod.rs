//! SQLite-backed flight on-time performance store.
//!
//! Holds one table of per-flight operational records (delays,
//! cancellations, diversions, delay-cause minutes) and answers filtered
//! queries for the flight tool. Every filter predicate is bound through
//! `?` placeholders — field values never reach the SQL text.

use std::path::Path;

use rusqlite::types::Value;
use rusqlite::{Connection, Row, params_from_iter};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StorageError;

/// Default directory for the advocate database, relative to the CWD.
pub const DEFAULT_DB_DIR: &str = ".advocate";
/// Default database filename.
pub const DEFAULT_DB_FILE: &str = "flights.db";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS ontime (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    flight_date TEXT NOT NULL,
    airline TEXT NOT NULL,
    flight_number TEXT NOT NULL,
    origin TEXT NOT NULL,
    dest TEXT NOT NULL,
    dep_delay_minutes REAL,
    arr_delay_minutes REAL,
    dep_time INTEGER,
    arr_time INTEGER,
    cancelled INTEGER NOT NULL DEFAULT 0,
    diverted INTEGER NOT NULL DEFAULT 0,
    weather_delay REAL,
    nas_delay REAL,
    carrier_delay REAL,
    security_delay REAL,
    late_aircraft_delay REAL
);
CREATE INDEX IF NOT EXISTS idx_ontime_flight ON ontime (airline, flight_number, flight_date);
CREATE INDEX IF NOT EXISTS idx_ontime_route ON ontime (origin, dest, flight_date);
";

/// One flight's operational record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    /// Flight date, `YYYY-MM-DD`.
    pub flight_date: String,
    /// Reporting airline code (e.g. `UA`).
    pub airline: String,
    /// Flight number without leading zeros (e.g. `351`).
    pub flight_number: String,
    /// Origin airport code.
    pub origin: String,
    /// Destination airport code.
    pub dest: String,
    /// Departure delay in minutes.
    #[serde(default)]
    pub dep_delay_minutes: Option<f64>,
    /// Arrival delay in minutes.
    #[serde(default)]
    pub arr_delay_minutes: Option<f64>,
    /// Actual departure clock time as `HHMM`.
    #[serde(default)]
    pub dep_time: Option<u32>,
    /// Actual arrival clock time as `HHMM`.
    #[serde(default)]
    pub arr_time: Option<u32>,
    /// Whether the flight was cancelled.
    #[serde(default)]
    pub cancelled: bool,
    /// Whether the flight was diverted.
    #[serde(default)]
    pub diverted: bool,
    /// Weather delay minutes.
    #[serde(default)]
    pub weather_delay: Option<f64>,
    /// National Aviation System delay minutes.
    #[serde(default)]
    pub nas_delay: Option<f64>,
    /// Carrier-caused delay minutes.
    #[serde(default)]
    pub carrier_delay: Option<f64>,
    /// Security delay minutes.
    #[serde(default)]
    pub security_delay: Option<f64>,
    /// Late-arriving-aircraft delay minutes.
    #[serde(default)]
    pub late_aircraft_delay: Option<f64>,
}

/// Validated filter over the on-time table.
///
/// Fields are combined with `AND`; an empty filter matches everything
/// (only reachable if tool validation were bypassed).
#[derive(Debug, Clone, Default)]
pub struct FlightFilter {
    /// Exact airline code match.
    pub airline: Option<String>,
    /// Exact flight number match.
    pub flight_number: Option<String>,
    /// Exact date match.
    pub date: Option<String>,
    /// Inclusive date range.
    pub date_range: Option<(String, String)>,
    /// Exact origin match.
    pub origin: Option<String>,
    /// Exact destination match.
    pub dest: Option<String>,
}

impl FlightFilter {
    /// Builds the WHERE clause and its bound parameters.
    fn predicates(&self) -> (String, Vec<Value>) {
        let mut clauses: Vec<&str> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        if let Some(ref airline) = self.airline {
            clauses.push("airline = ?");
            params.push(Value::Text(airline.clone()));
        }
        if let Some(ref number) = self.flight_number {
            clauses.push("flight_number = ?");
            params.push(Value::Text(number.clone()));
        }
        if let Some(ref date) = self.date {
            clauses.push("flight_date = ?");
            params.push(Value::Text(date.clone()));
        }
        if let Some((ref start, ref end)) = self.date_range {
            clauses.push("flight_date BETWEEN ? AND ?");
            params.push(Value::Text(start.clone()));
            params.push(Value::Text(end.clone()));
        }
        if let Some(ref origin) = self.origin {
            clauses.push("origin = ?");
            params.push(Value::Text(origin.clone()));
        }
        if let Some(ref dest) = self.dest {
            clauses.push("dest = ?");
            params.push(Value::Text(dest.clone()));
        }

        let where_sql = if clauses.is_empty() {
            "1=1".to_string()
        } else {
            clauses.join(" AND ")
        };
        (where_sql, params)
    }
}

/// SQLite connection wrapper for the on-time table.
pub struct FlightStore {
    conn: Connection,
}

impl FlightStore {
    /// Opens (or creates) the database at the given path.
    ///
    /// Creates parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on filesystem or SQLite failures.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    /// Opens an in-memory database (tests).
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on SQLite failures.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Creates the schema if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on SQLite failures.
    pub fn init(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Inserts one record.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on SQLite failures.
    pub fn insert(&self, record: &FlightRecord) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO ontime (
                flight_date, airline, flight_number, origin, dest,
                dep_delay_minutes, arr_delay_minutes, dep_time, arr_time,
                cancelled, diverted,
                weather_delay, nas_delay, carrier_delay, security_delay, late_aircraft_delay
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            rusqlite::params![
                record.flight_date,
                record.airline,
                record.flight_number,
                record.origin,
                record.dest,
                record.dep_delay_minutes,
                record.arr_delay_minutes,
                record.dep_time,
                record.arr_time,
                record.cancelled,
                record.diverted,
                record.weather_delay,
                record.nas_delay,
                record.carrier_delay,
                record.security_delay,
                record.late_aircraft_delay,
            ],
        )?;
        Ok(())
    }

    /// Loads newline-delimited JSON records inside one transaction.
    ///
    /// Returns the number of records inserted. Blank lines are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Ingest`] naming the first malformed line;
    /// nothing is committed in that case.
    pub fn ingest_jsonl(&mut self, content: &str) -> Result<usize, StorageError> {
        let tx = self.conn.transaction()?;
        let mut inserted = 0usize;

        for (i, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let record: FlightRecord =
                serde_json::from_str(line).map_err(|e| StorageError::Ingest {
                    line: i + 1,
                    message: e.to_string(),
                })?;
            tx.execute(
                "INSERT INTO ontime (
                    flight_date, airline, flight_number, origin, dest,
                    dep_delay_minutes, arr_delay_minutes, dep_time, arr_time,
                    cancelled, diverted,
                    weather_delay, nas_delay, carrier_delay, security_delay, late_aircraft_delay
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                rusqlite::params![
                    record.flight_date,
                    record.airline,
                    record.flight_number,
                    record.origin,
                    record.dest,
                    record.dep_delay_minutes,
                    record.arr_delay_minutes,
                    record.dep_time,
                    record.arr_time,
                    record.cancelled,
                    record.diverted,
                    record.weather_delay,
                    record.nas_delay,
                    record.carrier_delay,
                    record.security_delay,
                    record.late_aircraft_delay,
                ],
            )?;
            inserted += 1;
        }

        tx.commit()?;
        debug!(inserted, "ingested on-time records");
        Ok(inserted)
    }

    /// Number of records in the table.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on SQLite failures.
    pub fn count(&self) -> Result<u64, StorageError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ontime", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    /// Runs a filtered query, capped at `limit` rows.
    ///
    /// Ordered by date, airline, flight number and departure time so
    /// results are stable across runs.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on SQLite failures.
    pub fn query(
        &self,
        filter: &FlightFilter,
        limit: usize,
    ) -> Result<Vec<FlightRecord>, StorageError> {
        let (where_sql, mut params) = filter.predicates();
        let sql = format!(
            "SELECT flight_date, airline, flight_number, origin, dest,
                    dep_delay_minutes, arr_delay_minutes, dep_time, arr_time,
                    cancelled, diverted,
                    weather_delay, nas_delay, carrier_delay, security_delay, late_aircraft_delay
             FROM ontime
             WHERE {where_sql}
             ORDER BY flight_date, airline, flight_number, dep_time
             LIMIT ?"
        );
        params.push(Value::Integer(i64::try_from(limit).unwrap_or(i64::MAX)));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}

impl std::fmt::Debug for FlightStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlightStore").finish_non_exhaustive()
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<FlightRecord> {
    Ok(FlightRecord {
        flight_date: row.get(0)?,
        airline: row.get(1)?,
        flight_number: row.get(2)?,
        origin: row.get(3)?,
        dest: row.get(4)?,
        dep_delay_minutes: row.get(5)?,
        arr_delay_minutes: row.get(6)?,
        dep_time: row.get(7)?,
        arr_time: row.get(8)?,
        cancelled: row.get(9)?,
        diverted: row.get(10)?,
        weather_delay: row.get(11)?,
        nas_delay: row.get(12)?,
        carrier_delay: row.get(13)?,
        security_delay: row.get(14)?,
        late_aircraft_delay: row.get(15)?,
    })
}
