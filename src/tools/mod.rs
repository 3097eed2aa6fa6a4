//! The two tools the planner can invoke.
//!
//! - [`flight`] — operational flight data (status, delays, cancellations,
//!   routes, date ranges) against the on-time store.
//! - [`policy`] — semantic search over DOT rules and airline customer
//!   service commitments.
//!
//! Both validate their inputs before touching any data source and return
//! typed outcomes rather than raising for empty or over-broad results.

pub mod flight;
pub mod policy;

pub use flight::{FlightQueryInput, FlightQueryOutput, FlightQueryStatus, run_flight_query};
pub use policy::{PolicySearchOutput, PolicySearchTool, normalize_airline};
