//! API request and response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sim::log::LogEntry;
use crate::sim::types::SystemState;

/// Clock position together with the full grid snapshot.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub hour: u32,
    pub running: bool,
    pub has_error: bool,
    /// Virtual time of the simulation (ms).
    pub now_ms: u64,
    /// Number of lines in the event log.
    pub log_entries: usize,
    pub state: SystemState,
}

/// Clock position after a control intent.
#[derive(Debug, Serialize)]
pub struct ClockResponse {
    pub hour: u32,
    pub running: bool,
    /// Whether the intent changed anything.
    pub changed: bool,
}

/// Body of `POST /clock/jump`.
#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub hour: i64,
}

#[derive(Debug, Serialize)]
pub struct JumpResponse {
    pub hour: u32,
    pub dispatched: bool,
    pub cascade: Option<u64>,
}

/// Query parameters for `GET /log`.
#[derive(Debug, Deserialize)]
pub struct LogQuery {
    /// Maximum number of entries, newest first.
    pub limit: Option<usize>,
}

/// One event-log line as served over HTTP.
#[derive(Debug, Serialize)]
pub struct LogLine {
    pub timestamp: DateTime<Utc>,
    pub hour: u32,
    pub cascade: Option<u64>,
    pub message: String,
    /// `[HH:MM:SS] message` rendering.
    pub text: String,
}

impl From<&LogEntry> for LogLine {
    fn from(e: &LogEntry) -> Self {
        Self {
            timestamp: e.timestamp,
            hour: e.hour,
            cascade: e.cascade,
            message: e.message.clone(),
            text: e.to_string(),
        }
    }
}

/// Error body returned with 4xx responses.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
