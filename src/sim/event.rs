//! Demand-response event table.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::clock::HOURS_PER_YEAR;

const BUILTIN_EVENTS: &str = include_str!("../../data/dr_events.json");

/// Per-hour requirement inside a DR event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDetail {
    #[serde(rename = "Hour")]
    pub hour: u32,
    #[serde(rename = "Reduction Needed (MWh)")]
    pub reduction_needed_mwh: f64,
    #[serde(rename = "Projected Load (MWh)")]
    pub projected_load_mwh: f64,
}

/// Grid-operator request for a temporary load reduction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrEvent {
    /// First hour of the event (inclusive).
    #[serde(rename = "Start")]
    pub start: u32,
    /// Last hour of the event (inclusive).
    #[serde(rename = "End")]
    pub end: u32,
    #[serde(rename = "Duration (hours)")]
    pub duration_hours: u32,
    #[serde(rename = "Hourly Details", default)]
    pub hourly_details: Vec<HourlyDetail>,
}

impl DrEvent {
    /// Creates an event spanning `[start, end]` with the given hourly details.
    pub fn new(start: u32, end: u32, hourly_details: Vec<HourlyDetail>) -> Self {
        Self {
            start,
            end,
            duration_hours: end.saturating_sub(start) + 1,
            hourly_details,
        }
    }

    /// Returns `true` when `hour` falls within the event window.
    pub fn is_active(&self, hour: u32) -> bool {
        hour >= self.start && hour <= self.end
    }

    /// Detail for `hour`, if the event carries one.
    pub fn detail_at(&self, hour: u32) -> Option<&HourlyDetail> {
        self.hourly_details.iter().find(|d| d.hour == hour)
    }

    fn check(&self) -> Result<(), String> {
        if self.start > self.end {
            return Err(format!("start {} is after end {}", self.start, self.end));
        }
        if self.end > HOURS_PER_YEAR {
            return Err(format!("end {} exceeds {HOURS_PER_YEAR}", self.end));
        }
        match self.hourly_details.iter().find(|d| !self.is_active(d.hour)) {
            Some(detail) => Err(format!(
                "detail hour {} lies outside [{}, {}]",
                detail.hour, self.start, self.end
            )),
            None => Ok(()),
        }
    }
}

/// Errors raised while loading an event table.
#[derive(Debug, thiserror::Error)]
pub enum EventTableError {
    #[error("failed to read event table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse event table: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable, validated set of DR events.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrEventTable {
    events: Vec<DrEvent>,
}

impl DrEventTable {
    /// Table embedded in the binary.
    pub fn builtin() -> Result<Self, EventTableError> {
        Self::from_json_str(BUILTIN_EVENTS)
    }

    /// Parses a JSON array of events.
    pub fn from_json_str(s: &str) -> Result<Self, EventTableError> {
        let events: Vec<DrEvent> = serde_json::from_str(s)?;
        Ok(Self::from_events(events))
    }

    /// Reads and parses a JSON event file.
    pub fn from_path(path: &Path) -> Result<Self, EventTableError> {
        let content = fs::read_to_string(path).map_err(|source| EventTableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// Wraps an in-memory event list, dropping malformed events.
    ///
    /// Structural checks only: window ordering, the year bound, and detail
    /// hours lying inside their window. Each dropped event is reported with
    /// a warning; the remaining events stay usable.
    pub fn from_events(events: Vec<DrEvent>) -> Self {
        let events = events
            .into_iter()
            .enumerate()
            .filter_map(|(index, event)| match event.check() {
                Ok(()) => Some(event),
                Err(reason) => {
                    warn!(index, %reason, "skipping malformed DR event");
                    None
                }
            })
            .collect();
        Self { events }
    }

    /// First event whose window contains `hour` together with its detail
    /// for that hour. An event covering the hour without a matching detail
    /// yields `None`.
    pub fn lookup(&self, hour: u32) -> Option<(&DrEvent, &HourlyDetail)> {
        let event = self.events.iter().find(|e| e.is_active(hour))?;
        event.detail_at(hour).map(|detail| (event, detail))
    }

    pub fn events(&self) -> &[DrEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
