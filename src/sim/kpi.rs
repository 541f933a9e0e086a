//! Per-hour dispatch history and aggregate DR statistics.

use std::fmt;

use serde::Serialize;

use super::selector::Selection;
use super::types::ResourceId;

/// One dispatched hour.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRecord {
    pub hour: u32,
    /// Start hour of the event the dispatch belongs to.
    pub event_start: u32,
    pub reduction_needed_mwh: f64,
    pub projected_load_mwh: f64,
    pub hvac_mwh: f64,
    pub ev_mwh: f64,
    pub battery_mwh: f64,
    /// Distribution flexibility remaining after the dispatch.
    pub flexibility_after_mwh: f64,
}

impl DispatchRecord {
    /// Committed capacity for `resource` from a selection list.
    pub fn share(selections: &[Selection], resource: ResourceId) -> f64 {
        selections
            .iter()
            .filter(|s| s.resource == resource)
            .map(|s| s.capacity_mwh)
            .sum()
    }
}

/// Aggregate statistics over a run's dispatch history.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DrSummary {
    /// Distinct DR events that produced at least one dispatch.
    pub events_dispatched: usize,
    pub hours_dispatched: usize,
    pub total_reduction_mwh: f64,
    pub hvac_mwh: f64,
    pub ev_mwh: f64,
    pub battery_mwh: f64,
    /// Largest single-hour reduction request (MWh).
    pub peak_reduction_mwh: f64,
    /// Hours whose DR update was rejected.
    pub failed_updates: usize,
}

impl DrSummary {
    /// Computes the summary from the complete dispatch history.
    ///
    /// # Arguments
    ///
    /// * `records` - Dispatched hours in the order they happened
    /// * `failed_updates` - Hours whose state update failed
    pub fn from_records(records: &[DispatchRecord], failed_updates: usize) -> Self {
        let mut summary = Self {
            failed_updates,
            hours_dispatched: records.len(),
            ..Self::default()
        };

        let mut last_event = None;
        for r in records {
            if last_event != Some(r.event_start) {
                summary.events_dispatched += 1;
                last_event = Some(r.event_start);
            }
            summary.total_reduction_mwh += r.reduction_needed_mwh;
            summary.hvac_mwh += r.hvac_mwh;
            summary.ev_mwh += r.ev_mwh;
            summary.battery_mwh += r.battery_mwh;
            summary.peak_reduction_mwh = summary.peak_reduction_mwh.max(r.reduction_needed_mwh);
        }
        summary
    }
}

impl fmt::Display for DrSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- DR Summary ---")?;
        writeln!(f, "Events dispatched:     {}", self.events_dispatched)?;
        writeln!(f, "Hours dispatched:      {}", self.hours_dispatched)?;
        writeln!(f, "Total reduction:       {:.2} MWh", self.total_reduction_mwh)?;
        writeln!(
            f,
            "By resource:           HVAC {:.2} / EV {:.2} / Battery {:.2} MWh",
            self.hvac_mwh, self.ev_mwh, self.battery_mwh
        )?;
        writeln!(f, "Peak hourly reduction: {:.2} MWh", self.peak_reduction_mwh)?;
        write!(f, "Failed updates:        {}", self.failed_updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::selector::ResourceSelector;

    fn record(hour: u32, event_start: u32, need: f64) -> DispatchRecord {
        let picks = ResourceSelector.select(need);
        DispatchRecord {
            hour,
            event_start,
            reduction_needed_mwh: need,
            projected_load_mwh: 40.0,
            hvac_mwh: DispatchRecord::share(&picks, ResourceId::Hvac),
            ev_mwh: DispatchRecord::share(&picks, ResourceId::Ev),
            battery_mwh: DispatchRecord::share(&picks, ResourceId::Battery),
            flexibility_after_mwh: 7.0,
        }
    }

    #[test]
    fn counts_distinct_events() {
        let records = vec![
            record(17, 17, 2.0),
            record(18, 17, 3.0),
            record(4089, 4089, 4.0),
        ];
        let summary = DrSummary::from_records(&records, 1);
        assert_eq!(summary.events_dispatched, 2);
        assert_eq!(summary.hours_dispatched, 3);
        assert_eq!(summary.failed_updates, 1);
        assert!((summary.total_reduction_mwh - 9.0).abs() < 1e-9);
        assert_eq!(summary.peak_reduction_mwh, 4.0);
    }

    #[test]
    fn resource_totals_add_up() {
        let records = vec![record(10, 10, 3.0), record(11, 10, 5.0)];
        let s = DrSummary::from_records(&records, 0);
        assert!((s.hvac_mwh - 3.2).abs() < 1e-9);
        assert!((s.hvac_mwh + s.ev_mwh + s.battery_mwh - s.total_reduction_mwh).abs() < 1e-9);
    }

    #[test]
    fn empty_history() {
        let s = DrSummary::from_records(&[], 0);
        assert_eq!(s, DrSummary::default());
        assert!(s.to_string().starts_with("--- DR Summary ---"));
    }
}
