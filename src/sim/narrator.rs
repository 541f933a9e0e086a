//! Timed narrative describing a DR dispatch from operator request to
//! resource confirmation.

use super::selector::{Selection, total_capacity};

/// Identifier tying narrative steps to the dispatch that produced them.
pub type CascadeId = u64;

/// Delay between the event notice and the VPP processing block (ms).
pub const PROCESSING_DELAY_MS: u64 = 500;
/// Delay from the event notice to resource selection (ms).
pub const SELECTION_DELAY_MS: u64 = 1500;
/// Stagger between consecutive control signals (ms).
pub const SIGNAL_STAGGER_MS: u64 = 300;
/// Delay from a control signal to its confirmation (ms).
pub const CONFIRM_DELAY_MS: u64 = 500;
/// Delay after the last control signal before the completion block (ms).
pub const COMPLETION_DELAY_MS: u64 = 1000;

/// Phases of the narrative; indices refer to the cascade's selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeStep {
    Initiated,
    Processing,
    SelectionComplete,
    SignalReceived(usize),
    ActionConfirmed(usize),
    ImplementationComplete,
}

/// Everything needed to narrate one dispatched hour.
#[derive(Debug, Clone)]
pub struct Cascade {
    pub id: CascadeId,
    pub hour: u32,
    pub duration_hours: u32,
    pub reduction_needed_mwh: f64,
    pub projected_load_mwh: f64,
    pub selections: Vec<Selection>,
}

impl Cascade {
    /// Delayed steps with their offset from the dispatch instant, in firing
    /// order. [`CascadeStep::Initiated`] is emitted immediately and is not
    /// part of the plan.
    ///
    /// # Examples
    ///
    /// ```
    /// use vpp_dr_sim::sim::narrator::{Cascade, CascadeStep};
    /// use vpp_dr_sim::sim::selector::ResourceSelector;
    ///
    /// let cascade = Cascade {
    ///     id: 0,
    ///     hour: 10,
    ///     duration_hours: 3,
    ///     reduction_needed_mwh: 3.0,
    ///     projected_load_mwh: 40.0,
    ///     selections: ResourceSelector.select(3.0),
    /// };
    /// let plan = cascade.plan();
    /// assert_eq!(plan.last(), Some(&(3400, CascadeStep::ImplementationComplete)));
    /// ```
    pub fn plan(&self) -> Vec<(u64, CascadeStep)> {
        let mut plan = vec![
            (PROCESSING_DELAY_MS, CascadeStep::Processing),
            (SELECTION_DELAY_MS, CascadeStep::SelectionComplete),
        ];
        for i in 0..self.selections.len() {
            let signal_at = SELECTION_DELAY_MS + SIGNAL_STAGGER_MS * i as u64;
            plan.push((signal_at, CascadeStep::SignalReceived(i)));
            plan.push((signal_at + CONFIRM_DELAY_MS, CascadeStep::ActionConfirmed(i)));
        }
        let completion_at = SELECTION_DELAY_MS
            + SIGNAL_STAGGER_MS * self.selections.len() as u64
            + COMPLETION_DELAY_MS;
        plan.push((completion_at, CascadeStep::ImplementationComplete));
        plan.sort_by_key(|(at, _)| *at);
        plan
    }

    /// Log lines for `step`, headline first.
    pub fn render(&self, step: CascadeStep) -> Vec<String> {
        match step {
            CascadeStep::Initiated => vec![
                "Grid Operator - Demand Response Event Initiated".to_string(),
                format!("├─ Event Duration: {} hours", self.duration_hours),
                format!("├─ Reduction Target: {} MWh", self.reduction_needed_mwh),
                format!("├─ Projected Load: {} MWh", self.projected_load_mwh),
                format!("└─ Start Hour: {}", self.hour),
            ],
            CascadeStep::Processing => vec![
                "VPP - Processing Demand Response Request".to_string(),
                "├─ Request Received and Validated".to_string(),
                "├─ Analyzing Available Resources".to_string(),
                "└─ Optimization Engine Started".to_string(),
            ],
            CascadeStep::SelectionComplete => {
                let names: Vec<&str> = self
                    .selections
                    .iter()
                    .map(|s| s.resource.display_name())
                    .collect();
                vec![format!(
                    "Optimization Engine - Resource Selection Complete: {} ({:.2} MWh available)",
                    names.join(", "),
                    total_capacity(&self.selections)
                )]
            }
            CascadeStep::SignalReceived(i) => self
                .selections
                .get(i)
                .map(|s| {
                    format!(
                        "{} - Control Signal Received: target {:.2} MWh, {}",
                        s.resource.display_name(),
                        s.capacity_mwh,
                        s.response.label()
                    )
                })
                .into_iter()
                .collect(),
            CascadeStep::ActionConfirmed(i) => self
                .selections
                .get(i)
                .map(|s| {
                    format!(
                        "{} - Action Confirmed: Active, Demand Response mode",
                        s.resource.display_name()
                    )
                })
                .into_iter()
                .collect(),
            CascadeStep::ImplementationComplete => vec![
                "VPP - Demand Response Implementation Complete".to_string(),
                "├─ All Resources Confirmed".to_string(),
                "└─ Monitoring Active".to_string(),
            ],
        }
    }

    /// Total number of log lines the full cascade produces.
    pub fn line_count(&self) -> usize {
        let delayed: usize = self.plan().iter().map(|(_, s)| self.render(*s).len()).sum();
        self.render(CascadeStep::Initiated).len() + delayed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::selector::ResourceSelector;

    fn cascade(need: f64) -> Cascade {
        Cascade {
            id: 7,
            hour: 10,
            duration_hours: 3,
            reduction_needed_mwh: need,
            projected_load_mwh: 40.0,
            selections: ResourceSelector.select(need),
        }
    }

    #[test]
    fn plan_matches_phase_offsets() {
        let offsets: Vec<u64> = cascade(3.0).plan().iter().map(|(at, _)| *at).collect();
        assert_eq!(offsets, vec![500, 1500, 1500, 1800, 2000, 2100, 2300, 2600, 3400]);
    }

    #[test]
    fn signals_precede_their_confirmations() {
        let plan = cascade(3.0).plan();
        for i in 0..3 {
            let signal = plan
                .iter()
                .position(|(_, s)| *s == CascadeStep::SignalReceived(i))
                .unwrap();
            let confirm = plan
                .iter()
                .position(|(_, s)| *s == CascadeStep::ActionConfirmed(i))
                .unwrap();
            assert!(signal < confirm);
        }
    }

    #[test]
    fn three_resource_cascade_has_nineteen_lines() {
        assert_eq!(cascade(3.0).line_count(), 19);
    }

    #[test]
    fn initiated_block_carries_event_numbers() {
        let lines = cascade(3.0).render(CascadeStep::Initiated);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Demand Response Event Initiated"));
        assert_eq!(lines[2], "├─ Reduction Target: 3 MWh");
        assert_eq!(lines[4], "└─ Start Hour: 10");
    }

    #[test]
    fn selection_line_names_resources_and_total() {
        let lines = cascade(3.0).render(CascadeStep::SelectionComplete);
        assert_eq!(
            lines,
            vec![
                "Optimization Engine - Resource Selection Complete: \
                 HVAC System, EV Charging, Battery Storage (3.00 MWh available)"
                    .to_string()
            ]
        );
    }

    #[test]
    fn signal_line_carries_target_and_response() {
        let c = cascade(3.0);
        let hvac = c.render(CascadeStep::SignalReceived(0));
        assert_eq!(
            hvac,
            vec!["HVAC System - Control Signal Received: target 1.20 MWh, Demand Reduction"]
        );
        let battery = c.render(CascadeStep::SignalReceived(2));
        assert!(battery[0].ends_with("Supply Increase"));
    }

    #[test]
    fn out_of_range_index_renders_nothing() {
        assert!(cascade(3.0).render(CascadeStep::ActionConfirmed(9)).is_empty());
    }
}
