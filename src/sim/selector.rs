use serde::Serialize;

use super::types::{ResourceId, ResponseType};

/// Share of the requested reduction taken by HVAC load shedding.
pub const HVAC_SHARE: f64 = 0.4;
/// Share of the requested reduction taken by EV charging curtailment.
pub const EV_SHARE: f64 = 0.3;

/// One resource committed to a DR event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Selection {
    pub resource: ResourceId,
    /// Committed capacity (MWh).
    pub capacity_mwh: f64,
    pub response: ResponseType,
}

/// Fixed-proportion resource selector.
///
/// Splits every reduction 40/30/30 across HVAC, EV charging and battery
/// storage. The battery takes the remainder so the commitments always add up
/// to the requested amount exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceSelector;

impl ResourceSelector {
    /// Split `reduction_needed_mwh` across the three DR participants.
    ///
    /// No validation happens here: negative input yields negative
    /// capacities and NaN propagates to every selection.
    pub fn select(&self, reduction_needed_mwh: f64) -> Vec<Selection> {
        let hvac = reduction_needed_mwh * HVAC_SHARE;
        let ev = reduction_needed_mwh * EV_SHARE;
        let battery = reduction_needed_mwh - (hvac + ev);

        vec![
            Selection {
                resource: ResourceId::Hvac,
                capacity_mwh: hvac,
                response: ResponseType::Demand,
            },
            Selection {
                resource: ResourceId::Ev,
                capacity_mwh: ev,
                response: ResponseType::Demand,
            },
            Selection {
                resource: ResourceId::Battery,
                capacity_mwh: battery,
                response: ResponseType::Supply,
            },
        ]
    }
}

/// Sum of committed capacity across selections (MWh).
pub fn total_capacity(selections: &[Selection]) -> f64 {
    selections.iter().map(|s| s.capacity_mwh).sum()
}
