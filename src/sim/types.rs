//! Core simulation types: the grid snapshot, resources, and DR application.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::event::{DrEvent, HourlyDetail};
use super::selector::Selection;

/// Controllable resource families aggregated by the VPP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceId {
    Solar,
    Wind,
    Battery,
    Hvac,
    Ev,
}

impl ResourceId {
    /// Every resource in display order.
    pub const ALL: [ResourceId; 5] = [
        ResourceId::Solar,
        ResourceId::Wind,
        ResourceId::Battery,
        ResourceId::Hvac,
        ResourceId::Ev,
    ];

    /// Short identifier used in routes and serialized maps.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceId::Solar => "solar",
            ResourceId::Wind => "wind",
            ResourceId::Battery => "battery",
            ResourceId::Hvac => "hvac",
            ResourceId::Ev => "ev",
        }
    }

    /// Human-readable name used in the event log.
    pub fn display_name(&self) -> &'static str {
        match self {
            ResourceId::Solar => "Solar Farm",
            ResourceId::Wind => "Wind Farm",
            ResourceId::Battery => "Battery Storage",
            ResourceId::Hvac => "HVAC System",
            ResourceId::Ev => "EV Charging",
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transmission-level dispatch signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DispatchSignal {
    #[default]
    Normal,
    Reduction,
}

/// Operating mode of a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ResourceMode {
    #[default]
    Standard,
    #[serde(rename = "DR")]
    Dr,
}

/// Whether a selected resource sheds demand or adds supply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseType {
    Demand,
    Supply,
}

impl ResponseType {
    pub fn label(&self) -> &'static str {
        match self {
            ResponseType::Demand => "Demand Reduction",
            ResponseType::Supply => "Supply Increase",
        }
    }
}

/// Summary of the DR event currently driving the dispatch signal.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DrEventStatus {
    pub is_active: bool,
    pub start_hour: Option<u32>,
    pub duration_hours: u32,
    pub target_reduction_mwh: f64,
    pub participating_resources: usize,
}

/// High-voltage transmission quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransmissionState {
    /// Line voltage (kV), walked within [130, 134].
    pub voltage_kv: f64,
    /// System frequency (Hz), walked within [49.9, 50.1].
    pub frequency_hz: f64,
    /// Load flow (MW), walked within [75, 95].
    pub load_flow_mw: f64,
    pub dispatch_signal: DispatchSignal,
    /// Requested power change (MW); negative during a reduction.
    pub requested_power_mw: f64,
    pub power_factor: f64,
    pub harmonic_distortion: f64,
    pub line_stability: f64,
    pub congestion_level: f64,
    pub dr_event_status: DrEventStatus,
}

/// Medium-voltage distribution quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionState {
    pub voltage_kv: f64,
    pub loading_pct: f64,
    pub temperature_c: f64,
    pub power_quality_pct: f64,
    pub active_power_mw: f64,
    pub reactive_power_mvar: f64,
    /// Remaining flexible capacity (MWh), never negative.
    pub flexibility_available_mwh: f64,
    /// Per-feeder loading fractions.
    pub feeder_loading: Vec<f64>,
    pub power_losses: f64,
    pub voltage_imbalance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerStatus {
    pub status: String,
    pub control_mode: String,
    pub active_resources: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerStatus {
    pub algorithm: String,
    pub optimization_goal: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudStatus {
    pub ai_status: String,
    pub data_storage_pct: f64,
    pub predictions: String,
}

/// Display-only VPP platform status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VppState {
    pub controller: ControllerStatus,
    pub optimizer: OptimizerStatus,
    pub cloud: CloudStatus,
}

impl Default for VppState {
    fn default() -> Self {
        Self {
            controller: ControllerStatus {
                status: "Normal".to_string(),
                control_mode: "Automatic".to_string(),
                active_resources: ResourceId::ALL.len(),
            },
            optimizer: OptimizerStatus {
                algorithm: "Cost Minimization".to_string(),
                optimization_goal: "Efficiency".to_string(),
            },
            cloud: CloudStatus {
                ai_status: "Active".to_string(),
                data_storage_pct: 85.0,
                predictions: "Updated".to_string(),
            },
        }
    }
}

/// Operating point of one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceState {
    pub power_draw_kw: f64,
    pub target_kw: f64,
    pub status: String,
    pub mode: ResourceMode,
    /// Committed reduction while dispatched (MWh).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reduction_mwh: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_type: Option<ResponseType>,
}

impl ResourceState {
    /// Resource idling at its nominal operating point.
    pub fn standard(power_draw_kw: f64, target_kw: f64) -> Self {
        Self {
            power_draw_kw,
            target_kw,
            status: "Normal".to_string(),
            mode: ResourceMode::Standard,
            reduction_mwh: None,
            response_type: None,
        }
    }

    /// Nominal operating point for each resource family: `(power_draw_kw, target_kw)`.
    pub fn nominal(id: ResourceId) -> (f64, f64) {
        match id {
            ResourceId::Solar => (1200.0, 1500.0),
            ResourceId::Wind => (3000.0, 3200.0),
            ResourceId::Battery => (500.0, 600.0),
            ResourceId::Hvac => (8000.0, 7500.0),
            ResourceId::Ev => (2500.0, 2300.0),
        }
    }
}

/// Failure applying a DR dispatch to the system state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("reduction {0} is not a finite number")]
    NonFiniteReduction(f64),
    #[error("selected resource {0} is not part of the system state")]
    UnknownResource(ResourceId),
}

/// Complete snapshot of the simulated grid.
///
/// The snapshot is replaced wholesale by every update; callers never mutate
/// the live instance in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemState {
    pub transmission: TransmissionState,
    pub distribution: DistributionState,
    pub vpp: VppState,
    pub resources: BTreeMap<ResourceId, ResourceState>,
}

impl SystemState {
    /// State with every quantity at its nominal centre.
    pub fn nominal() -> Self {
        Self {
            transmission: TransmissionState {
                voltage_kv: 132.0,
                frequency_hz: 50.0,
                load_flow_mw: 85.0,
                dispatch_signal: DispatchSignal::Normal,
                requested_power_mw: 0.0,
                power_factor: 0.98,
                harmonic_distortion: 0.02,
                line_stability: 0.99,
                congestion_level: 0.5,
                dr_event_status: DrEventStatus::default(),
            },
            distribution: DistributionState {
                voltage_kv: 33.0,
                loading_pct: 75.0,
                temperature_c: 42.0,
                power_quality_pct: 98.5,
                active_power_mw: 12.4,
                reactive_power_mvar: 2.1,
                flexibility_available_mwh: 10.0,
                feeder_loading: vec![0.7, 0.8, 0.9],
                power_losses: 0.02,
                voltage_imbalance: 0.01,
            },
            vpp: VppState::default(),
            resources: ResourceId::ALL
                .iter()
                .map(|&id| {
                    let (draw, target) = ResourceState::nominal(id);
                    (id, ResourceState::standard(draw, target))
                })
                .collect(),
        }
    }

    /// Returns `true` while a DR reduction is being dispatched.
    pub fn is_dr_active(&self) -> bool {
        self.transmission.dispatch_signal == DispatchSignal::Reduction
    }

    /// Builds the state that results from dispatching `detail` of `event`
    /// to the given resource selections.
    ///
    /// The receiver is left untouched; on error the caller keeps it as is.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the reduction is not finite or a
    /// selection names a resource missing from the state.
    pub fn with_dispatch(
        &self,
        event: &DrEvent,
        detail: &HourlyDetail,
        selections: &[Selection],
    ) -> Result<SystemState, DispatchError> {
        let need = detail.reduction_needed_mwh;
        if !need.is_finite() {
            return Err(DispatchError::NonFiniteReduction(need));
        }

        let mut next = self.clone();
        let transmission = &mut next.transmission;
        transmission.dispatch_signal = DispatchSignal::Reduction;
        transmission.requested_power_mw = -need;
        transmission.dr_event_status = DrEventStatus {
            is_active: true,
            start_hour: Some(event.start),
            duration_hours: event.duration_hours,
            target_reduction_mwh: need,
            participating_resources: selections.len(),
        };

        let flex = next.distribution.flexibility_available_mwh;
        next.distribution.flexibility_available_mwh = (flex - need).max(0.0);

        next.vpp.controller.status = "DR Active".to_string();
        next.vpp.optimizer.optimization_goal = "Load Reduction".to_string();

        for selection in selections {
            let resource = next
                .resources
                .get_mut(&selection.resource)
                .ok_or(DispatchError::UnknownResource(selection.resource))?;
            if !selection.capacity_mwh.is_finite() {
                return Err(DispatchError::NonFiniteReduction(selection.capacity_mwh));
            }
            resource.status = "Responding".to_string();
            resource.mode = ResourceMode::Dr;
            resource.reduction_mwh = Some(selection.capacity_mwh);
            resource.response_type = Some(selection.response);
        }

        Ok(next)
    }

    /// Builds the state with any DR dispatch lifted.
    pub fn released(&self) -> SystemState {
        let mut next = self.clone();
        next.transmission.dispatch_signal = DispatchSignal::Normal;
        next.transmission.requested_power_mw = 0.0;
        next.transmission.dr_event_status = DrEventStatus::default();
        next.vpp.controller.status = "Normal".to_string();
        next.vpp.optimizer.optimization_goal = "Efficiency".to_string();
        for resource in next.resources.values_mut() {
            resource.status = "Normal".to_string();
            resource.mode = ResourceMode::Standard;
            resource.reduction_mwh = None;
            resource.response_type = None;
        }
        next
    }

    /// Resources currently dispatched for DR.
    pub fn dispatched_resources(&self) -> impl Iterator<Item = ResourceId> + '_ {
        self.resources
            .iter()
            .filter(|(_, r)| r.mode == ResourceMode::Dr)
            .map(|(id, _)| *id)
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::nominal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::selector::ResourceSelector;

    fn event_with(need: f64) -> (DrEvent, HourlyDetail) {
        let detail = HourlyDetail {
            hour: 10,
            reduction_needed_mwh: need,
            projected_load_mwh: 40.0,
        };
        (DrEvent::new(10, 12, vec![detail.clone()]), detail)
    }

    #[test]
    fn nominal_state_has_every_resource_in_standard_mode() {
        let state = SystemState::nominal();
        assert_eq!(state.resources.len(), 5);
        assert!(!state.is_dr_active());
        assert_eq!(state.dispatched_resources().count(), 0);
    }

    #[test]
    fn dispatch_sets_reduction_and_resource_modes() {
        let state = SystemState::nominal();
        let (event, detail) = event_with(3.0);
        let selections = ResourceSelector.select(3.0);

        let next = state.with_dispatch(&event, &detail, &selections).unwrap();

        assert_eq!(next.transmission.dispatch_signal, DispatchSignal::Reduction);
        assert_eq!(next.transmission.requested_power_mw, -3.0);
        assert_eq!(next.distribution.flexibility_available_mwh, 7.0);
        assert_eq!(next.vpp.controller.status, "DR Active");
        assert_eq!(next.vpp.optimizer.optimization_goal, "Load Reduction");
        let dispatched: Vec<_> = next.dispatched_resources().collect();
        assert_eq!(
            dispatched,
            vec![ResourceId::Battery, ResourceId::Hvac, ResourceId::Ev]
        );
        let hvac = &next.resources[&ResourceId::Hvac];
        assert_eq!(hvac.status, "Responding");
        assert_eq!(hvac.response_type, Some(ResponseType::Demand));
        assert_eq!(
            next.resources[&ResourceId::Battery].response_type,
            Some(ResponseType::Supply)
        );
        // original untouched
        assert!(!state.is_dr_active());
    }

    #[test]
    fn flexibility_floors_at_zero() {
        let state = SystemState::nominal();
        let (event, detail) = event_with(25.0);
        let next = state
            .with_dispatch(&event, &detail, &ResourceSelector.select(25.0))
            .unwrap();
        assert_eq!(next.distribution.flexibility_available_mwh, 0.0);
    }

    #[test]
    fn non_finite_reduction_is_rejected() {
        let state = SystemState::nominal();
        let (event, detail) = event_with(f64::NAN);
        let err = state
            .with_dispatch(&event, &detail, &ResourceSelector.select(f64::NAN))
            .unwrap_err();
        assert!(matches!(err, DispatchError::NonFiniteReduction(_)));
    }

    #[test]
    fn missing_resource_is_rejected() {
        let mut state = SystemState::nominal();
        state.resources.remove(&ResourceId::Ev);
        let (event, detail) = event_with(3.0);
        let err = state
            .with_dispatch(&event, &detail, &ResourceSelector.select(3.0))
            .unwrap_err();
        assert_eq!(err, DispatchError::UnknownResource(ResourceId::Ev));
    }

    #[test]
    fn release_restores_standard_modes() {
        let state = SystemState::nominal();
        let (event, detail) = event_with(3.0);
        let dispatched = state
            .with_dispatch(&event, &detail, &ResourceSelector.select(3.0))
            .unwrap();
        let released = dispatched.released();
        assert!(!released.is_dr_active());
        assert_eq!(released.transmission.requested_power_mw, 0.0);
        assert_eq!(released.dispatched_resources().count(), 0);
        assert!(!released.transmission.dr_event_status.is_active);
    }

    #[test]
    fn resource_map_serializes_with_lowercase_keys() {
        let json = serde_json::to_value(SystemState::nominal()).unwrap();
        assert!(json["resources"]["hvac"].is_object());
        assert_eq!(json["transmission"]["dispatch_signal"], "Normal");
    }
}
