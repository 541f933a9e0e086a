//! Background animation of grid quantities while the clock is stopped.

use rand::{Rng, SeedableRng, rngs::StdRng};

use super::types::{ResourceId, ResourceState, SystemState, VppState};
use crate::config::WalkConfig;

/// Transmission voltage band (kV).
pub const VOLTAGE_BAND_KV: (f64, f64) = (130.0, 134.0);
/// Frequency band (Hz).
pub const FREQUENCY_BAND_HZ: (f64, f64) = (49.9, 50.1);
/// Load flow band (MW).
pub const LOAD_FLOW_BAND_MW: (f64, f64) = (75.0, 95.0);

/// Seeded source of background state changes.
#[derive(Debug, Clone)]
pub struct StateGenerator {
    rng: StdRng,
    walk: WalkConfig,
}

impl StateGenerator {
    pub fn new(seed: u64, walk: WalkConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            walk,
        }
    }

    /// Uniform sample in `[center - half_width, center + half_width]`.
    fn around(&mut self, center: f64, half_width: f64) -> f64 {
        center + self.rng.random_range(-half_width..=half_width)
    }

    /// Nominal transmission with a freshly randomized distribution layer.
    pub fn initial_state(&mut self) -> SystemState {
        let nominal = SystemState::nominal();
        self.randomize(&nominal)
    }

    /// One bounded random-walk step on the transmission quantities.
    pub fn perturb(&mut self, state: &SystemState) -> SystemState {
        let mut next = state.clone();
        let t = &mut next.transmission;
        let (v_lo, v_hi) = VOLTAGE_BAND_KV;
        let (f_lo, f_hi) = FREQUENCY_BAND_HZ;
        let (l_lo, l_hi) = LOAD_FLOW_BAND_MW;

        let voltage = t.voltage_kv;
        let frequency = t.frequency_hz;
        let load_flow = t.load_flow_mw;
        t.voltage_kv = self.around(voltage, self.walk.voltage_step_kv).clamp(v_lo, v_hi);
        t.frequency_hz = self
            .around(frequency, self.walk.frequency_step_hz)
            .clamp(f_lo, f_hi);
        t.load_flow_mw = self
            .around(load_flow, self.walk.load_flow_step_mw)
            .clamp(l_lo, l_hi);
        next
    }

    /// Full refresh of the distribution, VPP and resource layers.
    ///
    /// Walked transmission quantities carry over. While a DR event is
    /// active nothing changes at all, and the result never carries a
    /// reduction signal the input did not already have.
    pub fn randomize(&mut self, state: &SystemState) -> SystemState {
        if state.is_dr_active() {
            return state.clone();
        }

        let mut next = SystemState::nominal();
        next.transmission.voltage_kv = state.transmission.voltage_kv;
        next.transmission.frequency_hz = state.transmission.frequency_hz;
        next.transmission.load_flow_mw = state.transmission.load_flow_mw;

        let d = &mut next.distribution;
        d.voltage_kv = 33.0 + self.rng.random_range(-0.5..=0.5);
        d.loading_pct = 75.0 + self.rng.random_range(-5.0..=5.0);
        d.temperature_c = 42.0 + self.rng.random_range(-1.0..=1.0);
        d.power_quality_pct = 98.5 + self.rng.random_range(-0.5..=0.5);
        d.active_power_mw = 12.4 + self.rng.random_range(-1.0..=1.0);
        d.reactive_power_mvar = 2.1 + self.rng.random_range(-0.2..=0.2);
        d.flexibility_available_mwh = 10.0 + self.rng.random_range(-1.0..=1.0);

        next.vpp = VppState::default();

        next.resources = ResourceId::ALL
            .iter()
            .map(|&id| {
                let (draw, target) = ResourceState::nominal(id);
                let draw = draw * (1.0 + self.rng.random_range(-0.05..=0.05));
                (id, ResourceState::standard(draw, target))
            })
            .collect();
        next
    }
}
