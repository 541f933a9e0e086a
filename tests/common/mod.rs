//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use vpp_dr_sim::config::ScenarioConfig;
use vpp_dr_sim::sim::Simulation;
use vpp_dr_sim::sim::event::{DrEvent, DrEventTable, HourlyDetail};

/// Quiet configuration: no background walk or randomizer, 1 s hour tick.
pub fn calm_config() -> ScenarioConfig {
    ScenarioConfig::calm()
}

/// Hourly detail with a projected load of 40 MWh.
pub fn detail(hour: u32, reduction_needed_mwh: f64) -> HourlyDetail {
    HourlyDetail {
        hour,
        reduction_needed_mwh,
        projected_load_mwh: 40.0,
    }
}

/// Two events: hours 5–6 fully detailed, and 20–22 with hour 21 missing.
pub fn small_table() -> DrEventTable {
    DrEventTable::from_events(vec![
        DrEvent::new(5, 6, vec![detail(5, 2.0), detail(6, 2.5)]),
        DrEvent::new(20, 22, vec![detail(20, 3.0), detail(22, 3.3)]),
    ])
}

/// Stopped simulation over [`small_table`].
pub fn small_sim() -> Simulation {
    Simulation::new(&calm_config(), Some(small_table()))
}

/// Event log oldest first.
pub fn messages(sim: &Simulation) -> Vec<String> {
    sim.log()
        .chronological()
        .into_iter()
        .map(|e| e.message.clone())
        .collect()
}
