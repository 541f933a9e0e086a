/// Simulated hour-of-year clock.
pub mod clock;
pub mod engine;
pub mod error;
/// Demand-response event table.
pub mod event;
/// Background random walk and randomizer.
pub mod generator;
pub mod kpi;
pub mod log;
/// Timed DR narrative.
pub mod narrator;
pub mod scheduler;
/// Fixed-proportion resource selection.
pub mod selector;
pub mod types;

pub use engine::{HourOutcome, Simulation};
pub use error::{HourError, JumpError};
