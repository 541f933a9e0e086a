//! Virtual power plant demand-response simulator.

#[cfg(feature = "api")]
/// REST API over a live simulation.
pub mod api;
pub mod config;
pub mod io;
pub mod load_profile;
pub mod logging;
/// Hour clock, DR dispatch, narration and background state.
pub mod sim;
#[cfg(feature = "tui")]
/// Live terminal UI.
pub mod tui;
