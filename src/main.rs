//! VPP demand-response simulator entry point: CLI wiring and run modes.

use std::path::{Path, PathBuf};
use std::process;

use clap::Parser;
use tracing::{error, info};

use vpp_dr_sim::config::ScenarioConfig;
use vpp_dr_sim::io::export::export_history_csv;
use vpp_dr_sim::load_profile::{LoadProfile, PEAK_FRACTION};
use vpp_dr_sim::logging::{LogFormat, init_tracing};
use vpp_dr_sim::sim::Simulation;
use vpp_dr_sim::sim::event::DrEventTable;

#[derive(Debug, Parser)]
#[command(
    name = "vpp-dr-sim",
    version,
    about = "Virtual power plant demand-response simulator",
    long_about = None
)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Load scenario from TOML config file")]
    scenario: Option<PathBuf>,

    #[arg(
        long,
        value_name = "NAME",
        conflicts_with = "scenario",
        help = "Use a built-in preset (baseline, fast_forward, calm)"
    )]
    preset: Option<String>,

    #[arg(long, help = "Override random seed")]
    seed: Option<u64>,

    #[arg(long, value_name = "FILE", help = "DR event table (JSON)")]
    events: Option<PathBuf>,

    #[arg(
        long,
        value_name = "FILE",
        help = "Hourly load profile (CSV with a Profile column); derives events unless --events is given"
    )]
    load_profile: Option<PathBuf>,

    #[arg(long, default_value_t = 24, help = "Simulated hours for a headless run")]
    hours: u32,

    #[arg(long, value_name = "HOUR", allow_negative_numbers = true, help = "Jump to an hour before running")]
    jump: Option<i64>,

    #[arg(long, value_name = "FILE", help = "Export the dispatch history to CSV")]
    history_out: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty, help = "Diagnostic log format")]
    log_format: LogFormat,

    #[cfg(feature = "api")]
    #[arg(long, help = "Serve the live simulation over HTTP")]
    serve: bool,

    #[cfg(feature = "api")]
    #[arg(long, default_value_t = 3000, help = "API server port")]
    port: u16,

    #[cfg(feature = "tui")]
    #[arg(long, help = "Launch the live terminal UI")]
    tui: bool,
}

impl Cli {
    fn interactive(&self) -> bool {
        #[cfg(feature = "tui")]
        if self.tui {
            return true;
        }
        false
    }
}

fn load_scenario(cli: &Cli) -> ScenarioConfig {
    // --scenario takes priority, then --preset, then baseline default
    let loaded = match (&cli.scenario, &cli.preset) {
        (Some(path), _) => ScenarioConfig::from_toml_file(path),
        (None, Some(name)) => ScenarioConfig::from_preset(name),
        (None, None) => Ok(ScenarioConfig::baseline()),
    };
    let mut scenario = loaded.unwrap_or_else(|e| {
        eprintln!("{e}");
        process::exit(1);
    });

    if let Some(seed) = cli.seed {
        scenario.simulation.seed = seed;
    }

    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }
    scenario
}

/// Resolves the event table. Load failures are reported and leave the
/// simulation without events rather than aborting.
fn load_events(
    cli: &Cli,
    scenario: &ScenarioConfig,
    profile: Option<&LoadProfile>,
) -> Option<DrEventTable> {
    let explicit = cli.events.as_deref().or(scenario.events.path.as_deref());
    let table = match (explicit, profile) {
        (Some(path), _) => DrEventTable::from_path(path),
        (None, Some(profile)) => Ok(profile.derive_events(PEAK_FRACTION)),
        (None, None) => DrEventTable::builtin(),
    };
    match table {
        Ok(table) => {
            info!(events = table.len(), "DR event table loaded");
            Some(table)
        }
        Err(e) => {
            error!(error = %e, "DR event table unavailable, running without events");
            None
        }
    }
}

fn load_profile(cli: &Cli) -> Option<LoadProfile> {
    let path = cli.load_profile.as_deref()?;
    match LoadProfile::from_csv_path(path) {
        Ok(profile) => Some(profile),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn run_headless(mut sim: Simulation, cli: &Cli) {
    if let Some(hour) = cli.jump {
        // a rejected jump is already written to the event log
        let _ = sim.jump_to(hour);
    }
    let advanced = sim.run_hours(cli.hours);
    info!(advanced, hour = sim.hour(), "headless run finished");

    for entry in sim.log().chronological() {
        println!("{entry}");
    }
    println!("\n{}", sim.summary());

    if let Some(path) = &cli.history_out {
        write_history(&sim, path);
    }
}

fn write_history(sim: &Simulation, path: &Path) {
    if let Err(e) = export_history_csv(sim.history(), path) {
        eprintln!("error: failed to write CSV: {e}");
        process::exit(1);
    }
    eprintln!("Dispatch history written to {}", path.display());
}

fn main() {
    let cli = Cli::parse();

    // keep the alternate screen clean unless logging is asked for explicitly
    let default_level = if cli.interactive() { "off" } else { "info" };
    init_tracing(cli.log_format, default_level);

    let scenario = load_scenario(&cli);
    let profile = load_profile(&cli);
    let events = load_events(&cli, &scenario, profile.as_ref());
    let sim = Simulation::new(&scenario, events);

    #[cfg(feature = "tui")]
    if cli.tui {
        let preset = cli.preset.as_deref().unwrap_or("baseline");
        if let Err(e) = vpp_dr_sim::tui::run(sim, preset) {
            eprintln!("error: TUI crashed: {e}");
            process::exit(1);
        }
        return;
    }

    #[cfg(feature = "api")]
    if cli.serve {
        use std::net::SocketAddr;
        use std::sync::Arc;

        let profile = profile.unwrap_or_else(|| LoadProfile::synthetic(scenario.simulation.seed));
        let state = Arc::new(vpp_dr_sim::api::AppState::new(
            sim,
            profile,
            scenario.simulation.seed,
        ));
        let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        if let Err(e) = rt.block_on(vpp_dr_sim::api::serve(state, addr)) {
            eprintln!("error: API server failed: {e}");
            process::exit(1);
        }
        return;
    }

    run_headless(sim, &cli);
}
