//! Scenario settings: TOML files, named presets and validation.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::sim::clock::HOURS_PER_YEAR;

/// Everything a run needs besides the event table.
///
/// Each section may be omitted; missing values fall back to the baseline
/// timings of one simulated hour per second.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Seed and starting hour.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Virtual-time periods of the hour clock and background tickers.
    #[serde(default)]
    pub timing: TimingConfig,
    /// Random-walk step sizes.
    #[serde(default)]
    pub walk: WalkConfig,
    /// DR event table source.
    #[serde(default)]
    pub events: EventsConfig,
    /// Event log retention.
    #[serde(default)]
    pub event_log: EventLogConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Master random seed.
    pub seed: u64,
    /// Hour the clock starts from (0..=8760).
    pub start_hour: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start_hour: 0,
        }
    }
}

/// Timer periods in virtual milliseconds. A zero background period disables
/// that ticker.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    /// Period of the hour clock (must be > 0).
    pub hour_tick_ms: u64,
    /// Period of the transmission random walk.
    pub walk_interval_ms: u64,
    /// Period of the full randomizer.
    pub randomize_interval_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hour_tick_ms: 1000,
            walk_interval_ms: 500,
            randomize_interval_ms: 5000,
        }
    }
}

/// Maximum per-step change of each walked transmission quantity.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WalkConfig {
    pub voltage_step_kv: f64,
    pub frequency_step_hz: f64,
    pub load_flow_step_mw: f64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            voltage_step_kv: 0.2,
            frequency_step_hz: 0.01,
            load_flow_step_mw: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventsConfig {
    /// JSON event table; the built-in table is used when unset.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EventLogConfig {
    /// Maximum retained log lines; 0 keeps everything.
    pub max_entries: usize,
}

/// A rejected setting.
#[derive(Debug, thiserror::Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"timing.hour_tick_ms"`).
    pub field: String,
    /// What the value must satisfy.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one simulated hour per second.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns the fast-forward preset: ten simulated hours per second.
    ///
    /// Narrative delays are fixed, so cascades overlap across hours.
    pub fn fast_forward() -> Self {
        Self {
            timing: TimingConfig {
                hour_tick_ms: 100,
                ..TimingConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns the calm preset: background walk and randomizer disabled.
    pub fn calm() -> Self {
        Self {
            timing: TimingConfig {
                walk_interval_ms: 0,
                randomize_interval_ms: 0,
                ..TimingConfig::default()
            },
            walk: WalkConfig {
                voltage_step_kv: 0.0,
                frequency_step_hz: 0.0,
                load_flow_step_mw: 0.0,
            },
            ..Self::default()
        }
    }

    /// Names accepted by [`ScenarioConfig::from_preset`].
    pub const PRESETS: &[&str] = &["baseline", "fast_forward", "calm"];

    /// Looks up a preset by name.
    ///
    /// # Errors
    ///
    /// Fails with field `preset` for a name outside [`Self::PRESETS`].
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "fast_forward" => Ok(Self::fast_forward()),
            "calm" => Ok(Self::calm()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Reads and parses a scenario file.
    ///
    /// # Errors
    ///
    /// Fails with field `scenario` when the file is unreadable, or `toml`
    /// when it does not parse.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// # Errors
    ///
    /// Fails with field `toml` on syntax errors, type mismatches and
    /// unknown keys.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Checks value ranges; an empty list means the scenario can run.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.simulation.start_hour > HOURS_PER_YEAR {
            errors.push(ConfigError::new(
                "simulation.start_hour",
                format!("must be <= {HOURS_PER_YEAR}"),
            ));
        }

        if self.timing.hour_tick_ms == 0 {
            errors.push(ConfigError::new("timing.hour_tick_ms", "must be > 0"));
        }

        let w = &self.walk;
        for (field, value) in [
            ("walk.voltage_step_kv", w.voltage_step_kv),
            ("walk.frequency_step_hz", w.frequency_step_hz),
            ("walk.load_flow_step_mw", w.load_flow_step_mw),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::new(field, "must be a finite value >= 0"));
            }
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn baseline_uses_one_second_hours() {
        let cfg = ScenarioConfig::baseline();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(cfg.timing.hour_tick_ms, 1000);
        assert_eq!(cfg.timing.walk_interval_ms, 500);
        assert_eq!(cfg.timing.randomize_interval_ms, 5000);
    }

    #[test]
    fn unknown_preset_names_the_choices() {
        let err = ScenarioConfig::from_preset("nonexistent").unwrap_err();
        assert!(err.message.contains("unknown preset"));
        assert_eq!(err.field, "preset");
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
seed = 99
start_hour = 4000

[timing]
hour_tick_ms = 250
walk_interval_ms = 100
randomize_interval_ms = 0

[walk]
voltage_step_kv = 0.1
frequency_step_hz = 0.005
load_flow_step_mw = 0.5

[events]
path = "data/dr_events.json"

[event_log]
max_entries = 500
"#;
        let cfg = ScenarioConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.simulation.start_hour, 4000);
        assert_eq!(cfg.timing.hour_tick_ms, 250);
        assert_eq!(cfg.walk.load_flow_step_mw, 0.5);
        assert_eq!(
            cfg.events.path.as_deref(),
            Some(Path::new("data/dr_events.json"))
        );
        assert_eq!(cfg.event_log.max_entries, 500);
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn unknown_timing_key_is_rejected() {
        let toml = r#"
[timing]
hour_tick_ms = 1000
bogus_field = true
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_zero_tick() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.timing.hour_tick_ms = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "timing.hour_tick_ms"));
    }

    #[test]
    fn validation_catches_start_past_year_end() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.simulation.start_hour = 9000;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.start_hour"));
    }

    #[test]
    fn validation_catches_negative_step() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.walk.frequency_step_hz = -0.01;
        cfg.walk.voltage_step_kv = f64::NAN;
        let errors = cfg.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn every_preset_passes_validation() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name).unwrap();
            assert!(cfg.validate().is_empty(), "{name}");
        }
    }

    #[test]
    fn fast_forward_ticks_faster() {
        assert!(
            ScenarioConfig::fast_forward().timing.hour_tick_ms
                < ScenarioConfig::baseline().timing.hour_tick_ms
        );
    }

    #[test]
    fn calm_disables_background_tickers() {
        let calm = ScenarioConfig::calm();
        assert_eq!(calm.timing.walk_interval_ms, 0);
        assert_eq!(calm.timing.randomize_interval_ms, 0);
    }

    #[test]
    fn omitted_sections_fall_back_to_baseline() {
        let cfg = ScenarioConfig::from_toml_str("[simulation]\nseed = 99\n").unwrap();
        assert_eq!(cfg.simulation.seed, 99);
        assert_eq!(cfg.timing.hour_tick_ms, 1000);
        assert_eq!(cfg.walk, WalkConfig::default());
        assert!(cfg.events.path.is_none());
    }

    #[test]
    fn error_display_names_field() {
        let err = ConfigError::new("timing.hour_tick_ms", "must be > 0");
        assert_eq!(err.to_string(), "config error: timing.hour_tick_ms: must be > 0");
    }
}
