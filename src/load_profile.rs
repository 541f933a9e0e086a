//! Hourly load profiles and the DR events derived from them.

use std::f64::consts::PI;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::Serialize;

use crate::sim::clock::HOURS_PER_YEAR;
use crate::sim::event::{DrEvent, DrEventTable, HourlyDetail};

/// CSV column holding the hourly load.
pub const PROFILE_COLUMN: &str = "Profile";
/// Time-of-day window (inclusive) in which DR trims the load.
pub const PEAK_HOURS: (usize, usize) = (9, 21);
/// Load multiplier applied inside the peak window.
pub const DR_PEAK_FACTOR: f64 = 0.9;
/// Full width of the uniform snapshot jitter (5 %, i.e. ±2.5 %).
pub const SNAPSHOT_JITTER: f64 = 0.05;
/// Share of hours, highest load first, that become DR event hours.
pub const PEAK_FRACTION: f64 = 0.10;
/// Reduction requested for a derived event hour, as a share of its load.
pub const DERIVED_REDUCTION_SHARE: f64 = 0.10;

/// Errors raised while reading a load profile.
#[derive(Debug, thiserror::Error)]
pub enum LoadProfileError {
    #[error("failed to open load profile {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse load profile: {0}")]
    Csv(#[from] csv::Error),
    #[error("load profile has no \"{PROFILE_COLUMN}\" column")]
    MissingColumn,
    #[error("row {row}: \"{value}\" is not a number")]
    InvalidValue { row: usize, value: String },
    #[error("load profile is empty")]
    Empty,
}

/// Baseline hourly load and its DR-adjusted counterpart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadProfile {
    base_load: Vec<f64>,
    with_dr: Vec<f64>,
}

/// Jittered copy of a profile stamped with its creation time.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadProfileSnapshot {
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub base_load: Vec<f64>,
    #[serde(rename = "withDR")]
    pub with_dr: Vec<f64>,
}

/// Repeats or truncates `values` to exactly `horizon` entries.
fn tile(values: &[f64], horizon: usize) -> Vec<f64> {
    if values.is_empty() {
        return vec![0.0; horizon];
    }
    values.iter().copied().cycle().take(horizon).collect()
}

fn is_peak_hour(hour: usize) -> bool {
    let (from, to) = PEAK_HOURS;
    (from..=to).contains(&(hour % 24))
}

impl LoadProfile {
    /// Builds a profile from baseline values, deriving the DR-adjusted series.
    pub fn from_base_load(base_load: Vec<f64>) -> Self {
        let with_dr = base_load
            .iter()
            .enumerate()
            .map(|(hour, &v)| if is_peak_hour(hour) { v * DR_PEAK_FACTOR } else { v })
            .collect();
        Self { base_load, with_dr }
    }

    /// Reads the `Profile` column of a CSV file.
    ///
    /// Profiles shorter than a year are tiled up to 8760 hours; longer ones
    /// are cut at the year end.
    ///
    /// # Errors
    ///
    /// [`LoadProfileError`] on I/O failure, a missing column, or a
    /// non-numeric cell.
    pub fn from_csv_path(path: &Path) -> Result<Self, LoadProfileError> {
        let file = File::open(path).map_err(|source| LoadProfileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_csv_reader(file)
    }

    /// Reads the `Profile` column from any CSV source.
    pub fn from_csv_reader(reader: impl Read) -> Result<Self, LoadProfileError> {
        let mut rdr = csv::Reader::from_reader(reader);
        let column = rdr
            .headers()?
            .iter()
            .position(|h| h.trim() == PROFILE_COLUMN)
            .ok_or(LoadProfileError::MissingColumn)?;

        let mut values = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = record.get(column).unwrap_or_default().trim();
            let value = cell.parse::<f64>().map_err(|_| LoadProfileError::InvalidValue {
                row: row + 1,
                value: cell.to_string(),
            })?;
            values.push(value);
        }
        if values.is_empty() {
            return Err(LoadProfileError::Empty);
        }

        Ok(Self::from_base_load(tile(&values, HOURS_PER_YEAR as usize)))
    }

    /// Year-long synthetic profile with a daily and a seasonal swing plus noise.
    pub fn synthetic(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let base_load = (0..HOURS_PER_YEAR as usize)
            .map(|hour| {
                let daily = (2.0 * PI * ((hour % 24) as f64 - 9.0) / 24.0).sin();
                let seasonal = (2.0 * PI * (hour as f64 / 8760.0 - 0.3)).sin();
                let noise = rng.random_range(-0.03..=0.03);
                30_000.0 * (1.0 + 0.2 * daily + 0.15 * seasonal + noise)
            })
            .collect();
        Self::from_base_load(base_load)
    }

    pub fn base_load(&self) -> &[f64] {
        &self.base_load
    }

    pub fn with_dr(&self) -> &[f64] {
        &self.with_dr
    }

    pub fn len(&self) -> usize {
        self.base_load.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base_load.is_empty()
    }

    /// Copy with every value scaled by an independent `1 + u`,
    /// `u ∈ [-2.5 %, +2.5 %)`.
    pub fn snapshot(&self, rng: &mut impl Rng, now: DateTime<Utc>) -> LoadProfileSnapshot {
        let half = SNAPSHOT_JITTER / 2.0;
        let mut jitter = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .map(|v| v * (1.0 + rng.random_range(-half..half)))
                .collect()
        };
        let base_load = jitter(&self.base_load);
        let with_dr = jitter(&self.with_dr);
        LoadProfileSnapshot {
            timestamp: now.timestamp_millis(),
            base_load,
            with_dr,
        }
    }

    /// Derives a DR event table from the highest-load hours.
    ///
    /// The top `fraction` of hours by load are grouped into runs of
    /// consecutive hours; each run becomes one event whose details ask for
    /// [`DERIVED_REDUCTION_SHARE`] of the hour's load.
    pub fn derive_events(&self, fraction: f64) -> DrEventTable {
        let count = ((self.base_load.len() as f64) * fraction.clamp(0.0, 1.0)).floor() as usize;
        let mut ranked: Vec<usize> = (0..self.base_load.len()).collect();
        ranked.sort_by(|&a, &b| self.base_load[b].total_cmp(&self.base_load[a]));
        let mut peak: Vec<usize> = ranked.into_iter().take(count).collect();
        peak.sort_unstable();

        let mut events = Vec::new();
        let mut run: Vec<usize> = Vec::new();
        for hour in peak {
            if run.last().is_some_and(|&last| last + 1 != hour) {
                events.push(self.event_for(&run));
                run.clear();
            }
            run.push(hour);
        }
        if !run.is_empty() {
            events.push(self.event_for(&run));
        }

        DrEventTable::from_events(events)
    }

    fn event_for(&self, hours: &[usize]) -> DrEvent {
        let details = hours
            .iter()
            .map(|&h| HourlyDetail {
                hour: h as u32,
                reduction_needed_mwh: self.base_load[h] * DERIVED_REDUCTION_SHARE,
                projected_load_mwh: self.base_load[h],
            })
            .collect();
        let start = hours.first().copied().unwrap_or_default() as u32;
        let end = hours.last().copied().unwrap_or_default() as u32;
        DrEvent::new(start, end, details)
    }
}
