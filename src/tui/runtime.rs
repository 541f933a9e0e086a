//! TUI application state wrapping a live simulation.

use std::time::{Duration, Instant};

use crate::sim::Simulation;
use crate::sim::clock::HOURS_PER_YEAR;
use crate::sim::types::ResourceId;

/// Virtual milliseconds per wall millisecond (slowest → fastest).
const SPEED_LEVELS: [u64; 6] = [1, 2, 5, 10, 50, 100];

/// Default speed index (real time).
const DEFAULT_SPEED_IDX: usize = 0;

/// Longest accepted jump input; 8760 has four digits.
const MAX_JUMP_DIGITS: usize = 5;

/// TUI application state.
pub struct App {
    sim: Simulation,
    /// Current index into `SPEED_LEVELS`.
    pub speed_idx: usize,
    /// Whether the user has requested quit.
    pub quit: bool,
    /// When virtual time was last advanced.
    pub last_tick: Instant,
    /// Name of the active preset.
    pub preset_name: String,
    /// Digits typed for a pending jump.
    pub jump_input: String,
}

impl App {
    pub fn new(sim: Simulation, preset: &str) -> Self {
        Self {
            sim,
            speed_idx: DEFAULT_SPEED_IDX,
            quit: false,
            last_tick: Instant::now(),
            preset_name: preset.to_string(),
            jump_input: String::new(),
        }
    }

    pub fn sim(&self) -> &Simulation {
        &self.sim
    }

    /// Advances virtual time by `elapsed` scaled by the speed multiplier.
    pub fn tick(&mut self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.sim.advance(ms.saturating_mul(self.speed()));
    }

    /// Starts the clock if stopped, stops it otherwise.
    pub fn toggle_running(&mut self) {
        if self.sim.is_running() {
            self.sim.stop();
        } else {
            self.sim.start();
        }
    }

    pub fn restart(&mut self) {
        self.sim.restart();
    }

    pub fn recover(&mut self) {
        self.sim.recover();
    }

    pub fn click(&mut self, node: ResourceId) {
        self.sim.click(node.as_str());
    }

    /// Increases simulation speed.
    pub fn speed_up(&mut self) {
        if self.speed_idx + 1 < SPEED_LEVELS.len() {
            self.speed_idx += 1;
        }
    }

    /// Decreases simulation speed.
    pub fn speed_down(&mut self) {
        if self.speed_idx > 0 {
            self.speed_idx -= 1;
        }
    }

    /// Current speed multiplier.
    pub fn speed(&self) -> u64 {
        SPEED_LEVELS[self.speed_idx]
    }

    pub fn push_jump_digit(&mut self, digit: char) {
        if digit.is_ascii_digit() && self.jump_input.len() < MAX_JUMP_DIGITS {
            self.jump_input.push(digit);
        }
    }

    pub fn pop_jump_digit(&mut self) {
        self.jump_input.pop();
    }

    /// Submits the typed hour; a rejected value still shows up in the log.
    pub fn submit_jump(&mut self) {
        let input = std::mem::take(&mut self.jump_input);
        if let Ok(hour) = input.parse::<i64>() {
            let _ = self.sim.jump_to(hour);
        }
    }

    /// Fraction of the year already simulated.
    pub fn year_progress(&self) -> f64 {
        f64::from(self.sim.hour()) / f64::from(HOURS_PER_YEAR)
    }
}
