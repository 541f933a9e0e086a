use super::error::JumpError;

/// Number of simulated hours in one year; also the highest reachable hour.
pub const HOURS_PER_YEAR: u32 = 8760;

/// Simulated hour-of-year clock.
///
/// The `HourClock` only tracks the hour and whether it is running; the
/// periodic tick that drives it is owned by the simulation controller.
///
/// # Examples
///
/// ```
/// use vpp_dr_sim::sim::clock::HourClock;
///
/// let mut clock = HourClock::new(0);
/// clock.start();
/// assert_eq!(clock.tick(), Some(1));
/// assert_eq!(clock.hour(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct HourClock {
    /// Current simulated hour, `0..=HOURS_PER_YEAR`
    hour: u32,
    running: bool,
}

impl HourClock {
    /// Creates a stopped clock at `hour`, clamped to the year.
    pub fn new(hour: u32) -> Self {
        Self {
            hour: hour.min(HOURS_PER_YEAR),
            running: false,
        }
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Returns `true` once the final hour of the year has been reached.
    pub fn is_finished(&self) -> bool {
        self.hour >= HOURS_PER_YEAR
    }

    /// Starts the clock.
    ///
    /// # Returns
    ///
    /// `true` if the clock transitioned from stopped to running. Already
    /// running or finished clocks are left alone.
    pub fn start(&mut self) -> bool {
        if self.running || self.is_finished() {
            return false;
        }
        self.running = true;
        true
    }

    /// Stops the clock, returning `true` if it was running.
    pub fn stop(&mut self) -> bool {
        std::mem::replace(&mut self.running, false)
    }

    /// Stops the clock and rewinds it to hour 0.
    pub fn reset(&mut self) {
        self.running = false;
        self.hour = 0;
    }

    /// Validates a user-supplied jump target.
    ///
    /// # Errors
    ///
    /// [`JumpError::OutOfRange`] unless `0 <= hour <= HOURS_PER_YEAR`.
    pub fn validate(hour: i64) -> Result<u32, JumpError> {
        u32::try_from(hour)
            .ok()
            .filter(|h| *h <= HOURS_PER_YEAR)
            .ok_or(JumpError::OutOfRange(hour))
    }

    /// Sets the hour after validation; the running flag is untouched.
    pub fn set(&mut self, hour: i64) -> Result<u32, JumpError> {
        let hour = Self::validate(hour)?;
        self.hour = hour;
        Ok(hour)
    }

    /// Advances one hour.
    ///
    /// # Returns
    ///
    /// * `Some(hour)` - The new hour. Reaching [`HOURS_PER_YEAR`] stops the clock.
    /// * `None` - If the clock is stopped or already finished
    pub fn tick(&mut self) -> Option<u32> {
        if !self.running {
            return None;
        }
        if self.is_finished() {
            self.running = false;
            return None;
        }
        self.hour += 1;
        if self.is_finished() {
            self.running = false;
        }
        Some(self.hour)
    }
}
