//! Simulation controller owning the grid state, hour clock, event log and
//! every pending timer.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, warn};

use super::clock::{HOURS_PER_YEAR, HourClock};
use super::error::{HourError, JumpError};
use super::event::DrEventTable;
use super::generator::StateGenerator;
use super::kpi::{DispatchRecord, DrSummary};
use super::log::{EventLog, LogEntry};
use super::narrator::{Cascade, CascadeId, CascadeStep};
use super::scheduler::Scheduler;
use super::selector::ResourceSelector;
use super::types::{ResourceId, SystemState};
use crate::config::{ScenarioConfig, TimingConfig};

/// Pending timer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    HourTick,
    Walk,
    Randomize,
    Narrate { cascade: CascadeId, step: CascadeStep },
}

impl Task {
    fn is_narration(&self) -> bool {
        matches!(self, Task::Narrate { .. })
    }
}

/// Result of processing one simulated hour.
#[derive(Debug, Clone, PartialEq)]
pub enum HourOutcome {
    /// No DR event detail covers the hour.
    Idle,
    /// The hour was dispatched and its narrative scheduled.
    Dispatched {
        hour: u32,
        cascade: CascadeId,
        reduction_needed_mwh: f64,
    },
}

/// Single owner of all simulation state.
///
/// Every mutation goes through `&mut self`, so clock ticks, background
/// updates and user intents are serialized. Time is virtual: nothing
/// happens until [`Simulation::advance`] moves the clock forward, and all
/// pending timers die with the value.
pub struct Simulation {
    epoch: DateTime<Utc>,
    timing: TimingConfig,
    state: SystemState,
    clock: HourClock,
    log: EventLog,
    scheduler: Scheduler<Task>,
    generator: StateGenerator,
    selector: ResourceSelector,
    events: Option<DrEventTable>,
    missing_table_reported: bool,
    cascades: BTreeMap<CascadeId, Cascade>,
    next_cascade: CascadeId,
    history: Vec<DispatchRecord>,
    failed_updates: usize,
    has_error: bool,
}

impl Simulation {
    /// Creates a stopped simulation.
    ///
    /// # Arguments
    ///
    /// * `config` - Validated scenario configuration
    /// * `events` - DR event table, or `None` when it could not be loaded
    pub fn new(config: &ScenarioConfig, events: Option<DrEventTable>) -> Self {
        let mut generator = StateGenerator::new(config.simulation.seed, config.walk.clone());
        let state = generator.initial_state();
        let mut sim = Self {
            epoch: Utc::now(),
            timing: config.timing.clone(),
            state,
            clock: HourClock::new(config.simulation.start_hour),
            log: EventLog::new(config.event_log.max_entries),
            scheduler: Scheduler::new(),
            generator,
            selector: ResourceSelector,
            events,
            missing_table_reported: false,
            cascades: BTreeMap::new(),
            next_cascade: 0,
            history: Vec::new(),
            failed_updates: 0,
            has_error: false,
        };
        sim.schedule_background();
        sim
    }

    /// Sets the wall-clock instant corresponding to virtual time zero.
    pub fn with_epoch(mut self, epoch: DateTime<Utc>) -> Self {
        self.epoch = epoch;
        self
    }

    fn schedule_background(&mut self) {
        if self.timing.walk_interval_ms > 0 {
            self.scheduler
                .schedule_in(self.timing.walk_interval_ms, Task::Walk);
        }
        if self.timing.randomize_interval_ms > 0 {
            self.scheduler
                .schedule_in(self.timing.randomize_interval_ms, Task::Randomize);
        }
    }

    pub fn state(&self) -> &SystemState {
        &self.state
    }

    /// Replaces the whole system state.
    pub fn set_state(&mut self, state: SystemState) {
        self.state = state;
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn hour(&self) -> u32 {
        self.clock.hour()
    }

    pub fn is_running(&self) -> bool {
        self.clock.is_running()
    }

    pub fn has_error(&self) -> bool {
        self.has_error
    }

    /// Current virtual time (ms).
    pub fn now_ms(&self) -> u64 {
        self.scheduler.now_ms()
    }

    pub fn history(&self) -> &[DispatchRecord] {
        &self.history
    }

    pub fn summary(&self) -> DrSummary {
        DrSummary::from_records(&self.history, self.failed_updates)
    }

    /// Number of scheduled hour ticks; at most one.
    pub fn pending_hour_ticks(&self) -> usize {
        self.scheduler.count_where(|t| *t == Task::HourTick)
    }

    /// Number of narrative steps still waiting to fire.
    pub fn pending_narration(&self) -> usize {
        self.scheduler.count_where(Task::is_narration)
    }

    fn timestamp(&self) -> DateTime<Utc> {
        let elapsed = i64::try_from(self.scheduler.now_ms())
            .ok()
            .and_then(TimeDelta::try_milliseconds)
            .unwrap_or(TimeDelta::MAX);
        self.epoch
            .checked_add_signed(elapsed)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    fn entry(&self, hour: u32, cascade: Option<CascadeId>, message: String) -> LogEntry {
        LogEntry {
            timestamp: self.timestamp(),
            hour,
            cascade,
            message,
        }
    }

    fn log_line(&mut self, message: impl Into<String>) {
        let entry = self.entry(self.clock.hour(), None, message.into());
        self.log.push(entry);
    }

    /// Starts the hour clock.
    ///
    /// # Returns
    ///
    /// `true` if the clock transitioned to running. Calling it again while
    /// running, after the final hour, or while the error flag is raised does
    /// nothing.
    pub fn start(&mut self) -> bool {
        if self.has_error {
            warn!("start refused: simulation is in error state, recover first");
            return false;
        }
        if !self.clock.start() {
            return false;
        }
        self.scheduler
            .schedule_in(self.timing.hour_tick_ms, Task::HourTick);
        info!(hour = self.clock.hour(), "simulation started");
        true
    }

    /// Stops the clock and cancels any narration still in flight.
    pub fn stop(&mut self) -> bool {
        if !self.halt_clock() {
            return false;
        }
        self.cancel_narration();
        info!(hour = self.clock.hour(), "simulation stopped");
        true
    }

    fn halt_clock(&mut self) -> bool {
        let was_running = self.clock.stop();
        self.scheduler.cancel_where(|t| *t == Task::HourTick);
        was_running
    }

    fn cancel_narration(&mut self) {
        let dropped = self.scheduler.cancel_where(Task::is_narration);
        if dropped > 0 {
            debug!(dropped, "pending narration cancelled");
        }
        self.cascades.clear();
    }

    /// Stops, rewinds to hour 0, clears the event log and lifts any DR
    /// dispatch. The dispatch history starts over.
    pub fn restart(&mut self) {
        self.halt_clock();
        self.cancel_narration();
        self.clock.reset();
        self.log.clear();
        if self.state.is_dr_active() {
            self.state = self.state.released();
        }
        self.history.clear();
        self.failed_updates = 0;
        info!("simulation restarted");
    }

    /// Clears the error flag, regenerates the system state and restarts.
    pub fn recover(&mut self) {
        self.has_error = false;
        self.state = self.generator.initial_state();
        self.restart();
        info!("simulation recovered");
    }

    /// Records a user click on a diagram node.
    pub fn click(&mut self, node_id: &str) {
        debug!(node_id, "node clicked");
        self.log_line(format!("User clicked on {node_id}"));
    }

    /// Jumps straight to `hour` and processes it.
    ///
    /// # Errors
    ///
    /// * [`JumpError::OutOfRange`] - nothing changes apart from one error
    ///   line in the event log
    /// * [`JumpError::Hour`] - the clock moved but the hour's DR update
    ///   was rejected
    pub fn jump_to(&mut self, hour: i64) -> Result<HourOutcome, JumpError> {
        let hour = match HourClock::validate(hour) {
            Ok(hour) => hour,
            Err(err) => {
                warn!(requested = hour, "jump rejected");
                self.log_line(err.to_string());
                return Err(err);
            }
        };

        self.stop();
        self.cancel_narration();
        self.clock.set(i64::from(hour))?;
        let outcome = self.advance_hour(hour);
        self.log_line(format!("Jumped to hour {hour}"));
        info!(hour, "jumped");
        Ok(outcome?)
    }

    /// Moves to `hour` the way the clock does: lifts a DR dispatch that no
    /// longer applies, then processes the hour.
    pub fn advance_hour(&mut self, hour: u32) -> Result<HourOutcome, HourError> {
        let covered = self
            .events
            .as_ref()
            .is_some_and(|table| table.lookup(hour).is_some());
        if self.state.is_dr_active() && !covered {
            self.state = self.state.released();
            self.log_line("Demand Response Event Concluded");
            info!(hour, "DR dispatch released");
        }
        self.process_hour(hour)
    }

    /// Dispatches the DR event detail covering `hour`, if any.
    ///
    /// Outside events this is a no-op: neither the state nor the log change.
    ///
    /// # Errors
    ///
    /// [`HourError::StateUpdate`] when the DR update cannot be applied. The
    /// previous state is kept, nothing is logged, and the failure counts
    /// toward [`DrSummary::failed_updates`].
    pub fn process_hour(&mut self, hour: u32) -> Result<HourOutcome, HourError> {
        let Some(table) = self.events.as_ref() else {
            if !self.missing_table_reported {
                error!("no DR event table loaded; hours will not be dispatched");
                self.missing_table_reported = true;
            }
            return Ok(HourOutcome::Idle);
        };
        let Some((event, detail)) = table.lookup(hour) else {
            debug!(hour, "no DR event");
            return Ok(HourOutcome::Idle);
        };
        let (event, detail) = (event.clone(), detail.clone());

        let selections = self.selector.select(detail.reduction_needed_mwh);
        let next = match self.state.with_dispatch(&event, &detail, &selections) {
            Ok(next) => next,
            Err(source) => {
                self.failed_updates += 1;
                warn!(hour, %source, "DR update rejected, keeping previous state");
                return Err(HourError::StateUpdate { hour, source });
            }
        };
        self.state = next;

        self.history.push(DispatchRecord {
            hour,
            event_start: event.start,
            reduction_needed_mwh: detail.reduction_needed_mwh,
            projected_load_mwh: detail.projected_load_mwh,
            hvac_mwh: DispatchRecord::share(&selections, ResourceId::Hvac),
            ev_mwh: DispatchRecord::share(&selections, ResourceId::Ev),
            battery_mwh: DispatchRecord::share(&selections, ResourceId::Battery),
            flexibility_after_mwh: self.state.distribution.flexibility_available_mwh,
        });

        let id = self.next_cascade;
        self.next_cascade += 1;
        let cascade = Cascade {
            id,
            hour,
            duration_hours: event.duration_hours,
            reduction_needed_mwh: detail.reduction_needed_mwh,
            projected_load_mwh: detail.projected_load_mwh,
            selections,
        };
        self.narrate(&cascade, CascadeStep::Initiated);
        for (delay, step) in cascade.plan() {
            self.scheduler
                .schedule_in(delay, Task::Narrate { cascade: id, step });
        }
        self.cascades.insert(id, cascade);

        info!(
            hour,
            cascade = id,
            reduction_mwh = detail.reduction_needed_mwh,
            "DR event dispatched"
        );
        Ok(HourOutcome::Dispatched {
            hour,
            cascade: id,
            reduction_needed_mwh: detail.reduction_needed_mwh,
        })
    }

    fn narrate(&mut self, cascade: &Cascade, step: CascadeStep) {
        let block: Vec<LogEntry> = cascade
            .render(step)
            .into_iter()
            .map(|line| self.entry(cascade.hour, Some(cascade.id), line))
            .collect();
        self.log.push_block(block);
    }

    /// Advances virtual time by `ms`, firing every task that comes due.
    pub fn advance(&mut self, ms: u64) {
        let until = self.scheduler.now_ms().saturating_add(ms);
        self.advance_to(until);
    }

    /// Advances virtual time to `until_ms`; earlier instants are ignored.
    pub fn advance_to(&mut self, until_ms: u64) {
        while let Some(task) = self.scheduler.pop_due(until_ms) {
            self.fire(task);
        }
        self.scheduler.finish_at(until_ms);
    }

    /// Runs the clock for up to `hours` simulated hours, then halts it and
    /// lets the narration of the last dispatches finish.
    ///
    /// # Returns
    ///
    /// The number of hours the clock actually advanced.
    pub fn run_hours(&mut self, hours: u32) -> u32 {
        let from = self.clock.hour();
        if !self.clock.is_running() && !self.start() {
            return 0;
        }
        let span = u64::from(hours) * self.timing.hour_tick_ms;
        self.advance(span);
        self.halt_clock();
        if let Some(last) = self.scheduler.last_due_where(Task::is_narration) {
            self.advance_to(last);
        }
        self.clock.hour() - from
    }

    fn fire(&mut self, task: Task) {
        match task {
            Task::HourTick => self.on_hour_tick(),
            Task::Walk => {
                if !self.clock.is_running() {
                    self.state = self.generator.perturb(&self.state);
                }
                self.scheduler
                    .schedule_in(self.timing.walk_interval_ms, Task::Walk);
            }
            Task::Randomize => {
                if !self.clock.is_running() {
                    self.state = self.generator.randomize(&self.state);
                }
                self.scheduler
                    .schedule_in(self.timing.randomize_interval_ms, Task::Randomize);
            }
            Task::Narrate { cascade, step } => {
                let Some(c) = self.cascades.get(&cascade).cloned() else {
                    return;
                };
                self.narrate(&c, step);
                if step == CascadeStep::ImplementationComplete {
                    self.cascades.remove(&cascade);
                }
            }
        }
    }

    fn on_hour_tick(&mut self) {
        if !self.clock.is_running() {
            return;
        }
        if self.state.resources.is_empty() {
            error!(hour = self.clock.hour(), "no resources left to simulate, halting");
            self.has_error = true;
            self.halt_clock();
            return;
        }
        let Some(hour) = self.clock.tick() else {
            return;
        };
        // Failures are reported and counted by process_hour.
        let _ = self.advance_hour(hour);

        if self.clock.is_running() {
            self.scheduler
                .schedule_in(self.timing.hour_tick_ms, Task::HourTick);
        } else {
            info!(hour, last = HOURS_PER_YEAR, "end of year reached, clock stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::event::{DrEvent, HourlyDetail};
    use crate::sim::types::DispatchSignal;

    fn table() -> DrEventTable {
        DrEventTable::from_events(vec![DrEvent::new(
            10,
            12,
            vec![
                HourlyDetail {
                    hour: 10,
                    reduction_needed_mwh: 3.0,
                    projected_load_mwh: 40.0,
                },
                HourlyDetail {
                    hour: 11,
                    reduction_needed_mwh: 4.0,
                    projected_load_mwh: 42.0,
                },
            ],
        )])
    }

    fn sim() -> Simulation {
        Simulation::new(&ScenarioConfig::calm(), Some(table()))
    }

    #[test]
    fn tick_advances_one_hour_per_period() {
        let mut s = sim();
        s.start();
        s.advance(3000);
        assert_eq!(s.hour(), 3);
        s.advance(999);
        assert_eq!(s.hour(), 3);
        s.advance(1);
        assert_eq!(s.hour(), 4);
    }

    #[test]
    fn start_is_idempotent() {
        let mut s = sim();
        assert!(s.start());
        assert!(!s.start());
        assert_eq!(s.pending_hour_ticks(), 1);
    }

    #[test]
    fn stop_halts_ticks() {
        let mut s = sim();
        s.start();
        s.advance(2000);
        assert!(s.stop());
        s.advance(10_000);
        assert_eq!(s.hour(), 2);
        assert!(!s.stop());
    }

    #[test]
    fn dispatch_then_release() {
        let mut s = sim();
        s.jump_to(9).unwrap();
        s.start();
        s.advance(1000);
        assert_eq!(s.hour(), 10);
        assert_eq!(s.state().transmission.dispatch_signal, DispatchSignal::Reduction);
        s.advance(2000);
        assert_eq!(s.hour(), 12);
        assert!(!s.state().is_dr_active());
        assert!(s.log().contains("Demand Response Event Concluded"));
        assert_eq!(s.summary().hours_dispatched, 2);
    }

    #[test]
    fn idle_hour_leaves_state_and_log_alone() {
        let mut s = sim();
        let before = s.state().clone();
        assert_eq!(s.process_hour(500), Ok(HourOutcome::Idle));
        assert_eq!(s.state(), &before);
        assert!(s.log().is_empty());
    }

    #[test]
    fn missing_table_is_treated_as_no_event() {
        let mut s = Simulation::new(&ScenarioConfig::calm(), None);
        assert_eq!(s.process_hour(10), Ok(HourOutcome::Idle));
        assert!(!s.state().is_dr_active());
    }

    #[test]
    fn restart_clears_log_and_hour() {
        let mut s = sim();
        s.jump_to(10).unwrap();
        s.restart();
        assert_eq!(s.hour(), 0);
        assert!(s.log().is_empty());
        assert!(!s.state().is_dr_active());
        assert_eq!(s.pending_narration(), 0);
    }

    #[test]
    fn click_logs_node() {
        let mut s = sim();
        s.click("battery");
        assert_eq!(
            s.log().entries().next().map(|e| e.message.as_str()),
            Some("User clicked on battery")
        );
    }

    #[test]
    fn timestamps_follow_virtual_time() {
        use chrono::TimeZone;

        let epoch = Utc.with_ymd_and_hms(2024, 7, 1, 14, 0, 0).unwrap();
        let mut s = sim().with_epoch(epoch);
        s.advance(61_500);
        s.click("solar");
        let entry = s.log().entries().next().unwrap();
        assert_eq!(entry.timestamp, epoch + TimeDelta::milliseconds(61_500));
        assert_eq!(entry.to_string(), "[14:01:01] User clicked on solar");
    }

    #[test]
    fn empty_resources_raise_error_flag() {
        let mut s = sim();
        let mut state = s.state().clone();
        state.resources.clear();
        s.set_state(state);
        s.start();
        s.advance(1000);
        assert!(s.has_error());
        assert!(!s.is_running());
        assert!(!s.start());
        s.recover();
        assert!(!s.has_error());
        assert_eq!(s.state().resources.len(), 5);
        assert!(s.start());
    }

    #[test]
    fn run_hours_lets_narration_finish() {
        let mut s = sim();
        let advanced = s.run_hours(11);
        assert_eq!(advanced, 11);
        assert!(!s.is_running());
        assert_eq!(s.pending_narration(), 0);
        assert_eq!(s.log().count_for(0), 19);
        assert_eq!(s.log().count_for(1), 19);
    }

    #[test]
    fn background_walk_runs_only_while_stopped() {
        let mut s = Simulation::new(&ScenarioConfig::baseline(), Some(table()));
        let before = s.state().transmission.clone();
        s.start();
        s.advance(900);
        assert_eq!(s.state().transmission.voltage_kv, before.voltage_kv);
        s.stop();
        s.advance(500);
        assert_ne!(s.state().transmission, before);
    }
}
