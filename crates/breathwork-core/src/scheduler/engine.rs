//! Phase scheduler implementation.
//!
//! The scheduler is a 1 Hz state machine. It does not use internal threads -
//! the caller is responsible for calling `tick()` once per second.
//!
//! ## State Transitions
//!
//! ```text
//! Idle -> Active -> (Paused <-> Active) -> (AutoStopped | Reset) -> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut scheduler = PhaseScheduler::new();
//! scheduler.start(PatternId::Box.pattern(), 60)?;
//! // Once per second:
//! let events = scheduler.tick();
//! ```

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::driver::{DriverSlot, TickDriver};
use crate::catalog::{BreathingPattern, Phase};
use crate::error::SessionError;
use crate::events::Event;

/// Mutable counters of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SchedulerState {
    pub active: bool,
    pub paused: bool,
    pub phase_index: usize,
    /// Seconds remaining in the current phase.
    pub countdown: u32,
    pub cycle_count: u64,
    pub breath_count: u64,
    pub elapsed_secs: u64,
    pub target_duration_secs: u64,
}

impl SchedulerState {
    pub fn remaining_secs(&self) -> u64 {
        self.target_duration_secs.saturating_sub(self.elapsed_secs)
    }

    /// Active and not paused.
    pub fn is_running(&self) -> bool {
        self.active && !self.paused
    }

    /// 0.0 .. 100.0 progress towards the target duration.
    pub fn progress_pct(&self) -> f64 {
        if self.target_duration_secs == 0 {
            return 0.0;
        }
        (self.elapsed_secs as f64 / self.target_duration_secs as f64 * 100.0).min(100.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSnapshot {
    pub pattern_id: String,
    pub phase_name: Option<String>,
    #[serde(flatten)]
    pub state: SchedulerState,
}

/// Payload delivered to phase-transition listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseTransition {
    pub phase_index: usize,
    pub phase: Phase,
    /// True when the transition wrapped back to the first phase.
    pub wrapped: bool,
}

/// Payload delivered to auto-stop listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoStop {
    pub elapsed_secs: u64,
    pub breath_count: u64,
    pub cycle_count: u64,
}

type PhaseListener = Box<dyn FnMut(&PhaseTransition)>;
type AutoStopListener = Box<dyn FnMut(&AutoStop)>;

/// Core phase scheduler.
pub struct PhaseScheduler {
    pattern: BreathingPattern,
    state: SchedulerState,
    driver: DriverSlot,
    phase_listeners: Vec<PhaseListener>,
    stop_listeners: Vec<AutoStopListener>,
}

impl fmt::Debug for PhaseScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseScheduler")
            .field("pattern", &self.pattern.id)
            .field("state", &self.state)
            .field("driver", &self.driver.current())
            .finish_non_exhaustive()
    }
}

impl Default for PhaseScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseScheduler {
    /// Create an idle scheduler holding the default pattern.
    pub fn new() -> Self {
        Self {
            pattern: BreathingPattern::default(),
            state: SchedulerState::default(),
            driver: DriverSlot::default(),
            phase_listeners: Vec::new(),
            stop_listeners: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn pattern(&self) -> &BreathingPattern {
        &self.pattern
    }

    pub fn current_phase(&self) -> Option<&Phase> {
        self.pattern.phase(self.state.phase_index)
    }

    /// Serializable view of the scheduler for observers and the CLI.
    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            pattern_id: self.pattern.id.clone(),
            phase_name: self.current_phase().map(|p| p.name.clone()),
            state: self.state,
        }
    }

    /// The installed tick driver, if the scheduler is currently ticking.
    pub fn driver(&self) -> Option<TickDriver> {
        self.driver.current()
    }

    /// Number of installed tick drivers (0 or 1).
    pub fn installed_drivers(&self) -> usize {
        self.driver.installed()
    }

    pub fn on_phase_transition(&mut self, listener: impl FnMut(&PhaseTransition) + 'static) {
        self.phase_listeners.push(Box::new(listener));
    }

    pub fn on_auto_stop(&mut self, listener: impl FnMut(&AutoStop) + 'static) {
        self.stop_listeners.push(Box::new(listener));
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a fresh session on `pattern`, ending after `target_duration_secs`.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for an empty or zero-length pattern or a
    /// zero target duration. State is left untouched in that case.
    pub fn start(
        &mut self,
        pattern: BreathingPattern,
        target_duration_secs: u64,
    ) -> Result<Vec<Event>, SessionError> {
        pattern.validate()?;
        if target_duration_secs == 0 {
            return Err(SessionError::invalid("target duration must be positive"));
        }

        self.driver.install();
        self.pattern = pattern;
        self.state = SchedulerState {
            active: true,
            paused: false,
            phase_index: 0,
            countdown: self.pattern.phases[0].duration_secs,
            cycle_count: 0,
            breath_count: 0,
            elapsed_secs: 0,
            target_duration_secs,
        };
        info!(
            pattern = %self.pattern.id,
            target_duration_secs, "breathing session started"
        );

        let mut events = vec![Event::SessionStarted {
            pattern_id: self.pattern.id.clone(),
            target_duration_secs,
            at: Utc::now(),
        }];
        events.push(self.enter_phase(0, false));
        Ok(events)
    }

    pub fn pause(&mut self) -> Option<Event> {
        if !self.state.is_running() {
            return None;
        }
        self.driver.cancel();
        self.state.paused = true;
        Some(Event::SessionPaused {
            elapsed_secs: self.state.elapsed_secs,
            at: Utc::now(),
        })
    }

    pub fn resume(&mut self) -> Option<Event> {
        if !(self.state.active && self.state.paused) {
            return None;
        }
        self.driver.install();
        self.state.paused = false;
        Some(Event::SessionResumed {
            elapsed_secs: self.state.elapsed_secs,
            at: Utc::now(),
        })
    }

    /// Stop ticking and rewind to the first phase.
    ///
    /// `breath_count` survives so the recorder can still read it; call
    /// [`clear_breaths`](Self::clear_breaths) once it has.
    pub fn reset(&mut self) -> Event {
        self.driver.cancel();
        let elapsed_secs = self.state.elapsed_secs;
        self.state = SchedulerState {
            breath_count: self.state.breath_count,
            target_duration_secs: self.state.target_duration_secs,
            ..SchedulerState::default()
        };
        Event::SessionReset {
            elapsed_secs,
            breath_count: self.state.breath_count,
            at: Utc::now(),
        }
    }

    pub fn clear_breaths(&mut self) {
        self.state.breath_count = 0;
    }

    /// Swap the pattern. A running session keeps its counters and restarts
    /// the new pattern at its first phase under a freshly installed driver.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` if the new pattern does not validate.
    pub fn set_pattern(&mut self, pattern: BreathingPattern) -> Result<Vec<Event>, SessionError> {
        pattern.validate()?;
        self.pattern = pattern;
        if !self.state.active {
            self.state.phase_index = 0;
            return Ok(Vec::new());
        }

        if self.state.paused {
            self.driver.cancel();
        } else {
            self.driver.install();
        }
        self.state.phase_index = 0;
        self.state.countdown = self.pattern.phases[0].duration_secs;
        let mut events = vec![Event::PatternChanged {
            pattern_id: self.pattern.id.clone(),
            at: Utc::now(),
        }];
        events.push(self.enter_phase(0, false));
        Ok(events)
    }

    /// Advance one second using the installed driver. No-op when idle or paused.
    pub fn tick(&mut self) -> Vec<Event> {
        match self.driver.current() {
            Some(driver) => self.tick_with(driver),
            None => Vec::new(),
        }
    }

    /// Advance one second on behalf of `driver`. Ticks from a stale driver are ignored.
    pub fn tick_with(&mut self, driver: TickDriver) -> Vec<Event> {
        if !self.driver.accepts(driver) || !self.state.is_running() {
            return Vec::new();
        }

        let mut events = Vec::new();

        self.state.countdown = self.state.countdown.saturating_sub(1);
        if self.state.countdown == 0 {
            let next = (self.state.phase_index + 1) % self.pattern.len();
            let wrapped = next == 0;
            if wrapped {
                self.state.cycle_count += 1;
                self.state.breath_count += 1;
                events.push(Event::CycleCompleted {
                    cycle_count: self.state.cycle_count,
                    breath_count: self.state.breath_count,
                    at: Utc::now(),
                });
            }
            self.state.phase_index = next;
            self.state.countdown = self.pattern.phases[next].duration_secs;
            events.push(self.enter_phase(next, wrapped));
        }

        self.state.elapsed_secs += 1;

        if self.state.elapsed_secs >= self.state.target_duration_secs {
            events.push(self.auto_stop());
        }
        events
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn enter_phase(&mut self, index: usize, wrapped: bool) -> Event {
        let phase = self.pattern.phases[index].clone();
        debug!(phase = %phase.name, index, wrapped, "phase entered");
        let transition = PhaseTransition {
            phase_index: index,
            phase: phase.clone(),
            wrapped,
        };
        for listener in &mut self.phase_listeners {
            listener(&transition);
        }
        Event::PhaseEntered {
            phase_index: index,
            phase_name: phase.name,
            duration_secs: phase.duration_secs,
            at: Utc::now(),
        }
    }

    fn auto_stop(&mut self) -> Event {
        self.driver.cancel();
        self.state.active = false;
        self.state.paused = false;
        let stop = AutoStop {
            elapsed_secs: self.state.elapsed_secs,
            breath_count: self.state.breath_count,
            cycle_count: self.state.cycle_count,
        };
        info!(
            elapsed_secs = stop.elapsed_secs,
            breaths = stop.breath_count,
            "target duration reached"
        );
        for listener in &mut self.stop_listeners {
            listener(&stop);
        }
        Event::AutoStopped {
            elapsed_secs: stop.elapsed_secs,
            breath_count: stop.breath_count,
            cycle_count: stop.cycle_count,
            at: Utc::now(),
        }
    }
}
