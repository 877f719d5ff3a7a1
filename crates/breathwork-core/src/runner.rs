//! Async 1 Hz driver for a [`SessionEngine`].
//!
//! The runner is the only timer a session has. It lives for exactly one call
//! to [`run_session`], so nothing can tick the engine once the call returns.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use crate::events::Event;
use crate::recorder::SessionRecord;
use crate::session::SessionEngine;

pub const TICK_PERIOD: Duration = Duration::from_secs(1);

/// How a run ended, with the record written for it (if it counted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Target duration reached, or the engine was idle or paused to begin with.
    Completed(Option<SessionRecord>),
    /// Cancellation fired; the engine was reset.
    Cancelled(Option<SessionRecord>),
}

impl RunOutcome {
    pub fn record(&self) -> Option<&SessionRecord> {
        match self {
            RunOutcome::Completed(r) | RunOutcome::Cancelled(r) => r.as_ref(),
        }
    }
}

/// Tick `engine` once per second until it auto-stops or `cancel` turns true.
///
/// `on_tick` sees the engine after every tick together with that tick's
/// events. A dropped cancel sender just means the run can no longer be
/// cancelled. An idle or paused engine returns `Completed` at once.
pub async fn run_session(
    engine: &mut SessionEngine,
    mut cancel: watch::Receiver<bool>,
    mut on_tick: impl FnMut(&SessionEngine, &[Event]),
) -> RunOutcome {
    let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut cancel_open = true;

    loop {
        if !engine.state().is_running() {
            return RunOutcome::Completed(engine.last_record().cloned());
        }
        if *cancel.borrow() {
            debug!("session run cancelled");
            return RunOutcome::Cancelled(engine.reset());
        }

        tokio::select! {
            _ = ticker.tick() => {
                let events = engine.tick();
                on_tick(engine, &events);
                if events.iter().any(Event::is_auto_stop) {
                    return RunOutcome::Completed(engine.last_record().cloned());
                }
            }
            changed = cancel.changed(), if cancel_open => {
                if changed.is_err() {
                    cancel_open = false;
                }
            }
        }
    }
}

/// Drive `engine` to completion without waiting between ticks.
pub fn run_to_completion(
    engine: &mut SessionEngine,
    mut on_tick: impl FnMut(&SessionEngine, &[Event]),
) -> RunOutcome {
    while engine.state().is_running() {
        let events = engine.tick();
        on_tick(engine, &events);
    }
    RunOutcome::Completed(engine.last_record().cloned())
}
