use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Every state change of a session produces an Event.
/// The voice arbiter, ambient synthesizer and presentation layer subscribe to them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    SessionStarted {
        pattern_id: String,
        target_duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// A phase was entered; `countdown` equals the full phase duration.
    PhaseEntered {
        phase_index: usize,
        phase_name: String,
        duration_secs: u32,
        at: DateTime<Utc>,
    },
    /// The phase index wrapped back to 0.
    CycleCompleted {
        cycle_count: u64,
        breath_count: u64,
        at: DateTime<Utc>,
    },
    /// Target duration reached; the session is complete.
    AutoStopped {
        elapsed_secs: u64,
        breath_count: u64,
        cycle_count: u64,
        at: DateTime<Utc>,
    },
    /// The pattern was swapped mid-session.
    PatternChanged {
        pattern_id: String,
        at: DateTime<Utc>,
    },
    SessionPaused {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionResumed {
        elapsed_secs: u64,
        at: DateTime<Utc>,
    },
    SessionReset {
        elapsed_secs: u64,
        breath_count: u64,
        at: DateTime<Utc>,
    },
}

impl Event {
    /// Short machine name, as used in the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::SessionStarted { .. } => "SessionStarted",
            Event::PhaseEntered { .. } => "PhaseEntered",
            Event::CycleCompleted { .. } => "CycleCompleted",
            Event::AutoStopped { .. } => "AutoStopped",
            Event::PatternChanged { .. } => "PatternChanged",
            Event::SessionPaused { .. } => "SessionPaused",
            Event::SessionResumed { .. } => "SessionResumed",
            Event::SessionReset { .. } => "SessionReset",
        }
    }

    pub fn is_auto_stop(&self) -> bool {
        matches!(self, Event::AutoStopped { .. })
    }
}

/// Component that reacts to session events.
pub trait Subscriber {
    fn handle(&mut self, event: &Event);
}

/// FIFO queue between the scheduler and its subscribers.
///
/// Publishing never calls into subscribers; the owner drains the queue and
/// dispatches, so a subscriber can never re-enter the scheduler mid-tick.
#[derive(Debug, Default)]
pub struct EventBus {
    queue: VecDeque<Event>,
    published: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&mut self, event: Event) {
        self.published += 1;
        self.queue.push_back(event);
    }

    pub fn publish_all(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Take everything queued so far, oldest first.
    pub fn drain(&mut self) -> Vec<Event> {
        self.queue.drain(..).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Total events published over the bus lifetime.
    pub fn published(&self) -> u64 {
        self.published
    }
}
