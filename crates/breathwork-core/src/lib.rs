//! # Breathwork Core Library
//!
//! This library provides the session engine behind Breathwork's guided
//! breathing exercises. The CLI binary and any GUI shell are thin layers over
//! the same core.
//!
//! ## Architecture
//!
//! - **Phase Scheduler**: A 1 Hz state machine that requires the caller to
//!   invoke `tick()` once per second (or use the async [`runner`])
//! - **Ambient Synthesizer**: Builds and tears down procedurally generated
//!   soundscapes on an explicitly owned [`AudioDevice`]
//! - **Voice Arbiter**: Switches between prerecorded narration, synthesized
//!   phase announcements and silence
//! - **Session Recorder**: Append-only capped session log plus aggregate stats
//! - **Storage**: SQLite key-value store and TOML configuration
//!
//! ## Key Components
//!
//! - [`SessionEngine`]: Owns one instance of every component and routes events
//! - [`PhaseScheduler`]: Core phase/cycle/breath state machine
//! - [`SessionRecorder`]: Session persistence and statistics
//! - [`Config`]: Application configuration management

pub mod ambient;
pub mod catalog;
pub mod error;
pub mod events;
pub mod presentation;
pub mod recorder;
pub mod runner;
pub mod scheduler;
pub mod session;
pub mod storage;
pub mod voice;

pub use ambient::{AmbientSynthesizer, AudioDevice, DeviceState, NodeHandle};
pub use catalog::{AmbientSound, AmbientSoundId, BreathingPattern, PatternId, Phase, PhaseKind};
pub use error::{ConfigError, CoreError, DatabaseError, SessionError, StorageError};
pub use events::{Event, EventBus, Subscriber};
pub use presentation::{PresentationFrame, View};
pub use recorder::{
    AggregateStats, KeyValueStore, MemoryStore, RecordContext, RecordTrigger, SessionRecord,
    SessionRecorder,
};
pub use runner::{run_session, run_to_completion, RunOutcome};
pub use scheduler::{PhaseScheduler, SchedulerSnapshot, SchedulerState, TickDriver};
pub use session::{EngineDeps, SessionEngine};
pub use storage::{Config, Database};
pub use voice::{
    ConsoleSpeech, FileNarrationLibrary, NoNarration, SilentSpeech, SpeechSynthesizer, VoiceArbiter,
    VoiceMode,
};
