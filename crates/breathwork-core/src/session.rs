//! Session engine: owns one of each component and routes scheduler events
//! through the [`EventBus`] to them.
//!
//! Dispatch order for every event is voice, ambient, recorder (auto-stop
//! only), then observers registered with [`SessionEngine::subscribe`].
//! Voice does not hear the phase entered on the tick that auto-stops.

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ambient::{AmbientSynthesizer, AudioDevice};
use crate::catalog::{AmbientSoundId, BreathingPattern};
use crate::error::SessionError;
use crate::events::{Event, EventBus, Subscriber};
use crate::presentation::{PresentationFrame, View};
use crate::recorder::{KeyValueStore, MemoryStore, RecordContext, RecordTrigger, SessionRecord, SessionRecorder};
use crate::scheduler::{AutoStop, PhaseScheduler, PhaseTransition, SchedulerSnapshot, SchedulerState, TickDriver};
use crate::voice::{NarrationLibrary, NoNarration, SilentSpeech, SpeechSynthesizer, VoiceArbiter, VoiceMode};

/// Collaborators handed to a new engine.
pub struct EngineDeps {
    pub device: AudioDevice,
    pub speech: Box<dyn SpeechSynthesizer>,
    pub narration: Box<dyn NarrationLibrary>,
    pub store: Box<dyn KeyValueStore>,
    /// Seed for ambient textures; `None` draws from entropy.
    pub ambient_seed: Option<u64>,
    pub voice_mode: VoiceMode,
    pub ambient_sound: AmbientSoundId,
}

impl EngineDeps {
    /// Silent channels and an in-memory store.
    pub fn headless() -> Self {
        Self {
            device: AudioDevice::default(),
            speech: Box::new(SilentSpeech),
            narration: Box::new(NoNarration),
            store: Box::new(MemoryStore::default()),
            ambient_seed: None,
            voice_mode: VoiceMode::Off,
            ambient_sound: AmbientSoundId::None,
        }
    }
}

type Observer = Box<dyn FnMut(&Event)>;

pub struct SessionEngine {
    id: Uuid,
    scheduler: PhaseScheduler,
    ambient: AmbientSynthesizer,
    voice: VoiceArbiter,
    recorder: SessionRecorder,
    bus: EventBus,
    observers: Vec<Observer>,
    /// Set once the current session has been written; cleared by `start`.
    recorded: bool,
    last_record: Option<SessionRecord>,
    torn_down: bool,
}

impl std::fmt::Debug for SessionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEngine")
            .field("id", &self.id)
            .field("scheduler", &self.scheduler)
            .field("voice", &self.voice)
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}

impl SessionEngine {
    pub fn new(deps: EngineDeps) -> Self {
        let id = Uuid::new_v4();
        let mut device = deps.device;
        if let Err(err) = device.claim(id) {
            warn!(%err, "ambient channel silent");
            device = AudioDevice::blocked(device.sample_rate());
        }

        let mut ambient = AmbientSynthesizer::new(device, deps.ambient_seed);
        ambient.select(deps.ambient_sound);
        debug!(%id, "session engine created");

        Self {
            id,
            scheduler: PhaseScheduler::new(),
            ambient,
            voice: VoiceArbiter::new(deps.voice_mode, deps.speech, deps.narration),
            recorder: SessionRecorder::new(deps.store),
            bus: EventBus::new(),
            observers: Vec::new(),
            recorded: false,
            last_record: None,
            torn_down: false,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    pub fn pattern(&self) -> &BreathingPattern {
        self.scheduler.pattern()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        self.scheduler.snapshot()
    }

    pub fn scheduler(&self) -> &PhaseScheduler {
        &self.scheduler
    }

    pub fn ambient(&self) -> &AmbientSynthesizer {
        &self.ambient
    }

    pub fn ambient_mut(&mut self) -> &mut AmbientSynthesizer {
        &mut self.ambient
    }

    pub fn voice(&self) -> &VoiceArbiter {
        &self.voice
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// The record written for the most recent session, if any.
    pub fn last_record(&self) -> Option<&SessionRecord> {
        self.last_record.as_ref()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn frame(&self, view: View) -> PresentationFrame {
        PresentationFrame::from_state(
            view,
            self.scheduler.pattern(),
            &self.scheduler.state(),
            self.ambient.selected(),
            self.voice.mode(),
        )
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a new session. A session already in progress is reset first.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for an unusable pattern or target, or
    /// when the engine has been torn down.
    pub fn start(&mut self, pattern: BreathingPattern, target_duration_secs: u64) -> Result<(), SessionError> {
        if self.torn_down {
            return Err(SessionError::invalid("session engine has been torn down"));
        }
        pattern.validate()?;
        if target_duration_secs == 0 {
            return Err(SessionError::invalid("target duration must be positive"));
        }
        if self.scheduler.state().active {
            self.reset();
        }

        let events = self.scheduler.start(pattern, target_duration_secs)?;
        self.recorded = false;
        self.last_record = None;
        self.dispatch(events);
        Ok(())
    }

    pub fn pause(&mut self) -> bool {
        match self.scheduler.pause() {
            Some(event) => {
                self.dispatch(vec![event]);
                true
            }
            None => false,
        }
    }

    pub fn resume(&mut self) -> bool {
        match self.scheduler.resume() {
            Some(event) => {
                self.dispatch(vec![event]);
                true
            }
            None => false,
        }
    }

    /// Stop the session, recording it if it was long enough.
    pub fn reset(&mut self) -> Option<SessionRecord> {
        let record = self.record(RecordTrigger::ManualReset);
        let event = self.scheduler.reset();
        self.scheduler.clear_breaths();
        self.dispatch(vec![event]);
        record
    }

    /// Advance one second. Returns the events the tick produced.
    pub fn tick(&mut self) -> Vec<Event> {
        let events = self.scheduler.tick();
        self.dispatch(events.clone());
        events
    }

    /// Advance one second on behalf of `driver`; stale drivers are ignored.
    pub fn tick_with(&mut self, driver: TickDriver) -> Vec<Event> {
        let events = self.scheduler.tick_with(driver);
        self.dispatch(events.clone());
        events
    }

    /// # Errors
    /// Returns `InvalidConfiguration` if the pattern does not validate.
    pub fn set_pattern(&mut self, pattern: BreathingPattern) -> Result<(), SessionError> {
        let events = self.scheduler.set_pattern(pattern)?;
        self.dispatch(events);
        Ok(())
    }

    pub fn select_ambient(&mut self, sound: AmbientSoundId) {
        self.ambient.select(sound);
    }

    pub fn set_voice_mode(&mut self, mode: VoiceMode) {
        self.voice.set_mode(mode);
    }

    pub fn cycle_voice_mode(&mut self) -> VoiceMode {
        self.voice.cycle_mode()
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&Event) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn on_phase_transition(&mut self, listener: impl FnMut(&PhaseTransition) + 'static) {
        self.scheduler.on_phase_transition(listener);
    }

    pub fn on_auto_stop(&mut self, listener: impl FnMut(&AutoStop) + 'static) {
        self.scheduler.on_auto_stop(listener);
    }

    /// Stop everything for good: tick cancelled, ambient graph released and
    /// the device closed, voice silenced, an active session recorded.
    /// Later calls do nothing.
    pub fn teardown(&mut self) -> Option<SessionRecord> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;

        let record = if self.scheduler.state().active {
            self.record(RecordTrigger::Teardown)
        } else {
            None
        };
        self.scheduler.reset();
        self.scheduler.clear_breaths();
        self.bus.drain();
        self.voice.shutdown();
        self.ambient.teardown();
        self.ambient.device_mut().release(self.id);
        info!(id = %self.id, "session engine torn down");
        record
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn record(&mut self, trigger: RecordTrigger) -> Option<SessionRecord> {
        if self.recorded {
            return None;
        }
        let state = self.scheduler.state();
        let record = self.recorder.record_if_meaningful(
            &state,
            RecordContext {
                trigger,
                pattern: self.scheduler.pattern(),
                voice_mode: self.voice.mode(),
                ambient_sound: self.ambient.selected(),
            },
        );
        if record.is_some() {
            self.recorded = true;
            self.last_record.clone_from(&record);
        }
        record
    }

    fn dispatch(&mut self, events: Vec<Event>) {
        self.bus.publish_all(events);
        let batch = self.bus.drain();
        // A phase entered on the stopping tick never runs, so it is not announced.
        let ends_session = batch.iter().any(Event::is_auto_stop);
        for event in batch {
            if !(ends_session && matches!(event, Event::PhaseEntered { .. })) {
                self.voice.handle(&event);
            }
            self.ambient.handle(&event);
            if event.is_auto_stop() {
                self.record(RecordTrigger::AutoStop);
            }
            for observer in &mut self.observers {
                observer(&event);
            }
        }
    }
}

impl Drop for SessionEngine {
    fn drop(&mut self) {
        self.teardown();
    }
}
