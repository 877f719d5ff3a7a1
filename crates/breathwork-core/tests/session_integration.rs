//! Integration tests for the session engine.
//!
//! Drives whole sessions through `SessionEngine` and checks what each
//! component observed: scheduler counters, ambient graphs, voice output and
//! the persisted log.

use std::cell::RefCell;
use std::rc::Rc;

use breathwork_core::{
    AmbientSoundId, AudioDevice, BreathingPattern, EngineDeps, Event, KeyValueStore, MemoryStore,
    NoNarration, PatternId, Phase, SessionEngine, SessionError, SpeechSynthesizer, VoiceMode,
};
use proptest::prelude::*;

#[derive(Default)]
struct SpeechLog {
    spoken: Vec<String>,
    speaking: bool,
    cancels: usize,
}

struct RecordingSpeech(Rc<RefCell<SpeechLog>>);

impl SpeechSynthesizer for RecordingSpeech {
    fn speak(&mut self, text: &str) -> Result<(), SessionError> {
        let mut log = self.0.borrow_mut();
        log.spoken.push(text.to_string());
        log.speaking = true;
        Ok(())
    }

    fn cancel(&mut self) {
        let mut log = self.0.borrow_mut();
        log.speaking = false;
        log.cancels += 1;
    }

    fn is_speaking(&self) -> bool {
        self.0.borrow().speaking
    }
}

fn engine_with_store(store: Rc<MemoryStore>) -> SessionEngine {
    SessionEngine::new(EngineDeps {
        device: AudioDevice::new(8_000),
        store: Box::new(store),
        ambient_seed: Some(7),
        ..EngineDeps::headless()
    })
}

fn run(engine: &mut SessionEngine, secs: u64) -> Vec<Event> {
    (0..secs).flat_map(|_| engine.tick()).collect()
}

fn stored_sessions(store: &MemoryStore) -> usize {
    store
        .get("nb_breathing_sessions")
        .unwrap()
        .map(|raw| serde_json::from_str::<Vec<serde_json::Value>>(&raw).unwrap().len())
        .unwrap_or(0)
}

#[test]
fn test_box_sixty_seconds_auto_stops_with_three_breaths() {
    let store = Rc::new(MemoryStore::default());
    let mut engine = engine_with_store(Rc::clone(&store));
    engine.start(PatternId::Box.pattern(), 60).unwrap();

    let events = run(&mut engine, 59);
    assert!(!events.iter().any(Event::is_auto_stop));
    let events = engine.tick();
    assert!(events.iter().any(Event::is_auto_stop));

    let state = engine.state();
    assert_eq!(state.elapsed_secs, 60);
    assert_eq!(state.breath_count, 3);
    assert!(!state.active);

    let record = engine.last_record().unwrap();
    assert!(record.completed);
    assert_eq!(record.breaths, 3);
    assert_eq!(record.duration, 60);
    assert_eq!(stored_sessions(&store), 1);

    // Nothing ticks after the stop.
    assert!(run(&mut engine, 5).is_empty());
    assert_eq!(engine.state().elapsed_secs, 60);
}

#[test]
fn test_box_sixteen_seconds_counts_one_breath() {
    let mut engine = SessionEngine::new(EngineDeps::headless());
    engine.start(PatternId::Box.pattern(), 16).unwrap();
    run(&mut engine, 16);
    let state = engine.state();
    assert!(!state.active);
    assert_eq!(state.elapsed_secs, 16);
    assert_eq!(state.breath_count, 1);
    assert_eq!(state.phase_index, 0);
    // Below the 30 second threshold.
    assert!(engine.last_record().is_none());
}

#[test]
fn test_short_session_reset_writes_nothing() {
    let store = Rc::new(MemoryStore::default());
    let mut engine = engine_with_store(Rc::clone(&store));
    engine.start(PatternId::Box.pattern(), 120).unwrap();
    run(&mut engine, 10);
    assert_eq!(engine.state().breath_count, 0);

    assert!(engine.reset().is_none());
    assert_eq!(stored_sessions(&store), 0);
}

#[test]
fn test_switching_ambient_leaves_exactly_one_graph() {
    let mut engine = SessionEngine::new(EngineDeps {
        device: AudioDevice::new(8_000),
        ambient_sound: AmbientSoundId::Rain,
        ambient_seed: Some(3),
        ..EngineDeps::headless()
    });
    engine.start(PatternId::Coherent.pattern(), 120).unwrap();
    run(&mut engine, 5);
    let rain = engine.ambient().active_graph().unwrap().clone();
    assert_eq!(rain.sound, AmbientSoundId::Rain);

    engine.select_ambient(AmbientSoundId::Ocean);
    let ambient = engine.ambient();
    let ocean = ambient.active_graph().unwrap();
    assert_eq!(ocean.sound, AmbientSoundId::Ocean);
    let arena = ambient.device().arena();
    assert!(rain.handles.iter().all(|h| !arena.is_running(*h)));
    assert_eq!(arena.running(), ocean.handles.len());

    let samples = engine.ambient_mut().device_mut().render(256);
    assert!(samples.iter().any(|s| *s != 0.0));
}

#[test]
fn test_voice_off_cancels_in_flight_announcement() {
    let speech = Rc::new(RefCell::new(SpeechLog::default()));
    let mut engine = SessionEngine::new(EngineDeps {
        speech: Box::new(RecordingSpeech(Rc::clone(&speech))),
        narration: Box::new(NoNarration),
        voice_mode: VoiceMode::Synthesized,
        ..EngineDeps::headless()
    });
    engine.start(PatternId::Box.pattern(), 60).unwrap();
    assert_eq!(speech.borrow().spoken, vec!["Inhale"]);
    assert!(engine.voice().is_speaking());

    engine.set_voice_mode(VoiceMode::Off);
    assert!(!engine.voice().is_speaking());

    run(&mut engine, 60);
    assert_eq!(speech.borrow().spoken, vec!["Inhale"]);

    // Back on: announcements resume with the next phase.
    let mut engine = SessionEngine::new(EngineDeps {
        speech: Box::new(RecordingSpeech(Rc::clone(&speech))),
        voice_mode: VoiceMode::Off,
        ..EngineDeps::headless()
    });
    engine.start(PatternId::Sos.pattern(), 60).unwrap();
    engine.set_voice_mode(VoiceMode::Synthesized);
    run(&mut engine, 4);
    assert_eq!(speech.borrow().spoken.last().map(String::as_str), Some("Exhale"));
}

#[test]
fn test_synthesized_session_ends_with_completion_line() {
    let speech = Rc::new(RefCell::new(SpeechLog::default()));
    let mut engine = SessionEngine::new(EngineDeps {
        speech: Box::new(RecordingSpeech(Rc::clone(&speech))),
        voice_mode: VoiceMode::Synthesized,
        ..EngineDeps::headless()
    });
    engine.start(PatternId::Sos.pattern(), 20).unwrap();
    run(&mut engine, 20);
    assert_eq!(
        speech.borrow().spoken,
        vec!["Inhale", "Exhale", "Inhale", "Exhale", "Session complete. Well done."]
    );
}

#[test]
fn test_stopping_tick_announces_only_completion() {
    let speech = Rc::new(RefCell::new(SpeechLog::default()));
    let mut engine = SessionEngine::new(EngineDeps {
        speech: Box::new(RecordingSpeech(Rc::clone(&speech))),
        voice_mode: VoiceMode::Synthesized,
        ..EngineDeps::headless()
    });
    let phases = Rc::new(RefCell::new(Vec::new()));
    {
        let phases = Rc::clone(&phases);
        engine.subscribe(move |e| {
            if let Event::PhaseEntered { phase_name, .. } = e {
                phases.borrow_mut().push(phase_name.clone());
            }
        });
    }
    engine.start(PatternId::Box.pattern(), 16).unwrap();
    run(&mut engine, 16);

    let spoken = speech.borrow().spoken.clone();
    assert_eq!(
        spoken[spoken.len() - 2..],
        ["Hold".to_string(), "Session complete. Well done.".to_string()]
    );
    assert_eq!(engine.voice().announcements(), 4);
    // Observers still see the wrap into the first phase.
    assert_eq!(phases.borrow().last().map(String::as_str), Some("Inhale"));
}

#[test]
fn test_double_reset_records_once() {
    let store = Rc::new(MemoryStore::default());
    let mut engine = engine_with_store(Rc::clone(&store));
    engine.start(PatternId::Coherent.pattern(), 300).unwrap();
    run(&mut engine, 42);

    let first = engine.reset().unwrap();
    assert!(!first.completed);
    assert_eq!(first.breaths, 4);
    assert!(engine.reset().is_none());
    assert_eq!(stored_sessions(&store), 1);
    assert_eq!(engine.state().breath_count, 0);
}

#[test]
fn test_reset_then_teardown_records_once() {
    let store = Rc::new(MemoryStore::default());
    let mut engine = engine_with_store(Rc::clone(&store));
    engine.start(PatternId::Box.pattern(), 300).unwrap();
    run(&mut engine, 40);

    assert!(engine.reset().is_some());
    assert!(engine.teardown().is_none());
    assert_eq!(stored_sessions(&store), 1);
}

#[test]
fn test_auto_stop_then_reset_and_teardown_record_once() {
    let store = Rc::new(MemoryStore::default());
    let mut engine = engine_with_store(Rc::clone(&store));
    engine.start(PatternId::Coherent.pattern(), 30).unwrap();
    run(&mut engine, 30);
    assert!(engine.last_record().is_some());

    assert!(engine.reset().is_none());
    assert!(engine.teardown().is_none());
    assert_eq!(stored_sessions(&store), 1);
}

#[test]
fn test_teardown_records_active_session_and_silences_everything() {
    let store = Rc::new(MemoryStore::default());
    let mut engine = SessionEngine::new(EngineDeps {
        device: AudioDevice::new(8_000),
        store: Box::new(Rc::clone(&store)),
        ambient_sound: AmbientSoundId::Fire,
        ..EngineDeps::headless()
    });
    engine.start(PatternId::FourSevenEight.pattern(), 300).unwrap();
    run(&mut engine, 40);
    assert!(engine.ambient().active_graph().is_some());

    let record = engine.teardown().unwrap();
    assert!(!record.completed);
    assert_eq!(record.ambient_sound, "fire");
    assert_eq!(engine.scheduler().installed_drivers(), 0);
    assert!(engine.ambient().active_graph().is_none());
    assert_eq!(engine.ambient().device().arena().running(), 0);
    assert!(engine.teardown().is_none());
    assert!(run(&mut engine, 3).is_empty());
    assert_eq!(stored_sessions(&store), 1);
}

#[test]
fn test_dropping_an_active_engine_records_it() {
    let store = Rc::new(MemoryStore::default());
    {
        let mut engine = engine_with_store(Rc::clone(&store));
        engine.start(PatternId::Sos.pattern(), 300).unwrap();
        run(&mut engine, 35);
    }
    assert_eq!(stored_sessions(&store), 1);
}

#[test]
fn test_pattern_change_keeps_counters_and_one_driver() {
    let mut engine = SessionEngine::new(EngineDeps::headless());
    engine.start(PatternId::Box.pattern(), 300).unwrap();
    run(&mut engine, 20);
    let stale = engine.scheduler().driver().unwrap();

    engine.set_pattern(PatternId::Sos.pattern()).unwrap();
    assert_eq!(engine.scheduler().installed_drivers(), 1);
    assert!(engine.tick_with(stale).is_empty());

    let state = engine.state();
    assert_eq!(state.elapsed_secs, 20);
    assert_eq!(state.breath_count, 1);
    assert_eq!(state.phase_index, 0);
    assert_eq!(state.countdown, 4);
    assert_eq!(engine.pattern().id, "sos");
}

#[test]
fn test_pause_stops_ambient_and_freezes_time() {
    let mut engine = SessionEngine::new(EngineDeps {
        device: AudioDevice::new(8_000),
        ambient_sound: AmbientSoundId::Tibetan,
        ..EngineDeps::headless()
    });
    engine.start(PatternId::Box.pattern(), 120).unwrap();
    run(&mut engine, 3);
    assert!(engine.pause());
    assert!(engine.ambient().active_graph().is_none());
    run(&mut engine, 10);
    assert_eq!(engine.state().elapsed_secs, 3);

    assert!(engine.resume());
    assert!(engine.ambient().active_graph().is_some());
    run(&mut engine, 2);
    assert_eq!(engine.state().elapsed_secs, 5);
}

#[test]
fn test_invalid_configuration_is_rejected_before_starting() {
    let mut engine = SessionEngine::new(EngineDeps::headless());
    assert!(matches!(
        engine.start(PatternId::Box.pattern(), 0),
        Err(SessionError::InvalidConfiguration(_))
    ));
    let empty = BreathingPattern {
        id: "empty".into(),
        name: "Empty".into(),
        description: String::new(),
        phases: Vec::new(),
    };
    assert!(engine.start(empty, 60).is_err());
    assert!(!engine.state().active);
    assert_eq!(engine.scheduler().installed_drivers(), 0);
}

#[test]
fn test_custom_pattern_runs_like_builtins() {
    let pattern = BreathingPattern::custom(
        "triangle",
        "Triangle",
        "",
        vec![Phase::new("Inhale", 3), Phase::new("Hold", 3), Phase::new("Exhale", 3)],
    )
    .unwrap();
    let mut engine = SessionEngine::new(EngineDeps::headless());
    engine.start(pattern, 90).unwrap();
    run(&mut engine, 90);
    let record = engine.last_record().unwrap();
    assert_eq!(record.breaths, 10);
    assert_eq!(record.pattern, "triangle");
}

proptest! {
    #[test]
    fn breaths_match_whole_cycles(pattern in 0usize..4, k in 1u64..8) {
        let pattern = PatternId::ALL[pattern].pattern();
        let cycle = pattern.cycle_secs();
        let mut engine = SessionEngine::new(EngineDeps::headless());
        engine.start(pattern, cycle * 10).unwrap();
        run(&mut engine, k * cycle);

        let state = engine.state();
        prop_assert_eq!(state.breath_count, k);
        prop_assert_eq!(state.cycle_count, k);
        prop_assert_eq!(state.phase_index, 0);
        prop_assert!(state.active);
    }
}
