//! Session persistence: an append-only log capped at [`MAX_SESSIONS`] plus
//! aggregate stats recomputed from the whole log on every append.
//!
//! Both live as JSON documents in a [`KeyValueStore`]. Unreadable documents
//! count as empty and are overwritten by the next successful append.

mod store;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub use store::{KeyValueStore, MemoryStore};

use crate::catalog::{AmbientSoundId, BreathingPattern};
use crate::error::{CoreError, DatabaseError, StorageError};
use crate::scheduler::SchedulerState;
use crate::voice::VoiceMode;

pub const SESSIONS_KEY: &str = "nb_breathing_sessions";
pub const STATS_KEY: &str = "nb_breathing_stats";
pub const MAX_SESSIONS: usize = 100;
/// Sessions shorter than this are not worth keeping.
pub const MIN_ELAPSED_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub pattern: String,
    pub pattern_name: String,
    /// Seconds practised.
    pub duration: u64,
    pub breaths: u64,
    pub cycles: u64,
    pub timestamp: DateTime<Utc>,
    pub voice_mode: VoiceMode,
    pub ambient_sound: String,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateStats {
    pub total_sessions: u64,
    pub total_breaths: u64,
    pub total_minutes: u64,
    pub last_session: Option<DateTime<Utc>>,
}

impl AggregateStats {
    pub fn from_log(log: &[SessionRecord]) -> Self {
        let (sessions, breaths, seconds, last) = log.iter().fold(
            (0u64, 0u64, 0u64, None::<DateTime<Utc>>),
            |(sessions, breaths, seconds, last), r| {
                (
                    sessions + 1,
                    breaths + r.breaths,
                    seconds + r.duration,
                    Some(last.map_or(r.timestamp, |t| t.max(r.timestamp))),
                )
            },
        );
        Self {
            total_sessions: sessions,
            total_breaths: breaths,
            total_minutes: seconds / 60,
            last_session: last,
        }
    }
}

/// What ended the session being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordTrigger {
    AutoStop,
    ManualReset,
    Teardown,
}

#[derive(Debug, Clone, Copy)]
pub struct RecordContext<'a> {
    pub trigger: RecordTrigger,
    pub pattern: &'a BreathingPattern,
    pub voice_mode: VoiceMode,
    pub ambient_sound: AmbientSoundId,
}

pub struct SessionRecorder {
    store: Box<dyn KeyValueStore>,
}

impl std::fmt::Debug for SessionRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRecorder").finish_non_exhaustive()
    }
}

impl SessionRecorder {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn is_meaningful(state: &SchedulerState) -> bool {
        state.elapsed_secs >= MIN_ELAPSED_SECS && state.breath_count >= 1
    }

    /// Persist the session if it is long enough to count.
    ///
    /// A failed write is logged; the record is still returned.
    pub fn record_if_meaningful(
        &self,
        state: &SchedulerState,
        context: RecordContext<'_>,
    ) -> Option<SessionRecord> {
        if !Self::is_meaningful(state) {
            debug!(
                trigger = ?context.trigger,
                elapsed_secs = state.elapsed_secs,
                breaths = state.breath_count,
                "session too short to record"
            );
            return None;
        }

        let record = SessionRecord {
            pattern: context.pattern.id.clone(),
            pattern_name: context.pattern.name.clone(),
            duration: state.elapsed_secs,
            breaths: state.breath_count,
            cycles: state.cycle_count,
            timestamp: Utc::now(),
            voice_mode: context.voice_mode,
            ambient_sound: context.ambient_sound.as_str().to_string(),
            completed: context.trigger == RecordTrigger::AutoStop,
        };

        match self.append(record.clone()) {
            Ok(stats) => info!(
                trigger = ?context.trigger,
                duration = record.duration,
                breaths = record.breaths,
                total_sessions = stats.total_sessions,
                "session recorded"
            ),
            Err(err) => warn!(%err, "failed to persist session"),
        }
        Some(record)
    }

    /// Append to the log, evicting the oldest entries past the cap, and
    /// rewrite the stats.
    ///
    /// # Errors
    /// Returns an error if the stored log cannot be read or either document
    /// cannot be written. Nothing is written after a failed read.
    pub fn append(&self, record: SessionRecord) -> Result<AggregateStats, CoreError> {
        let mut log: Vec<SessionRecord> = self.read(SESSIONS_KEY)?.unwrap_or_default();
        log.push(record);
        if log.len() > MAX_SESSIONS {
            let excess = log.len() - MAX_SESSIONS;
            log.drain(..excess);
        }
        let stats = AggregateStats::from_log(&log);

        self.store.set(SESSIONS_KEY, &serde_json::to_string(&log)?)?;
        self.store.set(STATS_KEY, &serde_json::to_string(&stats)?)?;
        Ok(stats)
    }

    /// Recorded sessions, oldest first.
    pub fn sessions(&self) -> Vec<SessionRecord> {
        self.load(SESSIONS_KEY).unwrap_or_default()
    }

    pub fn stats(&self) -> AggregateStats {
        self.load(STATS_KEY).unwrap_or_default()
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read(key) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, key, "failed to read stored value");
                None
            }
        }
    }

    /// Store errors propagate; an unparseable document reads as absent.
    fn read<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DatabaseError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(source) => {
                let err = StorageError::Corrupt {
                    key: key.to_string(),
                    source,
                };
                warn!(%err, "treating stored value as empty");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use chrono::Duration;

    use super::*;
    use crate::catalog::PatternId;

    fn state(elapsed_secs: u64, breath_count: u64) -> SchedulerState {
        SchedulerState {
            elapsed_secs,
            breath_count,
            cycle_count: breath_count,
            target_duration_secs: 60,
            ..SchedulerState::default()
        }
    }

    fn context(pattern: &BreathingPattern, trigger: RecordTrigger) -> RecordContext<'_> {
        RecordContext {
            trigger,
            pattern,
            voice_mode: VoiceMode::Synthesized,
            ambient_sound: AmbientSoundId::Bowls,
        }
    }

    fn record(duration: u64, breaths: u64, minutes_ago: i64) -> SessionRecord {
        SessionRecord {
            pattern: "box".into(),
            pattern_name: "Box Breathing".into(),
            duration,
            breaths,
            cycles: breaths,
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            voice_mode: VoiceMode::Off,
            ambient_sound: "none".into(),
            completed: true,
        }
    }

    #[test]
    fn threshold_needs_time_and_a_breath() {
        assert!(!SessionRecorder::is_meaningful(&state(29, 3)));
        assert!(!SessionRecorder::is_meaningful(&state(120, 0)));
        assert!(SessionRecorder::is_meaningful(&state(30, 1)));
    }

    #[test]
    fn records_with_completed_only_for_auto_stop() {
        let store = Rc::new(MemoryStore::default());
        let recorder = SessionRecorder::new(Box::new(Rc::clone(&store)));
        let pattern = PatternId::Box.pattern();

        let done = recorder
            .record_if_meaningful(&state(60, 3), context(&pattern, RecordTrigger::AutoStop))
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.ambient_sound, "bowls");

        let abandoned = recorder
            .record_if_meaningful(&state(45, 2), context(&pattern, RecordTrigger::ManualReset))
            .unwrap();
        assert!(!abandoned.completed);

        assert!(recorder
            .record_if_meaningful(&state(10, 0), context(&pattern, RecordTrigger::Teardown))
            .is_none());

        assert_eq!(recorder.sessions(), vec![done, abandoned]);
        let stats = recorder.stats();
        assert_eq!(stats.total_sessions, 2);
        assert_eq!(stats.total_breaths, 5);
        assert_eq!(stats.total_minutes, 1);
    }

    #[test]
    fn log_is_capped_fifo() {
        let recorder = SessionRecorder::new(Box::new(MemoryStore::default()));
        for i in 0..105u64 {
            recorder.append(record(30 + i, 1, 0)).unwrap();
        }
        let log = recorder.sessions();
        assert_eq!(log.len(), MAX_SESSIONS);
        assert_eq!(log[0].duration, 35);
        assert_eq!(log[99].duration, 134);
        assert_eq!(recorder.stats().total_sessions, 100);
    }

    #[test]
    fn stats_fold_floors_minutes_and_tracks_newest() {
        let log = vec![record(50, 2, 10), record(50, 3, 5), record(30, 1, 20)];
        let stats = AggregateStats::from_log(&log);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.total_breaths, 6);
        assert_eq!(stats.total_minutes, 2);
        assert_eq!(stats.last_session, Some(log[1].timestamp));
        assert_eq!(AggregateStats::from_log(&[]), AggregateStats::default());
    }

    #[test]
    fn corrupt_documents_read_as_empty_and_get_overwritten() {
        let store = Rc::new(MemoryStore::default());
        store.set(SESSIONS_KEY, "{not json").unwrap();
        store.set(STATS_KEY, "[]").unwrap();
        let recorder = SessionRecorder::new(Box::new(Rc::clone(&store)));
        assert!(recorder.sessions().is_empty());
        assert_eq!(recorder.stats(), AggregateStats::default());

        recorder.append(record(40, 2, 0)).unwrap();
        assert_eq!(recorder.sessions().len(), 1);
        assert_eq!(recorder.stats().total_sessions, 1);
    }

    #[test]
    fn persisted_shape_uses_camel_case() {
        let store = Rc::new(MemoryStore::default());
        let recorder = SessionRecorder::new(Box::new(Rc::clone(&store)));
        recorder.append(record(90, 5, 0)).unwrap();

        let raw = store.get(SESSIONS_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        for key in ["pattern", "patternName", "duration", "breaths", "cycles", "timestamp", "voiceMode", "ambientSound", "completed"] {
            assert!(json[0].get(key).is_some(), "missing {key}");
        }
        let raw = store.get(STATS_KEY).unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["totalMinutes"], 1);
        assert!(json["lastSession"].is_string());
    }

    #[test]
    fn legacy_records_still_parse() {
        let raw = r#"[{"pattern":"box","patternName":"Box Breathing","duration":64,"breaths":4,"cycles":4,
            "timestamp":"2024-05-01T08:00:00.000Z","voiceMode":"audio","ambientSound":"bowl"}]"#;
        let store = MemoryStore::default();
        store.set(SESSIONS_KEY, raw).unwrap();
        let recorder = SessionRecorder::new(Box::new(store));
        let log = recorder.sessions();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].voice_mode, VoiceMode::Prerecorded);
        assert!(!log[0].completed);
    }

    struct BrokenStore;

    impl KeyValueStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>, DatabaseError> {
            Err(DatabaseError::Locked)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), DatabaseError> {
            Err(DatabaseError::Locked)
        }
    }

    #[test]
    fn storage_failure_still_returns_the_record() {
        let recorder = SessionRecorder::new(Box::new(BrokenStore));
        let pattern = PatternId::Coherent.pattern();
        let record = recorder.record_if_meaningful(&state(40, 4), context(&pattern, RecordTrigger::Teardown));
        assert!(record.is_some());
        assert!(recorder.sessions().is_empty());
    }

    /// Fails the next `failing_reads` reads, then behaves normally.
    struct FlakyStore {
        inner: MemoryStore,
        failing_reads: Cell<u32>,
    }

    impl KeyValueStore for FlakyStore {
        fn get(&self, key: &str) -> Result<Option<String>, DatabaseError> {
            if self.failing_reads.get() > 0 {
                self.failing_reads.set(self.failing_reads.get() - 1);
                return Err(DatabaseError::Locked);
            }
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<(), DatabaseError> {
            self.inner.set(key, value)
        }
    }

    #[test]
    fn failed_read_keeps_existing_log() {
        let store = Rc::new(FlakyStore {
            inner: MemoryStore::default(),
            failing_reads: Cell::new(0),
        });
        let recorder = SessionRecorder::new(Box::new(Rc::clone(&store)));
        for i in 0..50u64 {
            recorder.append(record(30 + i, 1, 0)).unwrap();
        }

        store.failing_reads.set(1);
        let err = recorder.append(record(999, 9, 0)).unwrap_err();
        assert!(matches!(err, CoreError::Database(DatabaseError::Locked)));

        let log = recorder.sessions();
        assert_eq!(log.len(), 50);
        assert!(log.iter().all(|r| r.duration != 999));
        assert_eq!(recorder.stats().total_sessions, 50);

        // The next append goes through once reads recover.
        recorder.append(record(999, 9, 0)).unwrap();
        assert_eq!(recorder.sessions().len(), 51);
    }
}
