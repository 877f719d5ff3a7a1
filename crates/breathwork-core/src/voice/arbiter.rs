use tracing::{debug, info, warn};

use super::narration::{NarrationLibrary, NarrationTrack};
use super::speech::SpeechSynthesizer;
use super::VoiceMode;
use crate::catalog::PatternId;
use crate::events::{Event, Subscriber};

pub const COMPLETION_LINE: &str = "Session complete. Well done.";

/// Routes voice guidance to exactly one of narration, speech or nothing.
pub struct VoiceArbiter {
    mode: VoiceMode,
    speech: Box<dyn SpeechSynthesizer>,
    library: Box<dyn NarrationLibrary>,
    track: Option<(PatternId, Box<dyn NarrationTrack>)>,
    pattern: Option<String>,
    running: bool,
    announcements: u64,
}

impl std::fmt::Debug for VoiceArbiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceArbiter")
            .field("mode", &self.mode)
            .field("pattern", &self.pattern)
            .field("running", &self.running)
            .field("narration_playing", &self.narration_playing())
            .finish_non_exhaustive()
    }
}

impl VoiceArbiter {
    pub fn new(
        mode: VoiceMode,
        speech: Box<dyn SpeechSynthesizer>,
        library: Box<dyn NarrationLibrary>,
    ) -> Self {
        Self {
            mode,
            speech,
            library,
            track: None,
            pattern: None,
            running: false,
            announcements: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> VoiceMode {
        self.mode
    }

    pub fn is_speaking(&self) -> bool {
        self.speech.is_speaking()
    }

    pub fn narration_playing(&self) -> bool {
        self.track.as_ref().is_some_and(|(_, t)| t.is_playing())
    }

    /// Phase announcements issued so far.
    pub fn announcements(&self) -> u64 {
        self.announcements
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn set_mode(&mut self, mode: VoiceMode) {
        if mode == self.mode {
            return;
        }
        debug!(from = %self.mode, to = %mode, "voice mode changed");
        self.speech.cancel();
        if self.mode == VoiceMode::Prerecorded {
            if let Some((_, track)) = self.track.as_mut() {
                track.pause();
            }
        }
        self.mode = mode;
        if mode == VoiceMode::Prerecorded && self.running {
            self.play_narration();
        }
    }

    /// prerecorded → synthesized → off → prerecorded
    pub fn cycle_mode(&mut self) -> VoiceMode {
        self.set_mode(self.mode.next());
        self.mode
    }

    /// Silence both channels.
    pub fn shutdown(&mut self) {
        self.running = false;
        self.speech.cancel();
        self.stop_narration();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn play_narration(&mut self) {
        let Some(pattern) = self.pattern.as_deref() else {
            return;
        };
        let Ok(id) = pattern.parse::<PatternId>() else {
            debug!(pattern, "no narration for custom pattern");
            return;
        };

        if !matches!(&self.track, Some((current, _)) if *current == id) {
            self.stop_narration();
            match self.library.open(id) {
                Ok(track) => self.track = Some((id, track)),
                Err(err) => {
                    warn!(%err, pattern = %id, "narration channel silent");
                    return;
                }
            }
        }
        if let Some((_, track)) = self.track.as_mut() {
            if let Err(err) = track.play() {
                warn!(%err, pattern = %id, "narration channel silent");
                self.track = None;
            }
        }
    }

    fn stop_narration(&mut self) {
        if let Some((_, mut track)) = self.track.take() {
            track.stop();
        }
    }

    fn say(&mut self, text: &str) {
        self.speech.cancel();
        if let Err(err) = self.speech.speak(text) {
            warn!(%err, "speech channel silent");
        }
    }
}

impl Subscriber for VoiceArbiter {
    fn handle(&mut self, event: &Event) {
        match event {
            Event::SessionStarted { pattern_id, .. } => {
                self.pattern = Some(pattern_id.clone());
                self.running = true;
                self.stop_narration();
                if self.mode == VoiceMode::Prerecorded {
                    self.play_narration();
                }
            }
            Event::PatternChanged { pattern_id, .. } => {
                self.pattern = Some(pattern_id.clone());
                self.speech.cancel();
                self.stop_narration();
                if self.mode == VoiceMode::Prerecorded && self.running {
                    self.play_narration();
                }
            }
            Event::PhaseEntered { phase_name, .. } => {
                if self.mode == VoiceMode::Synthesized && self.running {
                    self.say(phase_name);
                    self.announcements += 1;
                }
            }
            Event::SessionPaused { .. } => {
                self.running = false;
                self.speech.cancel();
                if let Some((_, track)) = self.track.as_mut() {
                    track.pause();
                }
            }
            Event::SessionResumed { .. } => {
                self.running = true;
                if self.mode == VoiceMode::Prerecorded {
                    self.play_narration();
                }
            }
            Event::SessionReset { .. } => {
                self.shutdown();
                self.pattern = None;
            }
            Event::AutoStopped { .. } => {
                self.running = false;
                self.stop_narration();
                if self.mode != VoiceMode::Off {
                    info!("speaking completion line");
                    self.say(COMPLETION_LINE);
                }
            }
            Event::CycleCompleted { .. } => {}
        }
    }
}
