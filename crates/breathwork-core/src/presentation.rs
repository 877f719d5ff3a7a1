//! Maps scheduler state to what a view shows: phase label, countdown, the
//! breathing circle's target scale and how long to animate towards it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::{AmbientSoundId, BreathingPattern, PhaseKind, UnknownId};
use crate::scheduler::SchedulerState;
use crate::voice::VoiceMode;

pub const IDLE_LABEL: &str = "Ready";
pub const EMPTY_COUNTDOWN: &str = "—";

const INHALE_SCALE: f32 = 1.25;
const EXHALE_SCALE: f32 = 0.75;
const REST_SCALE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Compact,
    Immersive,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            View::Compact => "compact",
            View::Immersive => "immersive",
        })
    }
}

impl FromStr for View {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(View::Compact),
            "immersive" | "fullscreen" => Ok(View::Immersive),
            _ => Err(UnknownId::new("view", s)),
        }
    }
}

/// One rendering of the session state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresentationFrame {
    pub view: View,
    pub pattern_id: String,
    pub pattern_name: String,
    pub timing: String,
    pub phase_label: String,
    pub phase_kind: Option<PhaseKind>,
    pub countdown: String,
    pub target_scale: f32,
    pub transition_secs: u32,
    pub active: bool,
    pub paused: bool,
    pub cycles: u64,
    pub breaths: u64,
    pub elapsed_secs: u64,
    pub remaining_secs: u64,
    pub progress_pct: f64,
    /// Selector state, immersive view only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ambient_sound: Option<AmbientSoundId>,
    /// Selector state, immersive view only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_mode: Option<VoiceMode>,
}

impl PresentationFrame {
    pub fn from_state(
        view: View,
        pattern: &BreathingPattern,
        state: &SchedulerState,
        ambient: AmbientSoundId,
        voice: VoiceMode,
    ) -> Self {
        let phase = pattern.phase(state.phase_index).filter(|_| state.active);
        let (phase_label, phase_kind, transition_secs) = match phase {
            Some(p) => (p.name.clone(), Some(p.kind()), p.duration_secs),
            None => (IDLE_LABEL.to_string(), None, 1),
        };
        let countdown = if state.countdown == 0 {
            EMPTY_COUNTDOWN.to_string()
        } else {
            state.countdown.to_string()
        };
        let immersive = view == View::Immersive;

        Self {
            view,
            pattern_id: pattern.id.clone(),
            pattern_name: pattern.name.clone(),
            timing: pattern.timing_label(),
            phase_label,
            phase_kind,
            countdown,
            target_scale: if state.active {
                target_scale(pattern, state.phase_index)
            } else {
                REST_SCALE
            },
            transition_secs,
            active: state.active,
            paused: state.paused,
            cycles: state.cycle_count,
            breaths: state.breath_count,
            elapsed_secs: state.elapsed_secs,
            remaining_secs: state.remaining_secs(),
            progress_pct: state.progress_pct(),
            ambient_sound: immersive.then_some(ambient),
            voice_mode: immersive.then_some(voice),
        }
    }

    /// Single terminal line for the compact view.
    pub fn render_line(&self) -> String {
        let mut line = format!(
            "{:<8} {:>2}  │ breaths {:<3} cycles {:<3} │ {} / {}",
            self.phase_label,
            self.countdown,
            self.breaths,
            self.cycles,
            format_clock(self.elapsed_secs),
            format_clock(self.elapsed_secs + self.remaining_secs),
        );
        if self.paused {
            line.push_str("  (paused)");
        }
        if let (Some(sound), Some(voice)) = (self.ambient_sound, self.voice_mode) {
            line.push_str(&format!("  │ ambient {sound} · voice {voice}"));
        }
        line
    }
}

/// Scale for the phase at `index`. Holds keep whatever scale the last
/// inhale or exhale reached.
fn target_scale(pattern: &BreathingPattern, index: usize) -> f32 {
    let n = pattern.len();
    if n == 0 {
        return REST_SCALE;
    }
    for back in 0..n {
        let i = (index + n - back) % n;
        match pattern.phases[i].kind() {
            PhaseKind::Inhale => return INHALE_SCALE,
            PhaseKind::Exhale => return EXHALE_SCALE,
            PhaseKind::Hold | PhaseKind::Other => {}
        }
    }
    REST_SCALE
}

fn format_clock(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PatternId, Phase};

    fn running(phase_index: usize, countdown: u32) -> SchedulerState {
        SchedulerState {
            active: true,
            phase_index,
            countdown,
            target_duration_secs: 60,
            elapsed_secs: 12,
            ..SchedulerState::default()
        }
    }

    #[test]
    fn idle_frame_shows_ready() {
        let frame = PresentationFrame::from_state(
            View::Compact,
            &PatternId::Box.pattern(),
            &SchedulerState::default(),
            AmbientSoundId::Rain,
            VoiceMode::Off,
        );
        assert_eq!(frame.phase_label, IDLE_LABEL);
        assert_eq!(frame.countdown, EMPTY_COUNTDOWN);
        assert_eq!(frame.transition_secs, 1);
        assert_eq!(frame.target_scale, 1.0);
        assert!(frame.ambient_sound.is_none());
    }

    #[test]
    fn holds_keep_the_previous_scale() {
        let box_pattern = PatternId::Box.pattern();
        let scale = |i| {
            PresentationFrame::from_state(View::Compact, &box_pattern, &running(i, 4), AmbientSoundId::None, VoiceMode::Off)
                .target_scale
        };
        assert_eq!(scale(0), 1.25);
        assert_eq!(scale(1), 1.25);
        assert_eq!(scale(2), 0.75);
        assert_eq!(scale(3), 0.75);
    }

    #[test]
    fn transition_matches_phase_duration() {
        let frame = PresentationFrame::from_state(
            View::Compact,
            &PatternId::FourSevenEight.pattern(),
            &running(1, 7),
            AmbientSoundId::None,
            VoiceMode::Off,
        );
        assert_eq!(frame.phase_label, "Hold");
        assert_eq!(frame.transition_secs, 7);
        assert_eq!(frame.countdown, "7");
        assert_eq!(frame.remaining_secs, 48);
        assert_eq!(frame.timing, "4-7-8");
    }

    #[test]
    fn immersive_exposes_selectors() {
        let frame = PresentationFrame::from_state(
            View::Immersive,
            &PatternId::Sos.pattern(),
            &running(0, 4),
            AmbientSoundId::Ocean,
            VoiceMode::Synthesized,
        );
        assert_eq!(frame.ambient_sound, Some(AmbientSoundId::Ocean));
        assert_eq!(frame.voice_mode, Some(VoiceMode::Synthesized));
        assert!(frame.render_line().contains("ambient ocean · voice synthesized"));

        let json = serde_json::to_value(&frame).unwrap();
        assert_eq!(json["ambient_sound"], "ocean");
    }

    #[test]
    fn all_hold_pattern_rests() {
        let pattern = BreathingPattern::custom("still", "Still", "", vec![Phase::new("Hold", 3)]).unwrap();
        assert_eq!(target_scale(&pattern, 0), 1.0);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(125), "2:05");
    }
}
