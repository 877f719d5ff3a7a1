//! Voice guidance: prerecorded narration, synthesized announcements, or off.

mod arbiter;
mod narration;
mod speech;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use arbiter::{VoiceArbiter, COMPLETION_LINE};
pub use narration::{FileNarrationLibrary, NarrationLibrary, NarrationTrack, NoNarration, NARRATION_VOLUME};
pub use speech::{ConsoleSpeech, SilentSpeech, SpeechSynthesizer};

use crate::catalog::UnknownId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceMode {
    #[default]
    #[serde(alias = "audio")]
    Prerecorded,
    #[serde(alias = "tts")]
    Synthesized,
    Off,
}

impl VoiceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceMode::Prerecorded => "prerecorded",
            VoiceMode::Synthesized => "synthesized",
            VoiceMode::Off => "off",
        }
    }

    pub fn next(&self) -> VoiceMode {
        match self {
            VoiceMode::Prerecorded => VoiceMode::Synthesized,
            VoiceMode::Synthesized => VoiceMode::Off,
            VoiceMode::Off => VoiceMode::Prerecorded,
        }
    }
}

impl fmt::Display for VoiceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoiceMode {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prerecorded" | "audio" => Ok(VoiceMode::Prerecorded),
            "synthesized" | "tts" => Ok(VoiceMode::Synthesized),
            "off" | "none" => Ok(VoiceMode::Off),
            _ => Err(UnknownId::new("voice mode", s)),
        }
    }
}
