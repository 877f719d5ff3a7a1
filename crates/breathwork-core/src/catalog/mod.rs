//! Static catalogs: breathing patterns and ambient textures.

mod pattern;
mod sound;

pub use pattern::{BreathingPattern, PatternId, Phase, PhaseKind};
pub use sound::{AmbientSound, AmbientSoundId, RecipeId, AMBIENT_SOUNDS};

/// Returned when a catalog id does not name a known entry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownId {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownId {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Every built-in pattern in display order.
pub fn patterns() -> Vec<BreathingPattern> {
    PatternId::ALL.iter().map(|id| id.pattern()).collect()
}
