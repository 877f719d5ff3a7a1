use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownId;
use crate::error::SessionError;

/// Built-in breathing patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum PatternId {
    #[default]
    #[serde(rename = "box")]
    Box,
    #[serde(rename = "4-7-8")]
    FourSevenEight,
    #[serde(rename = "coherent")]
    Coherent,
    #[serde(rename = "sos")]
    Sos,
}

impl PatternId {
    pub const ALL: [PatternId; 4] = [
        PatternId::Box,
        PatternId::FourSevenEight,
        PatternId::Coherent,
        PatternId::Sos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::Box => "box",
            PatternId::FourSevenEight => "4-7-8",
            PatternId::Coherent => "coherent",
            PatternId::Sos => "sos",
        }
    }

    /// File stem of the long-form narration recorded for this pattern.
    pub fn narration_asset(&self) -> &'static str {
        match self {
            PatternId::Box => "box-breathing-instructions",
            PatternId::FourSevenEight => "4-7-8-instructions",
            PatternId::Coherent => "coherent-instructions",
            PatternId::Sos => "sos-instructions",
        }
    }

    pub fn pattern(&self) -> BreathingPattern {
        BreathingPattern::builtin(*self)
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PatternId {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "box" => Ok(PatternId::Box),
            "4-7-8" | "478" => Ok(PatternId::FourSevenEight),
            "coherent" | "5-5" => Ok(PatternId::Coherent),
            "sos" => Ok(PatternId::Sos),
            _ => Err(UnknownId::new("pattern", s)),
        }
    }
}

/// Coarse classification of a phase label, used for visuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Inhale,
    Hold,
    Exhale,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    pub name: String,
    /// Duration in seconds. Always > 0 in a validated pattern.
    pub duration_secs: u32,
}

impl Phase {
    pub fn new(name: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            name: name.into(),
            duration_secs,
        }
    }

    pub fn kind(&self) -> PhaseKind {
        let name = self.name.to_ascii_lowercase();
        if name.starts_with("inhale") || name.starts_with("breathe in") {
            PhaseKind::Inhale
        } else if name.starts_with("exhale") || name.starts_with("breathe out") {
            PhaseKind::Exhale
        } else if name.starts_with("hold") || name.starts_with("rest") {
            PhaseKind::Hold
        } else {
            PhaseKind::Other
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreathingPattern {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub phases: Vec<Phase>,
}

impl BreathingPattern {
    pub fn builtin(id: PatternId) -> Self {
        let (name, description, phases) = match id {
            PatternId::Box => (
                "Box Breathing",
                "Equal 4-4-4-4 timing for all phases. Great for focus and calm.",
                vec![
                    Phase::new("Inhale", 4),
                    Phase::new("Hold", 4),
                    Phase::new("Exhale", 4),
                    Phase::new("Hold", 4),
                ],
            ),
            PatternId::FourSevenEight => (
                "4-7-8 Breathing",
                "Extended hold and exhale for deep relaxation. 4s inhale, 7s hold, 8s exhale.",
                vec![
                    Phase::new("Inhale", 4),
                    Phase::new("Hold", 7),
                    Phase::new("Exhale", 8),
                ],
            ),
            PatternId::Coherent => (
                "Coherent 5-5",
                "Simple 5-5 pattern. Inhale and exhale equally for heart rate variability.",
                vec![Phase::new("Inhale", 5), Phase::new("Exhale", 5)],
            ),
            PatternId::Sos => (
                "SOS 60s Reset",
                "60-second reset. 4s inhale, 6s exhale. Quick calm for transitions.",
                vec![Phase::new("Inhale", 4), Phase::new("Exhale", 6)],
            ),
        };
        Self {
            id: id.as_str().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            phases,
        }
    }

    /// Build a user-defined pattern.
    ///
    /// # Errors
    /// Returns `InvalidConfiguration` for an empty phase list or a zero-length phase.
    pub fn custom(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        phases: Vec<Phase>,
    ) -> Result<Self, SessionError> {
        let pattern = Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            phases,
        };
        pattern.validate()?;
        Ok(pattern)
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        if self.phases.is_empty() {
            return Err(SessionError::invalid(format!(
                "pattern '{}' has no phases",
                self.id
            )));
        }
        if let Some(phase) = self.phases.iter().find(|p| p.duration_secs == 0) {
            return Err(SessionError::invalid(format!(
                "phase '{}' of pattern '{}' has zero duration",
                phase.name, self.id
            )));
        }
        Ok(())
    }

    pub fn phase(&self, index: usize) -> Option<&Phase> {
        self.phases.get(index)
    }

    pub fn len(&self) -> usize {
        self.phases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Length of one full cycle in seconds.
    pub fn cycle_secs(&self) -> u64 {
        self.phases.iter().map(|p| u64::from(p.duration_secs)).sum()
    }

    /// Compact timing label such as `4-7-8`.
    pub fn timing_label(&self) -> String {
        self.phases
            .iter()
            .map(|p| p.duration_secs.to_string())
            .collect::<Vec<_>>()
            .join("-")
    }
}

impl Default for BreathingPattern {
    fn default() -> Self {
        Self::builtin(PatternId::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_cycle_lengths() {
        assert_eq!(PatternId::Box.pattern().cycle_secs(), 16);
        assert_eq!(PatternId::FourSevenEight.pattern().cycle_secs(), 19);
        assert_eq!(PatternId::Coherent.pattern().cycle_secs(), 10);
        assert_eq!(PatternId::Sos.pattern().cycle_secs(), 10);
    }

    #[test]
    fn builtins_are_valid() {
        for id in PatternId::ALL {
            assert!(id.pattern().validate().is_ok(), "{id} should validate");
            assert_eq!(id.pattern().id, id.as_str());
        }
    }

    #[test]
    fn custom_rejects_empty_phase_list() {
        let err = BreathingPattern::custom("empty", "Empty", "", vec![]).unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfiguration(_)));
    }

    #[test]
    fn custom_rejects_zero_duration() {
        let err = BreathingPattern::custom(
            "bad",
            "Bad",
            "",
            vec![Phase::new("Inhale", 4), Phase::new("Exhale", 0)],
        )
        .unwrap_err();
        assert!(matches!(err, SessionError::InvalidConfiguration(_)));
    }

    #[test]
    fn parse_pattern_ids() {
        assert_eq!("box".parse::<PatternId>().unwrap(), PatternId::Box);
        assert_eq!("4-7-8".parse::<PatternId>().unwrap(), PatternId::FourSevenEight);
        assert_eq!("5-5".parse::<PatternId>().unwrap(), PatternId::Coherent);
        assert!("square".parse::<PatternId>().is_err());
    }

    #[test]
    fn serde_uses_catalog_ids() {
        let json = serde_json::to_string(&PatternId::FourSevenEight).unwrap();
        assert_eq!(json, "\"4-7-8\"");
    }

    #[test]
    fn phase_kind_from_label() {
        assert_eq!(Phase::new("Inhale", 4).kind(), PhaseKind::Inhale);
        assert_eq!(Phase::new("hold", 4).kind(), PhaseKind::Hold);
        assert_eq!(Phase::new("Exhale slowly", 8).kind(), PhaseKind::Exhale);
        assert_eq!(Phase::new("Sigh", 2).kind(), PhaseKind::Other);
    }

    #[test]
    fn timing_label() {
        assert_eq!(PatternId::FourSevenEight.pattern().timing_label(), "4-7-8");
    }
}
