use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::UnknownId;

/// Selectable ambient textures, including the silent `none` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AmbientSoundId {
    #[default]
    None,
    Cosmic,
    Rain,
    Ocean,
    Birds,
    Forest,
    Fire,
    #[serde(alias = "bowl")]
    Bowls,
    Tibetan,
    Meditation,
    Spiritual,
    Wind,
}

/// Synthesis strategy used to build a texture's generator graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipeId {
    Cosmic,
    Rain,
    Ocean,
    Birds,
    Forest,
    Fire,
    Bowls,
    Tibetan,
    Meditation,
    Spiritual,
    Wind,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmbientSound {
    pub id: AmbientSoundId,
    pub name: &'static str,
    pub emoji: &'static str,
    /// Level of the graph's volume stage, 0.0..=1.0.
    pub default_volume: f32,
    pub recipe: Option<RecipeId>,
}

pub static AMBIENT_SOUNDS: [AmbientSound; 12] = [
    AmbientSound {
        id: AmbientSoundId::None,
        name: "None",
        emoji: "🔇",
        default_volume: 0.0,
        recipe: None,
    },
    AmbientSound {
        id: AmbientSoundId::Cosmic,
        name: "Cosmic",
        emoji: "🌌",
        default_volume: 0.15,
        recipe: Some(RecipeId::Cosmic),
    },
    AmbientSound {
        id: AmbientSoundId::Rain,
        name: "Gentle Rain",
        emoji: "🌧️",
        default_volume: 0.15,
        recipe: Some(RecipeId::Rain),
    },
    AmbientSound {
        id: AmbientSoundId::Ocean,
        name: "Ocean Waves",
        emoji: "🌊",
        default_volume: 0.12,
        recipe: Some(RecipeId::Ocean),
    },
    AmbientSound {
        id: AmbientSoundId::Birds,
        name: "Nature Birds",
        emoji: "🐦",
        default_volume: 0.15,
        recipe: Some(RecipeId::Birds),
    },
    AmbientSound {
        id: AmbientSoundId::Forest,
        name: "Forest Stream",
        emoji: "🌲",
        default_volume: 0.18,
        recipe: Some(RecipeId::Forest),
    },
    AmbientSound {
        id: AmbientSoundId::Fire,
        name: "Crackling Fire",
        emoji: "🔥",
        default_volume: 0.14,
        recipe: Some(RecipeId::Fire),
    },
    AmbientSound {
        id: AmbientSoundId::Bowls,
        name: "Singing Bowls",
        emoji: "🥣",
        default_volume: 0.15,
        recipe: Some(RecipeId::Bowls),
    },
    AmbientSound {
        id: AmbientSoundId::Tibetan,
        name: "Tibetan Bowls",
        emoji: "🎵",
        default_volume: 0.16,
        recipe: Some(RecipeId::Tibetan),
    },
    AmbientSound {
        id: AmbientSoundId::Meditation,
        name: "Meditation",
        emoji: "🧘",
        default_volume: 0.15,
        recipe: Some(RecipeId::Meditation),
    },
    AmbientSound {
        id: AmbientSoundId::Spiritual,
        name: "Spiritual",
        emoji: "✨",
        default_volume: 0.14,
        recipe: Some(RecipeId::Spiritual),
    },
    AmbientSound {
        id: AmbientSoundId::Wind,
        name: "Wind Chimes",
        emoji: "🎐",
        default_volume: 0.13,
        recipe: Some(RecipeId::Wind),
    },
];

impl AmbientSoundId {
    pub fn as_str(&self) -> &'static str {
        match self {
            AmbientSoundId::None => "none",
            AmbientSoundId::Cosmic => "cosmic",
            AmbientSoundId::Rain => "rain",
            AmbientSoundId::Ocean => "ocean",
            AmbientSoundId::Birds => "birds",
            AmbientSoundId::Forest => "forest",
            AmbientSoundId::Fire => "fire",
            AmbientSoundId::Bowls => "bowls",
            AmbientSoundId::Tibetan => "tibetan",
            AmbientSoundId::Meditation => "meditation",
            AmbientSoundId::Spiritual => "spiritual",
            AmbientSoundId::Wind => "wind",
        }
    }

    pub fn sound(&self) -> &'static AmbientSound {
        AMBIENT_SOUNDS
            .iter()
            .find(|s| s.id == *self)
            .unwrap_or(&AMBIENT_SOUNDS[0])
    }

    pub fn is_none(&self) -> bool {
        *self == AmbientSoundId::None
    }

    pub fn all() -> impl Iterator<Item = AmbientSoundId> {
        AMBIENT_SOUNDS.iter().map(|s| s.id)
    }
}

impl fmt::Display for AmbientSoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AmbientSoundId {
    type Err = UnknownId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        if wanted == "bowl" {
            return Ok(AmbientSoundId::Bowls);
        }
        AmbientSoundId::all()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| UnknownId::new("ambient sound", s))
    }
}
