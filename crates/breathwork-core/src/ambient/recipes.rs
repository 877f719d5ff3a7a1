//! Generator recipes for each ambient texture.
//!
//! A recipe creates and starts its nodes on the stage it is given and returns
//! their handles. Randomness comes only from the `rng` argument.

use rand::RngCore;

use super::graph::{ChirpSpec, Filter, GainStage, NodeHandle, NoiseColor, Waveform};
use crate::catalog::RecipeId;

pub trait AmbientRecipe {
    fn id(&self) -> RecipeId;
    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle>;
}

/// Look up the recipe implementing `id`.
pub fn recipe_for(id: RecipeId) -> &'static dyn AmbientRecipe {
    match id {
        RecipeId::Cosmic => &Cosmic,
        RecipeId::Rain => &Rain,
        RecipeId::Ocean => &Ocean,
        RecipeId::Birds => &Birds,
        RecipeId::Forest => &Forest,
        RecipeId::Fire => &Fire,
        RecipeId::Bowls => &Bowls,
        RecipeId::Tibetan => &Tibetan,
        RecipeId::Meditation => &Meditation,
        RecipeId::Spiritual => &Spiritual,
        RecipeId::Wind => &Wind,
    }
}

fn drone(stage: &mut GainStage<'_>, voices: &[(Waveform, f32, f32)]) -> Vec<NodeHandle> {
    voices
        .iter()
        .map(|&(waveform, frequency, level)| stage.oscillator(waveform, frequency, level))
        .collect()
}

pub struct Cosmic;

impl AmbientRecipe for Cosmic {
    fn id(&self) -> RecipeId {
        RecipeId::Cosmic
    }

    fn build(&self, stage: &mut GainStage<'_>, _rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        drone(
            stage,
            &[
                (Waveform::Sine, 60.0, 0.15),
                (Waveform::Sine, 90.0, 0.1),
                (Waveform::Sine, 120.0, 0.08),
                (Waveform::Triangle, 180.0, 0.05),
            ],
        )
    }
}

pub struct Rain;

impl AmbientRecipe for Rain {
    fn id(&self) -> RecipeId {
        RecipeId::Rain
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        // Band centred near 1.2 kHz, rolled off above 3 kHz.
        vec![stage.noise(
            NoiseColor::White,
            1.0,
            &[Filter::HighPass(600.0), Filter::LowPass(3_000.0)],
            rng,
        )]
    }
}

pub struct Ocean;

impl AmbientRecipe for Ocean {
    fn id(&self) -> RecipeId {
        RecipeId::Ocean
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        vec![
            stage.modulated(Waveform::Sine, 80.0, 0.5, 0.08, 400.0),
            stage.noise(NoiseColor::White, 0.3, &[Filter::LowPass(600.0)], rng),
        ]
    }
}

pub struct Birds;

impl AmbientRecipe for Birds {
    fn id(&self) -> RecipeId {
        RecipeId::Birds
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        let mut nodes = drone(
            stage,
            &[
                (Waveform::Sine, 2_000.0, 0.02),
                (Waveform::Sine, 2_500.0, 0.015),
                (Waveform::Triangle, 3_000.0, 0.01),
            ],
        );
        nodes.push(stage.noise(NoiseColor::Pink, 0.1, &[Filter::HighPass(1_000.0)], rng));
        nodes
    }
}

const FOREST_NOTES: &[f32] = &[
    600.0, 800.0, 1_000.0, 1_200.0, 1_400.0, 1_600.0, 1_800.0, 2_000.0,
];

pub struct Forest;

impl AmbientRecipe for Forest {
    fn id(&self) -> RecipeId {
        RecipeId::Forest
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        let chirp = |initial_delay_secs| ChirpSpec {
            notes: FOREST_NOTES,
            peak: 0.08,
            note_secs: (0.1, 0.4),
            gap_secs: (0.8, 4.0),
            initial_delay_secs,
        };
        vec![
            // stream bed
            stage.noise(NoiseColor::Brown, 0.2, &[Filter::LowPass(800.0)], rng),
            stage.chirps(chirp(0.0), rng),
            stage.chirps(chirp(1.5), rng),
        ]
    }
}

pub struct Fire;

impl AmbientRecipe for Fire {
    fn id(&self) -> RecipeId {
        RecipeId::Fire
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        vec![
            stage.crackle(0.05, 1.0, &[Filter::LowPass(1_200.0)], rng),
            stage.oscillator(Waveform::Sine, 60.0, 0.3),
        ]
    }
}

pub struct Bowls;

impl AmbientRecipe for Bowls {
    fn id(&self) -> RecipeId {
        RecipeId::Bowls
    }

    fn build(&self, stage: &mut GainStage<'_>, _rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        [220.0, 330.0, 440.0, 550.0]
            .iter()
            .enumerate()
            .map(|(i, &frequency)| stage.oscillator(Waveform::Sine, frequency, 0.25 / (i + 1) as f32))
            .collect()
    }
}

pub struct Tibetan;

impl AmbientRecipe for Tibetan {
    fn id(&self) -> RecipeId {
        RecipeId::Tibetan
    }

    fn build(&self, stage: &mut GainStage<'_>, _rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        drone(
            stage,
            &[
                (Waveform::Sine, 174.0, 0.12),
                (Waveform::Sine, 285.0, 0.1),
                (Waveform::Sine, 396.0, 0.08),
                (Waveform::Sine, 528.0, 0.06),
                (Waveform::Triangle, 639.0, 0.04),
            ],
        )
    }
}

pub struct Meditation;

impl AmbientRecipe for Meditation {
    fn id(&self) -> RecipeId {
        RecipeId::Meditation
    }

    fn build(&self, stage: &mut GainStage<'_>, _rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        // 100/104 Hz pair beats at 4 Hz
        drone(
            stage,
            &[
                (Waveform::Sine, 100.0, 0.15),
                (Waveform::Sine, 104.0, 0.15),
                (Waveform::Sine, 200.0, 0.08),
                (Waveform::Triangle, 300.0, 0.05),
            ],
        )
    }
}

pub struct Spiritual;

impl AmbientRecipe for Spiritual {
    fn id(&self) -> RecipeId {
        RecipeId::Spiritual
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        let mut nodes = drone(
            stage,
            &[
                (Waveform::Sine, 256.0, 0.1),
                (Waveform::Sine, 384.0, 0.08),
                (Waveform::Sine, 512.0, 0.06),
                (Waveform::Triangle, 768.0, 0.04),
            ],
        );
        nodes.push(stage.noise(NoiseColor::White, 0.02, &[Filter::HighPass(8_000.0)], rng));
        nodes
    }
}

const CHIME_NOTES: &[f32] = &[261.63, 293.66, 329.63, 392.0, 440.0];

pub struct Wind;

impl AmbientRecipe for Wind {
    fn id(&self) -> RecipeId {
        RecipeId::Wind
    }

    fn build(&self, stage: &mut GainStage<'_>, rng: &mut dyn RngCore) -> Vec<NodeHandle> {
        let chime = |initial_delay_secs| ChirpSpec {
            notes: CHIME_NOTES,
            peak: 0.15,
            note_secs: (2.5, 2.5),
            gap_secs: (1.5, 6.0),
            initial_delay_secs,
        };
        vec![stage.chirps(chime(0.0), rng), stage.chirps(chime(2.0), rng)]
    }
}
