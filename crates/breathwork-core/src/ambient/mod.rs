//! Procedural ambient soundscapes.
//!
//! [`AmbientSynthesizer`] owns an [`AudioDevice`] and keeps at most one
//! generator graph alive on it. Graphs are built by [`recipes`] into the
//! device's generation-scoped [`NodeArena`].

mod device;
mod graph;
pub mod recipes;
mod synth;

pub use device::{AudioDevice, DeviceState};
pub use graph::{ChirpSpec, Filter, GainStage, NodeArena, NodeHandle, NoiseColor, Waveform};
pub use recipes::{recipe_for, AmbientRecipe};
pub use synth::{ActiveGraph, AmbientSynthesizer};
