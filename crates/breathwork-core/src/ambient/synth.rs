use rand::SeedableRng;
use rand_pcg::Mcg128Xsl64;
use tracing::{debug, info, warn};

use super::device::AudioDevice;
use super::graph::NodeHandle;
use super::recipes::recipe_for;
use crate::catalog::AmbientSoundId;
use crate::events::{Event, Subscriber};

/// The generator graph currently playing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveGraph {
    pub sound: AmbientSoundId,
    pub generation: u64,
    pub handles: Vec<NodeHandle>,
}

/// Keeps zero or one ambient graph alive on the owned [`AudioDevice`].
///
/// Switching textures always tears the old graph down before the new one is
/// built. While the session is inactive the selection is only remembered.
#[derive(Debug)]
pub struct AmbientSynthesizer {
    device: AudioDevice,
    selected: AmbientSoundId,
    active: bool,
    graph: Option<ActiveGraph>,
    rng: Mcg128Xsl64,
}

impl AmbientSynthesizer {
    /// `seed` makes every generated texture reproducible; `None` draws from entropy.
    pub fn new(device: AudioDevice, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        Self {
            device,
            selected: AmbientSoundId::None,
            active: false,
            graph: None,
            rng,
        }
    }

    pub fn selected(&self) -> AmbientSoundId {
        self.selected
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn active_graph(&self) -> Option<&ActiveGraph> {
        self.graph.as_ref()
    }

    pub fn device(&self) -> &AudioDevice {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut AudioDevice {
        &mut self.device
    }

    pub fn select(&mut self, sound: AmbientSoundId) {
        self.selected = sound;
        if self.active {
            self.rebuild();
        }
    }

    pub fn set_active(&mut self, active: bool) {
        if active == self.active {
            return;
        }
        self.active = active;
        if active {
            self.rebuild();
        } else {
            self.release_graph();
            self.device.suspend();
        }
    }

    /// Silence the channel and close the device. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.active = false;
        self.release_graph();
        self.device.close();
    }

    fn rebuild(&mut self) {
        self.release_graph();

        let sound = self.selected.sound();
        let Some(recipe_id) = sound.recipe else {
            return;
        };
        if let Err(err) = self.device.resume() {
            warn!(%err, sound = %self.selected, "ambient channel silent");
            return;
        }

        let recipe = recipe_for(recipe_id);
        let mut stage = self.device.gain_stage(sound.default_volume);
        let handles = recipe.build(&mut stage, &mut self.rng);
        let generation = self.device.arena().generation();
        info!(
            sound = %self.selected,
            nodes = handles.len(),
            generation, "ambient graph started"
        );
        self.graph = Some(ActiveGraph {
            sound: self.selected,
            generation,
            handles,
        });
    }

    fn release_graph(&mut self) {
        let Some(graph) = self.graph.take() else {
            return;
        };
        let arena = self.device.arena_mut();
        for handle in &graph.handles {
            arena.stop(*handle);
        }
        arena.release();
        debug!(sound = %graph.sound, generation = graph.generation, "ambient graph released");
    }
}

impl Subscriber for AmbientSynthesizer {
    fn handle(&mut self, event: &Event) {
        match event {
            Event::SessionStarted { .. } | Event::SessionResumed { .. } => self.set_active(true),
            Event::SessionPaused { .. } | Event::SessionReset { .. } | Event::AutoStopped { .. } => {
                self.set_active(false)
            }
            _ => {}
        }
    }
}

impl Drop for AmbientSynthesizer {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::ambient::DeviceState;

    fn synth() -> AmbientSynthesizer {
        AmbientSynthesizer::new(AudioDevice::new(8_000), Some(9))
    }

    #[test]
    fn selection_is_remembered_while_inactive() {
        let mut synth = synth();
        synth.select(AmbientSoundId::Rain);
        assert!(synth.active_graph().is_none());
        assert_eq!(synth.device().state(), DeviceState::Suspended);

        synth.set_active(true);
        let graph = synth.active_graph().unwrap();
        assert_eq!(graph.sound, AmbientSoundId::Rain);
        assert_eq!(synth.device().state(), DeviceState::Running);
    }

    #[test]
    fn switching_tears_down_before_building() {
        let mut synth = synth();
        synth.set_active(true);
        synth.select(AmbientSoundId::Rain);
        let rain = synth.active_graph().unwrap().clone();

        synth.select(AmbientSoundId::Ocean);
        let ocean = synth.active_graph().unwrap();
        assert_eq!(ocean.sound, AmbientSoundId::Ocean);
        assert!(ocean.generation > rain.generation);

        let arena = synth.device().arena();
        assert!(rain.handles.iter().all(|h| !arena.is_running(*h)));
        assert_eq!(arena.running(), ocean.handles.len());
    }

    #[test]
    fn none_leaves_silence() {
        let mut synth = synth();
        synth.set_active(true);
        synth.select(AmbientSoundId::Bowls);
        synth.select(AmbientSoundId::None);
        assert!(synth.active_graph().is_none());
        assert_eq!(synth.device().arena().running(), 0);
        assert!(synth.device_mut().render(128).iter().all(|s| *s == 0.0));
    }

    #[test]
    fn blocked_device_degrades_to_silent() {
        let mut synth = AmbientSynthesizer::new(AudioDevice::blocked(8_000), Some(1));
        synth.select(AmbientSoundId::Fire);
        synth.set_active(true);
        assert!(synth.active_graph().is_none());
        assert_eq!(synth.device().arena().running(), 0);
    }

    #[test]
    fn follows_session_events() {
        let mut synth = synth();
        synth.select(AmbientSoundId::Wind);
        synth.handle(&Event::SessionStarted {
            pattern_id: "box".into(),
            target_duration_secs: 60,
            at: Utc::now(),
        });
        assert!(synth.active_graph().is_some());

        synth.handle(&Event::SessionPaused {
            elapsed_secs: 5,
            at: Utc::now(),
        });
        assert!(synth.active_graph().is_none());
        assert_eq!(synth.device().state(), DeviceState::Suspended);

        synth.handle(&Event::SessionResumed {
            elapsed_secs: 5,
            at: Utc::now(),
        });
        assert!(synth.active_graph().is_some());

        synth.handle(&Event::AutoStopped {
            elapsed_secs: 60,
            breath_count: 3,
            cycle_count: 3,
            at: Utc::now(),
        });
        assert!(synth.active_graph().is_none());
    }

    #[test]
    fn teardown_is_repeatable() {
        let mut synth = synth();
        synth.select(AmbientSoundId::Cosmic);
        synth.set_active(true);
        synth.teardown();
        synth.teardown();
        assert!(synth.active_graph().is_none());
        assert_eq!(synth.device().state(), DeviceState::Closed);
    }
}
