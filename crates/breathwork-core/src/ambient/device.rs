use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::graph::{GainStage, NodeArena};
use crate::error::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Suspended,
    Running,
    Closed,
}

/// Software audio output owned by exactly one session engine.
///
/// The device starts suspended and must be resumed before it produces sound.
/// It hosts the [`NodeArena`] that ambient graphs are built in and mixes it
/// on demand through [`render`](Self::render).
#[derive(Debug)]
pub struct AudioDevice {
    sample_rate: u32,
    state: DeviceState,
    owner: Option<Uuid>,
    resume_blocked: bool,
    arena: NodeArena,
}

impl AudioDevice {
    pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            state: DeviceState::Suspended,
            owner: None,
            resume_blocked: false,
            arena: NodeArena::new(),
        }
    }

    /// A device whose `resume` always fails, like an output the host refuses
    /// to start.
    pub fn blocked(sample_rate: u32) -> Self {
        Self {
            resume_blocked: true,
            ..Self::new(sample_rate)
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn owner(&self) -> Option<Uuid> {
        self.owner
    }

    pub fn resume(&mut self) -> Result<(), SessionError> {
        match self.state {
            DeviceState::Running => Ok(()),
            DeviceState::Closed => Err(SessionError::unavailable("audio device", "device is closed")),
            DeviceState::Suspended if self.resume_blocked => Err(SessionError::unavailable(
                "audio device",
                "output refused to resume",
            )),
            DeviceState::Suspended => {
                debug!(sample_rate = self.sample_rate, "audio device resumed");
                self.state = DeviceState::Running;
                Ok(())
            }
        }
    }

    pub fn suspend(&mut self) {
        if self.state == DeviceState::Running {
            self.state = DeviceState::Suspended;
        }
    }

    /// Release every node and close the device for good.
    pub fn close(&mut self) {
        if self.state != DeviceState::Closed {
            self.arena.release();
            self.state = DeviceState::Closed;
            self.owner = None;
        }
    }

    /// Claim the device for `owner`. Re-claiming by the same owner succeeds.
    pub fn claim(&mut self, owner: Uuid) -> Result<(), SessionError> {
        match self.owner {
            Some(current) if current != owner => Err(SessionError::unavailable(
                "audio device",
                format!("already claimed by session {current}"),
            )),
            _ => {
                self.owner = Some(owner);
                Ok(())
            }
        }
    }

    pub fn release(&mut self, owner: Uuid) {
        if self.owner == Some(owner) {
            self.owner = None;
        }
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    /// Volume stage for building a new graph in the current generation.
    pub fn gain_stage(&mut self, volume: f32) -> GainStage<'_> {
        GainStage::new(&mut self.arena, self.sample_rate, volume)
    }

    /// Mix `frames` samples. A device that is not running renders silence.
    pub fn render(&mut self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0; frames];
        if self.state == DeviceState::Running {
            self.arena.render(&mut out, self.sample_rate);
        }
        out
    }
}

impl Default for AudioDevice {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SAMPLE_RATE)
    }
}
