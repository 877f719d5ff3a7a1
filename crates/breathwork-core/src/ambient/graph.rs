//! Generator graph primitives and the generation-scoped node arena.
//!
//! Every generator belongs to exactly one graph generation. Releasing a
//! generation stops and drops all of its generators and bumps the counter, so
//! a [`NodeHandle`] kept from an older graph can never touch a newer one.

use std::f32::consts::TAU;

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Mcg128Xsl64;

/// Handle to a generator registered in a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeHandle {
    generation: u64,
    index: usize,
}

impl NodeHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoiseColor {
    White,
    Pink,
    Brown,
}

/// One-pole filter stage placed after a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    LowPass(f32),
    HighPass(f32),
}

/// Random note sequencer settings (bird chirps, wind chimes).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChirpSpec {
    pub notes: &'static [f32],
    pub peak: f32,
    pub note_secs: (f32, f32),
    pub gap_secs: (f32, f32),
    pub initial_delay_secs: f32,
}

#[derive(Debug, Clone)]
struct OnePole {
    high_pass: bool,
    alpha: f32,
    state: f32,
}

impl OnePole {
    fn new(filter: Filter, sample_rate: u32) -> Self {
        let (high_pass, cutoff) = match filter {
            Filter::LowPass(hz) => (false, hz),
            Filter::HighPass(hz) => (true, hz),
        };
        let nyquist = sample_rate as f32 / 2.0;
        let cutoff = cutoff.clamp(1.0, nyquist.max(1.0));
        let dt = 1.0 / sample_rate as f32;
        let rc = 1.0 / (TAU * cutoff);
        Self {
            high_pass,
            alpha: dt / (rc + dt),
            state: 0.0,
        }
    }

    fn process(&mut self, input: f32) -> f32 {
        self.state += self.alpha * (input - self.state);
        if self.high_pass {
            input - self.state
        } else {
            self.state
        }
    }
}

#[derive(Debug, Clone)]
struct Lfo {
    frequency: f32,
    depth: f32,
    phase: f32,
}

#[derive(Debug, Clone)]
struct Note {
    frequency: f32,
    phase: f32,
    length: u64,
    position: u64,
}

#[derive(Debug, Clone)]
struct ChirpSequencer {
    spec: ChirpSpec,
    rng: Mcg128Xsl64,
    wait: u64,
    note: Option<Note>,
}

impl ChirpSequencer {
    fn next(&mut self, sample_rate: u32) -> f32 {
        if self.note.is_none() {
            if self.wait > 0 {
                self.wait -= 1;
                return 0.0;
            }
            let (lo, hi) = self.spec.note_secs;
            let secs = self.rng.gen_range(lo..=hi);
            let index = self.rng.gen_range(0..self.spec.notes.len());
            self.note = Some(Note {
                frequency: self.spec.notes[index],
                phase: 0.0,
                length: secs_to_samples(secs, sample_rate).max(1),
                position: 0,
            });
        }

        let Some(note) = self.note.as_mut() else {
            return 0.0;
        };
        let attack = secs_to_samples(0.01, sample_rate).max(1);
        let envelope = if note.position < attack {
            note.position as f32 / attack as f32
        } else {
            let decay = (note.length.saturating_sub(attack)).max(1);
            1.0 - (note.position - attack) as f32 / decay as f32
        };
        let sample = (TAU * note.phase).sin() * envelope.max(0.0) * self.spec.peak;
        note.phase = (note.phase + note.frequency / sample_rate as f32).fract();
        note.position += 1;

        if note.position >= note.length {
            self.note = None;
            let (lo, hi) = self.spec.gap_secs;
            self.wait = secs_to_samples(self.rng.gen_range(lo..=hi), sample_rate);
        }
        sample
    }
}

#[derive(Debug, Clone)]
enum Source {
    Oscillator {
        waveform: Waveform,
        frequency: f32,
        phase: f32,
        lfo: Option<Lfo>,
    },
    Loop {
        samples: Vec<f32>,
        position: usize,
    },
    Chirps(Box<ChirpSequencer>),
}

impl Source {
    fn next(&mut self, sample_rate: u32) -> f32 {
        let rate = sample_rate as f32;
        match self {
            Source::Oscillator {
                waveform,
                frequency,
                phase,
                lfo,
            } => {
                let value = match waveform {
                    Waveform::Sine => (TAU * *phase).sin(),
                    Waveform::Triangle => 4.0 * (*phase - 0.5).abs() - 1.0,
                };
                let mut current = *frequency;
                if let Some(lfo) = lfo {
                    current += lfo.depth * (TAU * lfo.phase).sin();
                    lfo.phase = (lfo.phase + lfo.frequency / rate).rem_euclid(1.0);
                }
                *phase = (*phase + current / rate).rem_euclid(1.0);
                value
            }
            Source::Loop { samples, position } => {
                if samples.is_empty() {
                    return 0.0;
                }
                let value = samples[*position];
                *position = (*position + 1) % samples.len();
                value
            }
            Source::Chirps(sequencer) => sequencer.next(sample_rate),
        }
    }
}

#[derive(Debug, Clone)]
struct Generator {
    source: Source,
    filters: Vec<OnePole>,
    level: f32,
    running: bool,
}

impl Generator {
    fn next(&mut self, sample_rate: u32) -> f32 {
        let mut value = self.source.next(sample_rate);
        for filter in &mut self.filters {
            value = filter.process(value);
        }
        value * self.level
    }
}

/// Registry of the generators belonging to the current graph generation.
#[derive(Debug, Default)]
pub struct NodeArena {
    generation: u64,
    generators: Vec<Generator>,
    master_gain: f32,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain
    }

    pub fn set_master_gain(&mut self, gain: f32) {
        self.master_gain = gain.clamp(0.0, 1.0);
    }

    fn register(&mut self, generator: Generator) -> NodeHandle {
        self.generators.push(generator);
        NodeHandle {
            generation: self.generation,
            index: self.generators.len() - 1,
        }
    }

    fn get_mut(&mut self, handle: NodeHandle) -> Option<&mut Generator> {
        if handle.generation != self.generation {
            return None;
        }
        self.generators.get_mut(handle.index)
    }

    /// Stop one generator. Returns `false` when it was already stopped or
    /// belongs to a released generation; neither case is an error.
    pub fn stop(&mut self, handle: NodeHandle) -> bool {
        match self.get_mut(handle) {
            Some(generator) if generator.running => {
                generator.running = false;
                true
            }
            _ => false,
        }
    }

    pub fn is_running(&self, handle: NodeHandle) -> bool {
        handle.generation == self.generation
            && self
                .generators
                .get(handle.index)
                .is_some_and(|g| g.running)
    }

    /// Generators currently producing sound.
    pub fn running(&self) -> usize {
        self.generators.iter().filter(|g| g.running).count()
    }

    /// Stop and drop the whole current generation. Returns how many
    /// generators were still running.
    pub fn release(&mut self) -> usize {
        let stopped = self.running();
        self.generators.clear();
        self.generation += 1;
        self.master_gain = 0.0;
        stopped
    }

    /// Mix every running generator through the master gain into `out`.
    pub fn render(&mut self, out: &mut [f32], sample_rate: u32) {
        for frame in out.iter_mut() {
            let mut mix = 0.0;
            for generator in self.generators.iter_mut().filter(|g| g.running) {
                mix += generator.next(sample_rate);
            }
            *frame = mix * self.master_gain;
        }
    }
}

/// The volume stage a recipe feeds. Everything built through it is
/// registered in the current generation and started immediately.
pub struct GainStage<'a> {
    arena: &'a mut NodeArena,
    sample_rate: u32,
}

impl<'a> GainStage<'a> {
    pub fn new(arena: &'a mut NodeArena, sample_rate: u32, volume: f32) -> Self {
        arena.set_master_gain(volume);
        Self { arena, sample_rate }
    }

    pub fn volume(&self) -> f32 {
        self.arena.master_gain()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn oscillator(&mut self, waveform: Waveform, frequency: f32, level: f32) -> NodeHandle {
        self.start(
            Source::Oscillator {
                waveform,
                frequency,
                phase: 0.0,
                lfo: None,
            },
            &[],
            level,
        )
    }

    /// Oscillator whose frequency is swept by a slow sine LFO.
    pub fn modulated(
        &mut self,
        waveform: Waveform,
        frequency: f32,
        level: f32,
        lfo_frequency: f32,
        lfo_depth: f32,
    ) -> NodeHandle {
        self.start(
            Source::Oscillator {
                waveform,
                frequency,
                phase: 0.0,
                lfo: Some(Lfo {
                    frequency: lfo_frequency,
                    depth: lfo_depth,
                    phase: 0.0,
                }),
            },
            &[],
            level,
        )
    }

    /// Two-second looped noise buffer.
    pub fn noise(
        &mut self,
        color: NoiseColor,
        level: f32,
        filters: &[Filter],
        rng: &mut dyn RngCore,
    ) -> NodeHandle {
        let samples = noise_buffer(color, self.sample_rate as usize * 2, rng);
        self.start(Source::Loop { samples, position: 0 }, filters, level)
    }

    /// Sparse impulse loop, used for fire crackle.
    pub fn crackle(
        &mut self,
        density: f32,
        level: f32,
        filters: &[Filter],
        rng: &mut dyn RngCore,
    ) -> NodeHandle {
        let len = (self.sample_rate / 2) as usize;
        let samples = (0..len)
            .map(|_| {
                if rng.gen::<f32>() < density {
                    (rng.gen::<f32>() * 2.0 - 1.0) * 0.5
                } else {
                    0.0
                }
            })
            .collect();
        self.start(Source::Loop { samples, position: 0 }, filters, level)
    }

    pub fn chirps(&mut self, spec: ChirpSpec, rng: &mut dyn RngCore) -> NodeHandle {
        let sequencer = ChirpSequencer {
            spec,
            rng: Mcg128Xsl64::seed_from_u64(rng.next_u64()),
            wait: secs_to_samples(spec.initial_delay_secs, self.sample_rate),
            note: None,
        };
        self.start(Source::Chirps(Box::new(sequencer)), &[], 1.0)
    }

    fn start(&mut self, source: Source, filters: &[Filter], level: f32) -> NodeHandle {
        let filters = filters
            .iter()
            .map(|f| OnePole::new(*f, self.sample_rate))
            .collect();
        self.arena.register(Generator {
            source,
            filters,
            level,
            running: true,
        })
    }
}

fn secs_to_samples(secs: f32, sample_rate: u32) -> u64 {
    (secs.max(0.0) * sample_rate as f32) as u64
}

fn noise_buffer(color: NoiseColor, len: usize, rng: &mut dyn RngCore) -> Vec<f32> {
    let mut out = Vec::with_capacity(len);
    let (mut b0, mut b1, mut b2, mut b3, mut b4, mut b5, mut b6) =
        (0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32, 0.0f32);
    for _ in 0..len {
        let white = rng.gen::<f32>() * 2.0 - 1.0;
        let value = match color {
            NoiseColor::White => white * 0.5,
            NoiseColor::Pink => {
                b0 = 0.99886 * b0 + white * 0.055_517_9;
                b1 = 0.99332 * b1 + white * 0.075_075_9;
                b2 = 0.969 * b2 + white * 0.153_852;
                b3 = 0.8665 * b3 + white * 0.310_485_6;
                b4 = 0.55 * b4 + white * 0.532_952_2;
                b5 = -0.7616 * b5 - white * 0.016_898;
                let pink = (b0 + b1 + b2 + b3 + b4 + b5 + b6 + white * 0.5362) * 0.11;
                b6 = white * 0.115_926;
                pink
            }
            NoiseColor::Brown => {
                b0 = (b0 + 0.02 * white) / 1.02;
                b0 * 3.5
            }
        };
        out.push(value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng() -> Mcg128Xsl64 {
        Mcg128Xsl64::seed_from_u64(7)
    }

    #[test]
    fn stop_is_idempotent() {
        let mut arena = NodeArena::new();
        let handle = GainStage::new(&mut arena, 8_000, 0.5).oscillator(Waveform::Sine, 220.0, 0.2);
        assert!(arena.is_running(handle));
        assert!(arena.stop(handle));
        assert!(!arena.stop(handle));
        assert!(!arena.is_running(handle));
    }

    #[test]
    fn release_invalidates_old_handles() {
        let mut arena = NodeArena::new();
        let old = GainStage::new(&mut arena, 8_000, 0.5).oscillator(Waveform::Sine, 220.0, 0.2);
        assert_eq!(arena.release(), 1);

        let new = GainStage::new(&mut arena, 8_000, 0.5).oscillator(Waveform::Sine, 330.0, 0.2);
        assert_ne!(old.generation(), new.generation());
        // Same slot index, different generation: the stale stop must not land.
        assert!(!arena.stop(old));
        assert!(arena.is_running(new));
        assert_eq!(arena.running(), 1);
    }

    #[test]
    fn render_is_silent_without_generators() {
        let mut arena = NodeArena::new();
        let mut out = vec![1.0; 64];
        arena.render(&mut out, 8_000);
        assert!(out.iter().all(|s| *s == 0.0));
    }

    #[test]
    fn render_produces_signal_through_master_gain() {
        let mut arena = NodeArena::new();
        let mut r = rng();
        GainStage::new(&mut arena, 8_000, 0.5).noise(NoiseColor::Pink, 1.0, &[Filter::LowPass(1_000.0)], &mut r);
        let mut out = vec![0.0; 256];
        arena.render(&mut out, 8_000);
        assert!(out.iter().any(|s| *s != 0.0));
        assert!(out.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn seeded_noise_is_reproducible() {
        let a = noise_buffer(NoiseColor::Brown, 128, &mut rng());
        let b = noise_buffer(NoiseColor::Brown, 128, &mut rng());
        assert_eq!(a, b);
    }

    #[test]
    fn chirps_stay_silent_during_initial_delay() {
        const NOTES: &[f32] = &[1_000.0];
        let mut arena = NodeArena::new();
        let mut r = rng();
        GainStage::new(&mut arena, 1_000, 1.0).chirps(
            ChirpSpec {
                notes: NOTES,
                peak: 0.1,
                note_secs: (0.1, 0.1),
                gap_secs: (1.0, 1.0),
                initial_delay_secs: 0.5,
            },
            &mut r,
        );
        let mut out = vec![0.0; 500];
        arena.render(&mut out, 1_000);
        assert!(out.iter().all(|s| *s == 0.0));
        let mut out = vec![0.0; 100];
        arena.render(&mut out, 1_000);
        assert!(out.iter().any(|s| *s != 0.0));
    }
}
