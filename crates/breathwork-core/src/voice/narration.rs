//! Long-form narration tracks, one recording per built-in pattern.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::catalog::PatternId;
use crate::error::SessionError;

pub const NARRATION_VOLUME: f32 = 0.7;

pub trait NarrationTrack {
    /// Start or continue playback from the current position.
    fn play(&mut self) -> Result<(), SessionError>;
    /// Hold the current position.
    fn pause(&mut self);
    /// Rewind to the start.
    fn stop(&mut self);
    fn is_playing(&self) -> bool;
    fn position(&self) -> Duration;
}

pub trait NarrationLibrary {
    fn open(&mut self, pattern: PatternId) -> Result<Box<dyn NarrationTrack>, SessionError>;
}

/// Looks up `<dir>/<asset>.mp3` for each pattern.
#[derive(Debug, Clone)]
pub struct FileNarrationLibrary {
    dir: PathBuf,
}

impl FileNarrationLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn asset_path(&self, pattern: PatternId) -> PathBuf {
        self.dir.join(format!("{}.mp3", pattern.narration_asset()))
    }
}

impl NarrationLibrary for FileNarrationLibrary {
    fn open(&mut self, pattern: PatternId) -> Result<Box<dyn NarrationTrack>, SessionError> {
        let path = self.asset_path(pattern);
        if !path.is_file() {
            return Err(SessionError::unavailable(
                "narration",
                format!("missing asset {}", path.display()),
            ));
        }
        debug!(
            path = %path.display(),
            volume = NARRATION_VOLUME,
            looped = true,
            "narration track opened"
        );
        Ok(Box::new(FileTrack::new(path)))
    }
}

/// Looped narration playback tracked by wall-clock position.
#[derive(Debug)]
struct FileTrack {
    path: PathBuf,
    started: Option<Instant>,
    offset: Duration,
}

impl FileTrack {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            started: None,
            offset: Duration::ZERO,
        }
    }
}

impl NarrationTrack for FileTrack {
    fn play(&mut self) -> Result<(), SessionError> {
        if self.started.is_some() {
            return Ok(());
        }
        if !self.path.is_file() {
            return Err(SessionError::unavailable(
                "narration",
                format!("asset vanished: {}", self.path.display()),
            ));
        }
        self.started = Some(Instant::now());
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(started) = self.started.take() {
            self.offset += started.elapsed();
        }
    }

    fn stop(&mut self) {
        self.started = None;
        self.offset = Duration::ZERO;
    }

    fn is_playing(&self) -> bool {
        self.started.is_some()
    }

    fn position(&self) -> Duration {
        self.offset + self.started.map(|s| s.elapsed()).unwrap_or_default()
    }
}

/// Library with no recordings; every open reports the channel unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoNarration;

impl NarrationLibrary for NoNarration {
    fn open(&mut self, _pattern: PatternId) -> Result<Box<dyn NarrationTrack>, SessionError> {
        Err(SessionError::unavailable("narration", "no narration library configured"))
    }
}
