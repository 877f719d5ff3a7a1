use std::io::Write;

use crate::error::SessionError;

/// Text-to-speech output channel.
pub trait SpeechSynthesizer {
    /// Queue `text` for speaking. Errors leave the channel silent.
    fn speak(&mut self, text: &str) -> Result<(), SessionError>;
    /// Drop the in-flight utterance, if any.
    fn cancel(&mut self);
    fn is_speaking(&self) -> bool;
}

/// Speech channel that never produces output.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentSpeech;

impl SpeechSynthesizer for SilentSpeech {
    fn speak(&mut self, _text: &str) -> Result<(), SessionError> {
        Ok(())
    }

    fn cancel(&mut self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}

/// Writes each utterance as a line to a terminal sink.
///
/// An utterance counts as in flight until the next `cancel`.
#[derive(Debug)]
pub struct ConsoleSpeech<W: Write> {
    sink: W,
    speaking: bool,
}

impl<W: Write> ConsoleSpeech<W> {
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            speaking: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

impl ConsoleSpeech<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> SpeechSynthesizer for ConsoleSpeech<W> {
    fn speak(&mut self, text: &str) -> Result<(), SessionError> {
        writeln!(self.sink, "  » {text}")
            .and_then(|_| self.sink.flush())
            .map_err(|e| SessionError::unavailable("speech", e.to_string()))?;
        self.speaking = true;
        Ok(())
    }

    fn cancel(&mut self) {
        self.speaking = false;
    }

    fn is_speaking(&self) -> bool {
        self.speaking
    }
}
