//! Text-to-speech provider interface.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::{Error, Result};

pub type UtteranceId = u64;

/// Prosody applied to every utterance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechSettings {
    pub rate: f32,
    pub pitch: f32,
    pub volume: f32,
}

impl Default for SpeechSettings {
    fn default() -> Self {
        Self {
            rate: 0.9,
            pitch: 0.8,
            volume: 0.8,
        }
    }
}

/// One piece of text to speak.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub id: UtteranceId,
    pub text: String,
    /// BCP-47 locale hint for voice selection.
    pub lang: String,
    pub settings: SpeechSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEventKind {
    Started,
    Finished,
    Failed(String),
}

impl SpeechEventKind {
    /// Playback is over, successfully or not.
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub utterance: UtteranceId,
    pub kind: SpeechEventKind,
}

/// Completion callbacks for one utterance.
#[derive(Debug, Clone)]
pub struct SpeechSink {
    utterance: UtteranceId,
    tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl SpeechSink {
    pub fn new(utterance: UtteranceId, tx: mpsc::UnboundedSender<SpeechEvent>) -> Self {
        Self { utterance, tx }
    }

    pub fn started(&self) {
        self.emit(SpeechEventKind::Started);
    }

    pub fn finished(&self) {
        self.emit(SpeechEventKind::Finished);
    }

    pub fn failed(&self, reason: impl Into<String>) {
        self.emit(SpeechEventKind::Failed(reason.into()));
    }

    fn emit(&self, kind: SpeechEventKind) {
        let _ = self.tx.send(SpeechEvent {
            utterance: self.utterance,
            kind,
        });
    }
}

/// Text-to-speech capability provider.
pub trait SpeechSynthesizer: Send + Sync {
    /// Queue `utterance`. Completion is reported through `sink`.
    fn speak(&self, utterance: Utterance, sink: SpeechSink) -> Result<()>;

    /// Stop any utterance in progress.
    fn cancel_all(&self);
}

/// Provider for platforms without speech synthesis.
pub struct UnsupportedSynthesizer;

impl SpeechSynthesizer for UnsupportedSynthesizer {
    fn speak(&self, _utterance: Utterance, _sink: SpeechSink) -> Result<()> {
        Err(Error::Unsupported("speech synthesis"))
    }

    fn cancel_all(&self) {}
}
