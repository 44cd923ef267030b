//! Voice (accent) selection.

use serde::{Deserialize, Serialize};

/// A selectable synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceOption {
    /// Display label, also the word users say ("british").
    pub name: String,
    /// BCP-47 locale tag.
    pub lang: String,
}

impl VoiceOption {
    pub fn new(name: &str, lang: &str) -> Self {
        Self {
            name: name.to_string(),
            lang: lang.to_string(),
        }
    }
}

/// The current voice selection, threaded through the interpreter and read
/// by the synthesis step. Last write wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceContext {
    current: VoiceOption,
}

impl VoiceContext {
    pub fn new(initial: VoiceOption) -> Self {
        Self { current: initial }
    }

    pub fn current(&self) -> &VoiceOption {
        &self.current
    }

    pub fn lang(&self) -> &str {
        &self.current.lang
    }

    pub fn select(&mut self, voice: VoiceOption) {
        tracing::info!(from = %self.current.name, to = %voice.name, "voice_changed");
        self.current = voice;
    }
}

/// Case-insensitive lookup by display name.
pub fn find_voice<'a>(voices: &'a [VoiceOption], name: &str) -> Option<&'a VoiceOption> {
    voices.iter().find(|v| v.name.eq_ignore_ascii_case(name))
}
