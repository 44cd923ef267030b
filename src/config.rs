//! Assistant configuration.
//! Every table has a built-in default; a JSON file may override any subset
//! of fields (missing fields keep their defaults).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::command::catalog::{self, IntentEntry, Shortcut, Topic};
use crate::command::voice::VoiceOption;
use crate::speech::SpeechSettings;
use crate::{Error, Result};

/// A known mis-transcription of part of the wake phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substitution {
    pub heard: String,
    pub meant: String,
}

fn sub(heard: &str, meant: &str) -> Substitution {
    Substitution {
        heard: heard.to_string(),
        meant: meant.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Canonical phrase and its accepted variants.
    pub phrases: Vec<String>,
    pub substitutions: Vec<Substitution>,
    /// How long the detected pulse stays high before listening resumes.
    pub cooldown_ms: u64,
    /// Backoff before restarting after a transient recognition error.
    pub error_backoff_ms: u64,
    /// Delay before restarting after the platform ended the session.
    pub end_restart_ms: u64,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            phrases: vec![
                "hey literal".to_string(),
                "hello literal".to_string(),
                "literal".to_string(),
            ],
            substitutions: vec![
                sub("lateral", "literal"),
                sub("litteral", "literal"),
                sub("literall", "literal"),
                sub("litral", "literal"),
                sub("littoral", "literal"),
                sub("lit rul", "literal"),
            ],
            cooldown_ms: 3000,
            error_backoff_ms: 1000,
            end_restart_ms: 100,
        }
    }
}

impl WakeConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn end_restart(&self) -> Duration {
        Duration::from_millis(self.end_restart_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandConfig {
    pub intents: Vec<IntentEntry>,
    pub shortcuts: Vec<Shortcut>,
    pub knowledge: Vec<Topic>,
    /// First entry is the startup voice.
    pub voices: Vec<VoiceOption>,
    pub greetings: Vec<String>,
    /// Open a web search when a knowledge question has no answer.
    /// Fires without waiting for the user to confirm.
    pub search_unknown_topics: bool,
}

impl Default for CommandConfig {
    fn default() -> Self {
        Self {
            intents: catalog::default_intents(),
            shortcuts: catalog::default_shortcuts(),
            knowledge: catalog::default_knowledge(),
            voices: catalog::default_voices(),
            greetings: catalog::default_greetings(),
            search_unknown_topics: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub assistant_name: String,
    /// Recognition locale, fixed for the process.
    pub locale: String,
    /// Spoken right after the wake phrase is heard.
    pub acknowledgement: String,
    pub wake: WakeConfig,
    pub speech: SpeechSettings,
    pub commands: CommandConfig,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            assistant_name: "Literal".to_string(),
            locale: "en-US".to_string(),
            acknowledgement: "Yes, I'm listening.".to_string(),
            wake: WakeConfig::default(),
            speech: SpeechSettings::default(),
            commands: CommandConfig::default(),
        }
    }
}

impl AssistantConfig {
    /// Load from a JSON file and validate.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = %path.display(), "config_loaded");
        Ok(config)
    }

    /// Load `path` if given, falling back to defaults on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::load_from_file(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "config load failed, using defaults");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    /// Reject configs that would break response invariants.
    pub fn validate(&self) -> Result<()> {
        if self.assistant_name.trim().is_empty() {
            return Err(Error::Config("assistant_name must not be empty".into()));
        }
        if self.acknowledgement.trim().is_empty() {
            return Err(Error::Config("acknowledgement must not be empty".into()));
        }
        if self.wake.phrases.iter().all(|p| p.trim().is_empty()) {
            return Err(Error::Config("at least one wake phrase is required".into()));
        }
        let commands = &self.commands;
        if commands.voices.is_empty() {
            return Err(Error::Config("at least one voice is required".into()));
        }
        if commands.greetings.iter().any(|g| g.trim().is_empty()) || commands.greetings.is_empty() {
            return Err(Error::Config("greetings must be non-empty strings".into()));
        }
        if let Some(t) = commands.knowledge.iter().find(|t| t.topic.trim().is_empty()) {
            return Err(Error::Config(format!("knowledge entry {:?} has an empty topic", t.answer)));
        }
        if let Some(t) = commands.knowledge.iter().find(|t| t.answer.trim().is_empty()) {
            return Err(Error::Config(format!("knowledge topic {:?} has no answer", t.topic)));
        }
        if let Some(e) = commands.intents.iter().find(|e| e.keyword.trim().is_empty()) {
            return Err(Error::Config(format!("intent for {:?} has an empty keyword", e.url)));
        }
        if let Some(s) = commands
            .shortcuts
            .iter()
            .find(|s| s.label.trim().is_empty() || s.triggers.iter().all(|t| t.trim().is_empty()))
        {
            return Err(Error::Config(format!("shortcut {:?} needs a label and a trigger", s.url)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AssistantConfig::default();
        config.validate().unwrap();
        assert_eq!(config.wake.cooldown(), Duration::from_millis(3000));
        assert_eq!(config.wake.error_backoff(), Duration::from_millis(1000));
        assert_eq!(config.wake.end_restart(), Duration::from_millis(100));
        assert_eq!(config.commands.voices[0].lang, "en-US");
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "assistant_name": "Nova", "wake": {{ "phrases": ["hey nova"], "cooldown_ms": 500 }} }}"#
        )
        .unwrap();

        let config = AssistantConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.assistant_name, "Nova");
        assert_eq!(config.wake.phrases, vec!["hey nova".to_string()]);
        assert_eq!(config.wake.cooldown_ms, 500);
        assert_eq!(config.wake.error_backoff_ms, 1000);
        assert_eq!(config.commands.intents, catalog::default_intents());
    }

    #[test]
    fn invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "commands": {{ "voices": [] }} }}"#).unwrap();
        assert!(matches!(
            AssistantConfig::load_from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn blank_knowledge_topic_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "commands": {{ "knowledge": [{{ "topic": "  ", "answer": "Everything." }}] }} }}"#
        )
        .unwrap();
        assert!(matches!(
            AssistantConfig::load_from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let config = AssistantConfig::load_or_default(Some(Path::new("/nonexistent/literal.json")));
        assert_eq!(config, AssistantConfig::default());
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            AssistantConfig::load_from_file(file.path()),
            Err(Error::Json(_))
        ));
    }
}
