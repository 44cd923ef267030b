//! Fuzzy wake-phrase matching.

use crate::config::WakeConfig;
use crate::text::{self, Substitutions};
use crate::{Error, Result};

const MIN_WINDOW: usize = 64;

/// Canonical wake phrase plus accepted variants and known mis-hearings.
pub struct WakePhraseSet {
    phrases: Vec<String>,
    compact: Vec<String>,
    substitutions: Substitutions,
    window: usize,
}

impl WakePhraseSet {
    pub fn new(config: &WakeConfig) -> Result<Self> {
        let phrases: Vec<String> = config
            .phrases
            .iter()
            .map(|p| text::normalize(p))
            .filter(|p| !p.is_empty())
            .collect();
        if phrases.is_empty() {
            return Err(Error::Config("at least one wake phrase is required".into()));
        }
        let compact = phrases.iter().map(|p| text::compact(p)).collect();
        let longest = phrases
            .iter()
            .map(String::as_str)
            .chain(config.substitutions.iter().map(|s| s.heard.as_str()))
            .map(|p| p.chars().count())
            .max()
            .unwrap_or(0);
        let substitutions = Substitutions::new(
            config
                .substitutions
                .iter()
                .map(|s| (s.heard.as_str(), s.meant.as_str())),
        )?;
        Ok(Self {
            phrases,
            compact,
            substitutions,
            window: (longest * 4).max(MIN_WINDOW),
        })
    }

    /// Transcript tail, in characters, that can still hold a full match.
    /// Anything older can be discarded.
    pub fn window(&self) -> usize {
        self.window
    }

    /// True if `transcript` contains any phrase, directly, with whitespace
    /// ignored, or after applying the substitution table.
    pub fn matches(&self, transcript: &str) -> bool {
        let heard = text::normalize(transcript);
        if heard.is_empty() {
            return false;
        }
        if self.contains_phrase(&heard) {
            return true;
        }
        if self.substitutions.is_empty() {
            return false;
        }
        let corrected = self.substitutions.apply(&heard);
        corrected != heard && self.contains_phrase(&corrected)
    }

    fn contains_phrase(&self, heard: &str) -> bool {
        if self.phrases.iter().any(|p| heard.contains(p.as_str())) {
            return true;
        }
        let squashed = text::compact(heard);
        self.compact.iter().any(|p| squashed.contains(p.as_str()))
    }
}
