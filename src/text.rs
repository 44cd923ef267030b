//! Transcript normalization and keyword helpers shared by the wake
//! detector and the command interpreter.

use regex::Regex;

use crate::{Error, Result};

/// Lowercase, trim, and collapse internal whitespace runs to one space.
pub fn normalize(text: &str) -> String {
    squash_whitespace(&text.to_lowercase())
}

pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `text` with all whitespace removed.
pub fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

#[inline]
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Whole-word (or whole-phrase) containment: `term` must not be glued to
/// other word characters on either side.
pub fn has_term(text: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }
    text.match_indices(term).any(|(start, _)| {
        let before = text[..start].chars().next_back();
        let after = text[start + term.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}

pub fn has_any_term(text: &str, terms: &[&str]) -> bool {
    terms.iter().any(|term| has_term(text, term))
}

/// Uppercase the first character, leave the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Drop trailing `?`, `!`, `.` and `,`.
pub fn trim_punctuation(text: &str) -> &str {
    text.trim_end_matches(['?', '!', '.', ','])
        .trim_end()
}

/// Drop leading characters so that at most `max_chars` remain.
pub fn keep_tail(buf: &mut String, max_chars: usize) {
    let count = buf.chars().count();
    if count <= max_chars {
        return;
    }
    if let Some((cut, _)) = buf.char_indices().nth(count - max_chars) {
        buf.drain(..cut);
    }
}

/// Removes a fixed set of words/phrases (whole-word) from text.
pub struct TermStripper {
    pattern: Regex,
}

impl TermStripper {
    /// Longer terms are tried first so `on spotify` wins over `on`.
    pub fn new(terms: &[&str]) -> Result<Self> {
        let mut sorted: Vec<&str> = terms.iter().copied().filter(|t| !t.is_empty()).collect();
        sorted.sort_by_key(|t| std::cmp::Reverse(t.len()));
        if sorted.is_empty() {
            return Err(Error::Config("term stripper needs at least one term".into()));
        }
        let alternation = sorted
            .iter()
            .map(|t| regex::escape(t))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"\b(?:{alternation})\b"))
            .map_err(|e| Error::Config(format!("invalid strip terms: {e}")))?;
        Ok(Self { pattern })
    }

    /// Remove every term and squash the remaining whitespace.
    pub fn strip(&self, text: &str) -> String {
        squash_whitespace(&self.pattern.replace_all(text, " "))
    }
}

/// Whole-word replacement table (`heard` → `meant`).
pub struct Substitutions {
    rules: Vec<(Regex, String)>,
}

impl Substitutions {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self> {
        let mut rules = Vec::new();
        for (heard, meant) in pairs {
            let heard = normalize(heard);
            if heard.is_empty() {
                continue;
            }
            let re = Regex::new(&format!(r"\b{}\b", regex::escape(&heard)))
                .map_err(|e| Error::Config(format!("invalid substitution {heard:?}: {e}")))?;
            rules.push((re, normalize(meant)));
        }
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (re, meant) in &self.rules {
            out = re.replace_all(&out, meant.as_str()).into_owned();
        }
        out
    }
}
