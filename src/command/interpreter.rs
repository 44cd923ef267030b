//! Rule-cascade command interpreter.
//!
//! A normalized transcript is tested against [`Intent::CASCADE`] from top to
//! bottom; the first rule that matches produces the response. Ordering is
//! priority (specific overrides before generic), not confidence.

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info};

use super::catalog::{
    self, IntentEntry, Shortcut, Topic, EMPTY_QUESTION_MESSAGE, FALLBACK_MESSAGE,
    GOODBYE_MESSAGE, THANKS_MESSAGE, WEATHER_MESSAGE,
};
use super::response::CommandResponse;
use super::voice::{find_voice, VoiceContext, VoiceOption};
use crate::config::AssistantConfig;
use crate::text::{self, TermStripper};
use crate::{Error, Result};

/// Classified purpose of a command, in cascade order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Intent {
    AccentChange,
    KnowledgeQuery,
    Shortcut,
    Greeting,
    MediaPlayback,
    OpenApp,
    WebSearch,
    VideoPlayback,
    Time,
    Date,
    Weather,
    Thanks,
    Goodbye,
    /// Nothing matched.
    Fallback,
}

impl Intent {
    /// Evaluation order. `Fallback` is implicit after the last entry.
    pub const CASCADE: [Intent; 13] = [
        Intent::AccentChange,
        Intent::KnowledgeQuery,
        Intent::Shortcut,
        Intent::Greeting,
        Intent::MediaPlayback,
        Intent::OpenApp,
        Intent::WebSearch,
        Intent::VideoPlayback,
        Intent::Time,
        Intent::Date,
        Intent::Weather,
        Intent::Thanks,
        Intent::Goodbye,
    ];
}

/// Wall-clock source for the date/time rules.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// Always reports the same instant.
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

const LEAD_WORDS: &str = r"^(?:what|who|how|why|when|where|which|tell me|explain|define)\b";
const ACCENT_CHANGE: &str = r"change (?:your |the )?(?:voice|accent) to (\w+)";
const QUESTION_PHRASING: &[&str] = &[
    "what is",
    "what's",
    "what are",
    "tell me about",
    "explain",
    "who is",
    "define",
    "meaning of",
    "definition of",
];
const MEDIA_FILLER: &[&str] = &[
    "play",
    "listen to",
    "music",
    "song",
    "songs",
    "track",
    "tracks",
    "artist",
    "album",
    "on spotify",
    "spotify",
];
const MEDIA_STOPWORDS: &[&str] = &[
    "this", "that", "it", "some", "something", "anything", "me", "a", "the",
];
const SEARCH_FILLER: &[&str] = &["search", "google", "for", "on", "open", "launch"];
const VIDEO_FILLER: &[&str] = &["play", "video", "on youtube", "youtube"];
/// Search terms shorter than this open the service home page instead.
const MIN_MEDIA_QUERY_CHARS: usize = 3;

fn identity_patterns(name: &str) -> Result<Vec<Regex>> {
    let name = regex::escape(&text::normalize(name));
    [
        r"who (?:named|choose|chose|picked|selected|gave) you.* name".to_string(),
        r"where.* (?:get|got) your name".to_string(),
        format!(r"why.* (?:called|named) {name}"),
        r"who.* (?:created|made|built|designed) you".to_string(),
        r"what.* your name".to_string(),
        r"your name.* (?:mean|means|stand for|stands for)".to_string(),
    ]
    .iter()
    .map(|p| Regex::new(p).map_err(|e| Error::Config(format!("identity pattern: {e}"))))
    .collect()
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::Config(format!("pattern {pattern:?}: {e}")))
}

/// Maps transcripts to responses. Holds only immutable tables; the one
/// piece of mutable state (current voice) is passed in by the caller.
pub struct Interpreter {
    intents: Vec<IntentEntry>,
    shortcuts: Vec<Shortcut>,
    knowledge: Vec<Topic>,
    voices: Vec<VoiceOption>,
    greetings: Vec<String>,
    search_unknown_topics: bool,
    identity_answer: String,
    lead_words: Regex,
    accent_change: Regex,
    identity: Vec<Regex>,
    question_phrasing: TermStripper,
    media_filler: TermStripper,
    search_filler: TermStripper,
    video_filler: TermStripper,
    clock: Box<dyn Clock>,
}

impl Interpreter {
    pub fn new(config: &AssistantConfig) -> Result<Self> {
        config.validate()?;
        let commands = &config.commands;
        Ok(Self {
            intents: commands
                .intents
                .iter()
                .map(|e| IntentEntry {
                    keyword: text::normalize(&e.keyword),
                    url: e.url.clone(),
                })
                .collect(),
            shortcuts: commands
                .shortcuts
                .iter()
                .map(|s| Shortcut {
                    label: s.label.clone(),
                    triggers: s.triggers.iter().map(|t| text::normalize(t)).collect(),
                    url: s.url.clone(),
                })
                .collect(),
            knowledge: commands
                .knowledge
                .iter()
                .map(|t| Topic {
                    topic: text::normalize(&t.topic),
                    answer: t.answer.clone(),
                })
                .collect(),
            voices: commands.voices.clone(),
            greetings: commands.greetings.clone(),
            search_unknown_topics: commands.search_unknown_topics,
            identity_answer: format!(
                "My name is {}. I was named by the developer who built me.",
                config.assistant_name
            ),
            lead_words: compile(LEAD_WORDS)?,
            accent_change: compile(ACCENT_CHANGE)?,
            identity: identity_patterns(&config.assistant_name)?,
            question_phrasing: TermStripper::new(QUESTION_PHRASING)?,
            media_filler: TermStripper::new(MEDIA_FILLER)?,
            search_filler: TermStripper::new(SEARCH_FILLER)?,
            video_filler: TermStripper::new(VIDEO_FILLER)?,
            clock: Box::new(SystemClock),
        })
    }

    /// Replace the wall clock (used for deterministic date/time output).
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Voice context starting at the first configured voice.
    pub fn initial_voice(&self) -> VoiceContext {
        let first = self
            .voices
            .first()
            .cloned()
            .unwrap_or_else(|| VoiceOption::new("Default", "en-US"));
        VoiceContext::new(first)
    }

    /// Interpret one finalized transcript. Never fails: unmatched input
    /// yields the fallback response.
    pub fn process(&self, voice: &mut VoiceContext, transcript: &str) -> CommandResponse {
        let command = text::normalize(transcript);
        debug!(command = %command, "processing_command");

        for intent in Intent::CASCADE {
            if let Some(response) = self.apply(intent, voice, &command) {
                info!(intent = ?intent, has_action = response.action.is_some(), "command_matched");
                return response;
            }
        }

        info!(command = %command, "command_unmatched");
        CommandResponse::say(Intent::Fallback, FALLBACK_MESSAGE)
    }

    fn apply(&self, intent: Intent, voice: &mut VoiceContext, cmd: &str) -> Option<CommandResponse> {
        match intent {
            Intent::AccentChange => {
                let caps = self.accent_change.captures(cmd)?;
                Some(self.change_accent(voice, caps.get(1)?.as_str()))
            }
            Intent::KnowledgeQuery => {
                let is_question = self.lead_words.is_match(cmd)
                    || text::has_any_term(cmd, &["meaning of", "definition of"]);
                is_question.then(|| self.answer(cmd))
            }
            Intent::Shortcut => {
                let shortcut = self
                    .shortcuts
                    .iter()
                    .find(|s| s.triggers.iter().any(|t| text::has_term(cmd, t)))?;
                Some(open_app(intent, &shortcut.url, &shortcut.label))
            }
            Intent::Greeting => {
                if !text::has_any_term(cmd, &["hello", "hi", "hey"]) {
                    return None;
                }
                let greeting = self
                    .greetings
                    .choose(&mut rand::thread_rng())
                    .map(String::as_str)
                    .unwrap_or("Hello!");
                Some(CommandResponse::say(intent, greeting))
            }
            Intent::MediaPlayback => {
                let wants_play = text::has_any_term(cmd, &["play", "listen to"]);
                let is_music = text::has_any_term(cmd, &["music", "song", "songs", "spotify"]);
                (wants_play && is_music).then(|| self.play_on_spotify(cmd))
            }
            Intent::OpenApp => {
                if !text::has_any_term(cmd, &["open", "launch", "go to"]) {
                    return None;
                }
                let entry = self.intents.iter().find(|e| cmd.contains(&e.keyword))?;
                Some(open_app(intent, &entry.url, &text::capitalize_first(&entry.keyword)))
            }
            Intent::WebSearch => {
                if !text::has_any_term(cmd, &["search", "google"]) {
                    return None;
                }
                let query = self.search_filler.strip(cmd);
                if query.is_empty() {
                    Some(open_app(intent, catalog::GOOGLE_HOME, "Google"))
                } else {
                    Some(search_google(intent, &query))
                }
            }
            Intent::VideoPlayback => {
                let wants_video = text::has_term(cmd, "play")
                    && text::has_any_term(cmd, &["video", "youtube"]);
                wants_video.then(|| self.play_on_youtube(cmd))
            }
            Intent::Time => text::has_any_term(cmd, &["time", "clock"]).then(|| {
                let now = self.clock.now();
                CommandResponse::say(
                    intent,
                    format!("The current time is {}", now.format("%-I:%M %p")),
                )
            }),
            Intent::Date => text::has_any_term(cmd, &["date", "today"]).then(|| {
                let now = self.clock.now();
                CommandResponse::say(intent, format!("Today is {}", now.format("%A, %B %-d, %Y")))
            }),
            Intent::Weather => text::has_term(cmd, "weather")
                .then(|| CommandResponse::say(intent, WEATHER_MESSAGE)),
            Intent::Thanks => text::has_any_term(cmd, &["thank", "thanks"])
                .then(|| CommandResponse::say(intent, THANKS_MESSAGE)),
            Intent::Goodbye => text::has_any_term(cmd, &["bye", "goodbye", "see you"])
                .then(|| CommandResponse::say(intent, GOODBYE_MESSAGE)),
            Intent::Fallback => None,
        }
    }

    fn change_accent(&self, voice: &mut VoiceContext, requested: &str) -> CommandResponse {
        match find_voice(&self.voices, requested) {
            Some(found) => {
                let name = found.name.clone();
                voice.select(found.clone());
                CommandResponse::say(
                    Intent::AccentChange,
                    format!("Voice accent changed to {name}. How does this sound?"),
                )
            }
            None => {
                let available = self
                    .voices
                    .iter()
                    .map(|v| v.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                CommandResponse::say(
                    Intent::AccentChange,
                    format!(
                        "I couldn't find the {requested} accent. Available accents are: {available}."
                    ),
                )
            }
        }
    }

    fn answer(&self, cmd: &str) -> CommandResponse {
        if self.identity.iter().any(|re| re.is_match(cmd)) {
            return CommandResponse::say(Intent::KnowledgeQuery, self.identity_answer.clone());
        }

        let stripped = self.question_phrasing.strip(cmd);
        let query = text::trim_punctuation(&stripped);
        if query.is_empty() {
            return CommandResponse::say(Intent::KnowledgeQuery, EMPTY_QUESTION_MESSAGE);
        }

        if let Some(topic) = self.lookup_topic(query) {
            debug!(topic = %topic.topic, "knowledge_hit");
            return CommandResponse::say(Intent::KnowledgeQuery, topic.answer.clone());
        }

        let message = format!(
            "I don't have specific information about {query} in my knowledge base. Would you like me to search the web for you?"
        );
        if self.search_unknown_topics {
            CommandResponse::open(Intent::KnowledgeQuery, message, google_search_url(query))
        } else {
            CommandResponse::say(Intent::KnowledgeQuery, message)
        }
    }

    /// Exact or topic-in-query first, then either-way containment.
    fn lookup_topic(&self, query: &str) -> Option<&Topic> {
        self.knowledge
            .iter()
            .find(|t| query == t.topic || query.contains(&t.topic))
            .or_else(|| {
                self.knowledge
                    .iter()
                    .find(|t| t.topic.contains(query) || query.contains(&t.topic))
            })
    }

    fn play_on_spotify(&self, cmd: &str) -> CommandResponse {
        let query = self.media_filler.strip(cmd);
        if query.is_empty()
            || MEDIA_STOPWORDS.contains(&query.as_str())
            || query.chars().count() < MIN_MEDIA_QUERY_CHARS
        {
            return CommandResponse::open(
                Intent::MediaPlayback,
                "Opening Spotify for you",
                catalog::SPOTIFY_HOME,
            );
        }
        CommandResponse::open(
            Intent::MediaPlayback,
            format!("Playing \"{query}\" on Spotify"),
            format!("{}{}", catalog::SPOTIFY_SEARCH, urlencoding::encode(&query)),
        )
    }

    fn play_on_youtube(&self, cmd: &str) -> CommandResponse {
        if text::has_term(cmd, "youtube") {
            let query = self.video_filler.strip(cmd);
            if !query.is_empty() {
                return CommandResponse::open(
                    Intent::VideoPlayback,
                    format!("Playing {query} on YouTube"),
                    format!("{}{}", catalog::YOUTUBE_SEARCH, urlencoding::encode(&query)),
                );
            }
        }
        open_app(Intent::VideoPlayback, catalog::YOUTUBE_HOME, "YouTube")
    }
}

fn open_app(intent: Intent, url: &str, name: &str) -> CommandResponse {
    CommandResponse::open(intent, format!("Opening {name}"), url)
}

fn google_search_url(query: &str) -> String {
    format!("{}{}", catalog::GOOGLE_SEARCH, urlencoding::encode(query))
}

fn search_google(intent: Intent, query: &str) -> CommandResponse {
    CommandResponse::open(intent, format!("Searching Google for {query}"), google_search_url(query))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn interpreter() -> Interpreter {
        let noon = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(15, 7, 0)
            .unwrap();
        Interpreter::new(&AssistantConfig::default())
            .unwrap()
            .with_clock(FixedClock(noon))
    }

    fn run(input: &str) -> CommandResponse {
        let interp = interpreter();
        let mut voice = interp.initial_voice();
        interp.process(&mut voice, input)
    }

    #[test]
    fn blank_topic_cannot_shadow_knowledge() {
        let mut config = AssistantConfig::default();
        config.commands.knowledge.push(Topic {
            topic: String::new(),
            answer: "Everything.".to_string(),
        });
        assert!(matches!(Interpreter::new(&config), Err(Error::Config(_))));
    }

    #[test]
    fn open_youtube() {
        let r = run("open youtube");
        assert_eq!(r.intent, Intent::OpenApp);
        assert_eq!(r.message, "Opening Youtube");
        assert_eq!(r.url(), Some("https://www.youtube.com"));
    }

    #[test]
    fn search_encodes_query() {
        let r = run("search for rust programming");
        assert_eq!(r.intent, Intent::WebSearch);
        assert_eq!(r.message, "Searching Google for rust programming");
        assert_eq!(
            r.url(),
            Some("https://www.google.com/search?q=rust%20programming")
        );
    }

    #[test]
    fn bare_search_opens_google() {
        let r = run("search");
        assert_eq!(r.message, "Opening Google");
        assert_eq!(r.url(), Some("https://www.google.com"));
    }

    #[test]
    fn play_on_spotify_strips_filler() {
        let r = run("play lofi beats on spotify");
        assert_eq!(r.intent, Intent::MediaPlayback);
        assert_eq!(r.message, "Playing \"lofi beats\" on Spotify");
        assert_eq!(r.url(), Some("https://open.spotify.com/search/lofi%20beats"));
    }

    #[test]
    fn generic_music_request_opens_spotify_home() {
        for input in ["play music", "play this song", "listen to a song", "play ab music"] {
            let r = run(input);
            assert_eq!(r.intent, Intent::MediaPlayback, "{input}");
            assert_eq!(r.message, "Opening Spotify for you", "{input}");
            assert_eq!(r.url(), Some("https://open.spotify.com"), "{input}");
        }
    }

    #[test]
    fn knowledge_exact_topic() {
        let r = run("What is yoga?");
        assert_eq!(r.intent, Intent::KnowledgeQuery);
        assert!(r.message.starts_with("Yoga is a group of physical"));
        assert!(r.action.is_none());
    }

    #[test]
    fn knowledge_partial_topic() {
        let r = run("tell me about energy");
        assert!(r.message.starts_with("Renewable energy comes from"));
        let r = run("explain the basics of climate change");
        assert!(r.message.starts_with("Climate change refers to"));
    }

    #[test]
    fn unknown_topic_offers_search_with_action() {
        let r = run("what is quantum chromodynamics");
        assert_eq!(r.intent, Intent::KnowledgeQuery);
        assert!(r
            .message
            .starts_with("I don't have specific information about quantum chromodynamics"));
        assert_eq!(
            r.url(),
            Some("https://www.google.com/search?q=quantum%20chromodynamics")
        );
    }

    #[test]
    fn unknown_topic_search_can_be_disabled() {
        let mut config = AssistantConfig::default();
        config.commands.search_unknown_topics = false;
        let interp = Interpreter::new(&config).unwrap();
        let mut voice = interp.initial_voice();
        let r = interp.process(&mut voice, "what is quantum chromodynamics");
        assert!(r.action.is_none());
    }

    #[test]
    fn empty_question_asks_for_topic() {
        let r = run("explain");
        assert_eq!(r.message, EMPTY_QUESTION_MESSAGE);
        assert!(r.action.is_none());
    }

    #[test]
    fn identity_questions_get_canned_answer() {
        for input in [
            "who gave you your name",
            "what is your name",
            "who made you",
            "why are you called literal",
        ] {
            let r = run(input);
            assert_eq!(r.intent, Intent::KnowledgeQuery, "{input}");
            assert!(r.message.starts_with("My name is Literal"), "{input}");
        }
    }

    #[test]
    fn accent_change_updates_context() {
        let interp = interpreter();
        let mut voice = interp.initial_voice();
        assert_eq!(voice.lang(), "en-US");

        let r = interp.process(&mut voice, "change voice to british");
        assert_eq!(r.intent, Intent::AccentChange);
        assert_eq!(r.message, "Voice accent changed to British. How does this sound?");
        assert_eq!(voice.lang(), "en-GB");

        // Sticks across unrelated commands.
        interp.process(&mut voice, "open github");
        assert_eq!(voice.current().name, "British");

        interp.process(&mut voice, "Change your accent to JAPANESE");
        assert_eq!(voice.lang(), "ja-JP");
    }

    #[test]
    fn unknown_accent_lists_options() {
        let interp = interpreter();
        let mut voice = interp.initial_voice();
        let r = interp.process(&mut voice, "change the voice to klingon");
        assert!(r.message.starts_with("I couldn't find the klingon accent."));
        assert!(r.message.contains("Default, British, Australian"));
        assert_eq!(voice.lang(), "en-US");
    }

    #[test]
    fn shortcut_beats_generic_open() {
        let r = run("open fit buddy");
        assert_eq!(r.intent, Intent::Shortcut);
        assert_eq!(r.message, "Opening FitBuddy");
        assert_eq!(r.url(), Some("https://fit-buddy-ai.vercel.app/"));
    }

    #[test]
    fn greeting_is_from_fixed_list() {
        let greetings = catalog::default_greetings();
        for _ in 0..10 {
            let r = run("hey there");
            assert_eq!(r.intent, Intent::Greeting);
            assert!(greetings.contains(&r.message));
        }
    }

    #[test]
    fn youtube_playback() {
        let r = run("play cat videos on youtube");
        assert_eq!(r.intent, Intent::VideoPlayback);
        assert_eq!(r.message, "Playing cat videos on YouTube");
        assert_eq!(
            r.url(),
            Some("https://www.youtube.com/results?search_query=cat%20videos")
        );

        let r = run("play a video");
        assert_eq!(r.message, "Opening YouTube");
        assert_eq!(r.url(), Some("https://www.youtube.com"));
    }

    #[test]
    fn time_and_date_use_fixed_format() {
        assert_eq!(run("time please").message, "The current time is 3:07 PM");
        assert_eq!(run("date today").message, "Today is Tuesday, March 5, 2024");
    }

    #[test]
    fn canned_replies() {
        assert_eq!(run("weather forecast").message, WEATHER_MESSAGE);
        assert_eq!(run("thanks a lot").message, THANKS_MESSAGE);
        assert_eq!(run("ok bye").message, GOODBYE_MESSAGE);
        assert_eq!(run("see you later").intent, Intent::Goodbye);
    }

    #[test]
    fn cascade_order_resolves_ambiguity() {
        // Lead word wins over the time keyword.
        assert_eq!(run("what time is it").intent, Intent::KnowledgeQuery);
        // App-open wins over search when a known app is named.
        let r = run("open google");
        assert_eq!(r.intent, Intent::OpenApp);
        assert_eq!(r.message, "Opening Google");
        // Music playback wins over YouTube playback.
        assert_eq!(run("play music on youtube").intent, Intent::MediaPlayback);
        // Greeting wins over open.
        assert_eq!(run("hey open reddit").intent, Intent::Greeting);
        // Accent change wins over everything.
        assert_eq!(run("what if I change voice to french").intent, Intent::AccentChange);
        // Open with no known app falls through to search.
        assert_eq!(run("open search for pizza").intent, Intent::WebSearch);
    }

    #[test]
    fn garbage_and_empty_input_fall_back() {
        for input in ["asdkj qweoiu", "", "   ", "!!!", "12345", "日本語"] {
            let r = run(input);
            assert_eq!(r.intent, Intent::Fallback, "{input:?}");
            assert_eq!(r.message, FALLBACK_MESSAGE);
            assert!(r.action.is_none());
        }
    }

    #[test]
    fn same_input_same_branch() {
        let interp = interpreter();
        let mut voice = interp.initial_voice();
        for input in ["hello", "time", "open netflix", "what is blockchain", "xyz"] {
            let a = interp.process(&mut voice, input);
            let b = interp.process(&mut voice, input);
            assert_eq!(a.intent, b.intent, "{input}");
        }
    }

    #[test]
    fn messages_never_empty() {
        let interp = interpreter();
        let mut voice = interp.initial_voice();
        for input in [
            "open",
            "play",
            "search google",
            "change voice to",
            "define",
            "meaning of",
            "play youtube",
        ] {
            let r = interp.process(&mut voice, input);
            assert!(!r.message.is_empty(), "{input}");
        }
    }
}
