//! Speech capability providers.
//! Recognition and synthesis are black boxes reached through start/stop
//! calls and asynchronous callbacks; nothing here blocks on them.

pub mod console;
pub mod recognition;
pub mod synthesis;

pub use console::{ConsoleRecognizer, ConsoleSynthesizer};
pub use recognition::{
    ExclusiveRecognizer, RecognitionConfig, RecognitionErrorKind, RecognitionEvent,
    RecognitionEventKind, RecognitionSession, RecognitionSink, SessionId, SpeechRecognizer,
    UnsupportedRecognizer,
};
pub use synthesis::{
    SpeechEvent, SpeechEventKind, SpeechSettings, SpeechSink, SpeechSynthesizer, Utterance,
    UtteranceId, UnsupportedSynthesizer,
};
