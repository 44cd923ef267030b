//! Shared test utilities: scripted speech providers and a recording action runner.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use literal::command::ActionRunner;
use literal::speech::{
    RecognitionConfig, RecognitionErrorKind, RecognitionSession, RecognitionSink, SessionId,
    SpeechRecognizer, SpeechSink, SpeechSynthesizer, Utterance,
};
use literal::{Error, Result};

/// Ordered record of what the assistant did, shared by all fakes.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// A session the scripted recognizer has opened.
#[derive(Clone)]
pub struct Opened {
    pub id: SessionId,
    pub config: RecognitionConfig,
    pub sink: RecognitionSink,
    pub stopped: bool,
    pub aborted: bool,
}

/// Recognizer whose sessions only do what the test tells them to.
/// `start_session` reports `started` unless `auto_start` is off.
#[derive(Clone)]
pub struct ScriptedRecognizer {
    sessions: Arc<Mutex<Vec<Opened>>>,
    auto_start: Arc<Mutex<bool>>,
}

impl Default for ScriptedRecognizer {
    fn default() -> Self {
        Self {
            sessions: Arc::default(),
            auto_start: Arc::new(Mutex::new(true)),
        }
    }
}

impl ScriptedRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_auto_start(&self, on: bool) {
        *self.auto_start.lock() = on;
    }

    pub fn opened(&self) -> Vec<Opened> {
        self.sessions.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn last(&self) -> Opened {
        self.sessions
            .lock()
            .last()
            .cloned()
            .expect("no session opened")
    }

    /// Sessions neither stopped nor aborted.
    pub fn open_sessions(&self) -> Vec<SessionId> {
        self.sessions
            .lock()
            .iter()
            .filter(|s| !s.stopped && !s.aborted)
            .map(|s| s.id)
            .collect()
    }

    pub fn started(&self, id: SessionId) {
        self.sink(id).started();
    }

    pub fn say(&self, id: SessionId, text: &str, is_final: bool) {
        self.sink(id).result(text, is_final);
    }

    pub fn fail(&self, id: SessionId, kind: RecognitionErrorKind) {
        self.sink(id).error(kind);
    }

    pub fn end(&self, id: SessionId) {
        self.sink(id).ended();
    }

    fn sink(&self, id: SessionId) -> RecognitionSink {
        self.sessions
            .lock()
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.sink.clone())
            .expect("unknown session")
    }

    fn mark(&self, id: SessionId, f: impl FnOnce(&mut Opened)) {
        if let Some(session) = self.sessions.lock().iter_mut().find(|s| s.id == id) {
            f(session);
        }
    }
}

impl SpeechRecognizer for ScriptedRecognizer {
    fn start_session(
        &self,
        id: SessionId,
        config: RecognitionConfig,
        sink: RecognitionSink,
    ) -> Result<Box<dyn RecognitionSession>> {
        if *self.auto_start.lock() {
            sink.started();
        }
        self.sessions.lock().push(Opened {
            id,
            config,
            sink,
            stopped: false,
            aborted: false,
        });
        Ok(Box::new(ScriptedSession {
            id,
            recognizer: self.clone(),
        }))
    }
}

struct ScriptedSession {
    id: SessionId,
    recognizer: ScriptedRecognizer,
}

impl RecognitionSession for ScriptedSession {
    fn stop(&mut self) {
        self.recognizer.mark(self.id, |s| s.stopped = true);
    }

    fn abort(&mut self) {
        self.recognizer.mark(self.id, |s| s.aborted = true);
    }
}

/// Synthesizer that logs `speak:<lang>:<text>` and completes at once.
#[derive(Clone)]
pub struct RecordingSynthesizer {
    log: Log,
    utterances: Arc<Mutex<Vec<Utterance>>>,
}

impl RecordingSynthesizer {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            utterances: Arc::default(),
        }
    }

    pub fn utterances(&self) -> Vec<Utterance> {
        self.utterances.lock().clone()
    }
}

impl SpeechSynthesizer for RecordingSynthesizer {
    fn speak(&self, utterance: Utterance, sink: SpeechSink) -> Result<()> {
        self.log
            .push(format!("speak:{}:{}", utterance.lang, utterance.text));
        self.utterances.lock().push(utterance);
        sink.started();
        sink.finished();
        Ok(())
    }

    fn cancel_all(&self) {
        self.log.push("cancel_speech".to_string());
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum OpenMode {
    Succeed,
    Fail,
    Panic,
}

/// Action runner that logs `open:<url>`. The failing and panicking
/// variants log first, then misbehave.
#[derive(Clone)]
pub struct RecordingOpener {
    log: Log,
    mode: OpenMode,
}

impl RecordingOpener {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            mode: OpenMode::Succeed,
        }
    }

    pub fn failing(log: Log) -> Self {
        Self {
            log,
            mode: OpenMode::Fail,
        }
    }

    pub fn panicking(log: Log) -> Self {
        Self {
            log,
            mode: OpenMode::Panic,
        }
    }
}

impl ActionRunner for RecordingOpener {
    fn open_url(&self, url: &str) -> Result<()> {
        self.log.push(format!("open:{url}"));
        match self.mode {
            OpenMode::Succeed => Ok(()),
            OpenMode::Fail => Err(Error::Action(format!("no browser for {url}"))),
            OpenMode::Panic => panic!("browser launcher crashed"),
        }
    }
}

/// Let every task run until it blocks. Time is paused in these tests, so
/// the sleep only completes once the runtime is otherwise idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
