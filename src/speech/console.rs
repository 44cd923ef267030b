//! Terminal-backed providers used by the `literal` binary.
//! Lines typed on stdin stand in for recognized speech; spoken responses
//! are printed to stdout.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::recognition::{
    RecognitionConfig, RecognitionErrorKind, RecognitionSession, RecognitionSink, SessionId,
    SpeechRecognizer,
};
use super::synthesis::{SpeechSink, SpeechSynthesizer, Utterance};
use crate::Result;

struct ActiveSession {
    sink: RecognitionSink,
    continuous: bool,
}

/// Recognizer fed by [`ConsoleRecognizer::feed`].
#[derive(Clone, Default)]
pub struct ConsoleRecognizer {
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl ConsoleRecognizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver a typed line as a final result. Returns false when no
    /// session is listening and the line was dropped.
    pub fn feed(&self, line: &str) -> bool {
        let mut active = self.active.lock();
        let Some(session) = active.as_ref() else {
            debug!(line, "console_line_dropped");
            return false;
        };
        session.sink.result(line, true);
        if !session.continuous {
            session.sink.ended();
            *active = None;
        }
        true
    }

    pub fn is_listening(&self) -> bool {
        self.active.lock().is_some()
    }
}

impl SpeechRecognizer for ConsoleRecognizer {
    fn start_session(
        &self,
        id: SessionId,
        config: RecognitionConfig,
        sink: RecognitionSink,
    ) -> Result<Box<dyn RecognitionSession>> {
        sink.started();
        *self.active.lock() = Some(ActiveSession {
            sink,
            continuous: config.continuous,
        });
        debug!(session = id, continuous = config.continuous, "console_session_started");
        Ok(Box::new(ConsoleSession {
            id,
            active: Arc::clone(&self.active),
        }))
    }
}

struct ConsoleSession {
    id: SessionId,
    active: Arc<Mutex<Option<ActiveSession>>>,
}

impl ConsoleSession {
    /// Detach this session from the console if it is still the active one.
    fn detach(&self) -> Option<ActiveSession> {
        let mut active = self.active.lock();
        match active.as_ref() {
            Some(session) if session.sink.session() == self.id => active.take(),
            _ => None,
        }
    }
}

impl RecognitionSession for ConsoleSession {
    fn stop(&mut self) {
        if let Some(session) = self.detach() {
            session.sink.ended();
        }
    }

    fn abort(&mut self) {
        if let Some(session) = self.detach() {
            session.sink.error(RecognitionErrorKind::Aborted);
            session.sink.ended();
        }
    }
}

/// Synthesizer that prints each utterance and completes immediately.
pub struct ConsoleSynthesizer {
    speaker: String,
}

impl ConsoleSynthesizer {
    pub fn new(speaker: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
        }
    }
}

impl SpeechSynthesizer for ConsoleSynthesizer {
    fn speak(&self, utterance: Utterance, sink: SpeechSink) -> Result<()> {
        sink.started();
        let mut out = std::io::stdout().lock();
        writeln!(out, "{} [{}]> {}", self.speaker, utterance.lang, utterance.text)?;
        out.flush()?;
        sink.finished();
        Ok(())
    }

    fn cancel_all(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speech::recognition::{RecognitionEvent, RecognitionEventKind};
    use tokio::sync::mpsc;

    fn drain(rx: &mut mpsc::UnboundedReceiver<RecognitionEvent>) -> Vec<RecognitionEventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[test]
    fn one_shot_session_ends_after_first_line() {
        let recognizer = ConsoleRecognizer::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _session = recognizer
            .start_session(7, RecognitionConfig::command("en-US"), RecognitionSink::new(7, tx))
            .unwrap();

        assert!(recognizer.feed("open youtube"));
        assert!(!recognizer.feed("dropped"));
        assert_eq!(
            drain(&mut rx),
            vec![
                RecognitionEventKind::Started,
                RecognitionEventKind::Result {
                    text: "open youtube".into(),
                    is_final: true
                },
                RecognitionEventKind::Ended,
            ]
        );
    }

    #[test]
    fn abort_detaches_continuous_session() {
        let recognizer = ConsoleRecognizer::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut session = recognizer
            .start_session(3, RecognitionConfig::wake("en-US"), RecognitionSink::new(3, tx))
            .unwrap();
        assert!(recognizer.feed("hello"));
        assert!(recognizer.is_listening());

        session.abort();
        assert!(!recognizer.is_listening());
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&RecognitionEventKind::Ended),
            "abort should end the session"
        );
        assert!(events.contains(&RecognitionEventKind::Error(RecognitionErrorKind::Aborted)));
    }
}
