//! Speech-to-text provider interface.
//! Providers are cooperative: `start_session` returns immediately and the
//! session reports back through its `RecognitionSink`.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{Error, Result};

pub type SessionId = u64;

/// Session parameters handed to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionConfig {
    /// Keep recognizing after the first final result.
    pub continuous: bool,
    /// Deliver partial hypotheses as they change.
    pub interim_results: bool,
    /// BCP-47 locale, e.g. `en-US`.
    pub locale: String,
}

impl RecognitionConfig {
    /// Long-running config used for wake phrase spotting.
    pub fn wake(locale: &str) -> Self {
        Self {
            continuous: true,
            interim_results: true,
            locale: locale.to_string(),
        }
    }

    /// One-shot config used to capture a single command.
    pub fn command(locale: &str) -> Self {
        Self {
            continuous: false,
            interim_results: false,
            locale: locale.to_string(),
        }
    }
}

/// Error kinds reported by a recognition session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionErrorKind {
    /// Microphone permission denied by the user or platform.
    NotAllowed,
    /// Recognition service refused the request.
    ServiceNotAllowed,
    /// Session was aborted by its owner.
    Aborted,
    NoSpeech,
    Network,
    AudioCapture,
    Other(String),
}

impl RecognitionErrorKind {
    /// Parse a platform error code (`not-allowed`, `network`, ...).
    pub fn from_code(code: &str) -> Self {
        match code {
            "not-allowed" => Self::NotAllowed,
            "service-not-allowed" => Self::ServiceNotAllowed,
            "aborted" => Self::Aborted,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "audio-capture" => Self::AudioCapture,
            other => Self::Other(other.to_string()),
        }
    }

    /// Speech capture is unavailable until the user intervenes.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::NotAllowed | Self::ServiceNotAllowed)
    }
}

impl std::fmt::Display for RecognitionErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAllowed => write!(f, "not-allowed"),
            Self::ServiceNotAllowed => write!(f, "service-not-allowed"),
            Self::Aborted => write!(f, "aborted"),
            Self::NoSpeech => write!(f, "no-speech"),
            Self::Network => write!(f, "network"),
            Self::AudioCapture => write!(f, "audio-capture"),
            Self::Other(code) => write!(f, "{code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEventKind {
    Started,
    Result { text: String, is_final: bool },
    Error(RecognitionErrorKind),
    Ended,
}

/// A provider callback, tagged with the session it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEvent {
    pub session: SessionId,
    pub kind: RecognitionEventKind,
}

/// Callback handle given to a provider for one session.
#[derive(Debug, Clone)]
pub struct RecognitionSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<RecognitionEvent>,
}

impl RecognitionSink {
    pub fn new(session: SessionId, tx: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self { session, tx }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn started(&self) {
        self.emit(RecognitionEventKind::Started);
    }

    pub fn result(&self, text: impl Into<String>, is_final: bool) {
        self.emit(RecognitionEventKind::Result {
            text: text.into(),
            is_final,
        });
    }

    pub fn error(&self, kind: RecognitionErrorKind) {
        self.emit(RecognitionEventKind::Error(kind));
    }

    pub fn ended(&self) {
        self.emit(RecognitionEventKind::Ended);
    }

    fn emit(&self, kind: RecognitionEventKind) {
        // Owner gone means nobody cares about this session any more.
        let _ = self.tx.send(RecognitionEvent {
            session: self.session,
            kind,
        });
    }
}

/// A live recognition session.
pub trait RecognitionSession: Send {
    /// Stop listening and deliver any pending final result.
    fn stop(&mut self);
    /// Stop immediately; no trailing result is delivered.
    fn abort(&mut self);
}

/// Speech-to-text capability provider.
pub trait SpeechRecognizer: Send + Sync {
    fn start_session(
        &self,
        id: SessionId,
        config: RecognitionConfig,
        sink: RecognitionSink,
    ) -> Result<Box<dyn RecognitionSession>>;
}

/// Provider for platforms without speech recognition.
pub struct UnsupportedRecognizer;

impl SpeechRecognizer for UnsupportedRecognizer {
    fn start_session(
        &self,
        _id: SessionId,
        _config: RecognitionConfig,
        _sink: RecognitionSink,
    ) -> Result<Box<dyn RecognitionSession>> {
        Err(Error::Unsupported("speech recognition"))
    }
}

/// Wraps a provider so that at most one session is live process-wide.
///
/// The live session holds a lease; dropping its handle releases the gate.
/// A start while the gate is held is rejected with `RecognizerBusy`.
pub struct ExclusiveRecognizer<R> {
    inner: R,
    live: Arc<Mutex<Option<SessionId>>>,
}

impl<R: SpeechRecognizer> ExclusiveRecognizer<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            live: Arc::new(Mutex::new(None)),
        }
    }

    /// Session currently holding the gate, if any.
    pub fn live_session(&self) -> Option<SessionId> {
        *self.live.lock()
    }
}

impl<R: SpeechRecognizer> SpeechRecognizer for ExclusiveRecognizer<R> {
    fn start_session(
        &self,
        id: SessionId,
        config: RecognitionConfig,
        sink: RecognitionSink,
    ) -> Result<Box<dyn RecognitionSession>> {
        let mut live = self.live.lock();
        if let Some(holder) = *live {
            warn!(requested = id, holder, "recognition_start_rejected");
            return Err(Error::RecognizerBusy(holder));
        }
        let session = self.inner.start_session(id, config, sink)?;
        *live = Some(id);
        debug!(session = id, "recognition_gate_acquired");
        Ok(Box::new(LeasedSession {
            id,
            inner: session,
            live: Arc::clone(&self.live),
        }))
    }
}

/// Session handle that releases the gate when dropped.
struct LeasedSession {
    id: SessionId,
    inner: Box<dyn RecognitionSession>,
    live: Arc<Mutex<Option<SessionId>>>,
}

impl RecognitionSession for LeasedSession {
    fn stop(&mut self) {
        self.inner.stop();
    }

    fn abort(&mut self) {
        self.inner.abort();
    }
}

impl Drop for LeasedSession {
    fn drop(&mut self) {
        let mut live = self.live.lock();
        if *live == Some(self.id) {
            *live = None;
            debug!(session = self.id, "recognition_gate_released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullSession;

    impl RecognitionSession for NullSession {
        fn stop(&mut self) {}
        fn abort(&mut self) {}
    }

    struct NullRecognizer;

    impl SpeechRecognizer for NullRecognizer {
        fn start_session(
            &self,
            _id: SessionId,
            _config: RecognitionConfig,
            _sink: RecognitionSink,
        ) -> Result<Box<dyn RecognitionSession>> {
            Ok(Box::new(NullSession))
        }
    }

    fn sink(id: SessionId) -> RecognitionSink {
        let (tx, _rx) = mpsc::unbounded_channel();
        RecognitionSink::new(id, tx)
    }

    #[test]
    fn second_session_rejected_until_first_dropped() {
        let gate = ExclusiveRecognizer::new(NullRecognizer);
        let first = gate
            .start_session(1, RecognitionConfig::wake("en-US"), sink(1))
            .unwrap();
        assert_eq!(gate.live_session(), Some(1));

        let err = gate
            .start_session(2, RecognitionConfig::command("en-US"), sink(2))
            .err()
            .unwrap();
        assert!(matches!(err, Error::RecognizerBusy(1)));

        drop(first);
        assert_eq!(gate.live_session(), None);
        assert!(gate
            .start_session(3, RecognitionConfig::command("en-US"), sink(3))
            .is_ok());
    }

    #[test]
    fn unsupported_provider_reports_unsupported() {
        let gate = ExclusiveRecognizer::new(UnsupportedRecognizer);
        let err = gate
            .start_session(1, RecognitionConfig::wake("en-US"), sink(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Unsupported(_)));
        assert_eq!(gate.live_session(), None);
    }

    #[test]
    fn error_codes_parse() {
        assert!(RecognitionErrorKind::from_code("not-allowed").is_permission_denied());
        assert!(RecognitionErrorKind::from_code("service-not-allowed").is_permission_denied());
        assert_eq!(
            RecognitionErrorKind::from_code("network"),
            RecognitionErrorKind::Network
        );
        assert_eq!(
            RecognitionErrorKind::from_code("bad-grammar"),
            RecognitionErrorKind::Other("bad-grammar".into())
        );
    }
}
