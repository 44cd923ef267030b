//! Wake detector transition core.
//!
//! Pure state machine: every input produces a list of effects for the driver
//! to execute. Session and timer ids make late callbacks harmless: an input
//! tagged with an id the detector no longer owns is dropped.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::phrase::WakePhraseSet;
use crate::cancellation::{Generation, GenerationGuard};
use crate::config::AssistantConfig;
use crate::speech::{
    RecognitionConfig, RecognitionErrorKind, RecognitionEvent, RecognitionEventKind, SessionId,
};
use crate::text;
use crate::Result;

pub type TimerId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FatalReason {
    /// Microphone or recognition service permission refused.
    PermissionDenied,
    /// No speech recognition on this platform.
    Unsupported,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WakeState {
    Idle,
    /// Session requested, waiting for its started callback.
    Starting,
    Listening,
    /// Wake phrase heard; `detected` is high until the cooldown expires.
    CoolingDown,
    /// Session failed or ended; a restart timer is pending.
    RetryScheduled,
    /// Detection disabled until `start` is called again.
    Fatal(FatalReason),
}

impl std::fmt::Display for WakeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WakeState::Idle => write!(f, "Idle"),
            WakeState::Starting => write!(f, "Starting"),
            WakeState::Listening => write!(f, "Listening"),
            WakeState::CoolingDown => write!(f, "CoolingDown"),
            WakeState::RetryScheduled => write!(f, "RetryScheduled"),
            WakeState::Fatal(reason) => write!(f, "Fatal({reason:?})"),
        }
    }
}

/// Why the provider refused to open a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenFailure {
    Unsupported,
    /// Another owner holds the recognizer.
    Busy,
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeInput {
    Start,
    Stop,
    SessionOpenFailed {
        session: SessionId,
        failure: OpenFailure,
    },
    Recognition(RecognitionEvent),
    TimerFired(TimerId),
}

/// Work for the driver. Every `*Session` effect also drops the handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeEffect {
    OpenSession {
        session: SessionId,
        config: RecognitionConfig,
    },
    /// Graceful stop of the live session.
    StopSession,
    /// Immediate stop of the live session.
    AbortSession,
    /// Session already finished on its own; just let go of the handle.
    ReleaseSession,
    ScheduleTimer {
        timer: TimerId,
        after: Duration,
    },
    CancelTimer,
    /// New value of the detected pulse.
    Detected(bool),
}

pub struct WakeDetector {
    state: WakeState,
    phrases: WakePhraseSet,
    locale: String,
    cooldown: Duration,
    error_backoff: Duration,
    end_restart: Duration,
    ids: Generation,
    session: GenerationGuard,
    timer: GenerationGuard,
    next_timer: TimerId,
    /// Tail of the finalized fragments of the live session, at most
    /// `tail_chars` long.
    finals: String,
    tail_chars: usize,
    /// Latest interim hypothesis, replaced on every update.
    interim: String,
    detected: bool,
}

impl WakeDetector {
    pub fn new(config: &AssistantConfig, ids: Generation) -> Result<Self> {
        let phrases = WakePhraseSet::new(&config.wake)?;
        Ok(Self {
            state: WakeState::Idle,
            tail_chars: phrases.window(),
            phrases,
            locale: config.locale.clone(),
            cooldown: config.wake.cooldown(),
            error_backoff: config.wake.error_backoff(),
            end_restart: config.wake.end_restart(),
            ids,
            session: GenerationGuard::new(),
            timer: GenerationGuard::new(),
            next_timer: 0,
            finals: String::new(),
            interim: String::new(),
            detected: false,
        })
    }

    pub fn state(&self) -> WakeState {
        self.state
    }

    pub fn is_detected(&self) -> bool {
        self.detected
    }

    /// Session id the detector currently owns.
    pub fn session(&self) -> Option<SessionId> {
        self.session.live()
    }

    pub fn handle(&mut self, input: WakeInput) -> Vec<WakeEffect> {
        let mut fx = Vec::new();
        match input {
            WakeInput::Start => match self.state {
                WakeState::Idle | WakeState::Fatal(_) => self.begin_session(&mut fx),
                other => debug!(state = %other, "wake_start_ignored"),
            },
            WakeInput::Stop => self.stop(&mut fx),
            WakeInput::SessionOpenFailed { session, failure } => {
                if !self.session.is_current(session) {
                    debug!(session, "stale_open_failure");
                } else {
                    self.session.disarm();
                    match failure {
                        OpenFailure::Unsupported => {
                            warn!("speech recognition unsupported, wake detection disabled");
                            self.set_state(WakeState::Fatal(FatalReason::Unsupported));
                        }
                        OpenFailure::Busy => {
                            debug!(session, "recognizer busy, retrying");
                            self.schedule_retry(self.error_backoff, &mut fx);
                        }
                        OpenFailure::Other(reason) => {
                            warn!(session, reason = %reason, "wake session failed to open");
                            self.schedule_retry(self.error_backoff, &mut fx);
                        }
                    }
                }
            }
            WakeInput::Recognition(event) => {
                if !self.session.is_current(event.session) {
                    debug!(session = event.session, "stale_recognition_event");
                } else {
                    self.on_recognition(event.kind, &mut fx);
                }
            }
            WakeInput::TimerFired(timer) => {
                if !self.timer.is_current(timer) {
                    debug!(timer, "stale_timer");
                } else {
                    self.timer.disarm();
                    match self.state {
                        WakeState::CoolingDown => {
                            self.detected = false;
                            fx.push(WakeEffect::Detected(false));
                            self.begin_session(&mut fx);
                        }
                        WakeState::RetryScheduled => self.begin_session(&mut fx),
                        _ => {}
                    }
                }
            }
        }
        fx
    }

    fn on_recognition(&mut self, kind: RecognitionEventKind, fx: &mut Vec<WakeEffect>) {
        match kind {
            RecognitionEventKind::Started => {
                if self.state == WakeState::Starting {
                    self.set_state(WakeState::Listening);
                }
            }
            RecognitionEventKind::Result { text, is_final } => {
                if self.state != WakeState::Listening {
                    return;
                }
                if is_final {
                    self.finals.push_str(&text);
                    text::keep_tail(&mut self.finals, self.tail_chars);
                    self.interim.clear();
                } else {
                    self.interim = text;
                }
                let heard = format!("{}{}", self.finals, self.interim);
                if self.phrases.matches(&heard) {
                    info!(heard = %heard.trim(), "wake_phrase_detected");
                    self.session.disarm();
                    self.clear_transcript();
                    self.detected = true;
                    fx.push(WakeEffect::Detected(true));
                    fx.push(WakeEffect::StopSession);
                    self.set_state(WakeState::CoolingDown);
                    self.schedule(self.cooldown, fx);
                }
            }
            RecognitionEventKind::Error(RecognitionErrorKind::Aborted) => {
                debug!("wake session aborted");
            }
            RecognitionEventKind::Error(kind) if kind.is_permission_denied() => {
                warn!(error = %kind, "microphone permission denied, wake detection disabled");
                self.session.disarm();
                fx.push(WakeEffect::ReleaseSession);
                self.set_state(WakeState::Fatal(FatalReason::PermissionDenied));
            }
            RecognitionEventKind::Error(kind) => {
                warn!(error = %kind, "wake session error");
                self.session.disarm();
                fx.push(WakeEffect::ReleaseSession);
                self.schedule_retry(self.error_backoff, fx);
            }
            RecognitionEventKind::Ended => {
                if matches!(self.state, WakeState::Starting | WakeState::Listening) {
                    debug!("wake session ended, restarting");
                    self.session.disarm();
                    fx.push(WakeEffect::ReleaseSession);
                    self.schedule_retry(self.end_restart, fx);
                }
            }
        }
    }

    fn begin_session(&mut self, fx: &mut Vec<WakeEffect>) {
        let session = self.ids.advance();
        self.session.arm(session);
        self.clear_transcript();
        self.set_state(WakeState::Starting);
        fx.push(WakeEffect::OpenSession {
            session,
            config: RecognitionConfig::wake(&self.locale),
        });
    }

    fn stop(&mut self, fx: &mut Vec<WakeEffect>) {
        if self.timer.disarm().is_some() {
            fx.push(WakeEffect::CancelTimer);
        }
        if self.session.disarm().is_some() {
            fx.push(WakeEffect::AbortSession);
        }
        if self.detected {
            self.detected = false;
            fx.push(WakeEffect::Detected(false));
        }
        self.clear_transcript();
        self.set_state(WakeState::Idle);
    }

    fn schedule_retry(&mut self, after: Duration, fx: &mut Vec<WakeEffect>) {
        self.set_state(WakeState::RetryScheduled);
        self.schedule(after, fx);
    }

    /// At most one timer is ever pending.
    fn schedule(&mut self, after: Duration, fx: &mut Vec<WakeEffect>) {
        if let Some(pending) = self.timer.live() {
            debug!(pending, "timer_already_pending");
            return;
        }
        self.next_timer += 1;
        let timer = self.next_timer;
        self.timer.arm(timer);
        fx.push(WakeEffect::ScheduleTimer { timer, after });
    }

    fn clear_transcript(&mut self) {
        self.finals.clear();
        self.interim.clear();
    }

    fn set_state(&mut self, next: WakeState) {
        if self.state != next {
            info!(from = %self.state, to = %next, "wake_state_transition");
            self.state = next;
        }
    }
}
