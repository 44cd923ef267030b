//! Async driver for the wake detector.
//! One tokio task owns the live session handle and the pending timer,
//! feeds provider callbacks into the detector and executes its effects.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::detector::{OpenFailure, TimerId, WakeDetector, WakeEffect, WakeInput, WakeState};
use crate::cancellation::Generation;
use crate::config::AssistantConfig;
use crate::speech::{RecognitionEvent, RecognitionSession, RecognitionSink, SpeechRecognizer};
use crate::{Error, Result};

enum Command {
    Start(oneshot::Sender<()>),
    Stop(oneshot::Sender<()>),
}

/// Handle to a running wake listener task.
pub struct WakeListener {
    commands: mpsc::UnboundedSender<Command>,
    state_rx: watch::Receiver<WakeState>,
    detected_rx: watch::Receiver<bool>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WakeListener {
    /// Spawn the listener task in the idle state. Must be called inside a
    /// tokio runtime.
    pub fn spawn(
        config: &AssistantConfig,
        recognizer: Arc<dyn SpeechRecognizer>,
        ids: Generation,
    ) -> Result<Self> {
        let detector = WakeDetector::new(config, ids)?;
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WakeState::Idle);
        let (detected_tx, detected_rx) = watch::channel(false);
        let shutdown = CancellationToken::new();

        let driver = Driver {
            detector,
            recognizer,
            session: None,
            timer: None,
            events_tx,
            state_tx,
            detected_tx,
        };
        let task = tokio::spawn(driver.run(commands_rx, events_rx, shutdown.clone()));
        info!("wake_listener_spawned");

        Ok(Self {
            commands,
            state_rx,
            detected_rx,
            shutdown,
            task: Some(task),
        })
    }

    /// Begin listening. Resolves once the request has been applied.
    pub async fn start(&self) -> Result<()> {
        self.request(Command::Start).await
    }

    /// Stop listening. On return the session is released and the
    /// detected pulse is low.
    pub async fn stop(&self) -> Result<()> {
        self.request(Command::Stop).await
    }

    async fn request(&self, make: fn(oneshot::Sender<()>) -> Command) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| Error::ChannelClosed("wake listener"))?;
        rx.await.map_err(|_| Error::ChannelClosed("wake listener"))
    }

    pub fn state(&self) -> WakeState {
        *self.state_rx.borrow()
    }

    pub fn is_detected(&self) -> bool {
        *self.detected_rx.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WakeState> {
        self.state_rx.clone()
    }

    /// Pulse that goes high on a wake phrase and low after the cooldown
    /// (or on stop).
    pub fn subscribe_detected(&self) -> watch::Receiver<bool> {
        self.detected_rx.clone()
    }

    /// Stop the task and wait for it to release its session.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "wake listener task failed");
            }
        }
    }
}

impl Drop for WakeListener {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

enum Next {
    Command(Command),
    Event(RecognitionEvent),
    Timer(TimerId),
    Shutdown,
}

struct Driver {
    detector: WakeDetector,
    recognizer: Arc<dyn SpeechRecognizer>,
    session: Option<Box<dyn RecognitionSession>>,
    timer: Option<(TimerId, Pin<Box<Sleep>>)>,
    events_tx: mpsc::UnboundedSender<RecognitionEvent>,
    state_tx: watch::Sender<WakeState>,
    detected_tx: watch::Sender<bool>,
}

impl Driver {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<RecognitionEvent>,
        shutdown: CancellationToken,
    ) {
        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => Next::Shutdown,
                cmd = commands.recv() => cmd.map_or(Next::Shutdown, Next::Command),
                Some(event) = events.recv() => Next::Event(event),
                timer = wait_timer(&mut self.timer) => Next::Timer(timer),
            };

            match next {
                Next::Command(Command::Start(ack)) => {
                    self.apply(WakeInput::Start);
                    let _ = ack.send(());
                }
                Next::Command(Command::Stop(ack)) => {
                    self.apply(WakeInput::Stop);
                    let _ = ack.send(());
                }
                Next::Event(event) => self.apply(WakeInput::Recognition(event)),
                Next::Timer(timer) => {
                    self.timer = None;
                    self.apply(WakeInput::TimerFired(timer));
                }
                Next::Shutdown => break,
            }
        }

        self.apply(WakeInput::Stop);
        info!("wake_listener_stopped");
    }

    /// Run `input` and every follow-up input its effects produce.
    fn apply(&mut self, input: WakeInput) {
        let mut queue = VecDeque::from([input]);
        while let Some(input) = queue.pop_front() {
            for effect in self.detector.handle(input) {
                if let Some(follow_up) = self.execute(effect) {
                    queue.push_back(follow_up);
                }
            }
        }

        let state = self.detector.state();
        self.state_tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            *current = state;
            true
        });
    }

    fn execute(&mut self, effect: WakeEffect) -> Option<WakeInput> {
        match effect {
            WakeEffect::OpenSession { session, config } => {
                // Release any leftover handle before asking for a new one.
                self.session = None;
                let sink = RecognitionSink::new(session, self.events_tx.clone());
                match self.recognizer.start_session(session, config, sink) {
                    Ok(handle) => {
                        debug!(session, "wake_session_opened");
                        self.session = Some(handle);
                        None
                    }
                    Err(e) => {
                        let failure = match e {
                            Error::Unsupported(_) => OpenFailure::Unsupported,
                            Error::RecognizerBusy(_) => OpenFailure::Busy,
                            other => OpenFailure::Other(other.to_string()),
                        };
                        Some(WakeInput::SessionOpenFailed { session, failure })
                    }
                }
            }
            WakeEffect::StopSession => {
                if let Some(mut handle) = self.session.take() {
                    handle.stop();
                }
                None
            }
            WakeEffect::AbortSession => {
                if let Some(mut handle) = self.session.take() {
                    handle.abort();
                }
                None
            }
            WakeEffect::ReleaseSession => {
                self.session = None;
                None
            }
            WakeEffect::ScheduleTimer { timer, after } => {
                self.timer = Some((timer, Box::pin(tokio::time::sleep(after))));
                None
            }
            WakeEffect::CancelTimer => {
                self.timer = None;
                None
            }
            WakeEffect::Detected(detected) => {
                self.detected_tx.send_replace(detected);
                None
            }
        }
    }
}

async fn wait_timer(timer: &mut Option<(TimerId, Pin<Box<Sleep>>)>) -> TimerId {
    match timer {
        Some((id, sleep)) => {
            sleep.as_mut().await;
            *id
        }
        None => std::future::pending().await,
    }
}
