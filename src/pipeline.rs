//! Assistant pipeline: wake → acknowledgement → command capture → interpret
//! → speak → deferred action → idle.
//!
//! A single tokio task reacts to control messages, wake edges, capture
//! callbacks and speech completions. Speech always completes before the
//! response's action runs, because the action is executed from the
//! completion handler.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::cancellation::{Generation, GenerationGuard};
use crate::command::catalog::APOLOGY_MESSAGE;
use crate::command::{Action, ActionRunner, CommandResponse, Intent, Interpreter, VoiceContext, VoiceOption};
use crate::config::AssistantConfig;
use crate::speech::{
    RecognitionConfig, RecognitionErrorKind, RecognitionEvent, RecognitionEventKind,
    RecognitionSession, RecognitionSink, SpeechEvent, SpeechEventKind, SpeechRecognizer,
    SpeechSettings, SpeechSink, SpeechSynthesizer, Utterance,
};
use crate::state_machine::{AssistantState, StateMachine};
use crate::wake::{WakeListener, WakeState};
use crate::{Error, Result};

/// Requests from the UI or console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Microphone button: start capturing a command, or cancel if busy.
    Activate,
    /// Flip wake phrase detection on or off.
    ToggleWake,
    /// Interpret typed text as if it had been spoken.
    Submit(String),
    Shutdown,
}

/// Capability providers. The recognizer should be wrapped in
/// [`ExclusiveRecognizer`](crate::speech::ExclusiveRecognizer) so that the
/// wake listener and command capture never hold the microphone together.
#[derive(Clone)]
pub struct Providers {
    pub recognizer: Arc<dyn SpeechRecognizer>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub actions: Arc<dyn ActionRunner>,
}

/// Handle to the running assistant.
pub struct Assistant {
    controls: mpsc::UnboundedSender<Control>,
    state: Arc<StateMachine>,
    voice_rx: watch::Receiver<VoiceOption>,
    wake_state_rx: watch::Receiver<WakeState>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Assistant {
    /// Spawn the pipeline task. With `wake` set, wake phrase detection
    /// starts immediately.
    pub async fn spawn(config: AssistantConfig, providers: Providers, wake: bool) -> Result<Self> {
        let interpreter = Interpreter::new(&config)?;
        Self::spawn_with(config, interpreter, providers, wake).await
    }

    /// Like [`Assistant::spawn`] with a caller-built interpreter, e.g. one
    /// with its own clock.
    pub async fn spawn_with(
        config: AssistantConfig,
        interpreter: Interpreter,
        providers: Providers,
        wake: bool,
    ) -> Result<Self> {
        let voice = interpreter.initial_voice();
        let ids = Generation::new();
        let listener = WakeListener::spawn(&config, Arc::clone(&providers.recognizer), ids.clone())?;
        if wake {
            listener.start().await?;
        }

        let state = Arc::new(StateMachine::new());
        let (controls, controls_rx) = mpsc::unbounded_channel();
        let (capture_tx, capture_rx) = mpsc::unbounded_channel();
        let (speech_tx, speech_rx) = mpsc::unbounded_channel();
        let (voice_tx, voice_rx) = watch::channel(voice.current().clone());
        let wake_state_rx = listener.subscribe_state();
        let shutdown = CancellationToken::new();

        let pipeline = Pipeline {
            interpreter,
            voice,
            voice_tx,
            state: Arc::clone(&state),
            recognizer: providers.recognizer,
            synthesizer: providers.synthesizer,
            actions: providers.actions,
            wake: listener,
            wake_enabled: wake,
            ids,
            locale: config.locale,
            acknowledgement: config.acknowledgement,
            settings: config.speech,
            capture: None,
            capture_guard: GenerationGuard::new(),
            utterance_guard: GenerationGuard::new(),
            after_speech: None,
            capture_tx,
            speech_tx,
        };
        let task = tokio::spawn(pipeline.run(controls_rx, capture_rx, speech_rx, shutdown.clone()));
        info!(wake, "assistant_started");

        Ok(Self {
            controls,
            state,
            voice_rx,
            wake_state_rx,
            shutdown,
            task: Some(task),
        })
    }

    pub fn send(&self, control: Control) -> Result<()> {
        self.controls
            .send(control)
            .map_err(|_| Error::ChannelClosed("assistant"))
    }

    pub fn activate(&self) -> Result<()> {
        self.send(Control::Activate)
    }

    pub fn toggle_wake(&self) -> Result<()> {
        self.send(Control::ToggleWake)
    }

    pub fn submit(&self, text: impl Into<String>) -> Result<()> {
        self.send(Control::Submit(text.into()))
    }

    pub fn state(&self) -> AssistantState {
        self.state.current()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<AssistantState> {
        self.state.subscribe()
    }

    pub fn wake_state(&self) -> WakeState {
        *self.wake_state_rx.borrow()
    }

    pub fn current_voice(&self) -> VoiceOption {
        self.voice_rx.borrow().clone()
    }

    /// Stop the pipeline and the wake listener.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "assistant task failed");
            }
        }
    }

    /// Resolves when the pipeline task has exited. Cancel safe.
    pub async fn closed(&mut self) {
        let Some(task) = self.task.as_mut() else {
            return;
        };
        if let Err(e) = task.await {
            warn!(error = %e, "assistant task failed");
        }
        self.task = None;
    }
}

impl Drop for Assistant {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// What happens once the current utterance has been spoken.
enum AfterSpeech {
    /// Acknowledgement done, capture the command.
    Listen,
    /// Response done, run its action and go idle.
    Finish(Option<Action>),
}

enum Next {
    Control(Control),
    Wake(bool),
    WakeGone,
    Capture(RecognitionEvent),
    Speech(SpeechEvent),
    Shutdown,
}

struct Pipeline {
    interpreter: Interpreter,
    voice: VoiceContext,
    voice_tx: watch::Sender<VoiceOption>,
    state: Arc<StateMachine>,
    recognizer: Arc<dyn SpeechRecognizer>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    actions: Arc<dyn ActionRunner>,
    wake: WakeListener,
    wake_enabled: bool,
    ids: Generation,
    locale: String,
    acknowledgement: String,
    settings: SpeechSettings,
    capture: Option<Box<dyn RecognitionSession>>,
    capture_guard: GenerationGuard,
    utterance_guard: GenerationGuard,
    after_speech: Option<AfterSpeech>,
    capture_tx: mpsc::UnboundedSender<RecognitionEvent>,
    speech_tx: mpsc::UnboundedSender<SpeechEvent>,
}

impl Pipeline {
    async fn run(
        mut self,
        mut controls: mpsc::UnboundedReceiver<Control>,
        mut capture_events: mpsc::UnboundedReceiver<RecognitionEvent>,
        mut speech_events: mpsc::UnboundedReceiver<SpeechEvent>,
        shutdown: CancellationToken,
    ) {
        let mut detected = self.wake.subscribe_detected();
        let mut wake_alive = true;

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => Next::Shutdown,
                ctl = controls.recv() => ctl.map_or(Next::Shutdown, Next::Control),
                changed = detected.changed(), if wake_alive => match changed {
                    Ok(()) => Next::Wake(*detected.borrow_and_update()),
                    Err(_) => Next::WakeGone,
                },
                Some(event) = capture_events.recv() => Next::Capture(event),
                Some(event) = speech_events.recv() => Next::Speech(event),
            };

            match next {
                Next::Control(Control::Shutdown) | Next::Shutdown => break,
                Next::Control(control) => self.on_control(control).await,
                Next::Wake(true) => self.on_wake().await,
                Next::Wake(false) => {}
                Next::WakeGone => {
                    warn!("wake listener exited");
                    wake_alive = false;
                }
                Next::Capture(event) => self.on_capture(event).await,
                Next::Speech(event) => self.on_speech(event).await,
            }
        }

        self.cancel_activity();
        self.wake.shutdown().await;
        info!("assistant_stopped");
    }

    async fn on_control(&mut self, control: Control) {
        match control {
            Control::Activate => {
                if self.state.current() == AssistantState::Idle {
                    self.stop_wake().await;
                    let _ = self.state.transition(AssistantState::Listening);
                    self.begin_capture().await;
                } else {
                    info!(state = %self.state.current(), "activation_cancelled");
                    self.cancel_activity();
                    self.finish().await;
                }
            }
            Control::ToggleWake => {
                self.wake_enabled = !self.wake_enabled;
                info!(enabled = self.wake_enabled, "wake_toggled");
                if !self.wake_enabled {
                    self.stop_wake().await;
                } else if self.state.current() == AssistantState::Idle {
                    self.start_wake().await;
                }
            }
            Control::Submit(text) => {
                if self.state.current() != AssistantState::Idle {
                    warn!(state = %self.state.current(), "busy, typed command dropped");
                    return;
                }
                self.stop_wake().await;
                self.respond_to(&text);
            }
            Control::Shutdown => {}
        }
    }

    async fn on_wake(&mut self) {
        if self.state.current() != AssistantState::Idle {
            debug!(state = %self.state.current(), "wake ignored while busy");
            return;
        }
        info!("wake_received");
        // Frees the recognizer for command capture.
        self.stop_wake().await;
        let _ = self.state.transition(AssistantState::Responding);
        let acknowledgement = self.acknowledgement.clone();
        self.speak(acknowledgement, AfterSpeech::Listen);
    }

    async fn on_capture(&mut self, event: RecognitionEvent) {
        if !self.capture_guard.is_current(event.session) {
            debug!(session = event.session, "stale_capture_event");
            return;
        }
        match event.kind {
            RecognitionEventKind::Started => debug!(session = event.session, "capture_started"),
            RecognitionEventKind::Result { text, is_final: true } => {
                self.release_capture();
                self.respond_to(&text);
            }
            RecognitionEventKind::Result { .. } => {}
            RecognitionEventKind::Error(RecognitionErrorKind::Aborted) => {}
            RecognitionEventKind::Error(kind) => {
                warn!(error = %kind, "command capture failed");
                self.release_capture();
                self.finish().await;
            }
            RecognitionEventKind::Ended => {
                debug!("capture ended without a command");
                self.release_capture();
                self.finish().await;
            }
        }
    }

    async fn on_speech(&mut self, event: SpeechEvent) {
        if !self.utterance_guard.is_current(event.utterance) {
            debug!(utterance = event.utterance, "stale_speech_event");
            return;
        }
        if !event.kind.is_done() {
            return;
        }
        if let SpeechEventKind::Failed(reason) = &event.kind {
            warn!(reason = %reason, "speech failed");
        }
        self.utterance_guard.disarm();

        match self.after_speech.take() {
            Some(AfterSpeech::Listen) => {
                let _ = self.state.transition(AssistantState::Listening);
                self.begin_capture().await;
            }
            Some(AfterSpeech::Finish(action)) => {
                if let Some(action) = action {
                    self.run_action(action);
                }
                self.finish().await;
            }
            None => self.finish().await,
        }
    }

    /// Failures and panics in the runner are logged and go no further.
    fn run_action(&self, action: Action) {
        let actions = self.actions.as_ref();
        match std::panic::catch_unwind(AssertUnwindSafe(|| action.run(actions))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "deferred action failed"),
            Err(_) => error!("action runner panicked"),
        }
    }

    /// Interpret `text` and speak the reply. The reply's action waits for
    /// the speech to complete.
    fn respond_to(&mut self, text: &str) {
        let request_id = Uuid::new_v4();
        let span = info_span!("command", %request_id);
        let _enter = span.enter();

        let _ = self.state.transition(AssistantState::Processing);
        info!(transcript = %text, "command_received");

        let interpreter = &self.interpreter;
        let voice = &mut self.voice;
        let response = std::panic::catch_unwind(AssertUnwindSafe(|| interpreter.process(voice, text)))
            .unwrap_or_else(|_| {
                error!("interpreter panicked");
                CommandResponse::say(Intent::Fallback, APOLOGY_MESSAGE)
            });

        if self.voice.current() != &*self.voice_tx.borrow() {
            self.voice_tx.send_replace(self.voice.current().clone());
        }

        info!(intent = ?response.intent, message = %response.message, "command_response");
        let _ = self.state.transition(AssistantState::Responding);
        self.speak(response.message, AfterSpeech::Finish(response.action));
    }

    /// Queue `text` in the current voice. A synthesizer that refuses the
    /// utterance reports it as a failed completion so the flow continues.
    fn speak(&mut self, text: String, after: AfterSpeech) {
        let id = self.ids.advance();
        self.utterance_guard.arm(id);
        self.after_speech = Some(after);

        let sink = SpeechSink::new(id, self.speech_tx.clone());
        let utterance = Utterance {
            id,
            text,
            lang: self.voice.lang().to_string(),
            settings: self.settings,
        };
        debug!(utterance = id, lang = %utterance.lang, "speaking");
        if let Err(e) = self.synthesizer.speak(utterance, sink.clone()) {
            debug!(error = %e, "synthesizer refused utterance");
            sink.failed(e.to_string());
        }
    }

    async fn begin_capture(&mut self) {
        self.release_capture();
        let session = self.ids.advance();
        self.capture_guard.arm(session);
        let sink = RecognitionSink::new(session, self.capture_tx.clone());
        match self
            .recognizer
            .start_session(session, RecognitionConfig::command(&self.locale), sink)
        {
            Ok(handle) => {
                debug!(session, "capture_session_opened");
                self.capture = Some(handle);
            }
            Err(e) => {
                warn!(error = %e, "command capture failed to start");
                self.capture_guard.disarm();
                self.finish().await;
            }
        }
    }

    fn release_capture(&mut self) {
        self.capture_guard.disarm();
        self.capture = None;
    }

    /// Abort capture and speech in flight. Pending actions are dropped.
    fn cancel_activity(&mut self) {
        if self.capture_guard.disarm().is_some() {
            if let Some(mut handle) = self.capture.take() {
                handle.abort();
            }
        }
        self.capture = None;
        if self.utterance_guard.disarm().is_some() {
            self.synthesizer.cancel_all();
        }
        self.after_speech = None;
    }

    async fn finish(&mut self) {
        let _ = self.state.transition(AssistantState::Idle);
        if self.wake_enabled {
            self.start_wake().await;
        }
    }

    async fn start_wake(&mut self) {
        if let Err(e) = self.wake.start().await {
            warn!(error = %e, "wake listener start failed");
        }
    }

    async fn stop_wake(&mut self) {
        if let Err(e) = self.wake.stop().await {
            warn!(error = %e, "wake listener stop failed");
        }
    }
}
