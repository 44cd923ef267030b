//! Assistant lifecycle: Idle → Listening → Processing → Responding → Idle.
//! The acknowledgement after a wake goes Idle → Responding → Listening.

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::{Error, Result};

/// Externally visible assistant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AssistantState {
    Idle,
    /// Capturing a command.
    Listening,
    /// Interpreting a transcript.
    Processing,
    /// Speaking.
    Responding,
}

impl std::fmt::Display for AssistantState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssistantState::Idle => write!(f, "idle"),
            AssistantState::Listening => write!(f, "listening"),
            AssistantState::Processing => write!(f, "processing"),
            AssistantState::Responding => write!(f, "responding"),
        }
    }
}

impl AssistantState {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: AssistantState) -> bool {
        matches!(
            (self, next),
            (AssistantState::Idle, AssistantState::Listening) // manual activation
                | (AssistantState::Idle, AssistantState::Responding) // wake acknowledgement
                | (AssistantState::Idle, AssistantState::Processing) // typed command
                | (AssistantState::Responding, AssistantState::Listening) // after acknowledgement
                | (AssistantState::Listening, AssistantState::Processing)
                | (AssistantState::Processing, AssistantState::Responding)
                | (_, AssistantState::Idle)
        )
    }
}

/// Thread-safe state machine with a watch channel for subscribers.
pub struct StateMachine {
    state: RwLock<AssistantState>,
    state_tx: watch::Sender<AssistantState>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(AssistantState::Idle);
        Self {
            state: RwLock::new(AssistantState::Idle),
            state_tx,
        }
    }

    pub fn current(&self) -> AssistantState {
        *self.state.read()
    }

    /// Attempt a state transition.
    pub fn transition(&self, next: AssistantState) -> Result<AssistantState> {
        let mut state = self.state.write();
        let current = *state;
        if !current.can_transition_to(next) {
            let msg = format!("invalid transition: {current} -> {next}");
            warn!("{}", msg);
            return Err(Error::InvalidTransition(msg));
        }
        *state = next;
        self.state_tx.send_replace(next);
        info!(from = %current, to = %next, "state_transition");
        Ok(next)
    }

    pub fn subscribe(&self) -> watch::Receiver<AssistantState> {
        self.state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_cycle_is_valid() {
        let sm = StateMachine::new();
        for next in [
            AssistantState::Listening,
            AssistantState::Processing,
            AssistantState::Responding,
            AssistantState::Idle,
        ] {
            sm.transition(next).unwrap();
        }
        assert_eq!(sm.current(), AssistantState::Idle);
    }

    #[test]
    fn wake_acknowledgement_path() {
        let sm = StateMachine::new();
        sm.transition(AssistantState::Responding).unwrap();
        sm.transition(AssistantState::Listening).unwrap();
        assert_eq!(sm.current(), AssistantState::Listening);
    }

    #[test]
    fn rejects_skipping_interpretation() {
        let sm = StateMachine::new();
        sm.transition(AssistantState::Listening).unwrap();
        assert!(matches!(
            sm.transition(AssistantState::Responding),
            Err(Error::InvalidTransition(_))
        ));
        assert_eq!(sm.current(), AssistantState::Listening);
    }

    #[test]
    fn subscribers_see_changes() {
        let sm = StateMachine::new();
        let rx = sm.subscribe();
        sm.transition(AssistantState::Listening).unwrap();
        assert_eq!(*rx.borrow(), AssistantState::Listening);
        sm.transition(AssistantState::Idle).unwrap();
        assert_eq!(*rx.borrow(), AssistantState::Idle);
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&AssistantState::Responding).unwrap();
        assert_eq!(json, "\"responding\"");
    }
}
