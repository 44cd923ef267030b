//! Literal: wake-phrase voice assistant core.
//! Fuzzy wake detection, a rule-cascade command interpreter, and the
//! pipeline that ties speech providers, interpreter and actions together.

pub mod cancellation;
pub mod command;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod speech;
pub mod state_machine;
pub mod text;
pub mod wake;

pub use command::{Action, CommandResponse, Intent, Interpreter, VoiceContext, VoiceOption};
pub use config::AssistantConfig;
pub use error::{Error, Result};
pub use pipeline::{Assistant, Control, Providers};
pub use state_machine::{AssistantState, StateMachine};
pub use wake::{WakeListener, WakeState};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the default
/// `literal=info` filter. Calling twice is a no-op.
pub fn init_tracing(json: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("literal=info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if installed.is_ok() {
        tracing::debug!(json, "tracing_initialized");
    }
}
