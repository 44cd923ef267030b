//! Command interpretation: transcript in, spoken reply plus optional action out.

pub mod catalog;
pub mod interpreter;
pub mod response;
pub mod voice;

pub use interpreter::{Clock, FixedClock, Intent, Interpreter, SystemClock};
pub use response::{Action, ActionRunner, BrowserOpener, CommandResponse, DryRunOpener};
pub use voice::{find_voice, VoiceContext, VoiceOption};
