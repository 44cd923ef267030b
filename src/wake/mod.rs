//! Wake phrase detection.
//! Pipeline: continuous recognition session → transcript buffer → fuzzy
//! phrase match → detected pulse → cooldown → restart.

pub mod detector;
pub mod listener;
pub mod phrase;

pub use detector::{
    FatalReason, OpenFailure, TimerId, WakeDetector, WakeEffect, WakeInput, WakeState,
};
pub use listener::WakeListener;
pub use phrase::WakePhraseSet;
