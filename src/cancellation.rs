//! Session and utterance id generations.
//! Every recognition session and utterance gets a fresh id; event handlers
//! compare against the id they currently own so that callbacks from an
//! aborted or superseded session cannot write state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Process-wide monotonically increasing id source.
///
/// Shared between the wake listener and the pipeline so that ids are unique
/// across every session that passes through the recognizer gate.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    next: Arc<AtomicU64>,
}

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance and return the new id. Ids start at 1; 0 is never issued.
    pub fn advance(&self) -> u64 {
        self.next.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Tracks the single id an owner currently cares about.
/// Anything tagged with a different id is stale.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GenerationGuard {
    live: Option<u64>,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `id`, implicitly invalidating the previous one.
    pub fn arm(&mut self, id: u64) {
        self.live = Some(id);
    }

    /// Drop ownership. All ids become stale.
    pub fn disarm(&mut self) -> Option<u64> {
        self.live.take()
    }

    #[inline]
    pub fn is_current(&self, id: u64) -> bool {
        self.live == Some(id)
    }

    pub fn live(&self) -> Option<u64> {
        self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_across_clones() {
        let gen = Generation::new();
        let other = gen.clone();
        let a = gen.advance();
        let b = other.advance();
        assert_ne!(a, b);
        assert_eq!(gen.advance(), 3);
    }

    #[test]
    fn guard_rejects_superseded_ids() {
        let mut guard = GenerationGuard::new();
        assert!(!guard.is_current(1));

        guard.arm(1);
        assert!(guard.is_current(1));

        guard.arm(2);
        assert!(!guard.is_current(1));
        assert!(guard.is_current(2));

        assert_eq!(guard.disarm(), Some(2));
        assert!(!guard.is_current(2));
    }
}
