//! Interrupt signal shared between a session thread and its manager.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// One-way interrupt flag.
///
/// The manager keeps one clone, the session's line reader another. Once
/// raised it never resets.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Create a lowered flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag. Returns `true` only for the call that raised it.
    pub fn interrupt(&self) -> bool {
        !self.0.swap(true, Ordering::SeqCst)
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interrupt_is_idempotent() {
        let flag = InterruptFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_interrupted());

        assert!(flag.interrupt());
        assert!(!flag.interrupt());
        assert!(observer.is_interrupted());
    }
}
