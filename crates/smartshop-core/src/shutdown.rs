//! Cooperative shutdown flag.
//!
//! A [`ShutdownSignal`] is the only state shared between the tick loop and
//! the outside world. The signal-handling task sets it; the loop polls it
//! once at the top of every tick, drains all open sessions on that tick
//! and then exits.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared, cloneable shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    requested: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Create a flag that has not been triggered.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request shutdown. Idempotent.
    pub fn trigger(&self) {
        self.requested.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let signal = ShutdownSignal::new();
        let handle = signal.clone();
        assert!(!signal.is_triggered());
        handle.trigger();
        assert!(signal.is_triggered());
        handle.trigger();
        assert!(signal.is_triggered());
    }
}
