//! Wall clocks for progress tracking and recording
//!
//! Progress and recorded event offsets are measured in wall-clock
//! milliseconds, separate from the audio clock that places sounds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::time::Instant;

/// Monotonic millisecond clock
pub trait Clock: Send + Sync {
    /// Milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> f64;
}

/// Real time, read through tokio's clock so paused-time tests see it
/// advance with the runtime
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// A clock that only moves when told to. Clones share the same time.
///
/// Used for offline rendering, where wall time follows rendered frames,
/// and for deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    // f64 bits
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ms(&self, ms: f64) {
        self.now.store(ms.to_bits(), Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: f64) {
        let current = self.now_ms();
        self.set_ms(current + ms.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        f64::from_bits(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new();
        let other = clock.clone();
        assert_eq!(clock.now_ms(), 0.0);

        other.advance_ms(125.0);
        assert_eq!(clock.now_ms(), 125.0);

        clock.advance_ms(-50.0);
        assert_eq!(other.now_ms(), 125.0);
    }

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(b >= a);
    }
}
