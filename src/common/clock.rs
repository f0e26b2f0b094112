//! Time sources
//!
//! The z axis of every space-time volume is measured in milliseconds since the
//! UNIX epoch. Planning code never reads the system clock directly; it asks a
//! [`Clock`] so that simulations and tests can control time.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time in milliseconds
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the UNIX epoch
    fn now_ms(&self) -> f64;
}

/// Wall clock anchored once, then advanced with the tokio monotonic clock.
///
/// Because it follows `tokio::time::Instant`, a paused tokio runtime also
/// pauses this clock.
#[derive(Debug)]
pub struct RuntimeClock {
    epoch_ms: f64,
    anchor: tokio::time::Instant,
}

impl RuntimeClock {
    pub fn new() -> Self {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64()
            * 1000.0;
        RuntimeClock {
            epoch_ms,
            anchor: tokio::time::Instant::now(),
        }
    }
}

impl Default for RuntimeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for RuntimeClock {
    fn now_ms(&self) -> f64 {
        self.epoch_ms + self.anchor.elapsed().as_secs_f64() * 1000.0
    }
}

/// Manually driven clock for deterministic planning
#[derive(Debug, Default)]
pub struct ManualClock {
    now_ms: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        ManualClock {
            now_ms: Mutex::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: f64) {
        if let Ok(mut now) = self.now_ms.lock() {
            *now = now_ms;
        }
    }

    pub fn advance(&self, delta_ms: f64) {
        if let Ok(mut now) = self.now_ms.lock() {
            *now += delta_ms;
        }
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        self.now_ms.lock().map(|now| *now).unwrap_or_default()
    }
}
