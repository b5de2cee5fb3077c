//! Phase timing for structured logs.
//!
//! Durations only ever reach the logs. Reports stay free of them so that
//! identical units produce identical reports.

use crate::core::UnitPhase;
use std::time::Instant;
use tracing::trace;

/// Measures how long a unit spends in one lifecycle phase.
#[derive(Debug)]
pub struct PhaseTimer {
    phase: UnitPhase,
    started: Instant,
}

impl PhaseTimer {
    /// Starts timing `phase`.
    #[must_use]
    pub fn start(phase: UnitPhase) -> Self {
        Self {
            phase,
            started: Instant::now(),
        }
    }

    /// The phase being timed.
    #[must_use]
    pub const fn phase(&self) -> UnitPhase {
        self.phase
    }

    /// Stops the timer and returns the elapsed milliseconds.
    #[must_use]
    pub fn finish(self) -> f64 {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        trace!(phase = %self.phase, elapsed_ms, "Phase timer stopped");
        elapsed_ms
    }
}
