//! Unit lifecycle phases.

use crate::errors::HarnessError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle phase of a unit of work.
///
/// `NotStarted -> SettingUp -> {SetupFailed | BodyRunning -> Completed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitPhase {
    /// Nothing has run yet.
    NotStarted,
    /// Setup (including before hooks) is running.
    SettingUp,
    /// Setup failed. Terminal.
    SetupFailed,
    /// The body is running.
    BodyRunning,
    /// The body finished. Terminal.
    Completed,
}

impl Default for UnitPhase {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl fmt::Display for UnitPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not_started"),
            Self::SettingUp => write!(f, "setting_up"),
            Self::SetupFailed => write!(f, "setup_failed"),
            Self::BodyRunning => write!(f, "body_running"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl UnitPhase {
    /// Returns true if the phase is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::SetupFailed | Self::Completed)
    }

    /// Returns true if `next` is a legal successor of this phase.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::SettingUp)
                | (Self::SettingUp, Self::SetupFailed | Self::BodyRunning)
                | (Self::BodyRunning, Self::Completed)
        )
    }
}

/// Tracks the phase of a single unit and rejects illegal transitions.
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    unit: String,
    phase: UnitPhase,
}

impl PhaseTracker {
    /// Creates a tracker in `NotStarted`.
    #[must_use]
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            phase: UnitPhase::NotStarted,
        }
    }

    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> UnitPhase {
        self.phase
    }

    /// Moves to `next`, or fails without changing state.
    pub fn advance(&mut self, next: UnitPhase) -> Result<(), HarnessError> {
        if !self.phase.can_transition_to(next) {
            return Err(HarnessError::IllegalTransition {
                unit: self.unit.clone(),
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_display() {
        assert_eq!(UnitPhase::NotStarted.to_string(), "not_started");
        assert_eq!(UnitPhase::SetupFailed.to_string(), "setup_failed");
        assert_eq!(UnitPhase::BodyRunning.to_string(), "body_running");
    }

    #[test]
    fn test_phase_is_terminal() {
        assert!(UnitPhase::SetupFailed.is_terminal());
        assert!(UnitPhase::Completed.is_terminal());
        assert!(!UnitPhase::NotStarted.is_terminal());
        assert!(!UnitPhase::SettingUp.is_terminal());
        assert!(!UnitPhase::BodyRunning.is_terminal());
    }

    #[test]
    fn test_tracker_happy_path() {
        let mut tracker = PhaseTracker::new("unit");
        tracker.advance(UnitPhase::SettingUp).unwrap();
        tracker.advance(UnitPhase::BodyRunning).unwrap();
        tracker.advance(UnitPhase::Completed).unwrap();
        assert_eq!(tracker.phase(), UnitPhase::Completed);
    }

    #[test]
    fn test_tracker_setup_failure_is_final() {
        let mut tracker = PhaseTracker::new("unit");
        tracker.advance(UnitPhase::SettingUp).unwrap();
        tracker.advance(UnitPhase::SetupFailed).unwrap();

        let err = tracker.advance(UnitPhase::BodyRunning).unwrap_err();
        assert!(matches!(err, HarnessError::IllegalTransition { .. }));
        assert_eq!(tracker.phase(), UnitPhase::SetupFailed);
    }

    #[test]
    fn test_tracker_rejects_skipping_setup() {
        let mut tracker = PhaseTracker::new("unit");
        let err = tracker.advance(UnitPhase::BodyRunning).unwrap_err();
        assert!(err.to_string().contains("not_started -> body_running"));
    }

    #[test]
    fn test_tracker_rejects_backward_moves() {
        let mut tracker = PhaseTracker::new("unit");
        tracker.advance(UnitPhase::SettingUp).unwrap();
        tracker.advance(UnitPhase::BodyRunning).unwrap();
        assert!(tracker.advance(UnitPhase::SettingUp).is_err());
        assert_eq!(tracker.phase(), UnitPhase::BodyRunning);
    }
}
