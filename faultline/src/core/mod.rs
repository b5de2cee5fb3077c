//! Core domain model types for faultline.
//!
//! This module contains the fundamental types used throughout the harness:
//! - The recorded outcome of a unit and what its body produced
//! - Lifecycle phases and the tracker that enforces them

mod outcome;
mod phase;

pub use outcome::{BodyResult, Outcome};
pub use phase::{PhaseTracker, UnitPhase};
