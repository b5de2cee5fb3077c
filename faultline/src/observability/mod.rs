//! Observability utilities.

mod logging;
mod timing;

pub use logging::{build_filter, init_logging};
pub use timing::PhaseTimer;
