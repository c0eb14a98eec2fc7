//! State machine module.

pub mod handlers;
pub mod machine;

pub use handlers::{CycleContext, CycleTask, run_cycle};
pub use machine::{SessionState, StopLimits};
