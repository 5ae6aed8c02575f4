//! Pipeline Execution Module
//!
//! Provides the step variants and the runner that drives them,
//! including deadline handling and termination-signal support.
//!
//! # Architecture
//!
//! - [`step`]: The three step kinds and their pass/fail rules
//! - [`engine`]: Sequential runner racing step failures against signals
//! - [`launcher`]: Pluggable construction of OS processes
//! - [`signal`]: SIGINT/SIGTERM listening

pub mod engine;
pub mod launcher;
pub mod signal;
pub mod step;

pub use engine::Pipeline;
pub use launcher::{ProcessLauncher, SystemLauncher};
pub use signal::{Signal, TerminationSignals};
pub use step::{BasicStep, ExceptionStep, Step, StepSpec, TimeoutStep, DEFAULT_STEP_TIMEOUT};
