//! goci - Sequential CI Pipeline Runner
//!
//! Runs a fixed, ordered sequence of external tools (build, test, format
//! check, lint, complexity check, push) as one pipeline. Each step owns its
//! pass/fail rule, the first failure stops the run, and SIGINT/SIGTERM make
//! the runner stop waiting.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`pipeline`]: Declarative pipeline descriptions, validation and loading
//! - [`execution`]: Step variants and the pipeline runner
//! - [`monitoring`]: Per-step execution timeline
//! - [`error`]: Step and pipeline error types
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use goci::load_pipeline;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a pipeline from YAML
//!     let pipeline = load_pipeline("pipeline.yaml", Some(Path::new("./tool")), None)?;
//!
//!     // Run it, printing one success message per step
//!     pipeline.run(std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod execution;
pub mod monitoring;
pub mod pipeline;

// Re-export commonly used types
pub use error::{PipelineError, ProcessError, StepError};
pub use execution::engine::Pipeline;
pub use execution::step::{Step, StepSpec};
pub use pipeline::parser::{default_pipeline, load_pipeline};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "goci";
