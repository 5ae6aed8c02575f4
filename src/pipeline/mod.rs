//! Pipeline Definition Module
//!
//! Declarative pipeline descriptions and their conversion into steps.
//!
//! # Structure
//!
//! - [`model`]: Configuration data structures (StepConfig, PipelineConfig)
//! - [`parser`]: YAML/JSON loading and step construction
//! - [`validator`]: Validation rules checked before any step runs

pub mod model;
pub mod parser;
pub mod validator;

pub use model::{PipelineConfig, StepConfig, StepKind, DEFAULT_BRANCH, PUSH_TOOL};
pub use parser::{build_steps, default_pipeline, load_pipeline, read_pipeline_config};
pub use validator::{validate_pipeline, ValidationError};
