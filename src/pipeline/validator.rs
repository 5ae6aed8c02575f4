//! Pipeline Validation
//!
//! Checks a pipeline description before any step runs:
//! - the pipeline has steps
//! - every step has a name and an executable
//! - step names are unique
//! - every step resolves to a project directory

use std::collections::HashSet;
use std::path::Path;

use log::{debug, info, warn};

use super::model::{PipelineConfig, StepConfig, PUSH_TOOL};

/// Validation error types for user-friendly error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyPipeline,
    EmptyStepName(usize),
    EmptyCommand(String),
    DuplicateStepName(String),
    MissingProject(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPipeline => write!(f, "Pipeline has no steps"),
            Self::EmptyStepName(index) => {
                write!(f, "Step #{} has empty or whitespace-only name", index + 1)
            }
            Self::EmptyCommand(step) => write!(f, "Step '{}' has no command specified", step),
            Self::DuplicateStepName(step) => write!(f, "Duplicate step name: '{}'", step),
            Self::MissingProject(step) => {
                write!(f, "No project directory provided for step '{}'", step)
            }
        }
    }
}

/// Validates a single step's fields.
fn validate_step(index: usize, step: &StepConfig, project: Option<&Path>) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if step.name.trim().is_empty() {
        errors.push(ValidationError::EmptyStepName(index));
        return errors; // Can't name further errors without a name
    }

    if step.cmd.trim().is_empty() {
        errors.push(ValidationError::EmptyCommand(step.name.clone()));
    }

    if project.is_none() && step.project().is_none() {
        errors.push(ValidationError::MissingProject(step.name.clone()));
    }

    if step.message.is_empty() {
        warn!("Step '{}' has no success message", step.name);
    }

    if step.exception && step.timeout != 0 {
        warn!(
            "Step '{}' sets both timeout and hasException; the exception check is ignored",
            step.name
        );
    }

    if step.branch.is_some() && step.cmd != PUSH_TOOL {
        debug!(
            "Step '{}': branch is only appended to '{}' commands",
            step.name, PUSH_TOOL
        );
    }

    errors
}

/// Validates the whole pipeline description.
///
/// `project` is the project directory given on the command line, if any.
/// All problems are reported together, one per line.
pub fn validate_pipeline(config: &PipelineConfig, project: Option<&Path>) -> Result<(), String> {
    info!("Validating pipeline with {} steps", config.steps.len());

    if config.steps.is_empty() {
        return Err(ValidationError::EmptyPipeline.to_string());
    }

    let mut all_errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for (index, step) in config.steps.iter().enumerate() {
        all_errors.extend(validate_step(index, step, project));

        if !step.name.trim().is_empty() && !seen.insert(step.name.as_str()) {
            all_errors.push(ValidationError::DuplicateStepName(step.name.clone()));
        }
    }

    if !all_errors.is_empty() {
        let error_messages: Vec<String> = all_errors.iter().map(|e| e.to_string()).collect();
        return Err(error_messages.join("\n"));
    }

    Ok(())
}
