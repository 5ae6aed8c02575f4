//! Pipeline Loader
//!
//! Turns a pipeline description into a runnable [`Pipeline`]:
//! 1. Read and parse the YAML (or `.json`) file
//! 2. Validate it against the command-line project directory
//! 3. Build one step per entry, in file order

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};

use crate::error::PipelineError;
use crate::execution::{BasicStep, ExceptionStep, Pipeline, Step, StepSpec, TimeoutStep};

use super::model::{PipelineConfig, StepConfig, StepKind, PUSH_TOOL};
use super::validator::validate_pipeline;

/// Reads and parses a pipeline description.
///
/// Files ending in `.json` are parsed as JSON, everything else as YAML.
pub fn read_pipeline_config(path: impl AsRef<Path>) -> Result<PipelineConfig, PipelineError> {
    let path = path.as_ref();
    let display = path.display().to_string();

    if display.is_empty() {
        return Err(PipelineError::ConfigRead {
            path: display,
            reason: "path not provided".to_string(),
        });
    }

    info!("Loading pipeline from: {}", display);

    let content = fs::read_to_string(path).map_err(|e| PipelineError::ConfigRead {
        path: display.clone(),
        reason: format!("failed to read file: {}", e),
    })?;

    debug!("Pipeline file loaded ({} bytes)", content.len());

    let is_json = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

    let parsed: Result<PipelineConfig, String> = if is_json {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    };

    parsed.map_err(|reason| PipelineError::ConfigRead {
        path: display,
        reason: format!("failed to parse: {}", reason),
    })
}

/// Validates `config` and builds its steps.
///
/// `project` and `branch` come from the command line and override the
/// per-step `proj` and `branch` values.
pub fn build_steps(
    config: &PipelineConfig,
    project: Option<&Path>,
    branch: Option<&str>,
) -> Result<Vec<Step>, PipelineError> {
    validate_pipeline(config, project).map_err(PipelineError::Validation)?;

    let mut steps = Vec::with_capacity(config.steps.len());
    for step_config in &config.steps {
        let dir = match (project, step_config.project()) {
            (Some(project), _) => project.to_path_buf(),
            (None, Some(proj)) => proj.to_path_buf(),
            (None, None) => {
                return Err(PipelineError::Validation(format!(
                    "no project path provided for step '{}'",
                    step_config.name
                )))
            }
        };
        let branch = branch.or(step_config.branch.as_deref());
        steps.push(populate_step(step_config, dir, branch));
    }

    info!("Built pipeline with {} steps", steps.len());
    Ok(steps)
}

/// Builds one step from its configuration.
fn populate_step(config: &StepConfig, dir: PathBuf, branch: Option<&str>) -> Step {
    let mut args = config.args.clone();
    let kind = config.kind();

    if kind == StepKind::Timeout && config.cmd == PUSH_TOOL {
        if let Some(branch) = branch.filter(|b| !b.is_empty()) {
            args.push(branch.to_string());
        }
    }

    let spec = StepSpec::new(&config.name, &config.cmd, &config.message, dir, args);
    debug!("Step '{}' is {:?}: {}", config.name, kind, spec.command_line());

    match kind {
        StepKind::Timeout => TimeoutStep::new(spec, Duration::from_secs(config.timeout)).into(),
        StepKind::Exception => ExceptionStep::new(spec).into(),
        StepKind::Basic => BasicStep::new(spec).into(),
    }
}

/// Loads a pipeline from a description file.
///
/// # Example
///
/// ```rust,no_run
/// use std::path::Path;
/// use goci::pipeline::load_pipeline;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = load_pipeline("pipeline.yaml", Some(Path::new("./tool")), None)?;
///     println!("Loaded {} steps", pipeline.len());
///     Ok(())
/// }
/// ```
pub fn load_pipeline(
    path: impl AsRef<Path>,
    project: Option<&Path>,
    branch: Option<&str>,
) -> Result<Pipeline, PipelineError> {
    let config = read_pipeline_config(path)?;
    Ok(Pipeline::new(build_steps(&config, project, branch)?))
}

/// The built-in Go pipeline for `project`.
pub fn default_pipeline(project: &Path, branch: Option<&str>) -> Result<Pipeline, PipelineError> {
    let config = PipelineConfig::go_default();
    Ok(Pipeline::new(build_steps(&config, Some(project), branch)?))
}
