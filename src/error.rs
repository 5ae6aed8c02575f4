//! Error Types
//!
//! Failures raised while building and running a pipeline.
//!
//! Step-level failures ([`StepError`]) always carry the name of the step
//! that produced them. Two step errors compare equal when they name the
//! same step, whatever their message or cause, so callers can ask "did the
//! build step fail?" without matching on error text.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::error::Elapsed;

use crate::execution::signal::Signal;

/// Why an external process did not finish cleanly.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The executable could not be started.
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),

    /// The process started but waiting on it failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),

    /// The process exited unsuccessfully.
    #[error("process exited with {0}")]
    ExitStatus(ExitStatus),
}

/// A failure raised inside a single step's execution.
#[derive(Debug, Error)]
pub enum StepError {
    /// The tool exited non-zero or could not be started.
    #[error("Step: {step:?}: failed to execute: Cause: {cause}")]
    Execution {
        step: String,
        #[source]
        cause: ProcessError,
    },

    /// The tool exited zero but printed output it is expected to keep silent.
    #[error("Step: {step:?}: invalid format: {output}")]
    Format { step: String, output: String },

    /// The tool ran past its deadline and was killed.
    #[error("Step: {step:?}: failed timeout after {timeout:?}: Cause: {cause}")]
    Timeout {
        step: String,
        timeout: Duration,
        #[source]
        cause: Elapsed,
    },
}

impl StepError {
    /// Name of the step that failed.
    pub fn step(&self) -> &str {
        match self {
            Self::Execution { step, .. } | Self::Format { step, .. } | Self::Timeout { step, .. } => {
                step
            }
        }
    }

    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Execution { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl PartialEq for StepError {
    fn eq(&self, other: &Self) -> bool {
        self.step() == other.step()
    }
}

impl Eq for StepError {}

/// Terminal error returned by a pipeline run or by pipeline construction.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required configuration is missing or invalid.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The declarative pipeline description could not be read or parsed.
    #[error("can't read the config file provided '{path}': {reason}")]
    ConfigRead { path: String, reason: String },

    #[error(transparent)]
    Step(#[from] StepError),

    /// Writing a step's success message to the output sink failed.
    #[error("Step: {step:?}: failed to write output: {source}")]
    Output {
        step: String,
        #[source]
        source: io::Error,
    },

    /// A termination signal arrived while steps were still running.
    #[error("{0}: Exiting: received signal")]
    Interrupted(Signal),

    #[error("failed to install signal handlers: {0}")]
    SignalSetup(#[source] io::Error),

    /// The worker task panicked or was aborted.
    #[error("pipeline worker stopped unexpectedly: {0}")]
    Worker(#[from] JoinError),
}

impl PipelineError {
    /// The step failure wrapped by this error, if any.
    pub fn step_error(&self) -> Option<&StepError> {
        match self {
            Self::Step(err) => Some(err),
            _ => None,
        }
    }

    /// The signal that interrupted the run, if any.
    pub fn signal(&self) -> Option<Signal> {
        match self {
            Self::Interrupted(signal) => Some(*signal),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn execution(step: &str) -> StepError {
        StepError::Execution {
            step: step.to_string(),
            cause: ProcessError::Spawn(io::Error::new(io::ErrorKind::NotFound, "no such file")),
        }
    }

    fn format_error(step: &str, output: &str) -> StepError {
        StepError::Format {
            step: step.to_string(),
            output: output.to_string(),
        }
    }

    #[test]
    fn test_same_step_is_same_failure() {
        assert_eq!(execution("go build"), format_error("go build", "main.go\n"));
        assert_eq!(format_error("go format", "a.go"), format_error("go format", "b.go"));
    }

    #[test]
    fn test_different_step_never_equal() {
        assert_ne!(format_error("go format", "main.go"), format_error("lint", "main.go"));
        assert_ne!(execution("go build"), execution("go test"));
    }

    #[test]
    fn test_step_name_accessor() {
        assert_eq!(execution("go build").step(), "go build");
        assert_eq!(format_error("lint", "").step(), "lint");
    }

    #[test]
    fn test_kind_predicates() {
        assert!(execution("go build").is_execution());
        assert!(format_error("go format", "x").is_format());
        assert!(!format_error("go format", "x").is_timeout());
    }

    #[test]
    fn test_display_names_step() {
        let message = format_error("go format", "file.go\n").to_string();
        assert!(message.contains("\"go format\""));
        assert!(message.contains("invalid format"));
        assert!(message.contains("file.go"));
    }

    #[test]
    fn test_execution_error_exposes_cause() {
        use std::error::Error;

        let err = execution("go build");
        let cause = err.source().map(|c| c.to_string()).unwrap_or_default();
        assert!(cause.contains("failed to spawn"));
    }

    #[test]
    fn test_pipeline_error_wraps_step_error() {
        let err: PipelineError = execution("go test").into();
        assert_eq!(err.step_error(), Some(&execution("go test")));
        assert!(err.signal().is_none());
    }

    #[test]
    fn test_interrupted_error_carries_signal() {
        let err = PipelineError::Interrupted(Signal::Terminate);
        assert_eq!(err.signal(), Some(Signal::Terminate));
        assert!(err.step_error().is_none());
        assert!(err.to_string().contains("received signal"));
    }
}
