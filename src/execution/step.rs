//! Step Execution
//!
//! A pipeline step wraps one external tool invocation. Every step shares
//! the same immutable [`StepSpec`] descriptor and differs only in how it
//! decides pass or fail:
//!
//! - [`BasicStep`]: passes on exit status zero.
//! - [`ExceptionStep`]: captures stdout, and treats anything printed on a
//!   zero exit as a failure (`gofmt -l`, linters).
//! - [`TimeoutStep`]: runs under a fresh deadline per call and kills the
//!   process when the deadline elapses.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::process::{Child, Command};

use crate::error::{ProcessError, StepError};

use super::launcher::{system_launcher, ProcessLauncher};

/// Deadline applied to a timeout-bound step when none is configured.
pub const DEFAULT_STEP_TIMEOUT: Duration = Duration::from_secs(30);

/// Immutable description of a single tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSpec {
    /// Step name, used to tag every failure raised by this step
    pub name: String,

    /// Executable to run (e.g. "go", "gofmt", "git")
    pub program: String,

    /// Message emitted when the step succeeds
    pub message: String,

    /// Working directory for the process
    pub dir: PathBuf,

    /// Arguments passed to the executable
    pub args: Vec<String>,
}

impl StepSpec {
    /// Creates a step descriptor.
    ///
    /// # Example
    ///
    /// ```
    /// use goci::execution::StepSpec;
    ///
    /// let spec = StepSpec::new("go build", "go", "Go Build: SUCCESS", "./project", ["build", "."]);
    /// assert_eq!(spec.args, vec!["build", "."]);
    /// ```
    pub fn new<I, S>(
        name: impl Into<String>,
        program: impl Into<String>,
        message: impl Into<String>,
        dir: impl Into<PathBuf>,
        args: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            program: program.into(),
            message: message.into(),
            dir: dir.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Human-readable command line, for logging.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    fn command(&self, launcher: &dyn ProcessLauncher) -> Command {
        let mut cmd = launcher.command(&self.program, &self.args);
        cmd.current_dir(&self.dir);
        debug!(
            "Step '{}': running `{}` in {}",
            self.name,
            self.command_line(),
            self.dir.display()
        );
        cmd
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Child, StepError> {
        cmd.spawn()
            .map_err(|e| self.execution_error(ProcessError::Spawn(e)))
    }

    fn execution_error(&self, cause: ProcessError) -> StepError {
        error!("Step '{}' failed to execute: {}", self.name, cause);
        StepError::Execution {
            step: self.name.clone(),
            cause,
        }
    }
}

/// Runs a tool to completion and passes on a zero exit status.
#[derive(Clone)]
pub struct BasicStep {
    spec: StepSpec,
    launcher: Arc<dyn ProcessLauncher>,
}

impl BasicStep {
    pub fn new(spec: StepSpec) -> Self {
        Self {
            spec,
            launcher: system_launcher(),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn spec(&self) -> &StepSpec {
        &self.spec
    }

    /// Runs the tool with inherited stdio and waits for it to exit.
    pub async fn execute(&self) -> Result<String, StepError> {
        let mut cmd = self.spec.command(self.launcher.as_ref());
        let mut child = self.spec.spawn(&mut cmd)?;

        let status = child
            .wait()
            .await
            .map_err(|e| self.spec.execution_error(ProcessError::Wait(e)))?;

        if !status.success() {
            return Err(self.spec.execution_error(ProcessError::ExitStatus(status)));
        }

        Ok(self.spec.message.clone())
    }
}

/// Runs a tool whose convention is "silent on success".
#[derive(Clone)]
pub struct ExceptionStep {
    spec: StepSpec,
    launcher: Arc<dyn ProcessLauncher>,
}

impl ExceptionStep {
    pub fn new(spec: StepSpec) -> Self {
        Self {
            spec,
            launcher: system_launcher(),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn spec(&self) -> &StepSpec {
        &self.spec
    }

    /// Runs the tool with stdout captured.
    ///
    /// A non-zero exit is an execution failure regardless of what was
    /// printed. A zero exit with anything on stdout is a format failure.
    pub async fn execute(&self) -> Result<String, StepError> {
        let mut cmd = self.spec.command(self.launcher.as_ref());
        cmd.stdout(Stdio::piped());
        let child = self.spec.spawn(&mut cmd)?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spec.execution_error(ProcessError::Wait(e)))?;

        if !output.status.success() {
            return Err(self
                .spec
                .execution_error(ProcessError::ExitStatus(output.status)));
        }

        if !output.stdout.is_empty() {
            let captured = String::from_utf8_lossy(&output.stdout).into_owned();
            error!(
                "Step '{}' reported problems ({} bytes of output)",
                self.spec.name,
                output.stdout.len()
            );
            return Err(StepError::Format {
                step: self.spec.name.clone(),
                output: captured,
            });
        }

        Ok(self.spec.message.clone())
    }
}

/// Runs a tool under a deadline, killing it when the deadline passes.
#[derive(Clone)]
pub struct TimeoutStep {
    spec: StepSpec,
    timeout: Duration,
    launcher: Arc<dyn ProcessLauncher>,
}

impl TimeoutStep {
    /// Creates a timeout-bound step. A zero timeout selects
    /// [`DEFAULT_STEP_TIMEOUT`].
    pub fn new(spec: StepSpec, timeout: Duration) -> Self {
        let timeout = if timeout.is_zero() {
            DEFAULT_STEP_TIMEOUT
        } else {
            timeout
        };

        Self {
            spec,
            timeout,
            launcher: system_launcher(),
        }
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn spec(&self) -> &StepSpec {
        &self.spec
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Runs the tool, racing its exit against a deadline created for this
    /// call. The deadline timer is dropped on every return path.
    pub async fn execute(&self) -> Result<String, StepError> {
        let mut cmd = self.spec.command(self.launcher.as_ref());
        cmd.kill_on_drop(true);
        let mut child = self.spec.spawn(&mut cmd)?;

        let status = match tokio::time::timeout(self.timeout, child.wait()).await {
            Ok(waited) => {
                waited.map_err(|e| self.spec.execution_error(ProcessError::Wait(e)))?
            }
            Err(elapsed) => {
                // Kill and reap so no orphan outlives the step.
                if let Err(e) = child.kill().await {
                    debug!("Step '{}': kill after timeout failed: {}", self.spec.name, e);
                }
                error!(
                    "Step '{}' timed out after {:?}",
                    self.spec.name, self.timeout
                );
                return Err(StepError::Timeout {
                    step: self.spec.name.clone(),
                    timeout: self.timeout,
                    cause: elapsed,
                });
            }
        };

        if !status.success() {
            return Err(self.spec.execution_error(ProcessError::ExitStatus(status)));
        }

        Ok(self.spec.message.clone())
    }
}

/// One step of a pipeline.
///
/// The set of step kinds is closed; a new tool category becomes a new
/// variant rather than a branch inside the runner.
#[derive(Clone)]
pub enum Step {
    Basic(BasicStep),
    Exception(ExceptionStep),
    Timeout(TimeoutStep),
}

impl Step {
    /// Executes the step, returning its success message.
    pub async fn execute(&self) -> Result<String, StepError> {
        info!("Starting step: {}", self.name());
        let result = match self {
            Self::Basic(step) => step.execute().await,
            Self::Exception(step) => step.execute().await,
            Self::Timeout(step) => step.execute().await,
        };

        if result.is_ok() {
            info!("Step '{}' completed successfully", self.name());
        }
        result
    }

    pub fn spec(&self) -> &StepSpec {
        match self {
            Self::Basic(step) => step.spec(),
            Self::Exception(step) => step.spec(),
            Self::Timeout(step) => step.spec(),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec().name
    }

    pub fn dir(&self) -> &Path {
        &self.spec().dir
    }

    /// Short label for the step kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Basic(_) => "basic",
            Self::Exception(_) => "exception",
            Self::Timeout(_) => "timeout",
        }
    }

    /// Replaces the launcher used to start this step's process.
    pub fn with_launcher(self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        match self {
            Self::Basic(step) => Self::Basic(step.with_launcher(launcher)),
            Self::Exception(step) => Self::Exception(step.with_launcher(launcher)),
            Self::Timeout(step) => Self::Timeout(step.with_launcher(launcher)),
        }
    }
}

impl From<BasicStep> for Step {
    fn from(step: BasicStep) -> Self {
        Self::Basic(step)
    }
}

impl From<ExceptionStep> for Step {
    fn from(step: ExceptionStep) -> Self {
        Self::Exception(step)
    }
}

impl From<TimeoutStep> for Step {
    fn from(step: TimeoutStep) -> Self {
        Self::Timeout(step)
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("kind", &self.kind())
            .field("spec", self.spec())
            .finish()
    }
}
