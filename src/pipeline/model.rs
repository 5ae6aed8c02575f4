//! Pipeline Configuration Model
//!
//! Declarative description of a pipeline, as read from YAML or JSON.
//!
//! # Example YAML Format
//!
//! ```yaml
//! steps:
//!   - name: go build
//!     cmd: go
//!     msg: "Go Build: SUCCESS"
//!     args: [build, ".", errors]
//!
//!   - name: go format
//!     cmd: gofmt
//!     msg: "Go Format: SUCCESS"
//!     args: [-l, ./]
//!     hasException: true
//!
//!   - name: git push
//!     cmd: git
//!     msg: "Git Push: SUCCESS"
//!     args: [push, origin]
//!     timeout: 10
//!     branch: main
//! ```

use std::path::{Path, PathBuf};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Executable whose timeout-bound steps get the branch appended.
pub const PUSH_TOOL: &str = "git";

/// Branch pushed by the built-in pipeline when none is given.
pub const DEFAULT_BRANCH: &str = "master";

/// Configuration of a single step.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct StepConfig {
    /// Step name, reported with every failure
    pub name: String,

    /// Executable to run
    pub cmd: String,

    /// Message printed when the step succeeds
    #[serde(rename = "msg", default)]
    pub message: String,

    /// Project directory; the command-line project takes precedence
    #[serde(
        deserialize_with = "empty_as_none",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub proj: Option<PathBuf>,

    /// Arguments, as a list or a single string
    #[serde(deserialize_with = "single_or_vec", default)]
    pub args: Vec<String>,

    /// Deadline in seconds; zero means the step is not timeout-bound
    #[serde(default)]
    pub timeout: u64,

    /// Treat output on a zero exit as a failure
    #[serde(rename = "hasException", default)]
    pub exception: bool,

    /// Branch appended to push commands; the command-line branch takes precedence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Deserializes either a single string or array of strings into Vec<String>
fn single_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Value::deserialize(deserializer)?;
    match val {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(arr) => arr
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Ok(s),
                Value::Number(n) => Ok(n.to_string()),
                _ => Err(de::Error::custom("Expected string in array")),
            })
            .collect(),
        _ => Err(de::Error::custom("Expected string or array of strings")),
    }
}

/// Deserializes a path, treating an empty or blank value as unset.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let val = Option::<String>::deserialize(deserializer)?;
    Ok(val.filter(|s| !s.trim().is_empty()).map(PathBuf::from))
}

/// Kind of step a configuration entry turns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Basic,
    Exception,
    Timeout,
}

impl StepConfig {
    /// Creates a basic step configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use goci::pipeline::StepConfig;
    ///
    /// let step = StepConfig::new("git push", "git", "Git Push: SUCCESS")
    ///     .with_args(["push", "origin"])
    ///     .with_timeout(10);
    /// assert_eq!(step.args, vec!["push", "origin"]);
    /// ```
    pub fn new(
        name: impl Into<String>,
        cmd: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            cmd: cmd.into().trim().to_string(),
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_proj(mut self, proj: impl Into<PathBuf>) -> Self {
        self.proj = Some(proj.into());
        self
    }

    /// Sets the deadline in seconds.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    pub fn with_exception(mut self) -> Self {
        self.exception = true;
        self
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    /// Project directory of this step, if set to a non-empty path.
    pub fn project(&self) -> Option<&Path> {
        self.proj
            .as_deref()
            .filter(|proj| !proj.as_os_str().is_empty())
    }

    /// A non-zero timeout wins over the exception flag.
    pub fn kind(&self) -> StepKind {
        if self.timeout != 0 {
            StepKind::Timeout
        } else if self.exception {
            StepKind::Exception
        } else {
            StepKind::Basic
        }
    }
}

/// A complete pipeline description.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Steps in execution order
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<StepConfig>) -> Self {
        Self { steps }
    }

    /// The built-in Go pipeline: build, test, format, lint, cyclomatic
    /// complexity, then push.
    pub fn go_default() -> Self {
        Self::from_steps(vec![
            // Building the errors package alongside avoids writing a binary.
            StepConfig::new("go build", "go", "Go Build: SUCCESS").with_args(["build", ".", "errors"]),
            StepConfig::new("go test", "go", "Go Test: SUCCESS").with_args(["test", "-v"]),
            StepConfig::new("go format", "gofmt", "Go Format: SUCCESS")
                .with_args(["-l", "./"])
                .with_exception(),
            StepConfig::new("lint", "golangci-lint", "Go Lint: SUCCESS")
                .with_args(["run", "."])
                .with_exception(),
            StepConfig::new("cyclo", "gocyclo", "Go Cyclo: SUCCESS")
                .with_args(["-over", "10", "."])
                .with_exception(),
            StepConfig::new("git push", PUSH_TOOL, "Git Push: SUCCESS")
                .with_args(["push", "origin"])
                .with_timeout(10)
                .with_branch(DEFAULT_BRANCH),
        ])
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn get_step(&self, name: &str) -> Option<&StepConfig> {
        self.steps.iter().find(|s| s.name == name)
    }
}
