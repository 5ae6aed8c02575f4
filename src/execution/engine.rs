//! Pipeline Runner
//!
//! Runs an ordered list of steps on a single worker task while the caller
//! waits on whichever comes first:
//! - a step failure (or a failed write to the output sink)
//! - a termination signal
//! - the last step finishing
//!
//! Steps never run concurrently. A failing step stops the pipeline, so a
//! push never happens before the tests pass.
//!
//! On a termination signal the runner stops waiting and returns
//! [`PipelineError::Interrupted`]. The worker is told not to start further
//! steps or write further messages, but the process already in flight is
//! left to finish on its own (timeout-bound steps still enforce their
//! deadline).

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::monitoring::{EventType, ExecutionTimeline};

use super::launcher::ProcessLauncher;
use super::signal::{Signal, TerminationSignals};
use super::step::Step;

/// An ordered, single-use sequence of steps.
///
/// # Example
///
/// ```rust,no_run
/// use goci::execution::{BasicStep, Pipeline, StepSpec};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::new(vec![
///         BasicStep::new(StepSpec::new("go build", "go", "Go Build: SUCCESS", ".", ["build", "."])).into(),
///         BasicStep::new(StepSpec::new("go test", "go", "Go Test: SUCCESS", ".", ["test", "-v"])).into(),
///     ]);
///
///     pipeline.run(std::io::stdout()).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Pipeline {
    steps: Vec<Step>,
}

impl Pipeline {
    /// Creates a pipeline that runs `steps` in the given order.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    /// Uses `launcher` to start the process of every step.
    pub fn with_launcher(self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        let steps = self
            .steps
            .into_iter()
            .map(|step| step.with_launcher(Arc::clone(&launcher)))
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Runs the pipeline, stopping early on SIGINT or SIGTERM.
    ///
    /// Success messages are written to `out`, one line per step, in order.
    /// The host's handling of both signals is restored before this returns.
    pub async fn run<W>(self, out: W) -> Result<(), PipelineError>
    where
        W: Write + Send + 'static,
    {
        let mut signals = TerminationSignals::install().map_err(PipelineError::SignalSetup)?;
        self.run_until(out, async move { signals.recv().await })
            .await
    }

    /// Runs the pipeline, stopping early when `shutdown` resolves.
    ///
    /// Returns on the first of: a step failure, `shutdown` resolving, or
    /// every step succeeding. Later events are discarded.
    pub async fn run_until<W, F>(self, out: W, shutdown: F) -> Result<(), PipelineError>
    where
        W: Write + Send + 'static,
        F: Future<Output = Signal>,
    {
        info!("Starting pipeline with {} steps", self.steps.len());

        let cancel = CancellationToken::new();
        let mut worker = tokio::spawn(run_steps(self.steps, out, cancel.clone()));
        tokio::pin!(shutdown);

        tokio::select! {
            joined = &mut worker => {
                let timeline = joined??;
                for line in timeline.summary().lines() {
                    debug!("{}", line);
                }
                info!("Pipeline completed in {:.2?}", timeline.elapsed());
                Ok(())
            }
            signal = &mut shutdown => {
                cancel.cancel();
                warn!("Received {} signal, no further steps will start", signal);
                Err(PipelineError::Interrupted(signal))
            }
        }
    }
}

/// Worker loop: executes each step in order and writes its message.
async fn run_steps<W>(
    steps: Vec<Step>,
    mut out: W,
    cancel: CancellationToken,
) -> Result<ExecutionTimeline, PipelineError>
where
    W: Write,
{
    let mut timeline = ExecutionTimeline::new();

    for step in steps {
        if cancel.is_cancelled() {
            debug!("Run cancelled before step '{}'", step.name());
            break;
        }

        timeline.add_event(step.name(), EventType::Started);
        let message = match step.execute().await {
            Ok(message) => message,
            Err(e) => {
                timeline.add_event(step.name(), EventType::Failed);
                return Err(e.into());
            }
        };
        timeline.add_event(step.name(), EventType::Completed);

        if cancel.is_cancelled() {
            debug!("Run cancelled, dropping message of step '{}'", step.name());
            break;
        }

        writeln!(out, "{}", message)
            .and_then(|()| out.flush())
            .map_err(|source| {
                error!("Failed to write output of step '{}': {}", step.name(), source);
                PipelineError::Output {
                    step: step.name().to_string(),
                    source,
                }
            })?;
    }

    Ok(timeline)
}
