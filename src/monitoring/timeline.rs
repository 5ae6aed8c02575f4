//! Execution Timeline
//!
//! Tracks step start/end times so a finished run can report how long
//! each tool took.

use std::time::{Duration, Instant};

/// Type of timeline event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    /// Step started executing
    Started,
    /// Step completed successfully
    Completed,
    /// Step failed
    Failed,
}

/// A single event in the execution timeline.
#[derive(Debug, Clone)]
pub struct TimelineEvent {
    /// Name of the step
    pub step: String,
    /// Type of event
    pub event_type: EventType,
    /// When the event occurred
    pub timestamp: Instant,
}

/// Records when each step of a run starts and finishes.
#[derive(Debug, Clone)]
pub struct ExecutionTimeline {
    events: Vec<TimelineEvent>,
    start_time: Instant,
}

impl ExecutionTimeline {
    /// Creates a new timeline starting now.
    pub fn new() -> Self {
        Self {
            events: Vec::new(),
            start_time: Instant::now(),
        }
    }

    /// Records an event for a step.
    pub fn add_event(&mut self, step: impl Into<String>, event_type: EventType) {
        self.events.push(TimelineEvent {
            step: step.into(),
            event_type,
            timestamp: Instant::now(),
        });
    }

    /// Returns all recorded events.
    pub fn get_events(&self) -> &[TimelineEvent] {
        &self.events
    }

    /// Returns the total elapsed time since timeline creation.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns finished steps with their durations, in start order.
    ///
    /// Steps that started but never finished are left out.
    pub fn get_durations(&self) -> Vec<(String, Duration)> {
        let mut durations = Vec::new();
        let mut open: Vec<(&str, Instant)> = Vec::new();

        for event in &self.events {
            match event.event_type {
                EventType::Started => open.push((event.step.as_str(), event.timestamp)),
                EventType::Completed | EventType::Failed => {
                    if let Some(pos) = open.iter().position(|(step, _)| *step == event.step) {
                        let (step, started) = open.remove(pos);
                        durations.push((step.to_string(), event.timestamp - started));
                    }
                }
            }
        }

        durations
    }

    /// One line per finished step, followed by the total.
    pub fn summary(&self) -> String {
        let mut output = String::new();

        for (step, duration) in self.get_durations() {
            output.push_str(&format!("{:16} {:>8} ms\n", truncate(&step, 16), duration.as_millis()));
        }

        output.push_str(&format!("Total: {} ms", self.elapsed().as_millis()));
        output
    }
}

impl Default for ExecutionTimeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Truncates a string to at most `max_len` characters, ellipsis included.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len < 3 {
        s.chars().take(max_len).collect()
    } else {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_timeline_creation() {
        let timeline = ExecutionTimeline::new();
        assert!(timeline.get_events().is_empty());
    }

    #[test]
    fn test_get_durations() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("go build", EventType::Started);
        thread::sleep(Duration::from_millis(50));
        timeline.add_event("go build", EventType::Completed);

        let durations = timeline.get_durations();
        assert_eq!(durations.len(), 1);
        assert_eq!(durations[0].0, "go build");
        assert!(durations[0].1 >= Duration::from_millis(50));
    }

    #[test]
    fn test_durations_keep_start_order() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("go build", EventType::Started);
        timeline.add_event("go build", EventType::Completed);
        timeline.add_event("go test", EventType::Started);
        timeline.add_event("go test", EventType::Failed);

        let names: Vec<String> = timeline.get_durations().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["go build", "go test"]);
    }

    #[test]
    fn test_get_durations_only_started() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("git push", EventType::Started);

        assert!(timeline.get_durations().is_empty());
    }

    #[test]
    fn test_summary_lists_steps() {
        let mut timeline = ExecutionTimeline::new();
        timeline.add_event("lint", EventType::Started);
        timeline.add_event("lint", EventType::Completed);

        let summary = timeline.summary();
        assert!(summary.contains("lint"));
        assert!(summary.contains("Total:"));
    }

    #[test]
    fn test_truncate_long_names() {
        assert_eq!(truncate("go build", 16), "go build");
        assert_eq!(truncate("a-very-long-step-name", 10), "a-very-...");
    }

    #[test]
    fn test_truncate_below_ellipsis_width() {
        assert_eq!(truncate("golangci-lint", 2), "go");
        assert_eq!(truncate("golangci-lint", 0), "");
        assert_eq!(truncate("go", 2), "go");
    }
}
