//! Run Monitoring Module
//!
//! - [`ExecutionTimeline`]: step start/end timing for run reports

pub mod timeline;

pub use timeline::{EventType, ExecutionTimeline, TimelineEvent};
