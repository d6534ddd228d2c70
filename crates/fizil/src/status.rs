//! Structured status events. The console display is a consumer of these, not
//! part of the core.

use std::time::SystemTime;

use tracing::info;

use crate::execution::TestOutcome;

/// Emitted once, before the first test runs.
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub start_time: SystemTime,
    /// Total size of all examples.
    pub example_bytes: u64,
    pub example_count: usize,
}

/// Receives one `initialize` and then an `update` per completed test, in
/// aggregator arrival order.
pub trait StatusSink: Send {
    fn initialize(&mut self, info: &RunInfo);
    fn update(&mut self, outcome: &TestOutcome);
}

/// Reports progress through the log.
#[derive(Debug, Default)]
pub struct LogStatusSink {
    updates: u64,
}

impl LogStatusSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusSink for LogStatusSink {
    fn initialize(&mut self, info: &RunInfo) {
        info!(
            examples = info.example_count,
            example_bytes = info.example_bytes,
            "Run starting"
        );
    }

    fn update(&mut self, outcome: &TestOutcome) {
        self.updates += 1;
        if outcome.new_path_found || outcome.test_result.crashed {
            info!(
                executed = self.updates,
                stage = %outcome.test_case.stage,
                crashed = outcome.test_result.crashed,
                new_path = outcome.new_path_found,
                "Progress"
            );
        }
    }
}

/// Swallows everything; for callers that only want the summary.
#[derive(Debug, Default)]
pub struct DiscardStatusSink;

impl StatusSink for DiscardStatusSink {
    fn initialize(&mut self, _info: &RunInfo) {}

    fn update(&mut self, _outcome: &TestOutcome) {}
}
