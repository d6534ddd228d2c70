//! The single consumer of execution results.
//!
//! All mutable run state lives here: the set of observed coverage hashes,
//! the finding counter, and the run statistics. Results arrive over a
//! bounded channel from however many workers the driver runs; processing
//! order is arrival order, which is what makes finding numbering
//! deterministic under parallel execution.

use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
    thread::JoinHandle,
};

use anyhow::Context;
use crossbeam_channel::Sender;
use md5::{Digest, Md5};
use tracing::{debug, info, warn};

use crate::{
    execution::TestOutcome,
    status::StatusSink,
};

/// Capacity of the result channel. Producers block briefly when the
/// aggregator falls behind instead of queueing unboundedly.
const RESULT_CHANNEL_CAPACITY: usize = 128;

#[derive(Debug)]
pub enum Message {
    TestComplete(Box<TestOutcome>),
    AllTestsComplete(Sender<RunSummary>),
}

/// Final state of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub executions: u64,
    pub crashes: u64,
    pub nonzero_exits: u64,
    pub paths: usize,
    pub findings: u64,
    pub findings_folder: PathBuf,
}

/// Handle held by the driver; cloneable senders go to the workers.
#[derive(Debug)]
pub struct Aggregator {
    sender: Sender<Message>,
    worker: JoinHandle<()>,
}

impl Aggregator {
    /// Starts the consumer thread. `findings_folder` must not exist yet; it
    /// is created lazily when the first finding is persisted.
    pub fn spawn(findings_folder: PathBuf, status: Box<dyn StatusSink>) -> Self {
        let (sender, receiver) = crossbeam_channel::bounded(RESULT_CHANNEL_CAPACITY);
        let mut state = ExecutionState::new(findings_folder, status);
        let worker = std::thread::spawn(move || {
            for message in receiver {
                match message {
                    Message::TestComplete(outcome) => state.on_test_complete(*outcome),
                    Message::AllTestsComplete(reply) => {
                        let _ = reply.send(state.into_summary());
                        return;
                    }
                }
            }
        });
        Self { sender, worker }
    }

    /// Posts a completed test. Fire-and-forget: a dead aggregator only
    /// means the summary will report what it saw.
    pub fn post(&self, outcome: TestOutcome) {
        let _ = self.sender.send(Message::TestComplete(Box::new(outcome)));
    }

    /// Barrier: waits until every queued result is processed and returns
    /// the final state.
    pub fn finish(self) -> anyhow::Result<RunSummary> {
        let (reply, response) = crossbeam_channel::bounded(1);
        self.sender
            .send(Message::AllTestsComplete(reply))
            .context("Aggregator is gone")?;
        let summary = response.recv().context("Aggregator dropped the reply")?;
        let _ = self.worker.join();
        Ok(summary)
    }
}

/// Aggregator-private mutable state.
struct ExecutionState {
    observed_paths: HashSet<String>,
    finding_name: u64,
    findings_folder: PathBuf,
    status: Box<dyn StatusSink>,
    executions: u64,
    crashes: u64,
    nonzero_exits: u64,
}

impl ExecutionState {
    fn new(findings_folder: PathBuf, status: Box<dyn StatusSink>) -> Self {
        Self {
            observed_paths: HashSet::new(),
            finding_name: 0,
            findings_folder,
            status,
            executions: 0,
            crashes: 0,
            nonzero_exits: 0,
        }
    }

    fn on_test_complete(&mut self, mut outcome: TestOutcome) {
        self.executions += 1;

        let path_hash = hex::encode(Md5::digest(&outcome.shared_memory));
        let new_path_found = self.observed_paths.insert(path_hash);
        outcome.new_path_found = new_path_found;

        let result = &outcome.test_result;
        if result.crashed {
            self.crashes += 1;
            info!(
                stage = %outcome.test_case.stage,
                exit_code = result.exit_code,
                "Target crashed"
            );
        } else if result.exit_code != 0 {
            self.nonzero_exits += 1;
            debug!(exit_code = result.exit_code, "Non-zero exit");
        }
        if new_path_found {
            info!(stage = %outcome.test_case.stage, "New path");
        }
        if !result.stdout.is_empty() {
            debug!(stdout = %result.stdout, "Target stdout");
        }
        if !result.stderr.is_empty() {
            debug!(stderr = %result.stderr, "Target stderr");
        }

        self.status.update(&outcome);

        let worth_recording = result.crashed
            && outcome.new_path_found
            && outcome.test_case.source_file.is_none();
        if worth_recording {
            // A lost finding is better than a halted run.
            if let Err(err) = self.record_finding(&outcome) {
                warn!(error = %format!("{err:#}"), "Failed to record finding");
            }
        }
    }

    fn record_finding(&mut self, outcome: &TestOutcome) -> anyhow::Result<()> {
        fs::create_dir_all(&self.findings_folder).with_context(|| {
            format!("Creating findings folder {}", self.findings_folder.display())
        })?;
        let file_name = format!("{}{}", self.finding_name, outcome.test_case.file_extension);
        let path = self.findings_folder.join(file_name);
        fs::write(&path, &outcome.test_case.data)
            .with_context(|| format!("Writing finding {}", path.display()))?;
        info!(path = %path.display(), "Finding recorded");
        self.finding_name += 1;
        Ok(())
    }

    fn into_summary(self) -> RunSummary {
        RunSummary {
            executions: self.executions,
            crashes: self.crashes,
            nonzero_exits: self.nonzero_exits,
            paths: self.observed_paths.len(),
            findings: self.finding_name,
            findings_folder: self.findings_folder,
        }
    }
}

/// Picks `findings_<timestamp>` under the examples root, appending `_` until
/// the name is unused.
pub fn pick_findings_folder(examples_root: &Path) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    let mut name = format!("findings_{stamp}");
    loop {
        let candidate = examples_root.join(&name);
        if !candidate.exists() {
            return candidate;
        }
        name.push('_');
    }
}
