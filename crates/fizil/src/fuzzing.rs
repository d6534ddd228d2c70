//! The run driver: wires the pipeline, the runner and the aggregator
//! together and owns the serial-versus-parallel decision.

use std::time::SystemTime;

use anyhow::Context;
use rayon::iter::{ParallelBridge, ParallelIterator};
use tracing::{info, warn};

use crate::{
    aggregator::{self, Aggregator, RunSummary},
    dictionary::Dictionary,
    execution::{self, Runner, TestOutcome},
    pipeline,
    project::FuzzProject,
    status::{RunInfo, StatusSink},
    test_case::Example,
};

/// What a run can come back with. Everything more granular (crashes found,
/// findings persisted) is observable through status events and the summary.
#[derive(Debug)]
pub enum RunOutcome {
    /// The examples directory held no usable inputs; nothing was executed.
    ExamplesNotFound,
    Success(RunSummary),
}

pub fn run(project: &FuzzProject, mut status: Box<dyn StatusSink>) -> anyhow::Result<RunOutcome> {
    let examples = Example::load_all(&project.examples_directory).with_context(|| {
        format!(
            "Reading examples from {}",
            project.examples_directory.display()
        )
    })?;
    if examples.is_empty() {
        warn!(directory = %project.examples_directory.display(), "No examples found");
        return Ok(RunOutcome::ExamplesNotFound);
    }

    execution::disable_crash_reporting();

    let dictionary = match &project.dictionary {
        Some(path) => Dictionary::from_file(path)?,
        None => Dictionary::empty(),
    };

    status.initialize(&RunInfo {
        start_time: SystemTime::now(),
        example_bytes: examples.iter().map(|example| example.data.len() as u64).sum(),
        example_count: examples.len(),
    });
    info!(
        expected_test_cases = pipeline::expected_total(&examples, &dictionary),
        "Pipeline planned"
    );

    // Built before the stream so a bad target configuration stops the run
    // up front instead of failing every test.
    let mut runner = Runner::for_project(project)?;

    let findings_folder = aggregator::pick_findings_folder(&project.examples_directory);
    let aggregator = Aggregator::spawn(findings_folder, status);
    let stream = pipeline::test_cases(examples, &dictionary);

    match &mut runner {
        Runner::OutOfProcess(runner) => {
            let runner = &*runner;
            let aggregator = &aggregator;
            stream.par_bridge().for_each(move |test_case| {
                let outcome = runner.execute_test(&test_case).unwrap_or_else(|err| {
                    warn!(error = %format!("{err:#}"), "Test execution failed");
                    TestOutcome::runner_failure(test_case, &err)
                });
                aggregator.post(outcome);
            });
        }
        Runner::InProcess(runner) => {
            for test_case in stream {
                let outcome = runner.execute_test(&test_case).unwrap_or_else(|err| {
                    warn!(error = %format!("{err:#}"), "Test execution failed");
                    TestOutcome::runner_failure(test_case, &err)
                });
                aggregator.post(outcome);
            }
        }
    }
    drop(runner);

    let summary = aggregator.finish()?;
    info!(
        executions = summary.executions,
        crashes = summary.crashes,
        nonzero_exits = summary.nonzero_exits,
        paths = summary.paths,
        findings = summary.findings,
        "Run complete"
    );
    Ok(RunOutcome::Success(summary))
}
