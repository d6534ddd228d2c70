//! Test execution.
//!
//! A runner takes a test case, runs the target on it, and reports the
//! target's result together with a snapshot of the coverage region. Novelty
//! is not decided here; runners always hand back `new_path_found = false`
//! and the aggregator fills it in.

use std::process::ExitStatus;

use tracing::warn;

use crate::{
    project::{FuzzProject, IsolationMode},
    test_case::TestCase,
};

pub mod in_process;
pub mod out_of_process;
mod test;

pub use in_process::{InProcessRunner, TargetError};
pub use out_of_process::OutOfProcessRunner;

/// What the target did with one input.
#[derive(Debug, Clone)]
pub struct TestResult {
    pub crashed: bool,
    pub exit_code: i32,
    pub stderr: String,
    pub stdout: String,
}

/// One completed execution, ready for the aggregator.
#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub test_case: TestCase,
    pub test_result: TestResult,
    /// Coverage bitmap contents after the execution.
    pub shared_memory: Vec<u8>,
    /// Decided by the aggregator; runners leave this false.
    pub new_path_found: bool,
}

impl TestOutcome {
    pub fn new(test_case: TestCase, test_result: TestResult, shared_memory: Vec<u8>) -> Self {
        Self {
            test_case,
            test_result,
            shared_memory,
            new_path_found: false,
        }
    }

    /// A runner failure, recorded as a non-crash with the error text in
    /// stderr so the run keeps going.
    pub fn runner_failure(test_case: TestCase, error: &anyhow::Error) -> Self {
        let test_result = TestResult {
            crashed: false,
            exit_code: -1,
            stderr: format!("{error:#}"),
            stdout: String::new(),
        };
        Self::new(test_case, test_result, Vec::new())
    }
}

/// The two isolation modes behind one surface.
#[derive(Debug)]
pub enum Runner {
    OutOfProcess(OutOfProcessRunner),
    InProcess(InProcessRunner),
}

impl Runner {
    pub fn for_project(project: &FuzzProject) -> anyhow::Result<Self> {
        let runner = match project.target.isolation {
            IsolationMode::OutOfProcess => Self::OutOfProcess(OutOfProcessRunner::new(
                &project.target,
                project.coverage_map_size,
            )),
            IsolationMode::InProcess => Self::InProcess(InProcessRunner::new(
                &project.target.executable,
                project.coverage_map_size,
            )?),
        };
        Ok(runner)
    }

    pub fn execute_test(&mut self, test_case: &TestCase) -> anyhow::Result<TestOutcome> {
        match self {
            Self::OutOfProcess(runner) => runner.execute_test(test_case),
            Self::InProcess(runner) => runner.execute_test(test_case),
        }
    }
}

/// Crash iff the target died to a signal or exited with the configured
/// unhandled-exception code. Other non-zero exits are the target's own
/// business and get tracked separately.
pub(crate) fn classify_exit(status: ExitStatus, crash_exit_code: Option<i32>) -> (bool, i32) {
    use std::os::unix::process::ExitStatusExt;

    if let Some(signal) = status.signal() {
        return (true, 128 + signal);
    }
    let exit_code = status.code().unwrap_or(-1);
    (crash_exit_code == Some(exit_code), exit_code)
}

/// Best-effort text form of a test buffer, for command lines and C-string
/// entry points. NUL cannot cross `execve`.
pub(crate) fn lossy_text(data: &[u8]) -> String {
    String::from_utf8_lossy(data).replace('\0', "")
}

/// Keeps crashes inside the fuzzer: without core dumps the OS crash
/// machinery stays out of the way, and children inherit the limit.
pub fn disable_crash_reporting() {
    use nix::sys::resource::{Resource, setrlimit};

    if let Err(err) = setrlimit(Resource::RLIMIT_CORE, 0, 0) {
        warn!(%err, "Could not disable core dumps");
    }
}
