//! Child-process execution. Every test gets a fresh coverage region and a
//! fresh child, so parallel workers never share state.

use std::{
    io::{self, Write},
    path::PathBuf,
    process::{Command, Stdio},
    time::Duration,
};

use anyhow::Context;
use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};
use tracing::warn;

use super::{TestOutcome, TestResult, classify_exit, lossy_text};
use crate::{
    coverage::CoverageMap,
    project::{InputDelivery, TargetConfig},
    test_case::TestCase,
};

#[derive(Debug)]
pub struct OutOfProcessRunner {
    executable: PathBuf,
    input_delivery: InputDelivery,
    crash_exit_code: Option<i32>,
    timeout: Option<Duration>,
    map_size: usize,
}

impl OutOfProcessRunner {
    pub fn new(target: &TargetConfig, map_size: usize) -> Self {
        Self {
            executable: target.executable.clone(),
            input_delivery: target.input_delivery,
            crash_exit_code: target.crash_exit_code,
            timeout: target.timeout_ms.map(Duration::from_millis),
            map_size,
        }
    }

    pub fn execute_test(&self, test_case: &TestCase) -> anyhow::Result<TestOutcome> {
        let coverage = CoverageMap::create(self.map_size).context("Creating coverage region")?;

        let mut command = Command::new(&self.executable);
        coverage.apply_to_command(&mut command);
        command.stdout(Stdio::piped()).stderr(Stdio::piped());
        match self.input_delivery {
            InputDelivery::OnCommandLine => {
                command.arg(lossy_text(&test_case.data));
                command.stdin(Stdio::null());
            }
            InputDelivery::OnStandardInput => {
                command.stdin(Stdio::piped());
            }
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("Spawning target {}", self.executable.display()))?;
        // Armed before stdin is written: a target that never reads would
        // otherwise block the writer past any deadline.
        let watchdog = self.timeout.map(|timeout| spawn_watchdog(&child, timeout));

        if self.input_delivery == InputDelivery::OnStandardInput {
            let mut stdin = child.stdin.take().expect("We set it to pipe");
            match stdin.write_all(&test_case.data) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                    // The target exited before reading everything.
                }
                err => err.context("Writing to target stdin")?,
            }
            // Dropping the handle closes the pipe.
        }

        let output = child.wait_with_output().context("Waiting for target")?;
        let timed_out = watchdog.is_some_and(|watchdog| watchdog.finish());

        let (crashed, exit_code) = classify_exit(output.status, self.crash_exit_code);
        let test_result = if timed_out {
            TestResult {
                crashed: false,
                exit_code,
                stderr: format!(
                    "target timed out after {}ms",
                    self.timeout.unwrap_or_default().as_millis()
                ),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            }
        } else {
            TestResult {
                crashed,
                exit_code,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            }
        };

        Ok(TestOutcome::new(
            test_case.clone(),
            test_result,
            coverage.snapshot(),
        ))
    }
}

struct Watchdog {
    done: crossbeam_channel::Sender<()>,
    handle: std::thread::JoinHandle<bool>,
}

impl Watchdog {
    /// Returns whether the watchdog had to kill the target.
    fn finish(self) -> bool {
        let _ = self.done.send(());
        self.handle.join().unwrap_or(false)
    }
}

fn spawn_watchdog(child: &std::process::Child, timeout: Duration) -> Watchdog {
    let (done, expired) = crossbeam_channel::bounded::<()>(1);
    let pid = Pid::from_raw(child.id() as i32);
    let handle = std::thread::spawn(move || {
        if expired.recv_timeout(timeout).is_ok() {
            return false;
        }
        match signal::kill(pid, Signal::SIGKILL) {
            // ESRCH means the target beat us to the exit
            Ok(()) | Err(Errno::ESRCH) => {}
            Err(err) => warn!(%err, %pid, "Failed to kill timed-out target"),
        }
        true
    });
    Watchdog { done, handle }
}
