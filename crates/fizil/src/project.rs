//! Project configuration.
//!
//! A project file describes one fuzzing target: where it lives, how it is
//! isolated, how input reaches it, and where the seed examples are. The CLI
//! deserializes this from JSON; the core only consumes the typed form.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::instrumentation;

/// Whether the target runs inside the fuzzer's process or as a child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationMode {
    /// Load the target binary once and call its entry point directly.
    /// Serial: the loaded target and its coverage region are process-global.
    InProcess,
    /// Spawn the target as a child per test. Parallel-capable.
    #[default]
    OutOfProcess,
}

/// How the test bytes reach an out-of-process target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputDelivery {
    /// Bytes are converted to a string and passed as the process argument.
    OnCommandLine,
    /// Bytes are written verbatim to the child's stdin, then stdin is closed.
    #[default]
    OnStandardInput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub executable: PathBuf,
    #[serde(default)]
    pub isolation: IsolationMode,
    #[serde(default)]
    pub input_delivery: InputDelivery,
    /// Exit code the platform uses for unhandled exceptions in the target
    /// runtime. Death by signal always counts as a crash; this adds an
    /// exit-code sentinel on top (e.g. a CLR host exiting with 0xE0434352
    /// truncates to its low byte under Unix wait semantics).
    #[serde(default)]
    pub crash_exit_code: Option<i32>,
    /// Per-test timeout in milliseconds. Timed-out targets are killed and
    /// recorded as non-crashes.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuzzProject {
    pub target: TargetConfig,
    /// Directory of seed inputs. Findings folders are created under it.
    pub examples_directory: PathBuf,
    /// Optional AFL-style dictionary file.
    #[serde(default)]
    pub dictionary: Option<PathBuf>,
    /// Coverage bitmap size; fixed for the lifetime of a run.
    #[serde(default = "default_map_size")]
    pub coverage_map_size: usize,
}

fn default_map_size() -> usize {
    instrumentation::DEFAULT_MAP_SIZE
}
