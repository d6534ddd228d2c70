//! In-process execution.
//!
//! The target binary is loaded once and its entry point is called directly,
//! trading isolation for speed. The loaded target and the single coverage
//! region are process-global, which is why this mode is serial.

use std::{
    ffi::{CStr, CString, c_char},
    path::{Path, PathBuf},
};

use anyhow::Context;
use libloading::Library;

use super::{TestOutcome, TestResult, lossy_text};
use crate::{coverage::CoverageMap, instrumentation, test_case::TestCase};

/// Result record returned by an instrumented entry point, C layout.
#[repr(C)]
#[derive(Debug)]
pub struct RawTestResult {
    pub crashed: bool,
    pub exit_code: i32,
    /// Null, or a NUL-terminated string owned by the target.
    pub stderr: *const c_char,
    pub stdout: *const c_char,
}

type BytesEntry = unsafe extern "C" fn(data: *const u8, len: usize) -> RawTestResult;
type StringEntry = unsafe extern "C" fn(text: *const c_char) -> RawTestResult;

/// The entry point takes exactly one parameter, either raw bytes or a
/// string; which one decides how test data is handed over.
#[derive(Debug, Clone, Copy)]
enum EntryPoint {
    Bytes(BytesEntry),
    String(StringEntry),
}

#[derive(Debug, thiserror::Error)]
pub enum TargetError {
    #[error("failed to load target binary {path}")]
    Load {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },
    #[error(
        "no fuzzing entry point in {path}: expected an exported `{bytes}` \
         taking raw bytes or `{string}` taking a C string",
        bytes = instrumentation::BYTES_ENTRY_POINT,
        string = instrumentation::STRING_ENTRY_POINT
    )]
    EntryPointNotFound { path: PathBuf },
}

#[derive(Debug)]
pub struct InProcessRunner {
    entry: EntryPoint,
    coverage: CoverageMap,
    /// Keeps the target mapped; `entry` points into it.
    _library: Library,
}

impl InProcessRunner {
    pub fn new(executable: &Path, map_size: usize) -> anyhow::Result<Self> {
        // SAFETY: loading the target runs its initializers; fuzzing it is
        // the whole point of the run.
        let library = unsafe { Library::new(executable) }.map_err(|source| TargetError::Load {
            path: executable.to_owned(),
            source,
        })?;
        let entry = resolve_entry_point(&library, executable)?;

        let coverage = CoverageMap::create(map_size).context("Creating coverage region")?;
        // SAFETY: runners are built before any worker thread exists, and
        // in-process mode stays single-threaded.
        unsafe { coverage.publish_in_process() };

        Ok(Self {
            entry,
            coverage,
            _library: library,
        })
    }

    pub fn execute_test(&mut self, test_case: &TestCase) -> anyhow::Result<TestOutcome> {
        self.coverage.clear();
        let raw = match self.entry {
            EntryPoint::Bytes(entry) => {
                // SAFETY: the contract says the entry reads exactly `len`
                // bytes and returns a valid result record.
                unsafe { entry(test_case.data.as_ptr(), test_case.data.len()) }
            }
            EntryPoint::String(entry) => {
                let text =
                    CString::new(lossy_text(&test_case.data)).context("Building C string input")?;
                // SAFETY: as above; `text` stays alive across the call.
                unsafe { entry(text.as_ptr()) }
            }
        };
        // SAFETY: the record's string pointers follow the contract above.
        let test_result = unsafe { raw.into_test_result() };
        Ok(TestOutcome::new(
            test_case.clone(),
            test_result,
            self.coverage.snapshot(),
        ))
    }
}

fn resolve_entry_point(library: &Library, path: &Path) -> Result<EntryPoint, TargetError> {
    // SAFETY: the signatures of these exports are fixed by the
    // instrumentation contract.
    unsafe {
        if let Ok(symbol) =
            library.get::<BytesEntry>(instrumentation::BYTES_ENTRY_POINT.as_bytes())
        {
            return Ok(EntryPoint::Bytes(*symbol));
        }
        if let Ok(symbol) =
            library.get::<StringEntry>(instrumentation::STRING_ENTRY_POINT.as_bytes())
        {
            return Ok(EntryPoint::String(*symbol));
        }
    }
    Err(TargetError::EntryPointNotFound {
        path: path.to_owned(),
    })
}

impl RawTestResult {
    /// # Safety
    /// The string pointers must be null or point to NUL-terminated strings
    /// that stay valid for the duration of this call.
    unsafe fn into_test_result(self) -> TestResult {
        let text = |ptr: *const c_char| {
            if ptr.is_null() {
                String::new()
            } else {
                // SAFETY: non-null pointers are NUL-terminated per the
                // caller's guarantee.
                unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
            }
        };
        TestResult {
            crashed: self.crashed,
            exit_code: self.exit_code,
            stderr: text(self.stderr),
            stdout: text(self.stdout),
        }
    }
}
