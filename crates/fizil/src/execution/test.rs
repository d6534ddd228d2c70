#![cfg(test)]

use std::{fs, os::unix::fs::PermissionsExt, path::Path, path::PathBuf, sync::Arc};

use super::{InProcessRunner, OutOfProcessRunner, classify_exit, lossy_text};
use crate::{
    project::{InputDelivery, TargetConfig},
    test_case::TestCase,
};

fn script_target(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("target.sh");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn runner_for(
    executable: PathBuf,
    input_delivery: InputDelivery,
    crash_exit_code: Option<i32>,
) -> OutOfProcessRunner {
    let target = TargetConfig {
        executable,
        isolation: Default::default(),
        input_delivery,
        crash_exit_code,
        timeout_ms: None,
    };
    OutOfProcessRunner::new(&target, 64)
}

fn test_case(data: &[u8]) -> TestCase {
    TestCase {
        data: data.to_vec(),
        file_extension: ".bin".into(),
        source_file: None,
        stage: Arc::from("runner test"),
    }
}

#[test]
fn stdin_delivery_feeds_raw_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(dir.path(), "cat");
    let runner = runner_for(target, InputDelivery::OnStandardInput, None);
    let outcome = runner.execute_test(&test_case(b"hello runner")).unwrap();
    assert!(!outcome.test_result.crashed);
    assert_eq!(outcome.test_result.exit_code, 0);
    assert_eq!(outcome.test_result.stdout, "hello runner");
    assert!(!outcome.new_path_found);
}

#[test]
fn command_line_delivery_passes_one_argument() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(dir.path(), r#"printf '%s' "$1""#);
    let runner = runner_for(target, InputDelivery::OnCommandLine, None);
    let outcome = runner.execute_test(&test_case(b"arg-input")).unwrap();
    assert_eq!(outcome.test_result.stdout, "arg-input");
}

#[test]
fn stderr_is_captured_separately() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(dir.path(), "echo out; echo err >&2; exit 3");
    let runner = runner_for(target, InputDelivery::OnCommandLine, None);
    let outcome = runner.execute_test(&test_case(b"")).unwrap();
    assert_eq!(outcome.test_result.stdout, "out\n");
    assert_eq!(outcome.test_result.stderr, "err\n");
    assert_eq!(outcome.test_result.exit_code, 3);
    assert!(!outcome.test_result.crashed, "a plain non-zero exit is not a crash");
}

#[test]
fn configured_exit_code_is_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(dir.path(), "exit 66");
    let runner = runner_for(target.clone(), InputDelivery::OnCommandLine, Some(66));
    assert!(runner.execute_test(&test_case(b"")).unwrap().test_result.crashed);

    let runner = runner_for(target, InputDelivery::OnCommandLine, Some(65));
    assert!(!runner.execute_test(&test_case(b"")).unwrap().test_result.crashed);
}

#[test]
fn signal_death_is_a_crash() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(dir.path(), "kill -SEGV $$");
    let runner = runner_for(target, InputDelivery::OnCommandLine, None);
    let outcome = runner.execute_test(&test_case(b"")).unwrap();
    assert!(outcome.test_result.crashed);
    assert_eq!(outcome.test_result.exit_code, 128 + libc_segv());
}

fn libc_segv() -> i32 {
    nix::sys::signal::Signal::SIGSEGV as i32
}

#[test]
fn target_sees_the_published_coverage_region() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(
        dir.path(),
        r#"printf 'hit' | dd of="$FIZIL_SHARED_MEMORY" conv=notrunc 2>/dev/null
test "$FIZIL_SHARED_MEMORY_SIZE" = 64 || exit 9"#,
    );
    let runner = runner_for(target, InputDelivery::OnStandardInput, None);
    let outcome = runner.execute_test(&test_case(b"")).unwrap();
    assert_eq!(outcome.test_result.exit_code, 0);
    assert_eq!(outcome.shared_memory.len(), 64);
    assert_eq!(&outcome.shared_memory[..3], b"hit");
}

#[test]
fn each_test_starts_from_a_clean_region() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(
        dir.path(),
        r#"printf 'x' | dd of="$FIZIL_SHARED_MEMORY" conv=notrunc 2>/dev/null"#,
    );
    let runner = runner_for(target, InputDelivery::OnStandardInput, None);
    let first = runner.execute_test(&test_case(b"")).unwrap();
    let second = runner.execute_test(&test_case(b"")).unwrap();
    assert_eq!(first.shared_memory, second.shared_memory);
    assert_eq!(second.shared_memory.iter().filter(|&&b| b != 0).count(), 1);
}

#[test]
fn spawn_failure_is_an_error_not_a_panic() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner_for(
        dir.path().join("does-not-exist"),
        InputDelivery::OnStandardInput,
        None,
    );
    assert!(runner.execute_test(&test_case(b"")).is_err());
}

#[test]
fn timed_out_targets_are_killed_and_not_crashes() {
    let dir = tempfile::tempdir().unwrap();
    let target = script_target(dir.path(), "sleep 30");
    let config = TargetConfig {
        executable: target,
        isolation: Default::default(),
        input_delivery: InputDelivery::OnCommandLine,
        crash_exit_code: None,
        timeout_ms: Some(100),
    };
    let runner = OutOfProcessRunner::new(&config, 64);
    let outcome = runner.execute_test(&test_case(b"")).unwrap();
    assert!(!outcome.test_result.crashed);
    assert!(outcome.test_result.stderr.contains("timed out"));
}

#[test]
fn broken_pipe_on_stdin_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    // exits without reading; writing a large input must not error out
    let target = script_target(dir.path(), "exit 0");
    let runner = runner_for(target, InputDelivery::OnStandardInput, None);
    let big = vec![0x41u8; 1 << 20];
    let outcome = runner.execute_test(&test_case(&big)).unwrap();
    assert_eq!(outcome.test_result.exit_code, 0);
}

#[test]
fn missing_target_binary_fails_in_process_construction() {
    let dir = tempfile::tempdir().unwrap();
    let err = InProcessRunner::new(&dir.path().join("no-such-target.so"), 64)
        .err()
        .expect("loading must fail");
    assert!(err.to_string().contains("failed to load target binary"));
}

#[test]
fn lossy_text_strips_nul_and_keeps_the_rest() {
    assert_eq!(lossy_text(b"ab\0cd"), "abcd");
    assert_eq!(lossy_text(&[0xff, b'a']), "\u{fffd}a");
}

#[test]
fn classify_prefers_signals_over_codes() {
    use std::os::unix::process::ExitStatusExt;
    let signalled = std::process::ExitStatus::from_raw(libc_segv());
    assert_eq!(classify_exit(signalled, None), (true, 128 + libc_segv()));

    let clean = std::process::ExitStatus::from_raw(0);
    assert_eq!(classify_exit(clean, Some(0)), (true, 0));
    assert_eq!(classify_exit(clean, None), (false, 0));
}
