//! Argument vectors and program resolution, as seen by the child.

use e2e_tests::assertions::assert_argv;
use e2e_tests::{wait_for_exit, ProbeReport, TestExecutor};
use fastspawn_process::{
    spawn_direct, spawn_with_options, Command, FileActionMap, SpawnError,
    EXEC_FAILED_EXIT_STATUS,
};
use nix::errno::Errno;

fn check(result: Result<(), String>) {
    if let Err(e) = result {
        panic!("Test failed: {}", e);
    }
}

#[test]
fn test_direct_argv_round_trip() {
    let executor = TestExecutor::new("direct-argv");

    check(executor.run_test(|ctx| {
        let report_path = ctx.report_path("argv");
        let probe = ctx.probe();
        let report_arg = report_path.to_string_lossy().into_owned();
        let argv = [
            probe.as_str(),
            "--report-file",
            report_arg.as_str(),
            "--",
            "plain",
            "with space",
            "--dashed",
            "",
        ];

        let pid = spawn_direct(&argv).map_err(|e| e.to_string())?;
        let code = wait_for_exit(pid);
        if code != 0 {
            return Err(format!("Probe exited with {}", code));
        }

        assert_argv(&ProbeReport::load(&report_path), &argv)
    }));
}

#[test]
fn test_display_name_replaces_argv0() {
    let executor = TestExecutor::new("display-name");

    check(executor.run_test(|ctx| {
        let report_path = ctx.report_path("renamed");
        let report_arg = report_path.to_string_lossy().into_owned();

        let pid = spawn_with_options(
            None,
            Command::with_argv0(ctx.probe(), "renamed-probe"),
            ["ignored", "--report-file", report_arg.as_str()],
            FileActionMap::new(),
        )
        .map_err(|e| e.to_string())?;
        let code = wait_for_exit(pid);
        if code != 0 {
            return Err(format!("Probe exited with {}", code));
        }

        assert_argv(
            &ProbeReport::load(&report_path),
            &["renamed-probe", "--report-file", report_arg.as_str()],
        )
    }));
}

#[test]
fn test_exit_code_passes_through() {
    let executor = TestExecutor::new("exit-code");

    check(executor.run_test(|ctx| {
        let probe = ctx.probe();
        let pid = spawn_direct(&[probe.as_str(), "--exit-code", "42"]).map_err(|e| e.to_string())?;
        match wait_for_exit(pid) {
            42 => Ok(()),
            other => Err(format!("Expected exit code 42, got {}", other)),
        }
    }));
}

#[test]
fn test_direct_path_search() {
    let pid = spawn_direct(&["true"]).unwrap();
    assert_eq!(wait_for_exit(pid), 0);

    let pid = spawn_direct(&["sh", "-c", "exit 3"]).unwrap();
    assert_eq!(wait_for_exit(pid), 3);
}

#[test]
fn test_direct_missing_binary_exits_with_sentinel() {
    let pid = spawn_direct(&["/nonexistent/binary"]).unwrap();
    assert!(pid.as_raw() > 0);
    assert_eq!(wait_for_exit(pid), EXEC_FAILED_EXIT_STATUS);
}

#[test]
fn test_attributed_missing_binary_is_reported() {
    let err = spawn_with_options(
        None,
        Command::new("/nonexistent/binary"),
        ["binary"],
        FileActionMap::new(),
    )
    .unwrap_err();

    assert!(matches!(err, SpawnError::AtomicSpawnFailed { .. }));
    assert_eq!(err.errno(), Some(Errno::ENOENT));
}

#[test]
fn test_attributed_path_search_failure_is_reported() {
    let err = spawn_with_options(
        None,
        Command::new("fastspawn-no-such-program"),
        ["fastspawn-no-such-program"],
        FileActionMap::new(),
    )
    .unwrap_err();

    assert_eq!(err.errno(), Some(Errno::ENOENT));
}
