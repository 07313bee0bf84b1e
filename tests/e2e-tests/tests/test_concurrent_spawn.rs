//! Many callers creating children at the same time.
//!
//! Every spawn builds its own environment block and file actions, so children
//! must never see each other's overrides.

use e2e_tests::assertions::assert_env_var;
use e2e_tests::{get_probe_path, wait_for_exit, ProbeReport, TestExecutor};
use fastspawn_process::{
    spawn_direct, Command, EnvOverrides, FileActionMap, SpawnConfig, SpawnRequest, Spawner,
};
use std::sync::Arc;

const CALLERS: usize = 16;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_spawns_keep_their_environment() {
    let executor = TestExecutor::new("concurrent-env");
    let spawner = Arc::new(Spawner::new(SpawnConfig::default()));
    let probe = get_probe_path().to_string_lossy().into_owned();

    let mut handles = Vec::new();
    for i in 0..CALLERS {
        let spawner = Arc::clone(&spawner);
        let probe = probe.clone();
        let report_path = executor.report_path(&format!("caller-{}", i));

        handles.push(tokio::task::spawn_blocking(move || {
            let report_arg = report_path.to_string_lossy().into_owned();
            let mut env = EnvOverrides::new();
            env.set("FASTSPAWN_CALLER", i.to_string());

            let request = SpawnRequest::new(
                Command::new(probe),
                ["probe", "--report-file", report_arg.as_str()],
            )
            .env(env)
            .file_actions(FileActionMap::new());

            let pid = spawner
                .spawn_with_options(request)
                .map_err(|e| format!("caller {}: {}", i, e))?;
            match wait_for_exit(pid) {
                0 => {}
                code => return Err(format!("caller {}: probe exited with {}", i, code)),
            }

            let report = ProbeReport::load(&report_path);
            assert_env_var(&report, "FASTSPAWN_CALLER", &i.to_string())
        }));
    }

    for handle in handles {
        if let Err(e) = handle.await.expect("spawn task panicked") {
            panic!("Test failed: {}", e);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_direct_spawns() {
    let mut handles = Vec::new();
    for i in 0..CALLERS {
        handles.push(tokio::task::spawn_blocking(move || {
            let script = format!("exit {}", i);
            let pid = spawn_direct(&["sh", "-c", script.as_str()]).expect("direct spawn failed");
            (i as i32, wait_for_exit(pid))
        }));
    }

    for handle in handles {
        let (expected, code) = handle.await.expect("spawn task panicked");
        assert_eq!(code, expected);
    }
}
