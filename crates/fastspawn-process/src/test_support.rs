//! Helpers shared by the unit tests.

use fastspawn_common::Pid;
use nix::sys::wait::{waitpid, WaitStatus};

/// Reaps `pid` and returns its exit code.
pub fn exit_code(pid: Pid) -> i32 {
    match waitpid(nix::unistd::Pid::from_raw(pid.as_raw()), None).unwrap() {
        WaitStatus::Exited(_, code) => code,
        other => panic!("unexpected wait status: {:?}", other),
    }
}
