//! Mapping raw syscall results to [`SpawnResult`]s.

use fastspawn_common::{Pid, SpawnError, SpawnResult};
use nix::errno::Errno;
use tracing::debug;

/// Result of `fork`/`vfork` in the parent: a pid, or -1 with `errno` set.
pub fn map_creation(program: &str, ret: libc::pid_t) -> SpawnResult<Pid> {
    if ret < 0 {
        let errno = Errno::last();
        debug!("Process creation for '{}' failed: {}", program, errno);
        return Err(SpawnError::creation_failed(program, errno));
    }

    Pid::from_raw(ret).ok_or_else(|| SpawnError::creation_failed(program, Errno::ECHILD))
}

/// Result of `posix_spawn`/`posix_spawnp`: zero and a pid, or an error code.
pub fn map_atomic(program: &str, ret: libc::c_int, pid: libc::pid_t) -> SpawnResult<Pid> {
    if ret != 0 {
        let errno = Errno::from_raw(ret);
        debug!("posix_spawn for '{}' failed: {}", program, errno);
        return Err(SpawnError::atomic_spawn_failed(program, errno));
    }

    Pid::from_raw(pid).ok_or_else(|| SpawnError::atomic_spawn_failed(program, Errno::ECHILD))
}

/// Result of a `posix_spawn_*` setup call.
pub fn map_setup(operation: &'static str, ret: libc::c_int) -> SpawnResult<()> {
    if ret != 0 {
        return Err(SpawnError::setup_failed(operation, Errno::from_raw(ret)));
    }
    Ok(())
}
