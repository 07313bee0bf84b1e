//! Direct strategy: `vfork`/`fork` followed by `exec`.
//!
//! Everything the child touches (program path, argv array) is built by the
//! caller before the fork. The child only calls `execvp`/`execv` and, if that
//! returns, `_exit(EXEC_FAILED_EXIT_STATUS)`: no allocation, no locks, no
//! logging. With `vfork` the child borrows the parent's stack and the calling
//! thread is suspended until the child execs or exits, so nothing else is
//! allowed on that path.

use crate::command::ResolvedCommand;
use crate::config::DirectPrimitive;
use crate::outcome::map_creation;
use fastspawn_common::{Pid, SpawnResult, EXEC_FAILED_EXIT_STATUS};
use std::os::raw::c_char;
use tracing::trace;

/// Creates the child and returns as soon as the OS reports its pid.
///
/// A returned pid means the child exists, not that the program is running:
/// an exec failure shows up only as exit status [`EXEC_FAILED_EXIT_STATUS`].
pub fn spawn(command: &ResolvedCommand, primitive: DirectPrimitive) -> SpawnResult<Pid> {
    let program_name = command.program_lossy();
    let program = command.program().as_ptr();
    let argv = command.argv().as_ptr();
    let search_path = command.search_path();

    // SAFETY: `program` and `argv` point into `command`, which outlives the
    // call; the child side only passes them to exec.
    let ret = unsafe {
        match primitive {
            DirectPrimitive::Vfork => vfork_exec(program, argv, search_path),
            DirectPrimitive::Fork => fork_exec(program, argv, search_path),
        }
    };

    let pid = map_creation(&program_name, ret)?;
    trace!("Direct spawn of '{}' ({:?}) created pid {}", program_name, primitive, pid);
    Ok(pid)
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos",
    target_os = "solaris",
))]
#[inline(never)]
unsafe fn vfork_exec(
    program: *const c_char,
    argv: *const *const c_char,
    search_path: bool,
) -> libc::pid_t {
    let pid = libc::vfork();
    if pid == 0 {
        exec_or_exit(program, argv, search_path);
    }
    pid
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos",
    target_os = "solaris",
)))]
unsafe fn vfork_exec(
    program: *const c_char,
    argv: *const *const c_char,
    search_path: bool,
) -> libc::pid_t {
    fork_exec(program, argv, search_path)
}

unsafe fn fork_exec(
    program: *const c_char,
    argv: *const *const c_char,
    search_path: bool,
) -> libc::pid_t {
    let pid = libc::fork();
    if pid == 0 {
        exec_or_exit(program, argv, search_path);
    }
    pid
}

unsafe fn exec_or_exit(program: *const c_char, argv: *const *const c_char, search_path: bool) -> ! {
    if search_path {
        libc::execvp(program, argv);
    } else {
        libc::execv(program, argv);
    }
    libc::_exit(EXEC_FAILED_EXIT_STATUS)
}
