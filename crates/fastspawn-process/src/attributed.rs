//! Attributed strategy: one `posix_spawn` call that creates the child, applies
//! the file actions and loads the program.
//!
//! The file-actions and attribute objects are RAII guards over stack storage.
//! They are declared in acquisition order, so Rust drops them in reverse:
//! attributes first, then file actions. The environment block and argv are
//! borrowed from the caller and freed by it after this function returns.

use crate::command::ResolvedCommand;
use crate::config::SpawnConfig;
use crate::environment::EnvironmentBlock;
use crate::file_actions::ResolvedFileAction;
use crate::outcome::{map_atomic, map_setup};
use fastspawn_common::{Pid, SpawnResult};
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
use fastspawn_common::SpawnError;
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
use nix::errno::Errno;
use nix::sys::signal::SigSet;
use std::ffi::CStr;
use std::mem::MaybeUninit;
use std::os::raw::c_char;
use tracing::trace;

// Newer glibc versions always behave this way and ignore the flag.
#[cfg(target_os = "linux")]
const POSIX_SPAWN_USEVFORK: libc::c_int = libc::POSIX_SPAWN_USEVFORK as libc::c_int;
#[cfg(not(target_os = "linux"))]
const POSIX_SPAWN_USEVFORK: libc::c_int = 0;

/// Spawns `command` with `actions` applied and `env` as its environment.
///
/// The working directory change, if any, runs after every other file action,
/// so relative open paths are resolved against the caller's directory.
pub fn spawn(
    command: &ResolvedCommand,
    env: &EnvironmentBlock,
    actions: &[ResolvedFileAction],
    current_dir: Option<&CStr>,
    config: &SpawnConfig,
) -> SpawnResult<Pid> {
    let program_name = command.program_lossy();

    let mut raw_actions = MaybeUninit::uninit();
    let mut file_actions = FileActions::init(&mut raw_actions)?;
    for action in actions {
        file_actions.add(action)?;
    }
    if let Some(dir) = current_dir {
        file_actions.chdir(dir)?;
    }

    let mut raw_attr = MaybeUninit::uninit();
    let mut attr = SpawnAttr::init(&mut raw_attr)?;
    attr.configure(config)?;

    let mut pid: libc::pid_t = 0;
    let argv = command.argv().as_ptr() as *const *mut c_char;
    let envp = env.as_ptr() as *const *mut c_char;

    // SAFETY: both objects were initialized above, and every pointer refers
    // to a null-terminated buffer borrowed for the duration of the call.
    let ret = unsafe {
        if command.search_path() {
            libc::posix_spawnp(
                &mut pid,
                command.program().as_ptr(),
                file_actions.as_ptr(),
                attr.as_ptr(),
                argv,
                envp,
            )
        } else {
            libc::posix_spawn(
                &mut pid,
                command.program().as_ptr(),
                file_actions.as_ptr(),
                attr.as_ptr(),
                argv,
                envp,
            )
        }
    };

    let pid = map_atomic(&program_name, ret, pid)?;
    trace!(
        "posix_spawn of '{}' with {} file actions created pid {}",
        program_name,
        actions.len(),
        pid
    );
    Ok(pid)
}

struct FileActions<'a>(&'a mut MaybeUninit<libc::posix_spawn_file_actions_t>);

impl<'a> FileActions<'a> {
    fn init(raw: &'a mut MaybeUninit<libc::posix_spawn_file_actions_t>) -> SpawnResult<Self> {
        // SAFETY: init writes a valid object into the uninitialized storage.
        let ret = unsafe { libc::posix_spawn_file_actions_init(raw.as_mut_ptr()) };
        map_setup("posix_spawn_file_actions_init", ret)?;
        Ok(Self(raw))
    }

    fn add(&mut self, action: &ResolvedFileAction) -> SpawnResult<()> {
        let actions = self.0.as_mut_ptr();

        // SAFETY: `actions` was initialized in init(); the open path is
        // copied by libc or outlives the spawn call.
        match action {
            ResolvedFileAction::Close(fd) => map_setup(
                "posix_spawn_file_actions_addclose",
                unsafe { libc::posix_spawn_file_actions_addclose(actions, *fd) },
            ),
            ResolvedFileAction::Duplicate { target, source } => map_setup(
                "posix_spawn_file_actions_adddup2",
                unsafe { libc::posix_spawn_file_actions_adddup2(actions, *source, *target) },
            ),
            ResolvedFileAction::Open {
                target,
                path,
                flags,
                mode,
            } => map_setup(
                "posix_spawn_file_actions_addopen",
                unsafe {
                    libc::posix_spawn_file_actions_addopen(
                        actions,
                        *target,
                        path.as_ptr(),
                        flags.bits(),
                        mode.bits(),
                    )
                },
            ),
        }
    }

    #[cfg(all(target_os = "linux", target_env = "gnu"))]
    fn chdir(&mut self, dir: &CStr) -> SpawnResult<()> {
        // SAFETY: initialized in init(); glibc copies the path.
        let ret = unsafe {
            libc::posix_spawn_file_actions_addchdir_np(self.0.as_mut_ptr(), dir.as_ptr())
        };
        map_setup("posix_spawn_file_actions_addchdir_np", ret)
    }

    #[cfg(not(all(target_os = "linux", target_env = "gnu")))]
    fn chdir(&mut self, _dir: &CStr) -> SpawnResult<()> {
        Err(SpawnError::setup_failed(
            "posix_spawn_file_actions_addchdir_np",
            Errno::ENOSYS,
        ))
    }

    fn as_ptr(&self) -> *const libc::posix_spawn_file_actions_t {
        self.0.as_ptr()
    }
}

impl Drop for FileActions<'_> {
    fn drop(&mut self) {
        // SAFETY: only constructed after a successful init.
        unsafe {
            libc::posix_spawn_file_actions_destroy(self.0.as_mut_ptr());
        }
    }
}

struct SpawnAttr<'a>(&'a mut MaybeUninit<libc::posix_spawnattr_t>);

impl<'a> SpawnAttr<'a> {
    fn init(raw: &'a mut MaybeUninit<libc::posix_spawnattr_t>) -> SpawnResult<Self> {
        // SAFETY: init writes a valid object into the uninitialized storage.
        let ret = unsafe { libc::posix_spawnattr_init(raw.as_mut_ptr()) };
        map_setup("posix_spawnattr_init", ret)?;
        Ok(Self(raw))
    }

    fn configure(&mut self, config: &SpawnConfig) -> SpawnResult<()> {
        let attr = self.0.as_mut_ptr();
        let mut flags: libc::c_int = 0;

        if config.reset_signal_mask {
            let empty = SigSet::empty();
            // SAFETY: `attr` was initialized in init().
            let ret = unsafe { libc::posix_spawnattr_setsigmask(attr, empty.as_ref()) };
            map_setup("posix_spawnattr_setsigmask", ret)?;
            flags |= libc::POSIX_SPAWN_SETSIGMASK as libc::c_int;
        }

        if config.use_vfork_hint {
            flags |= POSIX_SPAWN_USEVFORK;
        }

        // SAFETY: `attr` was initialized in init().
        let ret = unsafe { libc::posix_spawnattr_setflags(attr, flags as _) };
        map_setup("posix_spawnattr_setflags", ret)
    }

    fn as_ptr(&self) -> *const libc::posix_spawnattr_t {
        self.0.as_ptr()
    }
}

impl Drop for SpawnAttr<'_> {
    fn drop(&mut self) {
        // SAFETY: only constructed after a successful init.
        unsafe {
            libc::posix_spawnattr_destroy(self.0.as_mut_ptr());
        }
    }
}
