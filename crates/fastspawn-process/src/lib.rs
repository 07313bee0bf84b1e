//! # fastspawn process
//!
//! Low-latency child process creation for Unix hosts.
//!
//! This crate provides:
//! - Command resolution (program path vs. the `argv[0]` the child sees)
//! - Descriptor action translation (close / redirect / open in the child)
//! - Environment merging (set / replace / unset on top of the caller's env)
//! - Two creation strategies: direct `vfork`+`exec` and attributed
//!   `posix_spawn`
//!
//! It does not wait for, signal or reap children; a returned [`Pid`] only
//! means the child was created.
//!
//! ```rust,no_run
//! use fastspawn_process::{spawn_with_options, Command, EnvOverrides, FileActionMap};
//!
//! let mut env = EnvOverrides::new();
//! env.set("FOO", "bar");
//!
//! let pid = spawn_with_options(
//!     Some(env),
//!     Command::with_argv0("/bin/echo", "echo"),
//!     ["echo", "hi"],
//!     FileActionMap::new(),
//! )
//! .unwrap();
//! println!("spawned {}", pid);
//! ```

#![cfg(unix)]

mod attributed;
pub mod command;
pub mod config;
mod cstr_array;
mod direct;
pub mod environment;
pub mod file_actions;
pub mod outcome;
pub mod spawn;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-export main types
pub use command::{Command, ResolvedCommand};
pub use config::{DirectPrimitive, SpawnConfig};
pub use environment::{EnvOverrides, EnvSnapshot, EnvironmentBlock};
pub use file_actions::{
    Classification, FileActionMap, FileActionSpec, OpenMode, ResolvedFileAction,
    DEFAULT_CREATE_MODE,
};
pub use spawn::{spawn_direct, spawn_with_options, SpawnRequest, Spawner, Strategy};

pub use fastspawn_common::{
    DescriptorRef, Fileno, Pid, SpawnError, SpawnResult, StandardStream, EXEC_FAILED_EXIT_STATUS,
};
