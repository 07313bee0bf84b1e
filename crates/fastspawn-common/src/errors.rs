//! Error types for process creation.
//!
//! Every failure the engine can detect in the calling process is a
//! [`SpawnError`]. A program that fails to exec *inside* the child cannot be
//! reported here: by then the parent already holds a pid. Such a child exits
//! with [`EXEC_FAILED_EXIT_STATUS`] and the caller has to look at the exit
//! status when it reaps the child.
//!
//! ```
//! use fastspawn_common::{SpawnError, SpawnResult};
//!
//! fn check_key(key: &str) -> SpawnResult<()> {
//!     if key.contains('=') {
//!         return Err(SpawnError::environment_value_invalid(key, "key contains '='"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_key("PATH").is_ok());
//! assert!(check_key("A=B").is_err());
//! ```

use nix::errno::Errno;
use thiserror::Error;

/// Exit status of a direct-strategy child whose exec call failed.
pub const EXEC_FAILED_EXIT_STATUS: i32 = 1;

/// Result type for spawn operations.
pub type SpawnResult<T> = std::result::Result<T, SpawnError>;

/// Errors returned synchronously by the spawn engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// The fork/vfork-equivalent syscall failed; no child exists.
    #[error("Process creation failed for '{program}': {errno}")]
    CreationFailed { program: String, errno: Errno },

    /// `posix_spawn`/`posix_spawnp` returned a nonzero status; no child exists.
    #[error("Spawning '{program}' failed: {errno}")]
    AtomicSpawnFailed { program: String, errno: Errno },

    /// Building the file-actions or attribute structures failed.
    #[error("Spawn setup failed in {operation}: {errno}")]
    SpawnSetupFailed {
        operation: &'static str,
        errno: Errno,
    },

    /// An environment override key or value cannot be placed in an
    /// environment block.
    #[error("Invalid environment value for '{key}': {reason}")]
    EnvironmentValueInvalid { key: String, reason: String },

    /// The command or one of its arguments cannot be handed to the OS.
    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },
}

impl SpawnError {
    pub fn creation_failed(program: impl Into<String>, errno: Errno) -> Self {
        Self::CreationFailed {
            program: program.into(),
            errno,
        }
    }

    pub fn atomic_spawn_failed(program: impl Into<String>, errno: Errno) -> Self {
        Self::AtomicSpawnFailed {
            program: program.into(),
            errno,
        }
    }

    pub fn setup_failed(operation: &'static str, errno: Errno) -> Self {
        Self::SpawnSetupFailed { operation, errno }
    }

    pub fn environment_value_invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EnvironmentValueInvalid {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// The OS error code carried by this error, if any.
    pub fn errno(&self) -> Option<Errno> {
        match self {
            Self::CreationFailed { errno, .. }
            | Self::AtomicSpawnFailed { errno, .. }
            | Self::SpawnSetupFailed { errno, .. } => Some(*errno),
            Self::EnvironmentValueInvalid { .. } | Self::InvalidArgument { .. } => None,
        }
    }
}
