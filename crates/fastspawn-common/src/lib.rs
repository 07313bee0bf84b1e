//! # fastspawn common
//!
//! Types and errors shared by the fastspawn crates.
//!
//! The engine itself lives in `fastspawn-process`; this crate only holds the
//! vocabulary that callers need in order to describe a spawn request and to
//! interpret its outcome.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{SpawnError, SpawnResult, EXEC_FAILED_EXIT_STATUS};
pub use types::{DescriptorRef, Fileno, Pid, RawFd, StandardStream};
