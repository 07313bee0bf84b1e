//! Core domain types used by the spawn engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Raw descriptor number as the OS sees it.
pub type RawFd = std::os::raw::c_int;

/// Process id of a freshly created child. Always greater than zero.
///
/// # Example
/// ```
/// use fastspawn_common::Pid;
///
/// assert!(Pid::from_raw(0).is_none());
/// assert_eq!(Pid::from_raw(42).unwrap().as_raw(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pid(i32);

impl Pid {
    /// Wraps a raw pid, rejecting values that cannot name a child.
    pub fn from_raw(pid: i32) -> Option<Self> {
        (pid > 0).then_some(Self(pid))
    }

    pub fn as_raw(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the three standard streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardStream {
    In,
    Out,
    Err,
}

impl StandardStream {
    pub fn fd(&self) -> RawFd {
        match self {
            StandardStream::In => 0,
            StandardStream::Out => 1,
            StandardStream::Err => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StandardStream::In => "in",
            StandardStream::Out => "out",
            StandardStream::Err => "err",
        }
    }
}

impl FromStr for StandardStream {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "in" => Ok(StandardStream::In),
            "out" => Ok(StandardStream::Out),
            "err" => Ok(StandardStream::Err),
            other => Err(format!("unknown standard stream: {}", other)),
        }
    }
}

impl fmt::Display for StandardStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Anything that can report the descriptor number it wraps.
///
/// Returning `None` (or a negative number) means the handle currently has no
/// descriptor, e.g. it was already closed by its owner.
pub trait Fileno {
    fn fileno(&self) -> Option<RawFd>;
}

#[cfg(unix)]
impl<T: std::os::fd::AsRawFd> Fileno for T {
    fn fileno(&self) -> Option<RawFd> {
        Some(self.as_raw_fd())
    }
}

/// Reference to a descriptor in the calling process.
///
/// The calling layer converts its own values (stream names, integers, file
/// objects) into one of these three variants; the engine never inspects
/// anything else.
#[derive(Clone)]
pub enum DescriptorRef {
    Standard(StandardStream),
    Numeric(RawFd),
    Handle(Arc<dyn Fileno + Send + Sync>),
}

impl DescriptorRef {
    /// Wraps a handle. The handle is kept alive for as long as the reference.
    pub fn handle<H: Fileno + Send + Sync + 'static>(handle: H) -> Self {
        DescriptorRef::Handle(Arc::new(handle))
    }

    /// Resolves the reference to a non-negative descriptor number.
    pub fn resolve(&self) -> Option<RawFd> {
        let fd = match self {
            DescriptorRef::Numeric(fd) => *fd,
            DescriptorRef::Standard(stream) => stream.fd(),
            DescriptorRef::Handle(handle) => handle.fileno()?,
        };
        (fd >= 0).then_some(fd)
    }
}

impl fmt::Debug for DescriptorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorRef::Standard(stream) => write!(f, "Standard({})", stream),
            DescriptorRef::Numeric(fd) => write!(f, "Numeric({})", fd),
            DescriptorRef::Handle(handle) => match handle.fileno() {
                Some(fd) => write!(f, "Handle(fd={})", fd),
                None => write!(f, "Handle(closed)"),
            },
        }
    }
}

impl From<RawFd> for DescriptorRef {
    fn from(fd: RawFd) -> Self {
        DescriptorRef::Numeric(fd)
    }
}

impl From<StandardStream> for DescriptorRef {
    fn from(stream: StandardStream) -> Self {
        DescriptorRef::Standard(stream)
    }
}
