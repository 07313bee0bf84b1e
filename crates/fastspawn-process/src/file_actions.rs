//! Descriptor action translation.
//!
//! Callers describe what the child's descriptor table should look like as an
//! ordered mapping from [`DescriptorRef`] to [`FileActionSpec`]. A single
//! classification pass turns that mapping into resolved, fd-numbered
//! [`ResolvedFileAction`]s for the OS, plus the entries that are not file
//! actions at all (keys that do not resolve to a descriptor), which are handed
//! back untouched.
//!
//! Actions are emitted in declaration order, and the OS applies them in that
//! order, so two entries for the same target obey last-write-wins.
//!
//! A redirect `target <- source` becomes `dup2(source, target)` followed by
//! `close(source)` unless both are the same descriptor. The classifier keeps
//! track of what it has closed so that no action ever names a descriptor that
//! is already gone in the child:
//! - closing the same descriptor twice emits a single close;
//! - a redirect whose source was explicitly closed earlier is passed through;
//! - a redirect whose source was moved into an earlier target duplicates from
//!   that target instead, so `{out: pipe, err: pipe}` works as expected.

use crate::validation::argument_to_cstring;
use fastspawn_common::{DescriptorRef, RawFd, SpawnResult};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::collections::{HashMap, HashSet};
use std::ffi::CString;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, trace, warn};

/// Permission bits used when a redirect target file is created.
pub const DEFAULT_CREATE_MODE: u32 = 0o644;

/// What should happen to one descriptor in the child.
#[derive(Debug, Clone)]
pub enum FileActionSpec {
    /// Close the descriptor.
    Close,
    /// Make the descriptor refer to whatever `source` refers to in the parent.
    RedirectFrom(DescriptorRef),
    /// Open `path` onto the descriptor.
    Open {
        path: PathBuf,
        flags: OFlag,
        mode: Mode,
    },
}

impl FileActionSpec {
    pub fn open(path: impl Into<PathBuf>, mode: OpenMode, permissions: u32) -> Self {
        FileActionSpec::Open {
            path: path.into(),
            flags: mode.flags(),
            mode: Mode::from_bits_truncate(permissions as _),
        }
    }

    /// Opens `path` with the conventional mode for `target`: read for stdin
    /// and unknown descriptors, truncating write for stdout and stderr.
    pub fn open_default(target: &DescriptorRef, path: impl Into<PathBuf>) -> Self {
        Self::open(path, OpenMode::default_for(target), DEFAULT_CREATE_MODE)
    }
}

/// `fopen`-style mode strings for [`FileActionSpec::Open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// `r`
    Read,
    /// `r+`
    ReadWrite,
    /// `w`
    Write,
    /// `w+`
    WriteRead,
    /// `a`
    Append,
    /// `a+`
    AppendRead,
}

impl OpenMode {
    pub fn flags(&self) -> OFlag {
        match self {
            OpenMode::Read => OFlag::O_RDONLY,
            OpenMode::ReadWrite => OFlag::O_RDWR | OFlag::O_CREAT,
            OpenMode::Write => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
            OpenMode::WriteRead => OFlag::O_RDWR | OFlag::O_CREAT | OFlag::O_TRUNC,
            OpenMode::Append => OFlag::O_WRONLY | OFlag::O_APPEND | OFlag::O_CREAT,
            OpenMode::AppendRead => OFlag::O_RDWR | OFlag::O_APPEND | OFlag::O_CREAT,
        }
    }

    pub fn default_for(target: &DescriptorRef) -> Self {
        match target.resolve() {
            Some(1) | Some(2) => OpenMode::Write,
            _ => OpenMode::Read,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OpenMode::Read => "r",
            OpenMode::ReadWrite => "r+",
            OpenMode::Write => "w",
            OpenMode::WriteRead => "w+",
            OpenMode::Append => "a",
            OpenMode::AppendRead => "a+",
        }
    }
}

impl FromStr for OpenMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "r" => Ok(OpenMode::Read),
            "r+" => Ok(OpenMode::ReadWrite),
            "w" => Ok(OpenMode::Write),
            "w+" => Ok(OpenMode::WriteRead),
            "a" => Ok(OpenMode::Append),
            "a+" => Ok(OpenMode::AppendRead),
            other => Err(format!("unknown open mode: {}", other)),
        }
    }
}

impl fmt::Display for OpenMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An action on a concrete descriptor number, in the form the OS consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFileAction {
    Close(RawFd),
    Duplicate { target: RawFd, source: RawFd },
    Open {
        target: RawFd,
        path: CString,
        flags: OFlag,
        mode: Mode,
    },
}

/// Insertion-ordered mapping from descriptor to action.
#[derive(Debug, Clone, Default)]
pub struct FileActionMap {
    entries: Vec<(DescriptorRef, FileActionSpec)>,
}

impl FileActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<DescriptorRef>, spec: FileActionSpec) -> &mut Self {
        self.entries.push((key.into(), spec));
        self
    }

    pub fn close(&mut self, key: impl Into<DescriptorRef>) -> &mut Self {
        self.insert(key, FileActionSpec::Close)
    }

    /// Closes every key, in order.
    pub fn close_all<K, I>(&mut self, keys: I) -> &mut Self
    where
        K: Into<DescriptorRef>,
        I: IntoIterator<Item = K>,
    {
        for key in keys {
            self.close(key);
        }
        self
    }

    pub fn redirect(
        &mut self,
        target: impl Into<DescriptorRef>,
        source: impl Into<DescriptorRef>,
    ) -> &mut Self {
        self.insert(target, FileActionSpec::RedirectFrom(source.into()))
    }

    /// Redirects every target from the same source, in order.
    pub fn redirect_all<K, I>(&mut self, targets: I, source: impl Into<DescriptorRef>) -> &mut Self
    where
        K: Into<DescriptorRef>,
        I: IntoIterator<Item = K>,
    {
        let source = source.into();
        for target in targets {
            self.redirect(target, source.clone());
        }
        self
    }

    pub fn open(
        &mut self,
        target: impl Into<DescriptorRef>,
        path: impl Into<PathBuf>,
        mode: OpenMode,
        permissions: u32,
    ) -> &mut Self {
        self.insert(target, FileActionSpec::open(path, mode, permissions))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(DescriptorRef, FileActionSpec)> {
        self.entries.iter()
    }

    /// Partitions the mapping into resolved file actions and pass-through
    /// entries.
    ///
    /// Fails only when an open path cannot be converted to a C string.
    pub fn classify(self) -> SpawnResult<Classification> {
        let mut classification = Classification::default();
        let mut table = ChildDescriptors::default();

        for (key, spec) in self.entries {
            let Some(target) = key.resolve() else {
                debug!("Descriptor {:?} does not resolve, passing through", key);
                classification.passthrough.push((key, spec));
                continue;
            };

            classification.retain(&key);

            match spec {
                FileActionSpec::Close => {
                    if table.is_open(target) {
                        classification.actions.push(ResolvedFileAction::Close(target));
                    } else {
                        trace!("fd {} already closed, skipping close", target);
                    }
                    table.close(target);
                }
                FileActionSpec::RedirectFrom(ref source_ref) => {
                    let Some(source) = source_ref.resolve() else {
                        debug!(
                            "Redirect source {:?} for fd {} does not resolve, passing through",
                            source_ref, target
                        );
                        classification.passthrough.push((key, spec));
                        continue;
                    };

                    let Some(live) = table.locate(source) else {
                        warn!(
                            "Redirect of fd {} from fd {} dropped: source was closed by an earlier action",
                            target, source
                        );
                        classification.passthrough.push((key, spec));
                        continue;
                    };

                    classification.retain(source_ref);
                    classification.actions.push(ResolvedFileAction::Duplicate {
                        target,
                        source: live,
                    });
                    table.replace(target);

                    if live == source && source != target {
                        classification.actions.push(ResolvedFileAction::Close(source));
                        table.close(source);
                        table.moved.insert(source, target);
                    }
                }
                FileActionSpec::Open { ref path, flags, mode } => {
                    let path = argument_to_cstring(path.as_os_str().as_bytes())?;
                    classification.actions.push(ResolvedFileAction::Open {
                        target,
                        path,
                        flags,
                        mode,
                    });
                    table.replace(target);
                }
            }
        }

        trace!(
            "Classified file actions: {} resolved, {} passed through",
            classification.actions.len(),
            classification.passthrough.len()
        );
        Ok(classification)
    }
}

impl From<Vec<(DescriptorRef, FileActionSpec)>> for FileActionMap {
    fn from(entries: Vec<(DescriptorRef, FileActionSpec)>) -> Self {
        Self { entries }
    }
}

/// Output of [`FileActionMap::classify`].
///
/// Handle-backed descriptors named by `actions` stay open for as long as the
/// classification is alive, so it must outlive the spawn call.
#[derive(Debug, Default)]
pub struct Classification {
    pub actions: Vec<ResolvedFileAction>,
    pub passthrough: Vec<(DescriptorRef, FileActionSpec)>,
    retained: Vec<DescriptorRef>,
}

impl Classification {
    fn retain(&mut self, descriptor: &DescriptorRef) {
        if matches!(descriptor, DescriptorRef::Handle(_)) {
            self.retained.push(descriptor.clone());
        }
    }
}

/// The classifier's view of the child's descriptor table.
#[derive(Default)]
struct ChildDescriptors {
    closed: HashSet<RawFd>,
    // Closed redirect sources and the target now holding their resource.
    moved: HashMap<RawFd, RawFd>,
}

impl ChildDescriptors {
    fn is_open(&self, fd: RawFd) -> bool {
        !self.closed.contains(&fd)
    }

    /// Where the parent's `fd` can be found in the child, if anywhere.
    fn locate(&self, fd: RawFd) -> Option<RawFd> {
        match self.moved.get(&fd) {
            Some(&holder) => Some(holder),
            None if self.is_open(fd) => Some(fd),
            None => None,
        }
    }

    /// `fd` now refers to a new resource.
    fn replace(&mut self, fd: RawFd) {
        self.closed.remove(&fd);
        self.moved.remove(&fd);

        let stale: Vec<RawFd> = self
            .moved
            .iter()
            .filter(|(_, &holder)| holder == fd)
            .map(|(&source, _)| source)
            .collect();
        for source in stale {
            self.moved.remove(&source);
        }
    }

    fn close(&mut self, fd: RawFd) {
        self.replace(fd);
        self.closed.insert(fd);
    }
}
