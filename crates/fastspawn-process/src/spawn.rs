//! Spawn strategy selection.
//!
//! Two strategies create the child:
//! - [`Strategy::Direct`]: bare `vfork`/`fork` + `exec`. Lowest latency, no
//!   descriptor or environment customization.
//! - [`Strategy::Attributed`]: a single `posix_spawn` call that applies file
//!   actions and an explicit environment atomically with process creation.
//!
//! Both return as soon as the OS knows the child's pid. Waiting for, signaling
//! and reaping the child is the caller's business.

use crate::command::Command;
use crate::config::SpawnConfig;
use crate::environment::{EnvOverrides, EnvSnapshot, EnvironmentBlock};
use crate::file_actions::FileActionMap;
use crate::validation::validate_current_dir;
use crate::{attributed, direct};
use fastspawn_common::{Pid, SpawnError, SpawnResult};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Process creation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    Attributed,
}

/// Everything needed to create one child. Consumed by the spawn call.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    command: Command,
    argv: Vec<Vec<u8>>,
    env: Option<EnvOverrides>,
    file_actions: FileActionMap,
    current_dir: Option<PathBuf>,
}

impl SpawnRequest {
    /// `argv[0]` is replaced by the command's display name.
    pub fn new<I, A>(command: Command, argv: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Vec<u8>>,
    {
        Self {
            command,
            argv: argv.into_iter().map(Into::into).collect(),
            env: None,
            file_actions: FileActionMap::new(),
            current_dir: None,
        }
    }

    pub fn env(mut self, overrides: EnvOverrides) -> Self {
        self.env = Some(overrides);
        self
    }

    pub fn file_actions(mut self, file_actions: FileActionMap) -> Self {
        self.file_actions = file_actions;
        self
    }

    /// Working directory of the child. Relative paths are resolved against
    /// the caller's directory at spawn time. Only available on glibc.
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn argv(&self) -> &[Vec<u8>] {
        &self.argv
    }

    pub fn env_overrides(&self) -> Option<&EnvOverrides> {
        self.env.as_ref()
    }

    pub fn file_action_map(&self) -> &FileActionMap {
        &self.file_actions
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Whether the request asks for anything the direct strategy cannot do.
    pub fn needs_attributes(&self) -> bool {
        !self.file_actions.is_empty() || self.env.is_some() || self.current_dir.is_some()
    }
}

/// Entry point for creating processes.
#[derive(Debug, Clone, Default)]
pub struct Spawner {
    config: SpawnConfig,
}

impl Spawner {
    pub fn new(config: SpawnConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SpawnConfig {
        &self.config
    }

    /// Runs `argv` with the direct strategy.
    ///
    /// `argv[0]` is both the program (searched in `PATH` when it has no `/`)
    /// and the name the child sees. A missing program is not an error here:
    /// the child exits with [`fastspawn_common::EXEC_FAILED_EXIT_STATUS`].
    pub fn spawn_direct<A: AsRef<[u8]>>(&self, argv: &[A]) -> SpawnResult<Pid> {
        let first = argv
            .first()
            .ok_or_else(|| SpawnError::invalid_argument("argv cannot be empty"))?;
        let resolved = Command::new(first.as_ref()).resolve(argv)?;

        debug!("Spawning '{}' (direct)", resolved.program_lossy());
        direct::spawn(&resolved, self.config.direct_primitive)
    }

    /// The strategy [`Spawner::spawn_with_options`] will use for `request`.
    pub fn select_strategy(&self, request: &SpawnRequest) -> Strategy {
        if !request.needs_attributes() && self.config.prefer_direct {
            Strategy::Direct
        } else {
            Strategy::Attributed
        }
    }

    /// Runs a fully specified request.
    ///
    /// Everything that can fail validation (arguments, environment, open
    /// paths) is checked before any OS object is created. File-action entries
    /// whose descriptor does not resolve are ignored.
    pub fn spawn_with_options(&self, request: SpawnRequest) -> SpawnResult<Pid> {
        let strategy = self.select_strategy(&request);
        let SpawnRequest {
            command,
            argv,
            env,
            file_actions,
            current_dir,
        } = request;

        let resolved = command.resolve(&argv)?;
        let current_dir = current_dir
            .as_deref()
            .map(|dir| validate_current_dir(dir.as_os_str().as_bytes()))
            .transpose()?;

        if strategy == Strategy::Direct {
            debug!("Spawning '{}' (direct)", resolved.program_lossy());
            return direct::spawn(&resolved, self.config.direct_primitive);
        }

        let snapshot = EnvSnapshot::capture();
        let env_block = match &env {
            Some(overrides) => EnvironmentBlock::merge(&snapshot, overrides)?,
            None => EnvironmentBlock::inherit(&snapshot)?,
        };
        drop(snapshot);

        let classification = file_actions.classify()?;
        if !classification.passthrough.is_empty() {
            debug!(
                "Ignoring {} file action entries without a resolvable descriptor: {:?}",
                classification.passthrough.len(),
                classification.passthrough
            );
        }

        debug!(
            "Spawning '{}' (attributed, {} file actions, {} env entries)",
            resolved.program_lossy(),
            classification.actions.len(),
            env_block.len()
        );
        attributed::spawn(
            &resolved,
            &env_block,
            &classification.actions,
            current_dir.as_deref(),
            &self.config,
        )
    }
}

/// Spawns `argv` with the direct strategy and default configuration.
pub fn spawn_direct<A: AsRef<[u8]>>(argv: &[A]) -> SpawnResult<Pid> {
    Spawner::default().spawn_direct(argv)
}

/// Spawns `command` with optional environment overrides and file actions,
/// using the default configuration.
pub fn spawn_with_options<I, A>(
    env: Option<EnvOverrides>,
    command: Command,
    argv: I,
    file_actions: FileActionMap,
) -> SpawnResult<Pid>
where
    I: IntoIterator<Item = A>,
    A: Into<Vec<u8>>,
{
    let mut request = SpawnRequest::new(command, argv).file_actions(file_actions);
    if let Some(overrides) = env {
        request = request.env(overrides);
    }
    Spawner::default().spawn_with_options(request)
}
