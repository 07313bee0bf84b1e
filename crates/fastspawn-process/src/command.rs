//! Command resolution.
//!
//! A [`Command`] separates the image to load from the name the child sees
//! as `argv[0]`. When the executable contains no `/`, the OS primitive
//! searches `PATH` for it (`execvp`/`posix_spawnp`); otherwise the path is
//! used as given, relative to the current directory if not absolute.

use crate::cstr_array::CStringArray;
use crate::validation::{argument_to_cstring, validate_executable};
use fastspawn_common::SpawnResult;
use std::ffi::{CStr, CString};

/// Executable path plus optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    executable: Vec<u8>,
    argv0: Option<Vec<u8>>,
}

impl Command {
    /// A command whose display name is the executable path itself.
    pub fn new(executable: impl Into<Vec<u8>>) -> Self {
        Self {
            executable: executable.into(),
            argv0: None,
        }
    }

    /// A command presenting `argv0` to the child instead of its path.
    pub fn with_argv0(executable: impl Into<Vec<u8>>, argv0: impl Into<Vec<u8>>) -> Self {
        Self {
            executable: executable.into(),
            argv0: Some(argv0.into()),
        }
    }

    pub fn argv0(mut self, argv0: impl Into<Vec<u8>>) -> Self {
        self.argv0 = Some(argv0.into());
        self
    }

    pub fn executable(&self) -> &[u8] {
        &self.executable
    }

    pub fn display_name(&self) -> &[u8] {
        self.argv0.as_deref().unwrap_or(&self.executable)
    }

    /// Whether the OS primitive will search `PATH` for the executable.
    pub fn uses_path_search(&self) -> bool {
        !self.executable.contains(&b'/')
    }

    /// Materializes the program path and the final argument vector.
    ///
    /// `argv[0]` is replaced by the display name; the remaining arguments are
    /// kept in order. An empty `argv` yields just the display name.
    pub fn resolve<A: AsRef<[u8]>>(&self, argv: &[A]) -> SpawnResult<ResolvedCommand> {
        validate_executable(&self.executable)?;
        let program = argument_to_cstring(&self.executable)?;

        let mut args = CStringArray::with_capacity(argv.len().max(1));
        args.push(argument_to_cstring(self.display_name())?);
        for arg in argv.iter().skip(1) {
            args.push(argument_to_cstring(arg.as_ref())?);
        }

        Ok(ResolvedCommand {
            program,
            argv: args,
            search_path: self.uses_path_search(),
        })
    }
}

/// A command ready to be handed to the OS.
#[derive(Debug)]
pub struct ResolvedCommand {
    program: CString,
    argv: CStringArray,
    search_path: bool,
}

impl ResolvedCommand {
    pub fn program(&self) -> &CStr {
        &self.program
    }

    pub fn argv(&self) -> &CStringArray {
        &self.argv
    }

    pub fn search_path(&self) -> bool {
        self.search_path
    }

    /// Program path for log messages and errors.
    pub fn program_lossy(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }
}
