//! Validation of caller-supplied strings.
//!
//! Everything that ends up in a C string array goes through here first, so
//! that a bad value is reported before any OS resource is allocated.

use fastspawn_common::{SpawnError, SpawnResult};
use std::ffi::CString;

/// Validate that an executable path is usable.
pub fn validate_executable(path: &[u8]) -> SpawnResult<()> {
    if path.is_empty() {
        return Err(SpawnError::invalid_argument("Executable path cannot be empty"));
    }

    if path.contains(&0) {
        return Err(SpawnError::invalid_argument(format!(
            "Executable path contains a NUL byte: {}",
            String::from_utf8_lossy(path)
        )));
    }

    Ok(())
}

/// Convert an argument into a C string.
pub fn argument_to_cstring(arg: &[u8]) -> SpawnResult<CString> {
    CString::new(arg).map_err(|e| {
        SpawnError::invalid_argument(format!(
            "Argument contains a NUL byte at position {}: {}",
            e.nul_position(),
            String::from_utf8_lossy(arg)
        ))
    })
}

/// Validate a child working directory and convert it into a C string.
pub fn validate_current_dir(dir: &[u8]) -> SpawnResult<CString> {
    if dir.is_empty() {
        return Err(SpawnError::invalid_argument("Working directory cannot be empty"));
    }

    CString::new(dir).map_err(|_| {
        SpawnError::invalid_argument(format!(
            "Working directory contains a NUL byte: {}",
            String::from_utf8_lossy(dir)
        ))
    })
}

/// Validate an environment variable name.
pub fn validate_env_key(key: &[u8]) -> SpawnResult<()> {
    let display = String::from_utf8_lossy(key);

    if key.is_empty() {
        return Err(SpawnError::environment_value_invalid(display, "key cannot be empty"));
    }

    if key.contains(&b'=') {
        return Err(SpawnError::environment_value_invalid(display, "key contains '='"));
    }

    if key.contains(&0) {
        return Err(SpawnError::environment_value_invalid(display, "key contains a NUL byte"));
    }

    Ok(())
}

/// Validate an environment variable value.
pub fn validate_env_value(key: &[u8], value: &[u8]) -> SpawnResult<()> {
    if value.contains(&0) {
        return Err(SpawnError::environment_value_invalid(
            String::from_utf8_lossy(key),
            "value contains a NUL byte",
        ));
    }

    Ok(())
}
