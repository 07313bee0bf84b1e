//! Custom assertions for E2E tests

use crate::ProbeReport;
use std::fs;
use std::os::fd::RawFd;
use std::path::Path;

/// Assert that the child saw exactly `expected` as its argument vector
pub fn assert_argv(report: &ProbeReport, expected: &[&str]) -> Result<(), String> {
    if report.argv == expected {
        Ok(())
    } else {
        Err(format!(
            "Unexpected argv. Expected: {:?}, got: {:?}",
            expected, report.argv
        ))
    }
}

/// Assert that a descriptor was open in the child at startup
///
/// Only meaningful for fd 3 and above: the Rust runtime reopens closed
/// stdio descriptors on `/dev/null` before `main` runs, so fds 0-2 always
/// look open to a Rust child.
pub fn assert_fd_open(report: &ProbeReport, fd: RawFd) -> Result<(), String> {
    match report.fds.get(&fd) {
        Some(true) => Ok(()),
        Some(false) => Err(format!("fd {} was closed in the child", fd)),
        None => Err(format!("fd {} was not checked. Report: {:?}", fd, report.fds)),
    }
}

/// Assert that a descriptor was closed in the child at startup
///
/// Never holds for fds 0-2 in a Rust child; see [`assert_fd_open`].
pub fn assert_fd_closed(report: &ProbeReport, fd: RawFd) -> Result<(), String> {
    match report.fds.get(&fd) {
        Some(false) => Ok(()),
        Some(true) => Err(format!("fd {} was still open in the child", fd)),
        None => Err(format!("fd {} was not checked. Report: {:?}", fd, report.fds)),
    }
}

/// Assert that the child saw `key` with `value`
pub fn assert_env_var(report: &ProbeReport, key: &str, value: &str) -> Result<(), String> {
    match report.env_var(key) {
        Some(actual) if actual == value => Ok(()),
        Some(actual) => Err(format!(
            "Environment variable {} was {:?}, expected {:?}",
            key, actual, value
        )),
        None => Err(format!(
            "Environment variable {} missing. Env:\n{:#?}",
            key, report.env
        )),
    }
}

/// Assert that no environment entry for `key` reached the child
pub fn assert_env_absent(report: &ProbeReport, key: &str) -> Result<(), String> {
    let count = report
        .env
        .iter()
        .filter(|entry| entry.split_once('=').map(|(k, _)| k) == Some(key))
        .count();

    if count == 0 {
        Ok(())
    } else {
        Err(format!(
            "Environment variable {} should be absent but appears {} time(s)",
            key, count
        ))
    }
}

/// Assert that every key appears at most once in the child's environment
pub fn assert_env_keys_unique(report: &ProbeReport) -> Result<(), String> {
    let mut seen = std::collections::HashSet::new();
    for entry in &report.env {
        let key = entry.split_once('=').map_or(entry.as_str(), |(k, _)| k);
        if !seen.insert(key) {
            return Err(format!("Duplicate environment key: {}", key));
        }
    }
    Ok(())
}

/// Assert that a file exists and contains expected content
pub fn assert_file_contains(file_path: &Path, pattern: &str) -> Result<(), String> {
    if !file_path.exists() {
        return Err(format!("File does not exist: {}", file_path.display()));
    }

    let content = fs::read_to_string(file_path)
        .map_err(|e| format!("Failed to read file: {}", e))?;

    if content.contains(pattern) {
        Ok(())
    } else {
        Err(format!(
            "File {} does not contain pattern '{}'. Content:\n{}",
            file_path.display(),
            pattern,
            content
        ))
    }
}
