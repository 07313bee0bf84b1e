//! Environment merging.
//!
//! The child's environment is built from a read-only [`EnvSnapshot`] of the
//! calling process and a set of [`EnvOverrides`]:
//! - entries whose key is not overridden are kept unchanged, in order;
//! - an override with a value removes every entry with exactly that key and
//!   appends one `KEY=VALUE` entry;
//! - an override without a value only removes.
//!
//! All overrides are validated before the block is allocated. The resulting
//! [`EnvironmentBlock`] is owned by the request and freed when it is dropped.

use crate::cstr_array::CStringArray;
use crate::validation::{validate_env_key, validate_env_value};
use fastspawn_common::{SpawnError, SpawnResult};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::os::unix::ffi::OsStrExt;

/// Point-in-time copy of a process environment as `KEY=VALUE` entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    entries: Vec<Vec<u8>>,
}

impl EnvSnapshot {
    /// Copies the environment of the calling process.
    pub fn capture() -> Self {
        let entries = std::env::vars_os()
            .map(|(key, value)| {
                let mut entry = Vec::with_capacity(key.len() + value.len() + 1);
                entry.extend_from_slice(key.as_bytes());
                entry.push(b'=');
                entry.extend_from_slice(value.as_bytes());
                entry
            })
            .collect();
        Self { entries }
    }

    pub fn from_entries<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Vec<u8>>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(Vec::as_slice)
    }
}

/// Insertion-ordered environment changes. `None` unsets a variable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    vars: Vec<(Vec<u8>, Option<Vec<u8>>)>,
    clear_inherited: bool,
}

impl EnvOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: Option<Vec<u8>>) -> &mut Self {
        self.vars.push((key.into(), value));
        self
    }

    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.insert(key, Some(value.into()))
    }

    pub fn unset(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.insert(key, None)
    }

    /// Start from an empty environment instead of the caller's.
    pub fn clear_inherited(&mut self) -> &mut Self {
        self.clear_inherited = true;
        self
    }

    pub fn clears_inherited(&self) -> bool {
        self.clear_inherited
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && !self.clear_inherited
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], Option<&[u8]>)> {
        self.vars
            .iter()
            .map(|(key, value)| (key.as_slice(), value.as_deref()))
    }

    /// Checks every key and value.
    pub fn validate(&self) -> SpawnResult<()> {
        for (key, value) in self.iter() {
            validate_env_key(key)?;
            if let Some(value) = value {
                validate_env_value(key, value)?;
            }
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, Option<V>)> for EnvOverrides
where
    K: Into<Vec<u8>>,
    V: Into<Vec<u8>>,
{
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        let mut overrides = EnvOverrides::new();
        for (key, value) in iter {
            overrides.insert(key, value.map(Into::into));
        }
        overrides
    }
}

/// Null-terminated `envp` array owned by one spawn request.
#[derive(Debug)]
pub struct EnvironmentBlock {
    array: CStringArray,
}

impl EnvironmentBlock {
    /// The snapshot, unchanged.
    pub fn inherit(snapshot: &EnvSnapshot) -> SpawnResult<Self> {
        let entries = snapshot
            .iter()
            .map(entry_to_cstring)
            .collect::<SpawnResult<Vec<_>>>()?;
        Ok(Self {
            array: entries.into_iter().collect(),
        })
    }

    /// The snapshot with `overrides` applied.
    pub fn merge(snapshot: &EnvSnapshot, overrides: &EnvOverrides) -> SpawnResult<Self> {
        overrides.validate()?;

        let base_len = if overrides.clears_inherited() {
            0
        } else {
            snapshot.len()
        };

        let mut entries: Vec<CString> = Vec::with_capacity(base_len + overrides.len() + 1);
        if !overrides.clears_inherited() {
            for entry in snapshot.iter() {
                entries.push(entry_to_cstring(entry)?);
            }
        }

        for (key, value) in overrides.iter() {
            entries.retain(|entry| !has_key(entry.as_bytes(), key));

            if let Some(value) = value {
                let mut entry = Vec::with_capacity(key.len() + value.len() + 2);
                entry.extend_from_slice(key);
                entry.push(b'=');
                entry.extend_from_slice(value);
                entries.push(entry_to_cstring(&entry)?);
            }
        }

        let mut array = CStringArray::with_capacity(entries.len());
        for entry in entries {
            array.push(entry);
        }
        Ok(Self { array })
    }

    pub fn len(&self) -> usize {
        self.array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> {
        self.array.iter()
    }

    /// Value of `key`, if present.
    pub fn get(&self, key: &[u8]) -> Option<&[u8]> {
        self.iter()
            .map(CStr::to_bytes)
            .find(|entry| has_key(entry, key))
            .map(|entry| &entry[key.len() + 1..])
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        self.array.as_ptr()
    }
}

/// Whether `entry` is `key=...`. Matches the whole key, not a prefix.
fn has_key(entry: &[u8], key: &[u8]) -> bool {
    entry.len() > key.len() && entry.starts_with(key) && entry[key.len()] == b'='
}

fn entry_to_cstring(entry: &[u8]) -> SpawnResult<CString> {
    CString::new(entry).map_err(|_| {
        let key = entry.split(|&b| b == b'=').next().unwrap_or_default();
        SpawnError::environment_value_invalid(
            String::from_utf8_lossy(key),
            "entry contains a NUL byte",
        )
    })
}
