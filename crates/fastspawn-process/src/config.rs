//! Spawner configuration.
//!
//! ```yaml
//! prefer_direct: false
//! direct_primitive: vfork
//! use_vfork_hint: true
//! reset_signal_mask: true
//! ```

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for [`crate::Spawner`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnConfig {
    /// Use the direct strategy for requests that carry no file actions and no
    /// environment overrides. Off by default: the attributed strategy is the
    /// general path and the direct one is an opt-in fast path.
    #[serde(default)]
    pub prefer_direct: bool,

    /// Primitive used by the direct strategy.
    #[serde(default = "default_direct_primitive")]
    pub direct_primitive: DirectPrimitive,

    /// Ask `posix_spawn` to create the child with vfork semantics where the
    /// platform has such a flag.
    #[serde(default = "default_true")]
    pub use_vfork_hint: bool,

    /// Start the child with an empty signal mask.
    #[serde(default = "default_true")]
    pub reset_signal_mask: bool,
}

/// How the direct strategy creates the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectPrimitive {
    /// Child borrows the parent's address space until exec; parent is paused.
    Vfork,
    /// Ordinary copy-on-write fork.
    Fork,
}

impl SpawnConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        Self::load_from_str(&content)
    }

    /// Load configuration from a YAML string.
    pub fn load_from_str(content: &str) -> Result<Self> {
        let config: SpawnConfig = serde_yaml::from_str(content)
            .context("Failed to parse YAML configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.direct_primitive == DirectPrimitive::Vfork && !vfork_available() {
            return Err(anyhow!("vfork is not available on this platform, use 'fork'"));
        }
        Ok(())
    }
}

impl Default for SpawnConfig {
    fn default() -> Self {
        Self {
            prefer_direct: false,
            direct_primitive: default_direct_primitive(),
            use_vfork_hint: true,
            reset_signal_mask: true,
        }
    }
}

fn vfork_available() -> bool {
    cfg!(any(
        target_os = "linux",
        target_os = "android",
        target_os = "macos",
        target_os = "freebsd",
        target_os = "netbsd",
        target_os = "openbsd",
        target_os = "dragonfly",
        target_os = "illumos",
        target_os = "solaris",
    ))
}

fn default_direct_primitive() -> DirectPrimitive {
    if vfork_available() {
        DirectPrimitive::Vfork
    } else {
        DirectPrimitive::Fork
    }
}

fn default_true() -> bool {
    true
}
