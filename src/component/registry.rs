//! Component registry: `id`, `type`, `version`, per-platform URLs and
//! checksums, install path, executable name. Cached to `components.json`
//! under the user data root; shipped with a small built-in default set so
//! `ffmpeg`/whisper models resolve without a network round trip on first
//! run of the test suite or an offline doctor check.

use super::platform::PlatformKey;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Engine,
    Model,
    Tool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    pub id: String,
    pub kind: ComponentKind,
    pub version: String,
    pub urls: HashMap<PlatformKey, String>,
    /// Per-platform SHA-256. Absent or empty entries mean "no checksum
    /// published"; `Install` must reject these with `MissingIntegrity`
    /// rather than silently skipping verification.
    pub sha256: HashMap<PlatformKey, String>,
    /// Path relative to the user data root, e.g. `bin/ffmpeg` or
    /// `models/whisper-base.bin`.
    pub install_path: String,
    pub executable_name: Option<String>,
}

impl ComponentDescriptor {
    pub fn url_for(&self, platform: PlatformKey) -> Option<&str> {
        self.urls.get(&platform).map(|s| s.as_str())
    }

    /// Empty string counts as "not published" per the missing-integrity
    /// contract, distinct from a genuinely absent map entry only at the
    /// registry-authoring level.
    pub fn checksum_for(&self, platform: PlatformKey) -> Option<&str> {
        self.sha256
            .get(&platform)
            .map(|s| s.as_str())
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Registry {
    pub components: Vec<ComponentDescriptor>,
}

impl Registry {
    pub fn find(&self, id: &str) -> Option<&ComponentDescriptor> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn load(path: &std::path::Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &std::path::Path) -> crate::error::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        crate::fsutil::atomic_write(path, json.as_bytes())
    }
}
