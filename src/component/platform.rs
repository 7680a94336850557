//! Canonical platform keys for component descriptors. Unrecognized
//! `(os, arch)` pairs are a typed error, never a silent fallback.

use crate::error::{Result, SubgenError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlatformKey {
    WindowsX64,
    LinuxX64,
    LinuxArm64,
    MacosX64,
    MacosArm64,
}

impl PlatformKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformKey::WindowsX64 => "windows-x64",
            PlatformKey::LinuxX64 => "linux-x64",
            PlatformKey::LinuxArm64 => "linux-arm64",
            PlatformKey::MacosX64 => "macos-x64",
            PlatformKey::MacosArm64 => "macos-arm64",
        }
    }

    /// Resolve from `std::env::consts::{OS, ARCH}`-style strings.
    pub fn from_os_arch(os: &str, arch: &str) -> Result<Self> {
        match (os, arch) {
            ("windows", "x86_64") => Ok(PlatformKey::WindowsX64),
            ("linux", "x86_64") => Ok(PlatformKey::LinuxX64),
            ("linux", "aarch64") => Ok(PlatformKey::LinuxArm64),
            ("macos", "x86_64") => Ok(PlatformKey::MacosX64),
            ("macos", "aarch64") => Ok(PlatformKey::MacosArm64),
            _ => Err(SubgenError::UnsupportedPlatform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    pub fn current() -> Result<Self> {
        Self::from_os_arch(std::env::consts::OS, std::env::consts::ARCH)
    }
}
