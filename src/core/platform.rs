//! Host platform detection for download URLs.

use std::fmt;

use crate::util::errors::{Error, Result};

/// Platforms zkVyper binaries are published for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    LinuxAmd64,
    LinuxArm64,
    MacosAmd64,
    MacosArm64,
}

impl Platform {
    /// Detect the platform this binary was built for.
    pub fn host() -> Result<Self> {
        Self::detect(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map an OS/arch pair (as reported by `std::env::consts`) to a platform.
    pub fn detect(os: &str, arch: &str) -> Result<Self> {
        let amd64 = matches!(arch, "x86_64" | "amd64");
        let arm64 = matches!(arch, "aarch64" | "arm64");

        match os {
            "linux" if amd64 => Ok(Platform::LinuxAmd64),
            "linux" if arm64 => Ok(Platform::LinuxArm64),
            "macos" if amd64 => Ok(Platform::MacosAmd64),
            "macos" if arm64 => Ok(Platform::MacosArm64),
            _ => Err(Error::Platform {
                os: os.to_string(),
                arch: arch.to_string(),
            }),
        }
    }

    /// Identifier used in manifest paths and download URLs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::LinuxAmd64 => "linux-amd64",
            Platform::LinuxArm64 => "linux-arm64",
            Platform::MacosAmd64 => "macosx-amd64",
            Platform::MacosArm64 => "macosx-arm64",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
