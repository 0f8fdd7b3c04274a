//! Version identifiers for installable compiler binaries.
//!
//! A binary is keyed by two versions: the zkVyper compiler itself and the
//! Vyper backend it drives. Both are plain semver versions.

use std::fmt;
use std::str::FromStr;

use semver::{Version, VersionReq};
use serde::{Deserialize, Serialize};

/// The key of exactly one installable compiler binary.
///
/// Ordered by compiler version first, then backend version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionPair {
    /// zkVyper compiler version.
    pub compiler: Version,
    /// Vyper backend version.
    pub backend: Version,
}

impl VersionPair {
    pub fn new(compiler: Version, backend: Version) -> Self {
        VersionPair { compiler, backend }
    }

    /// Parse a pair from two version strings.
    pub fn parse(compiler: &str, backend: &str) -> Result<Self, semver::Error> {
        Ok(VersionPair {
            compiler: Version::parse(compiler.trim_start_matches('v'))?,
            backend: Version::parse(backend.trim_start_matches('v'))?,
        })
    }
}

impl fmt::Display for VersionPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{} (vyper v{})", self.compiler, self.backend)
    }
}

/// A version request as typed by a user: either an exact version or a
/// requirement such as `>=1.1.0`.
///
/// A bare `1.1.1` means exactly that version. Plain `VersionReq` parsing
/// would read it as `^1.1.1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSpec {
    Exact(Version),
    Req(VersionReq),
}

impl VersionSpec {
    /// Whether `version` satisfies this spec.
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            VersionSpec::Exact(v) => v == version,
            VersionSpec::Req(req) => req.matches(version),
        }
    }

    /// The exact version, if this spec names one.
    pub fn as_exact(&self) -> Option<&Version> {
        match self {
            VersionSpec::Exact(v) => Some(v),
            VersionSpec::Req(_) => None,
        }
    }

    /// Newest version in `candidates` that satisfies this spec.
    pub fn select<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a Version>,
    ) -> Option<&'a Version> {
        candidates.into_iter().filter(|v| self.matches(v)).max()
    }
}

impl FromStr for VersionSpec {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match Version::parse(s.trim_start_matches('v')) {
            Ok(v) => Ok(VersionSpec::Exact(v)),
            Err(_) => VersionReq::parse(s).map(VersionSpec::Req),
        }
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Exact(v) => write!(f, "{}", v),
            VersionSpec::Req(req) => write!(f, "{}", req),
        }
    }
}

impl From<Version> for VersionSpec {
    fn from(v: Version) -> Self {
        VersionSpec::Exact(v)
    }
}

impl Serialize for VersionSpec {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionSpec {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
