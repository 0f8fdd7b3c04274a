//! Remote manifest model.
//!
//! The manifest is served as two kinds of JSON documents per platform:
//!
//! ```text
//! <manifest_url>/<platform>/index.json
//!     {"compilers": ["1.1.0", "1.1.1"]}
//! <manifest_url>/<platform>/<compiler>.json
//!     {"compiler": "1.1.1",
//!      "backends": ["0.3.3"],
//!      "download_url": ".../zkvyper-{platform}-v{compiler}-vyper-v{backend}",
//!      "sha256": {"0.3.3": "<hex>"}}
//! ```
//!
//! Everything here is pure: documents are parsed from bytes, and the decision
//! of whether a pair can be installed is made without touching the network.

use std::collections::BTreeMap;

use semver::Version;
use serde::Deserialize;

use crate::core::{Platform, VersionPair, VersionSpec};
use crate::util::errors::{Error, Result};

#[derive(Debug, Deserialize)]
struct IndexDocument {
    compilers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReleaseDocument {
    compiler: String,
    backends: Vec<String>,
    download_url: String,
    #[serde(default)]
    sha256: BTreeMap<String, String>,
}

fn parse_version(what: &str, s: &str) -> Result<Version> {
    Version::parse(s.trim_start_matches('v'))
        .map_err(|e| Error::parse(what, format!("invalid version `{}`: {}", s, e)))
}

/// Sort newest first and drop duplicates.
fn newest_first(mut versions: Vec<Version>) -> Vec<Version> {
    versions.sort_by(|a, b| b.cmp(a));
    versions.dedup();
    versions
}

/// Parse the compiler index document. Versions come back newest first.
pub fn parse_index(bytes: &[u8]) -> Result<Vec<Version>> {
    let doc: IndexDocument =
        serde_json::from_slice(bytes).map_err(|e| Error::parse("compiler index", e))?;

    let versions = doc
        .compilers
        .iter()
        .map(|s| parse_version("compiler index", s))
        .collect::<Result<Vec<_>>>()?;

    Ok(newest_first(versions))
}

/// One compiler release and the backends it was built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRelease {
    pub compiler: Version,
    /// Compatible backend versions, newest first.
    pub backends: Vec<Version>,
    /// URL template with `{compiler}`, `{backend}` and `{platform}` placeholders.
    pub download_url: String,
    /// Published sha256 digests by backend version.
    pub sha256: BTreeMap<Version, String>,
}

impl RemoteRelease {
    /// Parse a release document.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let what = "release document";
        let doc: ReleaseDocument =
            serde_json::from_slice(bytes).map_err(|e| Error::parse(what, e))?;

        let compiler = parse_version(what, &doc.compiler)?;
        let backends = doc
            .backends
            .iter()
            .map(|s| parse_version(what, s))
            .collect::<Result<Vec<_>>>()?;

        let mut sha256 = BTreeMap::new();
        for (backend, digest) in &doc.sha256 {
            sha256.insert(parse_version(what, backend)?, digest.to_lowercase());
        }

        if doc.download_url.is_empty() {
            return Err(Error::parse(what, "empty download_url"));
        }

        Ok(RemoteRelease {
            compiler,
            backends: newest_first(backends),
            download_url: doc.download_url,
            sha256,
        })
    }

    /// Whether `backend` is listed for this release.
    pub fn supports(&self, backend: &Version) -> bool {
        self.backends.contains(backend)
    }

    /// Newest listed backend satisfying `spec`.
    pub fn select_backend(&self, spec: &VersionSpec) -> Option<&Version> {
        spec.select(&self.backends)
    }

    /// Expand the URL template for one backend.
    pub fn url_for(&self, backend: &Version, platform: Platform) -> String {
        self.download_url
            .replace("{compiler}", &self.compiler.to_string())
            .replace("{backend}", &backend.to_string())
            .replace("{platform}", platform.as_str())
    }
}

/// What the installer needs to fetch one binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    pub pair: VersionPair,
    pub url: String,
    pub sha256: Option<String>,
}

/// Listing of installable versions.
///
/// May be partial: `releases` only holds documents that were fetched. A
/// compiler without a fetched release is treated as having no backends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteManifest {
    compilers: Vec<Version>,
    releases: BTreeMap<Version, RemoteRelease>,
}

impl RemoteManifest {
    pub fn new(compilers: Vec<Version>) -> Self {
        RemoteManifest {
            compilers: newest_first(compilers),
            releases: BTreeMap::new(),
        }
    }

    pub fn insert_release(&mut self, release: RemoteRelease) {
        self.releases.insert(release.compiler.clone(), release);
    }

    /// Compiler versions, newest first.
    pub fn compilers(&self) -> &[Version] {
        &self.compilers
    }

    pub fn release(&self, compiler: &Version) -> Option<&RemoteRelease> {
        self.releases.get(compiler)
    }

    /// Compilers satisfying `spec`, newest first.
    pub fn matching_compilers<'a>(
        &'a self,
        spec: &'a VersionSpec,
    ) -> impl Iterator<Item = &'a Version> + 'a {
        self.compilers.iter().filter(move |v| spec.matches(v))
    }

    /// Every installable pair in the fetched releases, newest first.
    pub fn pairs(&self) -> Vec<VersionPair> {
        let mut pairs: Vec<VersionPair> = self
            .compilers
            .iter()
            .filter_map(|c| self.releases.get(c))
            .flat_map(|r| {
                r.backends
                    .iter()
                    .map(move |b| VersionPair::new(r.compiler.clone(), b.clone()))
            })
            .collect();
        pairs.sort_by(|a, b| b.cmp(a));
        pairs
    }

    /// Decide whether `pair` is installable and, if so, where to fetch it.
    pub fn resolve(&self, pair: &VersionPair, platform: Platform) -> Result<DownloadPlan> {
        let unknown = || Error::unknown_version(&pair.compiler, &pair.backend);

        if !self.compilers.contains(&pair.compiler) {
            return Err(unknown());
        }
        let release = self.releases.get(&pair.compiler).ok_or_else(unknown)?;
        if !release.supports(&pair.backend) {
            return Err(unknown());
        }

        Ok(DownloadPlan {
            pair: pair.clone(),
            url: release.url_for(&pair.backend, platform),
            sha256: release.sha256.get(&pair.backend).cloned(),
        })
    }
}
