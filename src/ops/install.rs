//! Installing and uninstalling compiler binaries.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use semver::VersionReq;

use crate::core::{DownloadPlan, RemoteManifest, VersionPair, VersionSpec};
use crate::sources::cache::{BinaryCache, CacheEntry, StagedEntry};
use crate::sources::{RemoteCatalog, Transport};
use crate::util::errors::{Error, Result};
use crate::util::hash::sha256_file;
use crate::util::process::ProcessBuilder;

/// Observer for long downloads.
pub trait DownloadProgress {
    /// Called once the server has answered. `total_bytes` is the
    /// `Content-Length`, when known.
    fn on_start(&mut self, pair: &VersionPair, total_bytes: Option<u64>);

    fn on_chunk(&mut self, bytes: u64);

    /// Called when the transfer ends, successfully or not.
    fn on_finish(&mut self);
}

/// Progress observer that ignores everything.
pub struct NoProgress;

impl DownloadProgress for NoProgress {
    fn on_start(&mut self, _pair: &VersionPair, _total_bytes: Option<u64>) {}
    fn on_chunk(&mut self, _bytes: u64) {}
    fn on_finish(&mut self) {}
}

const CHUNK_SIZE: usize = 64 * 1024;

/// Fetches binaries from the remote catalog into the local cache.
pub struct Installer {
    cache: BinaryCache,
    catalog: RemoteCatalog,
    transport: Arc<dyn Transport>,
    verify: bool,
    verify_timeout: Duration,
}

impl Installer {
    pub fn new(
        cache: BinaryCache,
        catalog: RemoteCatalog,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Installer {
            cache,
            catalog,
            transport,
            verify: true,
            verify_timeout: Duration::from_secs(30),
        }
    }

    /// Whether to run `<binary> --version` before publishing a download.
    pub fn with_verification(mut self, enabled: bool, timeout: Duration) -> Self {
        self.verify = enabled;
        self.verify_timeout = timeout;
        self
    }

    pub fn cache(&self) -> &BinaryCache {
        &self.cache
    }

    pub fn catalog(&self) -> &RemoteCatalog {
        &self.catalog
    }

    /// Make sure `pair` is installed, downloading it if needed.
    ///
    /// An installed entry is returned without any network access, even if the
    /// manifest is unreachable.
    pub fn ensure_installed(
        &self,
        pair: &VersionPair,
        progress: Option<&mut dyn DownloadProgress>,
    ) -> Result<CacheEntry> {
        if let Some(entry) = self.cache.get(pair) {
            tracing::debug!("zkVyper {} already installed at {}", pair, entry.path.display());
            return Ok(entry);
        }

        // Validate against the manifest before touching the cache directory.
        let plan = self.plan(pair)?;
        let _lock = self.cache.lock(pair)?;

        // Another process may have finished the same install while we waited.
        if let Some(entry) = self.cache.get(pair) {
            tracing::debug!("zkVyper {} was installed concurrently", pair);
            return Ok(entry);
        }

        self.download(&plan, progress)
    }

    /// Download `pair` even if it is already installed, replacing the entry.
    pub fn reinstall(
        &self,
        pair: &VersionPair,
        progress: Option<&mut dyn DownloadProgress>,
    ) -> Result<CacheEntry> {
        let plan = self.plan(pair)?;
        let _lock = self.cache.lock(pair)?;
        self.download(&plan, progress)
    }

    /// Remove an installed binary.
    pub fn uninstall(&self, pair: &VersionPair) -> Result<()> {
        self.cache.remove(pair)?;
        tracing::info!("Uninstalled zkVyper {}", pair);
        Ok(())
    }

    /// Pick the newest remote pair satisfying both specs.
    ///
    /// Two exact versions are returned as-is without a network round trip;
    /// [`ensure_installed`](Self::ensure_installed) validates them later if
    /// they are not already cached. Otherwise compilers are tried newest
    /// first and the first release with a matching backend wins.
    pub fn select(&self, compiler: &VersionSpec, backend: &VersionSpec) -> Result<VersionPair> {
        if let (Some(c), Some(b)) = (compiler.as_exact(), backend.as_exact()) {
            return Ok(VersionPair::new(c.clone(), b.clone()));
        }

        let manifest = RemoteManifest::new(self.catalog.list_compiler_versions()?);
        for candidate in manifest.matching_compilers(compiler) {
            let release = self.catalog.release(candidate)?;
            if let Some(backend) = release.select_backend(backend) {
                return Ok(VersionPair::new(candidate.clone(), backend.clone()));
            }
        }

        Err(Error::UnknownVersion {
            compiler: compiler.to_string(),
            backend: backend.to_string(),
        })
    }

    /// Fetch just enough of the manifest to decide whether `pair` exists.
    fn plan(&self, pair: &VersionPair) -> Result<DownloadPlan> {
        let mut manifest = RemoteManifest::new(self.catalog.list_compiler_versions()?);
        if manifest.compilers().contains(&pair.compiler) {
            manifest.insert_release(self.catalog.release(&pair.compiler)?);
        }
        manifest.resolve(pair, self.catalog.platform())
    }

    fn download(
        &self,
        plan: &DownloadPlan,
        progress: Option<&mut dyn DownloadProgress>,
    ) -> Result<CacheEntry> {
        let pair = &plan.pair;
        tracing::info!("Installing zkVyper {} from {}", pair, plan.url);

        let mut noop = NoProgress;
        let progress: &mut dyn DownloadProgress = match progress {
            Some(p) => p,
            None => &mut noop,
        };

        let response = self.transport.open(&plan.url).map_err(|e| match e {
            Error::Network { message, .. } => Error::Download {
                pair: pair.clone(),
                url: plan.url.clone(),
                message,
            },
            other => other,
        })?;
        progress.on_start(pair, response.content_length);
        let staged = self.stream(plan, response.content_length, response.body, progress);
        progress.on_finish();
        let staged = staged?;

        if let Some(expected) = &plan.sha256 {
            let actual = sha256_file(staged.path())?;
            if &actual != expected {
                return Err(Error::Verification {
                    pair: pair.clone(),
                    message: format!("sha256 mismatch: expected {}, got {}", expected, actual),
                });
            }
            tracing::debug!("sha256 verified: {}", &actual[..16]);
        }

        if self.verify {
            self.self_check(pair, &staged)?;
        }

        let entry = staged.commit()?;
        tracing::info!("Installed zkVyper {} at {}", pair, entry.path.display());
        Ok(entry)
    }

    /// Copy the response body into a pending cache entry.
    ///
    /// On any error the pending entry is dropped, which deletes the partial file.
    fn stream(
        &self,
        plan: &DownloadPlan,
        content_length: Option<u64>,
        mut body: Box<dyn Read + Send>,
        progress: &mut dyn DownloadProgress,
    ) -> Result<StagedEntry> {
        let mut pending = self.cache.begin_write(&plan.pair)?;
        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut received: u64 = 0;

        let failed = |message: String| Error::Download {
            pair: plan.pair.clone(),
            url: plan.url.clone(),
            message,
        };

        loop {
            let n = match body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {
                    return Err(Error::Timeout {
                        operation: format!("download of {}", plan.url),
                        after: self.transport.timeout(),
                    })
                }
                Err(e) => {
                    return Err(failed(format!("after {} bytes: {}", received, e)));
                }
            };
            pending
                .write_all(&buf[..n])
                .map_err(|e| Error::io(pending.path(), e))?;
            received += n as u64;
            progress.on_chunk(n as u64);
        }

        if let Some(expected) = content_length {
            if received != expected {
                return Err(failed(format!(
                    "received {} of {} bytes",
                    received, expected
                )));
            }
        }
        if received == 0 {
            return Err(failed("empty response body".to_string()));
        }

        tracing::debug!("downloaded {} bytes for {}", received, plan.pair);
        pending.stage()
    }

    /// Run the staged binary with `--version` and check it is what we asked for.
    fn self_check(&self, pair: &VersionPair, staged: &StagedEntry) -> Result<()> {
        let output = ProcessBuilder::new(staged.path())
            .arg("--version")
            .timeout(self.verify_timeout)
            .exec()
            .map_err(|e| Error::Verification {
                pair: pair.clone(),
                message: format!("binary would not execute: {}", e),
            })?;

        if !output.status.success() {
            return Err(Error::Verification {
                pair: pair.clone(),
                message: format!("`--version` exited with {}", output.status),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.contains(&pair.compiler.to_string()) {
            return Err(Error::Verification {
                pair: pair.clone(),
                message: format!("`--version` reported `{}`", stdout.trim()),
            });
        }

        Ok(())
    }
}

/// A spec matching any release version.
pub(crate) fn any_version() -> VersionSpec {
    VersionSpec::Req(VersionReq::STAR)
}
