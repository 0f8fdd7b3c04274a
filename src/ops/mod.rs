//! High-level operations.
//!
//! [`VersionManager`] ties the cache, the remote catalog and the compiler
//! invoker together behind the calls the CLI and embedding programs make.

pub mod compile;
pub mod install;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

pub use compile::{CompileResult, Compiler, ContractOutput};
pub use install::{DownloadProgress, Installer, NoProgress};

use crate::core::{Platform, VersionPair, VersionSpec};
use crate::sources::cache::{BinaryCache, CacheEntry};
use crate::sources::{HttpTransport, RemoteCatalog, Transport};
use crate::util::config::Config;
use crate::util::errors::Result;

/// Entry point for every operation, built from a resolved [`Config`].
pub struct VersionManager {
    config: Config,
    installer: Installer,
}

impl VersionManager {
    /// Manager for the host platform over real HTTP.
    pub fn new(config: Config) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(config.http_timeout())?);
        Self::with_transport(config, Platform::host()?, transport)
    }

    /// Manager with an explicit platform and transport.
    pub fn with_transport(
        config: Config,
        platform: Platform,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let catalog = RemoteCatalog::new(&config.manifest_url, platform, transport.clone())?;
        let installer = Installer::new(BinaryCache::new(&config.cache_dir), catalog, transport)
            .with_verification(config.verify_downloads, config.process_timeout());

        Ok(VersionManager { config, installer })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn installer(&self) -> &Installer {
        &self.installer
    }

    /// Installed pairs, sorted. Never touches the network.
    pub fn local_versions(&self) -> Result<BTreeSet<VersionPair>> {
        self.installer.cache().list_installed()
    }

    /// Every pair installable on this platform, newest first.
    pub fn remote_versions(&self) -> Result<Vec<VersionPair>> {
        Ok(self.installer.catalog().fetch_manifest()?.pairs())
    }

    /// Resolve both specs to the newest matching pair and install it.
    ///
    /// With `overwrite` an installed pair is downloaded again.
    pub fn install(
        &self,
        compiler: &VersionSpec,
        backend: &VersionSpec,
        overwrite: bool,
        progress: Option<&mut dyn DownloadProgress>,
    ) -> Result<CacheEntry> {
        let pair = self.installer.select(compiler, backend)?;
        if overwrite {
            self.installer.reinstall(&pair, progress)
        } else {
            self.installer.ensure_installed(&pair, progress)
        }
    }

    pub fn uninstall(&self, pair: &VersionPair) -> Result<()> {
        self.installer.uninstall(pair)
    }

    /// A compiler invoker using the configured default versions.
    pub fn compiler(&self) -> Compiler<'_> {
        Compiler::new(&self.installer, self.config.process_timeout())
            .with_defaults(
                self.config.compiler_version.as_ref(),
                self.config.backend_version.as_ref(),
            )
            .with_vyper_dir(&self.config.vyper_dir)
    }

    /// Compile files with the default pair.
    pub fn compile<P: AsRef<Path>>(&self, paths: &[P]) -> Result<CompileResult> {
        self.compiler().compile(paths, None, &[])
    }

    /// Compile source text with the default pair.
    pub fn compile_source(&self, source: &str) -> Result<CompileResult> {
        self.compiler().compile_source(source, None, &[])
    }
}
