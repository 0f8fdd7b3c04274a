//! Per-user directories.
//!
//! This is the only place the library asks the operating system where things
//! live. Everything downstream receives paths through [`Config`](crate::Config).

use std::path::{Path, PathBuf};

use directories::{BaseDirs, ProjectDirs};

/// Resolved per-user locations for cache, logs and configuration.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    cache_dir: PathBuf,
    data_dir: PathBuf,
    config_dir: PathBuf,
    vyper_dir: PathBuf,
}

impl GlobalContext {
    /// Resolve the platform's per-user directories.
    ///
    /// Falls back to `<tmp>/zkvvm` when no home directory can be determined.
    pub fn new() -> Self {
        match (ProjectDirs::from("io", "zkvvm", "zkvvm"), BaseDirs::new()) {
            (Some(dirs), Some(base)) => GlobalContext {
                cache_dir: dirs.cache_dir().to_path_buf(),
                data_dir: dirs.data_local_dir().to_path_buf(),
                config_dir: dirs.config_dir().to_path_buf(),
                vyper_dir: base.home_dir().join(".vvm"),
            },
            _ => Self::with_home(std::env::temp_dir().join("zkvvm")),
        }
    }

    /// A context rooted entirely under `home`.
    pub fn with_home(home: impl AsRef<Path>) -> Self {
        let home = home.as_ref();
        GlobalContext {
            cache_dir: home.join("cache"),
            data_dir: home.join("data"),
            config_dir: home.join("config"),
            vyper_dir: home.join("vvm"),
        }
    }

    /// Default directory for installed binaries.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Default diagnostic log file.
    pub fn log_file(&self) -> PathBuf {
        self.data_dir.join("zkvvm.log")
    }

    /// Default directory holding `vyper-<version>` backend executables.
    ///
    /// This is where vvm installs them.
    pub fn vyper_dir(&self) -> &Path {
        &self.vyper_dir
    }

    /// Default configuration file.
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new()
    }
}
