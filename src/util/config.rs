//! Configuration.
//!
//! Values are layered, later layers winning:
//!
//! 1. Built-in defaults (paths from [`GlobalContext`])
//! 2. `config.toml` in the user config directory, or an explicit `--config` file
//! 3. `ZKVVM_*` environment variables
//! 4. Command-line flags
//!
//! Each layer above the defaults is a [`ConfigOverrides`] with every field
//! optional. The resolved [`Config`] is handed to components at construction;
//! nothing below the entry point reads the environment.

use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::{Comparator, Op, Prerelease, Version, VersionReq};
use serde::{Deserialize, Serialize};

use crate::core::VersionSpec;
use crate::util::context::GlobalContext;
use crate::util::errors::{Error, Result};

/// Where the remote manifest is served from.
pub const DEFAULT_MANIFEST_URL: &str =
    "https://raw.githubusercontent.com/matter-labs/zkvyper-bin/main/manifest";

/// Prefix of recognised environment variables.
pub const ENV_PREFIX: &str = "ZKVVM_";

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Config {
    /// Root for installed binaries.
    pub cache_dir: PathBuf,

    /// Diagnostic log destination.
    pub log_file: PathBuf,

    /// 0 = warnings, 1 = info, 2+ = debug.
    pub verbosity: u8,

    /// Default compiler version when a call does not name one.
    pub compiler_version: Option<VersionSpec>,

    /// Default backend version when a call does not name one.
    pub backend_version: Option<VersionSpec>,

    /// Base URL of the remote manifest.
    pub manifest_url: String,

    /// Timeout for each HTTP request, body included.
    pub http_timeout_secs: u64,

    /// Timeout for each compiler invocation.
    pub process_timeout_secs: u64,

    /// Run `--version` on downloaded binaries before publishing them.
    pub verify_downloads: bool,

    /// Directory holding `vyper-<version>` executables passed to the
    /// compiler with `--vyper`.
    pub vyper_dir: PathBuf,
}

impl Config {
    /// Built-in defaults.
    pub fn defaults(ctx: &GlobalContext) -> Self {
        Config {
            cache_dir: ctx.cache_dir().to_path_buf(),
            log_file: ctx.log_file(),
            verbosity: 0,
            compiler_version: Some(VersionSpec::Req(VersionReq {
                comparators: vec![Comparator {
                    op: Op::GreaterEq,
                    major: 1,
                    minor: Some(1),
                    patch: Some(0),
                    pre: Prerelease::EMPTY,
                }],
            })),
            backend_version: Some(VersionSpec::Exact(Version::new(0, 3, 3))),
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            http_timeout_secs: 60,
            process_timeout_secs: 300,
            verify_downloads: true,
            vyper_dir: ctx.vyper_dir().to_path_buf(),
        }
    }

    /// Defaults with every path under `cache_dir`. Handy for embedding and tests.
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        let cache_dir = cache_dir.into();
        let mut config = Self::defaults(&GlobalContext::with_home(&cache_dir));
        config.log_file = cache_dir.join("zkvvm.log");
        config.cache_dir = cache_dir;
        config
    }

    /// Resolve defaults, config file and environment.
    ///
    /// `config_path` must exist when given; the default location is optional.
    pub fn load<I>(ctx: &GlobalContext, config_path: Option<&Path>, env: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut config = Self::defaults(ctx);

        match config_path {
            Some(path) => config.merge(ConfigOverrides::from_file(path)?),
            None => {
                let path = ctx.config_path();
                if path.is_file() {
                    config.merge(ConfigOverrides::from_file(&path)?);
                }
            }
        }

        config.merge(ConfigOverrides::from_env(env)?);
        Ok(config)
    }

    /// Apply a layer of overrides (set fields win).
    pub fn merge(&mut self, other: ConfigOverrides) {
        if let Some(v) = other.cache_dir {
            self.cache_dir = v;
        }
        if let Some(v) = other.log_file {
            self.log_file = v;
        }
        if let Some(v) = other.verbosity {
            self.verbosity = v;
        }
        if other.compiler_version.is_some() {
            self.compiler_version = other.compiler_version;
        }
        if other.backend_version.is_some() {
            self.backend_version = other.backend_version;
        }
        if let Some(v) = other.manifest_url {
            self.manifest_url = v;
        }
        if let Some(v) = other.http_timeout_secs {
            self.http_timeout_secs = v;
        }
        if let Some(v) = other.process_timeout_secs {
            self.process_timeout_secs = v;
        }
        if let Some(v) = other.verify_downloads {
            self.verify_downloads = v;
        }
        if let Some(v) = other.vyper_dir {
            self.vyper_dir = v;
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn process_timeout(&self) -> Duration {
        Duration::from_secs(self.process_timeout_secs)
    }
}

/// One configuration layer. Unset fields leave the lower layer alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub cache_dir: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub verbosity: Option<u8>,
    pub compiler_version: Option<VersionSpec>,
    pub backend_version: Option<VersionSpec>,
    pub manifest_url: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub process_timeout_secs: Option<u64>,
    pub verify_downloads: Option<bool>,
    pub vyper_dir: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Load a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        toml::from_str(&contents).map_err(|e| Error::Config {
            message: format!("{}: {}", path.display(), e),
        })
    }

    /// Collect `ZKVVM_*` variables. Unrecognised names are ignored.
    pub fn from_env<I>(vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut overrides = ConfigOverrides::default();

        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let invalid = |e: &dyn std::fmt::Display| Error::Config {
                message: format!("{}={}: {}", key, value, e),
            };

            match name {
                "CACHE_DIR" => overrides.cache_dir = Some(PathBuf::from(&value)),
                "LOG_FILE" => overrides.log_file = Some(PathBuf::from(&value)),
                "VERBOSITY" => {
                    let level: u8 = value.parse().map_err(|e| invalid(&e))?;
                    overrides.verbosity = Some(level);
                }
                "COMPILER_VERSION" => {
                    let spec: VersionSpec = value.parse().map_err(|e| invalid(&e))?;
                    overrides.compiler_version = Some(spec);
                }
                "BACKEND_VERSION" => {
                    let spec: VersionSpec = value.parse().map_err(|e| invalid(&e))?;
                    overrides.backend_version = Some(spec);
                }
                "MANIFEST_URL" => overrides.manifest_url = Some(value.clone()),
                "HTTP_TIMEOUT_SECS" => {
                    let secs: u64 = value.parse().map_err(|e| invalid(&e))?;
                    overrides.http_timeout_secs = Some(secs);
                }
                "PROCESS_TIMEOUT_SECS" => {
                    let secs: u64 = value.parse().map_err(|e| invalid(&e))?;
                    overrides.process_timeout_secs = Some(secs);
                }
                "VERIFY_DOWNLOADS" => {
                    let verify =
                        parse_bool(&value).ok_or_else(|| invalid(&"expected true/false"))?;
                    overrides.verify_downloads = Some(verify);
                }
                "VYPER_DIR" => overrides.vyper_dir = Some(PathBuf::from(&value)),
                _ => {}
            }
        }

        Ok(overrides)
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
