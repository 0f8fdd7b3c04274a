//! Running an installed compiler.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{VersionPair, VersionSpec};
use crate::ops::install::{any_version, DownloadProgress, Installer};
use crate::sources::cache::CacheEntry;
use crate::util::errors::{Error, Result};
use crate::util::process::ProcessBuilder;

/// Arguments that select the machine-readable output format.
pub const OUTPUT_FORMAT_ARGS: [&str; 2] = ["-f", "combined_json"];

/// Flag naming the vyper executable the compiler drives.
pub const BACKEND_ARG: &str = "--vyper";

/// File name of the vyper executable for `version` inside a vyper directory.
pub fn backend_file_name(version: &Version) -> String {
    format!("vyper-{}{}", version, std::env::consts::EXE_SUFFIX)
}

/// Output for one contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bytecode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Value>,
    /// Any other fields the compiler emitted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Parsed compiler output.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileResult {
    /// Compiler version as reported in the output, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Per-contract output keyed by source path.
    pub contracts: BTreeMap<String, ContractOutput>,
    /// Top-level non-contract fields.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl CompileResult {
    /// Parse `combined_json` output.
    ///
    /// The output is trimmed and must be one JSON object. Object-valued keys
    /// are contracts; a string `version` key is the compiler version.
    pub fn parse(stdout: &[u8]) -> Result<Self> {
        let what = "compiler output";
        let text = std::str::from_utf8(stdout).map_err(|e| Error::parse(what, e))?;
        let value: Value = serde_json::from_str(text.trim()).map_err(|e| Error::parse(what, e))?;

        let Value::Object(map) = value else {
            return Err(Error::parse(what, "expected a JSON object"));
        };

        let mut result = CompileResult::default();
        for (key, value) in map {
            match value {
                Value::String(v) if key == "version" => result.version = Some(v),
                Value::Object(_) => {
                    let contract = serde_json::from_value(value)
                        .map_err(|e| Error::parse(what, format!("contract `{}`: {}", key, e)))?;
                    result.contracts.insert(key, contract);
                }
                other => {
                    result.extra.insert(key, other);
                }
            }
        }
        Ok(result)
    }
}

/// Invokes compiler binaries, installing them on demand.
pub struct Compiler<'a> {
    installer: &'a Installer,
    compiler_version: Option<&'a VersionSpec>,
    backend_version: Option<&'a VersionSpec>,
    timeout: Duration,
    vyper_dir: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
    progress: Option<Box<dyn DownloadProgress + 'a>>,
}

impl<'a> Compiler<'a> {
    pub fn new(installer: &'a Installer, timeout: Duration) -> Self {
        Compiler {
            installer,
            compiler_version: None,
            backend_version: None,
            timeout,
            vyper_dir: None,
            temp_dir: None,
            progress: None,
        }
    }

    /// Versions to use when a call does not name a pair.
    pub fn with_defaults(
        mut self,
        compiler: Option<&'a VersionSpec>,
        backend: Option<&'a VersionSpec>,
    ) -> Self {
        self.compiler_version = compiler;
        self.backend_version = backend;
        self
    }

    /// Look up `vyper-<backend>` in `dir` and pass it with `--vyper`.
    ///
    /// Without a vyper directory the compiler finds `vyper` on its own.
    pub fn with_vyper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.vyper_dir = Some(dir.into());
        self
    }

    /// Directory for the `.vy` files written by `compile_source`.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Report downloads triggered by a compile.
    pub fn with_progress(mut self, progress: impl DownloadProgress + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// The pair a call will use.
    ///
    /// An explicit pair wins. Otherwise the configured versions are used
    /// directly when both are exact, and looked up in the remote manifest
    /// when either is a requirement or unset.
    pub fn resolve_pair(&self, explicit: Option<&VersionPair>) -> Result<VersionPair> {
        if let Some(pair) = explicit {
            return Ok(pair.clone());
        }

        let any = any_version();
        let compiler = self.compiler_version.unwrap_or(&any);
        let backend = self.backend_version.unwrap_or(&any);
        let pair = self.installer.select(compiler, backend)?;
        tracing::debug!("Using zkVyper {}", pair);
        Ok(pair)
    }

    /// Compile source files, installing the compiler first if needed.
    pub fn compile<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        pair: Option<&VersionPair>,
        flags: &[String],
    ) -> Result<CompileResult> {
        let (entry, backend) = self.prepare(pair)?;
        let paths: Vec<&Path> = paths.iter().map(|p| p.as_ref()).collect();
        self.invoke(&entry, backend.as_deref(), &paths, flags)
    }

    /// Compile Vyper source text via a temporary `.vy` file.
    ///
    /// The temp file is removed on every path out of this function.
    pub fn compile_source(
        &mut self,
        source: &str,
        pair: Option<&VersionPair>,
        flags: &[String],
    ) -> Result<CompileResult> {
        let (entry, backend) = self.prepare(pair)?;

        let dir = self.temp_dir.clone().unwrap_or_else(std::env::temp_dir);
        let mut file = tempfile::Builder::new()
            .prefix("zkvvm-")
            .suffix(".vy")
            .tempfile_in(&dir)
            .map_err(|e| Error::io(&dir, e))?;
        if let Err(e) = file.write_all(source.as_bytes()).and_then(|_| file.flush()) {
            return Err(Error::io(file.path(), e));
        }

        self.invoke(&entry, backend.as_deref(), &[file.path()], flags)
    }

    /// Resolve the pair, find its backend and make sure the compiler is
    /// installed.
    fn prepare(&mut self, pair: Option<&VersionPair>) -> Result<(CacheEntry, Option<PathBuf>)> {
        let pair = self.resolve_pair(pair)?;
        let backend = self.backend_path(&pair.backend)?;
        let progress = self
            .progress
            .as_deref_mut()
            .map(|p| p as &mut dyn DownloadProgress);
        let entry = self.installer.ensure_installed(&pair, progress)?;
        Ok((entry, backend))
    }

    fn backend_path(&self, version: &Version) -> Result<Option<PathBuf>> {
        let Some(dir) = &self.vyper_dir else {
            return Ok(None);
        };
        let path = dir.join(backend_file_name(version));
        if !path.is_file() {
            return Err(Error::BackendNotFound {
                version: version.clone(),
                path,
            });
        }
        Ok(Some(path))
    }

    fn invoke(
        &self,
        entry: &CacheEntry,
        backend: Option<&Path>,
        paths: &[&Path],
        flags: &[String],
    ) -> Result<CompileResult> {
        let mut cmd = ProcessBuilder::new(&entry.path);
        if let Some(vyper) = backend {
            cmd = cmd.arg(BACKEND_ARG).arg(vyper);
        }
        let cmd = cmd
            .args(OUTPUT_FORMAT_ARGS)
            .args(flags)
            .args(paths)
            .timeout(self.timeout);
        tracing::info!("Running {}", cmd.display_command());

        let output = cmd.exec()?;
        if !output.status.success() {
            return Err(Error::Compilation {
                pair: entry.pair.clone(),
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::warn!("zkVyper {}: {}", entry.pair, stderr.trim());
        }

        CompileResult::parse(&output.stdout)
    }
}
