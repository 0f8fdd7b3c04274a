//! zkvvm - a version manager for the zkVyper compiler
//!
//! Installs prebuilt zkVyper binaries into a local cache, keyed by compiler
//! and Vyper backend version, and runs them to compile Vyper sources.
//!
//! ```rust,no_run
//! use zkvvm::{Config, VersionManager};
//!
//! let config = Config::with_cache_dir("/tmp/zkvvm");
//! let manager = VersionManager::new(config)?;
//! let output = manager.compile(&["contracts/Token.vy"])?;
//! for (path, contract) in &output.contracts {
//!     println!("{}: {:?}", path, contract.bytecode);
//! }
//! # Ok::<(), zkvvm::Error>(())
//! ```

pub mod core;
pub mod ops;
pub mod sources;
pub mod util;

/// Test utilities and mocks for zkvvm unit tests.
///
/// Only compiled for tests. Provides a mock HTTP transport and manifest
/// fixtures.
#[cfg(test)]
pub mod test_support;

use std::path::Path;

pub use crate::core::{Platform, VersionPair, VersionSpec};
pub use ops::{CompileResult, ContractOutput, DownloadProgress, VersionManager};
pub use sources::CacheEntry;
pub use util::config::Config;
pub use util::context::GlobalContext;
pub use util::errors::{Error, Result};

/// Compile files with the default version pair from `config`.
pub fn compile<P: AsRef<Path>>(paths: &[P], config: &Config) -> Result<CompileResult> {
    VersionManager::new(config.clone())?.compile(paths)
}

/// Compile Vyper source text with the default version pair from `config`.
pub fn compile_source(source: &str, config: &Config) -> Result<CompileResult> {
    VersionManager::new(config.clone())?.compile_source(source)
}
