//! Shared utilities

pub mod config;
pub mod context;
pub mod errors;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use config::{Config, ConfigOverrides};
pub use context::GlobalContext;
pub use errors::{Error, Result};
pub use shell::Shell;
