//! Error taxonomy for the version manager.
//!
//! Every failure surfaces to the caller as one of these variants. Nothing is
//! retried or swallowed inside the library; the CLI decides how to render it.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use semver::Version;
use thiserror::Error;

use crate::core::VersionPair;

/// Remediation hints printed by the CLI under the error line.
pub mod suggestions {
    pub const NETWORK: &str = "help: Check your network connection or `--manifest-url`";
    pub const UNKNOWN_VERSION: &str = "help: Run `zkvvm ls-remote` to see installable versions";
    pub const NOT_FOUND: &str = "help: Run `zkvvm ls` to see installed versions";
    pub const TIMEOUT: &str =
        "help: Raise `http_timeout_secs` or `process_timeout_secs` in the config";
    pub const VERIFICATION: &str =
        "help: Retry with `zkvvm install --overwrite`, or set `verify_downloads = false`";
    pub const BACKEND_NOT_FOUND: &str =
        "help: Install that vyper release with vvm, or point `vyper_dir` at its directory";
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// Manifest fetch or download could not reach the server, or the server
    /// answered with a non-success status.
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    /// Malformed manifest document or malformed compiler output.
    #[error("failed to parse {what}: {message}")]
    Parse { what: String, message: String },

    /// The requested versions are not listed in the remote manifest.
    #[error("zkVyper {compiler} with vyper {backend} is not available remotely")]
    UnknownVersion { compiler: String, backend: String },

    /// The transfer started but failed before completing.
    #[error("download of {pair} from {url} failed: {message}")]
    Download {
        pair: VersionPair,
        url: String,
        message: String,
    },

    /// Local filesystem failure.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The pair is not installed.
    #[error("zkVyper {pair} is not installed")]
    NotFound { pair: VersionPair },

    /// No vyper executable for the backend version was found.
    #[error("vyper {version} not found at {}", path.display())]
    BackendNotFound { version: Version, path: PathBuf },

    /// The compiler binary exited non-zero. `stderr` is passed through verbatim.
    #[error("zkVyper {pair} exited with {}:\n{stderr}", exit_code_display(*status))]
    Compilation {
        pair: VersionPair,
        status: Option<i32>,
        stderr: String,
    },

    #[error("{operation} timed out after {}s", after.as_secs())]
    Timeout { operation: String, after: Duration },

    /// A downloaded binary failed its checksum or self-check.
    #[error("downloaded binary for {pair} failed verification: {message}")]
    Verification { pair: VersionPair, message: String },

    #[error("unsupported platform: {os}/{arch}")]
    Platform { os: String, arch: String },

    #[error("invalid configuration: {message}")]
    Config { message: String },
}

fn exit_code_display(status: Option<i32>) -> String {
    match status {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(what: impl Into<String>, message: impl ToString) -> Self {
        Error::Parse {
            what: what.into(),
            message: message.to_string(),
        }
    }

    pub fn unknown_version(compiler: &Version, backend: impl ToString) -> Self {
        Error::UnknownVersion {
            compiler: compiler.to_string(),
            backend: backend.to_string(),
        }
    }

    /// A remediation hint for the CLI, if one applies.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            Error::Network { .. } | Error::Download { .. } => Some(suggestions::NETWORK),
            Error::UnknownVersion { .. } => Some(suggestions::UNKNOWN_VERSION),
            Error::NotFound { .. } => Some(suggestions::NOT_FOUND),
            Error::BackendNotFound { .. } => Some(suggestions::BACKEND_NOT_FOUND),
            Error::Timeout { .. } => Some(suggestions::TIMEOUT),
            Error::Verification { .. } => Some(suggestions::VERIFICATION),
            _ => None,
        }
    }
}
