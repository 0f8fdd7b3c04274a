//! Core data types.

pub mod manifest;
pub mod platform;
pub mod version;

pub use manifest::{DownloadPlan, RemoteManifest, RemoteRelease};
pub use platform::Platform;
pub use version::{VersionPair, VersionSpec};
