//! Where compiler binaries come from and where they are kept.
//!
//! The remote catalog reads the manifest over a [`Transport`]; the binary
//! cache stores what the installer downloads.

pub mod cache;
pub mod catalog;
pub mod http;

pub use cache::{BinaryCache, CacheEntry};
pub use catalog::RemoteCatalog;
pub use http::{HttpTransport, Response, Transport};
