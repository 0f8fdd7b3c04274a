//! Test utilities and mocks for zkvvm unit tests.
//!
//! The network is the only collaborator that is hard to run for real, so the
//! main piece here is [`MockTransport`], a [`Transport`] that serves canned
//! responses and records every URL it was asked for.
//!
//! # Example
//!
//! ```rust,ignore
//! use zkvvm::test_support::{MockTransport, TEST_MANIFEST_URL};
//!
//! #[test]
//! fn test_example() {
//!     let transport = Arc::new(MockTransport::new());
//!     transport.serve_manifest(&[("1.1.1", &["0.3.3"])]);
//!     transport.serve_binary("1.1.1", "0.3.3", b"...".to_vec());
//!
//!     let platform = Platform::LinuxAmd64;
//!     let catalog = RemoteCatalog::new(TEST_MANIFEST_URL, platform, transport.clone())?;
//!     // ...
//!     assert_eq!(transport.request_count(), 2);
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::io::{self, Cursor, Read};
use std::sync::Mutex;
use std::time::Duration;

use crate::core::Platform;
use crate::sources::http::{Response, Transport};
use crate::util::errors::{Error, Result};

// Re-export fixtures for convenience
pub use fixtures::*;

/// Base URL the mocked manifest is served under.
pub const TEST_MANIFEST_URL: &str = "https://manifest.test/zkvyper";

/// Download URL template used by mocked release documents.
pub const TEST_DOWNLOAD_TEMPLATE: &str =
    "https://downloads.test/{platform}/zkvyper-v{compiler}-vyper-v{backend}";

/// Platform the mocks serve documents for.
pub const TEST_PLATFORM: Platform = Platform::LinuxAmd64;

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockHttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
    /// Advertised `Content-Length`. Defaults to the body length.
    pub content_length: Option<u64>,
    /// Fail the body read with a connection reset after this many bytes.
    pub fail_after: Option<usize>,
}

impl MockHttpResponse {
    /// Create a successful response with the given body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        MockHttpResponse {
            status: 200,
            content_length: Some(body.len() as u64),
            body,
            fail_after: None,
        }
    }

    /// Create a not found response.
    pub fn not_found() -> Self {
        MockHttpResponse {
            status: 404,
            body: b"Not Found".to_vec(),
            content_length: None,
            fail_after: None,
        }
    }

    /// Create a server error response.
    pub fn server_error(message: &str) -> Self {
        MockHttpResponse {
            status: 500,
            body: message.as_bytes().to_vec(),
            content_length: None,
            fail_after: None,
        }
    }

    /// Drop the connection after `bytes` bytes of body.
    pub fn fail_after(mut self, bytes: usize) -> Self {
        self.fail_after = Some(bytes);
        self
    }

    /// Advertise a different `Content-Length` than the body has.
    pub fn with_content_length(mut self, len: u64) -> Self {
        self.content_length = Some(len);
        self
    }

    /// Check if this is a successful response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Body reader that errors out part way through.
struct FailingReader {
    data: Cursor<Vec<u8>>,
    remaining: usize,
}

impl Read for FailingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ));
        }
        let len = buf.len().min(self.remaining);
        let n = self.data.read(&mut buf[..len])?;
        self.remaining -= n;
        Ok(n)
    }
}

/// Mock transport for catalog and download tests.
///
/// URLs without a registered response fail like an unreachable host.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, MockHttpResponse>>,
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Create a new mock transport with no responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a response for a URL, replacing any previous one.
    pub fn mock_url(&self, url: &str, response: MockHttpResponse) -> &Self {
        lock(&self.responses).insert(url.to_string(), response);
        self
    }

    /// Serve an index plus one release document per compiler.
    pub fn serve_manifest(&self, releases: &[(&str, &[&str])]) {
        let compilers: Vec<&str> = releases.iter().map(|(c, _)| *c).collect();
        self.mock_url(&manifest_url("index.json"), MockHttpResponse::ok(index_json(&compilers)));

        for (compiler, backends) in releases {
            self.mock_url(
                &manifest_url(&format!("{}.json", compiler)),
                MockHttpResponse::ok(release_json(compiler, backends)),
            );
        }
    }

    /// Serve a single-release manifest that publishes a checksum.
    pub fn serve_manifest_with_checksum(&self, compiler: &str, backend: &str, sha256: &str) {
        self.mock_url(&manifest_url("index.json"), MockHttpResponse::ok(index_json(&[compiler])));
        self.mock_url(
            &manifest_url(&format!("{}.json", compiler)),
            MockHttpResponse::ok(release_json_with_checksums(compiler, &[(backend, sha256)])),
        );
    }

    /// Serve a binary at the URL the mocked manifest points to. Returns that URL.
    pub fn serve_binary(&self, compiler: &str, backend: &str, bytes: Vec<u8>) -> String {
        let url = download_url(compiler, backend);
        self.mock_url(&url, MockHttpResponse::ok(bytes));
        url
    }

    /// All requested URLs, in order.
    pub fn requests(&self) -> Vec<String> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Clear request history.
    pub fn clear_requests(&self) {
        lock(&self.requests).clear();
    }
}

impl Transport for MockTransport {
    fn open(&self, url: &str) -> Result<Response> {
        lock(&self.requests).push(url.to_string());

        let response = lock(&self.responses).get(url).cloned().ok_or_else(|| Error::Network {
            url: url.to_string(),
            message: "no mock response (connection refused)".to_string(),
        })?;

        if !response.is_success() {
            return Err(Error::Network {
                url: url.to_string(),
                message: format!("HTTP {}", response.status),
            });
        }

        let content_length = response.content_length;
        Ok(match response.fail_after {
            Some(remaining) => Response::new(
                content_length,
                FailingReader {
                    data: Cursor::new(response.body),
                    remaining,
                },
            ),
            None => Response::new(content_length, Cursor::new(response.body)),
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// URL of a manifest document for [`TEST_PLATFORM`].
pub fn manifest_url(file: &str) -> String {
    format!("{}/{}/{}", TEST_MANIFEST_URL, TEST_PLATFORM, file)
}

/// URL the mocked manifest gives for a pair on [`TEST_PLATFORM`].
pub fn download_url(compiler: &str, backend: &str) -> String {
    TEST_DOWNLOAD_TEMPLATE
        .replace("{platform}", TEST_PLATFORM.as_str())
        .replace("{compiler}", compiler)
        .replace("{backend}", backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_transport_records_requests() {
        let transport = MockTransport::new();
        transport.mock_url("https://a.test/x", MockHttpResponse::ok("hello"));

        let body = transport
            .open("https://a.test/x")
            .unwrap()
            .bytes("https://a.test/x", transport.timeout())
            .unwrap();
        assert_eq!(body, b"hello");
        assert!(transport.open("https://a.test/missing").is_err());
        assert_eq!(transport.requests(), vec!["https://a.test/x", "https://a.test/missing"]);
    }

    #[test]
    fn test_failing_body() {
        let transport = MockTransport::new();
        transport.mock_url("https://a.test/x", MockHttpResponse::ok(vec![0u8; 100]).fail_after(10));

        let mut response = transport.open("https://a.test/x").unwrap();
        assert_eq!(response.content_length, Some(100));
        let mut buf = Vec::new();
        let err = response.body.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("1.1.1", "0.3.3"),
            "https://downloads.test/linux-amd64/zkvyper-v1.1.1-vyper-v0.3.3"
        );
    }
}
