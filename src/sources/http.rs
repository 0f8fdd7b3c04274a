//! HTTP transport.
//!
//! The catalog and installer only need "GET a URL, give me a byte stream".
//! That seam is the [`Transport`] trait so tests can serve fixed bytes.

use std::io::{self, Read};
use std::time::Duration;

use crate::util::errors::{Error, Result};

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("zkvvm/", env!("CARGO_PKG_VERSION"));

/// An open response body.
pub struct Response {
    /// Value of the `Content-Length` header, if sent.
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

impl Response {
    pub fn new(content_length: Option<u64>, body: impl Read + Send + 'static) -> Self {
        Response {
            content_length,
            body: Box::new(body),
        }
    }

    /// Read the whole body into memory.
    pub fn bytes(mut self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.body
            .read_to_end(&mut buf)
            .map_err(|e| read_error(url, e, timeout))?;
        Ok(buf)
    }
}

/// Something that can perform a blocking GET.
pub trait Transport: Send + Sync {
    /// Open `url`. Fails with `Network` if the host is unreachable or the
    /// status is not a success, and with `Timeout` if the request timed out.
    fn open(&self, url: &str) -> Result<Response>;

    /// Timeout applied to requests, used when reporting timeouts on body reads.
    fn timeout(&self) -> Duration;
}

/// Map a failed body read to `Timeout` or a network error.
pub(crate) fn read_error(url: &str, err: io::Error, timeout: Duration) -> Error {
    if err.kind() == io::ErrorKind::TimedOut {
        Error::Timeout {
            operation: format!("GET {}", url),
            after: timeout,
        }
    } else {
        Error::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// Production transport over `reqwest::blocking`.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(HttpTransport { client, timeout })
    }
}

impl Transport for HttpTransport {
    fn open(&self, url: &str) -> Result<Response> {
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                Error::Timeout {
                    operation: format!("GET {}", url),
                    after: self.timeout,
                }
            } else {
                Error::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::Network {
                url: url.to_string(),
                message: format!("HTTP {}", response.status()),
            });
        }

        Ok(Response::new(response.content_length(), response))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}
