//! Remote catalog of installable compiler binaries.

use std::sync::Arc;

use semver::Version;
use url::Url;

use crate::core::manifest::parse_index;
use crate::core::{Platform, RemoteManifest, RemoteRelease};
use crate::sources::http::Transport;
use crate::util::errors::{Error, Result};

/// Reads the remote manifest for one platform.
///
/// Nothing is cached between calls: every listing hits the network.
pub struct RemoteCatalog {
    base_url: Url,
    platform: Platform,
    transport: Arc<dyn Transport>,
}

impl RemoteCatalog {
    /// Create a catalog rooted at `manifest_url`.
    pub fn new(
        manifest_url: &str,
        platform: Platform,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let mut base_url = Url::parse(manifest_url).map_err(|e| Error::Config {
            message: format!("invalid manifest_url `{}`: {}", manifest_url, e),
        })?;

        // Url::join replaces the last segment unless the base ends in a slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(RemoteCatalog {
            base_url,
            platform,
            transport,
        })
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// URL of the compiler index document.
    pub fn index_url(&self) -> Result<Url> {
        self.endpoint("index.json")
    }

    /// URL of one compiler's release document.
    pub fn release_url(&self, compiler: &Version) -> Result<Url> {
        self.endpoint(&format!("{}.json", compiler))
    }

    fn endpoint(&self, file: &str) -> Result<Url> {
        let relative = format!("{}/{}", self.platform, file);
        self.base_url.join(&relative).map_err(|e| Error::Config {
            message: format!("cannot build manifest URL for `{}`: {}", relative, e),
        })
    }

    fn get(&self, url: &Url) -> Result<Vec<u8>> {
        let response = self.transport.open(url.as_str())?;
        response.bytes(url.as_str(), self.transport.timeout())
    }

    /// Available compiler versions, newest first.
    pub fn list_compiler_versions(&self) -> Result<Vec<Version>> {
        let url = self.index_url()?;
        tracing::debug!("Fetching remote zkVyper versions from {}", url);

        let versions = parse_index(&self.get(&url)?)?;
        tracing::debug!("Found {} zkVyper versions", versions.len());
        Ok(versions)
    }

    /// The release document for one compiler version.
    pub fn release(&self, compiler: &Version) -> Result<RemoteRelease> {
        let url = self.release_url(compiler)?;
        tracing::debug!("Fetching zkVyper v{} release from {}", compiler, url);

        let release = RemoteRelease::from_json(&self.get(&url)?)?;
        if &release.compiler != compiler {
            return Err(Error::parse(
                "release document",
                format!(
                    "{} describes compiler {}, expected {}",
                    url, release.compiler, compiler
                ),
            ));
        }
        Ok(release)
    }

    /// Backend versions compatible with `compiler`, newest first.
    pub fn list_backend_versions(&self, compiler: &Version) -> Result<Vec<Version>> {
        Ok(self.release(compiler)?.backends)
    }

    /// The index plus every release it lists.
    pub fn fetch_manifest(&self) -> Result<RemoteManifest> {
        let mut manifest = RemoteManifest::new(self.list_compiler_versions()?);
        for compiler in manifest.compilers().to_vec() {
            manifest.insert_release(self.release(&compiler)?);
        }
        Ok(manifest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{release_json, MockHttpResponse, MockTransport, TEST_MANIFEST_URL};

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    fn catalog(transport: &Arc<MockTransport>) -> RemoteCatalog {
        RemoteCatalog::new(TEST_MANIFEST_URL, Platform::LinuxAmd64, transport.clone()).unwrap()
    }

    #[test]
    fn test_endpoint_urls() {
        let transport = Arc::new(MockTransport::new());
        let cat =
            RemoteCatalog::new("https://example.com/zkvyper", Platform::MacosArm64, transport)
                .unwrap();
        assert_eq!(
            cat.index_url().unwrap().as_str(),
            "https://example.com/zkvyper/macosx-arm64/index.json"
        );
        assert_eq!(
            cat.release_url(&v("1.1.1")).unwrap().as_str(),
            "https://example.com/zkvyper/macosx-arm64/1.1.1.json"
        );
    }

    #[test]
    fn test_invalid_manifest_url() {
        let transport = Arc::new(MockTransport::new());
        let err = RemoteCatalog::new("not a url", Platform::LinuxAmd64, transport).err().unwrap();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_list_versions() {
        let transport = Arc::new(MockTransport::new());
        transport.serve_manifest(&[("1.1.0", &["0.3.3"]), ("1.1.1", &["0.3.3", "0.3.4"])]);

        let cat = catalog(&transport);
        assert_eq!(cat.list_compiler_versions().unwrap(), vec![v("1.1.1"), v("1.1.0")]);
        assert_eq!(
            cat.list_backend_versions(&v("1.1.1")).unwrap(),
            vec![v("0.3.4"), v("0.3.3")]
        );
        assert_eq!(transport.request_count(), 2);
    }

    #[test]
    fn test_fetch_manifest_reads_every_release() {
        let transport = Arc::new(MockTransport::new());
        transport.serve_manifest(&[("1.1.0", &["0.3.3"]), ("1.1.1", &["0.3.3"])]);

        let manifest = catalog(&transport).fetch_manifest().unwrap();
        assert_eq!(manifest.pairs().len(), 2);
        assert_eq!(transport.request_count(), 3);
    }

    #[test]
    fn test_http_failure_is_network_error() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_url(
            &format!("{}/linux-amd64/index.json", TEST_MANIFEST_URL),
            MockHttpResponse::server_error("boom"),
        );
        let err = catalog(&transport).list_compiler_versions().unwrap_err();
        assert!(matches!(err, Error::Network { .. }));
    }

    #[test]
    fn test_mismatched_release_is_parse_error() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_url(
            &format!("{}/linux-amd64/1.1.1.json", TEST_MANIFEST_URL),
            MockHttpResponse::ok(release_json("1.1.0", &["0.3.3"])),
        );
        let err = catalog(&transport).release(&v("1.1.1")).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
