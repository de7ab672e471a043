//! Remote video acquisition for shortsmith
//!
//! Classifies a link by storage provider, runs that provider's negotiation
//! and streams the resulting body into a private temporary directory.

pub mod download;
pub mod provider;
pub mod providers;

use std::path::{Path, PathBuf};

use tracing::info;

pub use download::{download_to_temp, stream_to_file, DownloadedVideo, CHUNK_SIZE};
pub use provider::{Provider, ProviderResolver};
pub use providers::{GenericResolver, GoogleDriveResolver, OneDriveResolver, OneDriveTokens};

use crate::error::DownloadError;
use crate::http_client::DownloadClient;

/// Returns `true` for `http://` and `https://` inputs (case-insensitive).
pub fn is_url(input: &str) -> bool {
    let lower = input.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Where a render item's video comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// A file already on disk, used in place.
    Local(PathBuf),
    /// A link that has to be resolved and downloaded first.
    Remote { url: String, provider: Provider },
}

impl VideoSource {
    /// Classify free-form input: URLs become remote sources, anything else a
    /// local path.
    pub fn classify(input: &str) -> Self {
        let input = input.trim();
        if is_url(input) {
            Self::Remote {
                url: input.to_string(),
                provider: Provider::classify(input),
            }
        } else {
            Self::Local(PathBuf::from(input))
        }
    }
}

/// Registry of provider resolvers with a generic fallback.
pub struct LinkResolver {
    client: DownloadClient,
    providers: Vec<Box<dyn ProviderResolver>>,
    fallback: GenericResolver,
    temp_root: Option<PathBuf>,
}

impl LinkResolver {
    /// Resolver with the built-in Google Drive and OneDrive providers.
    pub fn new(client: DownloadClient) -> Self {
        Self::with_providers(
            client,
            vec![
                Box::new(GoogleDriveResolver::new()),
                Box::new(OneDriveResolver::new()),
            ],
        )
    }

    /// Resolver with a custom provider list, tried in order.
    pub fn with_providers(
        client: DownloadClient,
        providers: Vec<Box<dyn ProviderResolver>>,
    ) -> Self {
        Self {
            client,
            providers,
            fallback: GenericResolver::new(),
            temp_root: None,
        }
    }

    /// Create download directories under `root` instead of the system temp dir.
    #[must_use]
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn resolver_for(&self, url: &str) -> &dyn ProviderResolver {
        self.providers
            .iter()
            .find(|p| p.matches(url))
            .map_or(&self.fallback as &dyn ProviderResolver, |p| &**p)
    }

    /// Which provider would handle `url`.
    pub fn classify(&self, url: &str) -> Provider {
        self.resolver_for(url).provider()
    }

    /// Negotiate and download `url` into a fresh temp directory owned by the
    /// returned value.
    pub async fn resolve(&self, url: &str) -> Result<DownloadedVideo, DownloadError> {
        let resolver = self.resolver_for(url);
        let provider = resolver.provider();
        info!(%provider, url, "Resolving link");
        let response = resolver.open(&self.client, url).await?;
        download_to_temp(response, provider, self.temp_root.as_deref()).await
    }

    /// Download `url` to an explicit path instead of a temp directory.
    pub async fn resolve_to(&self, url: &str, path: &Path) -> Result<u64, DownloadError> {
        let resolver = self.resolver_for(url);
        let response = resolver.open(&self.client, url).await?;
        stream_to_file(response, path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/a.mp4"));
        assert!(is_url("HTTP://EXAMPLE.COM"));
        assert!(!is_url("/tmp/a.mp4"));
        assert!(!is_url("ftp://example.com/a.mp4"));
    }

    #[test]
    fn classify_sources() {
        assert_eq!(
            VideoSource::classify("  https://drive.google.com/file/d/ABC123/view "),
            VideoSource::Remote {
                url: "https://drive.google.com/file/d/ABC123/view".into(),
                provider: Provider::GoogleDrive,
            }
        );
        assert_eq!(
            VideoSource::classify("clips/a.mov"),
            VideoSource::Local(PathBuf::from("clips/a.mov"))
        );
    }

    #[test]
    fn registry_falls_back_to_generic() {
        let resolver = LinkResolver::new(DownloadClient::new().unwrap());
        assert_eq!(resolver.classify("https://1drv.ms/v/s!x"), Provider::OneDrive);
        assert_eq!(
            resolver.classify("https://drive.google.com/file/d/x/view"),
            Provider::GoogleDrive
        );
        assert_eq!(resolver.classify("https://example.com/x.mp4"), Provider::Generic);
    }

    #[test]
    fn empty_registry_uses_generic_for_everything() {
        let resolver = LinkResolver::with_providers(DownloadClient::new().unwrap(), Vec::new());
        assert_eq!(
            resolver.classify("https://drive.google.com/file/d/x/view"),
            Provider::Generic
        );
    }

    #[tokio::test]
    async fn resolve_generic_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"0123456789".to_vec(), "video/mp4"),
            )
            .mount(&server)
            .await;

        let resolver = LinkResolver::new(DownloadClient::new().unwrap());
        let video = resolver.resolve(&format!("{}/v.mp4", server.uri())).await.unwrap();
        assert_eq!(video.provider(), Provider::Generic);
        assert_eq!(video.len(), 10);
        assert!(video.path().ends_with("input.mp4"));
        let dir = video.dir().to_path_buf();
        video.close().unwrap();
        assert!(!dir.exists());
    }
}
