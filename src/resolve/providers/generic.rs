//! Generic provider for direct URLs

use async_trait::async_trait;
use reqwest::Response;

use crate::error::DownloadError;
use crate::http_client::DownloadClient;
use crate::resolve::provider::{Provider, ProviderResolver};

/// Plain GET with redirects followed. Accepts every URL, so it serves as the
/// fallback when no specific provider matches.
pub struct GenericResolver;

impl GenericResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Default for GenericResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderResolver for GenericResolver {
    fn provider(&self) -> Provider {
        Provider::Generic
    }

    fn matches(&self, _url: &str) -> bool {
        true
    }

    async fn open(&self, client: &DownloadClient, url: &str) -> Result<Response, DownloadError> {
        client.get(url).await
    }
}
