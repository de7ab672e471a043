//! HTTP client for shared-link resolution
//!
//! Features:
//! - Cookie jar shared across the negotiation steps of one link
//! - Bounded redirects (share links bounce through several hosts)
//! - Connect, read and whole-request timeouts on every call
//! - Desktop browser User-Agent (providers serve stripped pages otherwise)

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE, REFERER};
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};

use crate::config::HttpConfig;
use crate::error::DownloadError;

/// User-Agent sent when the config does not override it.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

/// HTTP client used by every provider resolver.
#[derive(Debug, Clone)]
pub struct DownloadClient {
    client: Client,
}

impl DownloadClient {
    /// Create a client with default timeouts
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_config(&HttpConfig::default())
    }

    /// Create a client from explicit settings
    pub fn with_config(config: &HttpConfig) -> Result<Self, DownloadError> {
        let client = Client::builder()
            // ═══════════════════════════════════════════════════════════════
            // CONNECTION
            // ═══════════════════════════════════════════════════════════════
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .use_rustls_tls()
            // ═══════════════════════════════════════════════════════════════
            // COMPRESSION (HTML interstitials only; video bodies are identity)
            // ═══════════════════════════════════════════════════════════════
            .brotli(true)
            .gzip(true)
            .deflate(true)
            // ═══════════════════════════════════════════════════════════════
            // IDENTITY
            // ═══════════════════════════════════════════════════════════════
            .user_agent(config.user_agent.clone())
            // ═══════════════════════════════════════════════════════════════
            // TIMEOUTS
            // ═══════════════════════════════════════════════════════════════
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .timeout(config.request_timeout())
            // ═══════════════════════════════════════════════════════════════
            // REDIRECTS + COOKIES
            // ═══════════════════════════════════════════════════════════════
            .redirect(reqwest::redirect::Policy::limited(10))
            .cookie_store(true)
            .build()?;

        Ok(Self { client })
    }

    /// GET a URL, following redirects. The body is left unread.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get(&self, url: &str) -> Result<Response, DownloadError> {
        self.get_with_headers(url, HeaderMap::new()).await
    }

    /// GET a URL with a `Referer` header.
    #[instrument(skip(self), fields(url = %url, referer = %referer))]
    pub async fn get_with_referer(
        &self,
        url: &str,
        referer: &str,
    ) -> Result<Response, DownloadError> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(referer) {
            headers.insert(REFERER, value);
        } else {
            debug!("referer is not a valid header value, sending without it");
        }
        self.get_with_headers(url, headers).await
    }

    async fn get_with_headers(
        &self,
        url: &str,
        headers: HeaderMap,
    ) -> Result<Response, DownloadError> {
        let response = self.client.get(url).headers(headers).send().await?;

        info!(
            status = %response.status(),
            final_url = %response.url(),
            content_type = ?response.headers().get(CONTENT_TYPE),
            "Response received"
        );

        Ok(response)
    }
}

/// Returns `true` when the response declares an HTML body.
pub fn is_html(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("text/html"))
}

/// Turn a non-2xx response into [`DownloadError::Status`].
pub fn ensure_success(response: Response) -> Result<Response, DownloadError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(DownloadError::Status {
            url: response.url().to_string(),
            status: status.as_u16(),
        })
    }
}
