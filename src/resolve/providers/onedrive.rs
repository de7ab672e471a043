//! OneDrive (personal) shared-file provider
//!
//! `1drv.ms` short links redirect to an HTML viewer page. The file is
//! downloadable from `onedrive.live.com/download` given the `cid`, `resid`
//! and `authkey` parameters, which live in the visited URL's query or
//! fragment or, failing that, somewhere in the page body.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Response, StatusCode, Url};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::DownloadError;
use crate::http_client::{ensure_success, is_html, DownloadClient};
use crate::resolve::provider::{Provider, ProviderResolver};

const ONEDRIVE_BASE: &str = "https://onedrive.live.com";

static OG_URL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:url"]"#).expect("valid selector"));
static RESID_IN_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)https://onedrive\.live\.com/[^"']*resid=([^"&']+)"#)
        .expect("valid resid regex")
});
static AUTHKEY_IN_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)authkey=(![A-Za-z0-9\-_%]+)").expect("valid authkey regex")
});

/// Download parameters scraped from a share page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OneDriveTokens {
    pub cid: String,
    pub resid: String,
    pub authkey: String,
}

impl OneDriveTokens {
    /// Read `cid`/`resid`/`authkey` from a URL's query, then its fragment.
    pub fn from_url(url: &str) -> Self {
        let Ok(parsed) = Url::parse(url) else {
            return Self::default();
        };
        let query: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        let fragment: Vec<(String, String)> = parsed
            .fragment()
            .map(|f| url::form_urlencoded::parse(f.as_bytes()).into_owned().collect())
            .unwrap_or_default();

        let pick = |key: &str| {
            query
                .iter()
                .chain(fragment.iter())
                .find(|(k, v)| k == key && !v.is_empty())
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };

        Self {
            cid: pick("cid"),
            resid: pick("resid"),
            authkey: pick("authkey"),
        }
    }

    /// Tokens from the visited URL, completed from the page body when `cid`
    /// or `resid` is missing.
    pub fn extract(url: &str, html: &str) -> Self {
        let mut tokens = Self::from_url(url);
        if (!tokens.cid.is_empty() && !tokens.resid.is_empty()) || html.is_empty() {
            return tokens;
        }

        if let Some(og_url) = og_url(html) {
            tokens.fill_from(Self::from_url(&og_url));
        }
        if tokens.resid.is_empty() {
            if let Some(c) = RESID_IN_BODY.captures(html) {
                tokens.resid = c[1].to_string();
            }
        }
        if tokens.authkey.is_empty() {
            if let Some(c) = AUTHKEY_IN_BODY.captures(html) {
                tokens.authkey = c[1].to_string();
            }
        }
        if tokens.cid.is_empty() {
            if let Some((owner, _)) = tokens.resid.split_once('!') {
                tokens.cid = owner.to_string();
            }
        }
        tokens
    }

    fn fill_from(&mut self, other: Self) {
        for (mine, theirs) in [
            (&mut self.cid, other.cid),
            (&mut self.resid, other.resid),
            (&mut self.authkey, other.authkey),
        ] {
            if mine.is_empty() {
                *mine = theirs;
            }
        }
    }

    pub fn is_usable(&self) -> bool {
        !self.cid.is_empty() || !self.resid.is_empty()
    }
}

fn og_url(html: &str) -> Option<String> {
    Html::parse_document(html)
        .select(&OG_URL)
        .find_map(|meta| meta.value().attr("content"))
        .map(str::to_string)
}

pub struct OneDriveResolver {
    base_url: String,
}

impl OneDriveResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(ONEDRIVE_BASE)
    }

    /// Point the download endpoint somewhere else (used by tests).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Canonical download URL carrying only the non-empty tokens.
    pub fn download_url(&self, tokens: &OneDriveTokens) -> Result<String, DownloadError> {
        let base = format!("{}/download", self.base_url);
        let mut url = Url::parse(&base).map_err(|e| DownloadError::InvalidUrl {
            url: base.clone(),
            reason: e.to_string(),
        })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in [
                ("cid", &tokens.cid),
                ("resid", &tokens.resid),
                ("authkey", &tokens.authkey),
            ] {
                if !value.is_empty() {
                    pairs.append_pair(key, value);
                }
            }
        }
        Ok(url.into())
    }
}

impl Default for OneDriveResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderResolver for OneDriveResolver {
    fn provider(&self) -> Provider {
        Provider::OneDrive
    }

    async fn open(&self, client: &DownloadClient, url: &str) -> Result<Response, DownloadError> {
        let response = client.get(url).await?;
        let visited = response.url().to_string();
        if response.status() == StatusCode::OK && !is_html(&response) {
            debug!("share link served the file directly");
            return Ok(response);
        }

        let html = response.text().await?;
        let tokens = OneDriveTokens::extract(&visited, &html);
        if !tokens.is_usable() {
            return Err(DownloadError::MissingTokens {
                provider: "onedrive",
                what: "cid/resid",
            });
        }

        let download_url = self.download_url(&tokens)?;
        info!(%download_url, "OneDrive tokens resolved");

        let response = client.get_with_referer(&download_url, &visited).await?;
        if response.status() != StatusCode::FORBIDDEN {
            return ensure_success(response);
        }

        warn!("download refused with Referer, retrying without it");
        ensure_success(client.get(&download_url).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn tokens_from_query_string() {
        let tokens = OneDriveTokens::extract(
            "https://onedrive.live.com/?cid=ABCDEF&resid=ABCDEF%21123&authkey=%21AKey",
            "",
        );
        assert_eq!(
            tokens,
            OneDriveTokens {
                cid: "ABCDEF".into(),
                resid: "ABCDEF!123".into(),
                authkey: "!AKey".into(),
            }
        );
    }

    #[test]
    fn tokens_from_fragment() {
        let tokens =
            OneDriveTokens::from_url("https://onedrive.live.com/redir#cid=C1&resid=C1!9&authkey=!K");
        assert_eq!(tokens.cid, "C1");
        assert_eq!(tokens.resid, "C1!9");
        assert_eq!(tokens.authkey, "!K");
    }

    #[test]
    fn html_is_ignored_when_url_is_complete() {
        let html = r#"<meta property="og:url" content="https://onedrive.live.com/?cid=OTHER&resid=OTHER!1">"#;
        let tokens = OneDriveTokens::extract("https://onedrive.live.com/?cid=A&resid=A!2", html);
        assert_eq!(tokens.cid, "A");
        assert_eq!(tokens.resid, "A!2");
    }

    #[test]
    fn tokens_from_og_url_meta() {
        let html = r#"<html><head>
            <meta property="og:url" content="https://onedrive.live.com/redir?cid=B7&amp;resid=B7!55&amp;authkey=!xyz">
        </head></html>"#;
        let tokens = OneDriveTokens::extract("https://onedrive.live.com/view.aspx", html);
        assert_eq!(tokens.cid, "B7");
        assert_eq!(tokens.resid, "B7!55");
        assert_eq!(tokens.authkey, "!xyz");
    }

    #[test]
    fn tokens_from_body_literals_and_derived_cid() {
        let html = r#"<script>var u = "https://onedrive.live.com/embed?resid=D00D!42&x=1"; var k = "authkey=!Ab-C_d%21";</script>"#;
        let tokens = OneDriveTokens::extract("https://1drv.ms/v/s!abc", html);
        assert_eq!(tokens.resid, "D00D!42");
        assert_eq!(tokens.authkey, "!Ab-C_d%21");
        assert_eq!(tokens.cid, "D00D");
    }

    #[test]
    fn nothing_found_is_unusable() {
        let tokens = OneDriveTokens::extract("https://1drv.ms/v/s!abc", "<html></html>");
        assert!(!tokens.is_usable());
    }

    #[test]
    fn download_url_skips_empty_tokens() {
        let resolver = OneDriveResolver::new();
        let url = resolver
            .download_url(&OneDriveTokens {
                cid: "C".into(),
                resid: "C!1".into(),
                authkey: String::new(),
            })
            .unwrap();
        assert_eq!(url, "https://onedrive.live.com/download?cid=C&resid=C%211");
    }

    #[test]
    fn test_matches() {
        let resolver = OneDriveResolver::new();
        assert!(resolver.matches("https://1drv.ms/v/s!AbCd"));
        assert!(resolver.matches("https://onedrive.live.com/redir?resid=1"));
        assert!(!resolver.matches("https://drive.google.com/file/d/x/view"));
    }

    async fn share_page(server: &MockServer) {
        let page = format!(
            r#"<meta property="og:url" content="{}/redir?cid=C9&amp;resid=C9!7&amp;authkey=!k">"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/share"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(page, "text/html"))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn download_with_referer() {
        let server = MockServer::start().await;
        share_page(&server).await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .and(query_param("resid", "C9!7"))
            .and(header_exists("referer"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"film".to_vec(), "video/mp4"))
            .mount(&server)
            .await;

        let client = DownloadClient::new().unwrap();
        let resolver = OneDriveResolver::with_base_url(&server.uri());
        let response = resolver
            .open(&client, &format!("{}/share", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"film");
    }

    #[tokio::test]
    async fn forbidden_with_referer_retries_once_without() {
        let server = MockServer::start().await;
        share_page(&server).await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .and(header_exists("referer"))
            .respond_with(ResponseTemplate::new(403))
            .with_priority(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"film".to_vec(), "video/mp4"))
            .expect(1)
            .mount(&server)
            .await;

        let client = DownloadClient::new().unwrap();
        let resolver = OneDriveResolver::with_base_url(&server.uri());
        let response = resolver
            .open(&client, &format!("{}/share", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"film");
    }

    #[tokio::test]
    async fn forbidden_twice_is_an_error() {
        let server = MockServer::start().await;
        share_page(&server).await;
        Mock::given(method("GET"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;

        let client = DownloadClient::new().unwrap();
        let resolver = OneDriveResolver::with_base_url(&server.uri());
        let err = resolver
            .open(&client, &format!("{}/share", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Status { status: 403, .. }));
    }

    #[tokio::test]
    async fn direct_binary_share_is_streamed_as_is() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/share"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(b"raw".to_vec(), "video/mp4"))
            .mount(&server)
            .await;

        let client = DownloadClient::new().unwrap();
        let resolver = OneDriveResolver::with_base_url(&server.uri());
        let response = resolver
            .open(&client, &format!("{}/share", server.uri()))
            .await
            .unwrap();
        assert_eq!(response.bytes().await.unwrap().as_ref(), b"raw");
    }
}
