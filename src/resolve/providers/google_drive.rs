//! Google Drive shared-file provider
//!
//! Share links look like `https://drive.google.com/file/d/<id>/view`. The
//! file itself is served from the `uc?export=download` endpoint, which for
//! larger files first answers with a "can't scan for viruses" HTML page
//! carrying a `confirm=<token>` that must be echoed back.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Response;
use scraper::{Html, Selector};
use tracing::{debug, info};

use crate::error::DownloadError;
use crate::http_client::{is_html, DownloadClient};
use crate::resolve::provider::{Provider, ProviderResolver};

const GDRIVE_BASE: &str = "https://drive.google.com";

static FILE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/file/d/([a-zA-Z0-9_-]+)").expect("valid file id regex"));
static QUERY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]id=([a-zA-Z0-9_-]+)").expect("valid id regex"));
static CONFIRM_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"confirm=([0-9A-Za-z_]+)").expect("valid confirm regex"));
static CONFIRM_INPUT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"input[name="confirm"]"#).expect("valid selector"));

pub struct GoogleDriveResolver {
    base_url: String,
}

impl GoogleDriveResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(GDRIVE_BASE)
    }

    /// Point the export endpoint somewhere else (used by tests).
    #[must_use]
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Extract the file id from a `/file/d/<id>` path, or an `id=` query
    /// parameter on `open?id=` / `uc?id=` links.
    pub fn extract_file_id(url: &str) -> Option<String> {
        FILE_ID
            .captures(url)
            .or_else(|| QUERY_ID.captures(url))
            .map(|c| c[1].to_string())
    }

    /// Find the confirm token on the virus-scan interstitial.
    pub fn extract_confirm_token(html: &str) -> Option<String> {
        if let Some(c) = CONFIRM_TOKEN.captures(html) {
            return Some(c[1].to_string());
        }
        // Newer interstitials post a form instead of linking
        Html::parse_document(html)
            .select(&CONFIRM_INPUT)
            .find_map(|input| input.value().attr("value"))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn export_url(&self, file_id: &str, confirm: Option<&str>) -> String {
        match confirm {
            Some(token) => format!(
                "{}/uc?export=download&confirm={token}&id={file_id}",
                self.base_url
            ),
            None => format!("{}/uc?export=download&id={file_id}", self.base_url),
        }
    }
}

impl Default for GoogleDriveResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderResolver for GoogleDriveResolver {
    fn provider(&self) -> Provider {
        Provider::GoogleDrive
    }

    async fn open(&self, client: &DownloadClient, url: &str) -> Result<Response, DownloadError> {
        let Some(file_id) = Self::extract_file_id(url) else {
            debug!("no Drive file id in link, fetching it as-is");
            return client.get(url).await;
        };

        let response = client.get(&self.export_url(&file_id, None)).await?;
        if !is_html(&response) {
            return Ok(response);
        }

        let html = response.text().await?;
        let token = Self::extract_confirm_token(&html).ok_or(DownloadError::MissingTokens {
            provider: "google-drive",
            what: "confirm token",
        })?;
        info!(file_id, "Drive interstitial, retrying with confirm token");

        let confirmed_url = self.export_url(&file_id, Some(&token));
        let response = client.get(&confirmed_url).await?;
        if response.status().is_success() && is_html(&response) {
            return Err(DownloadError::UnexpectedHtml {
                provider: "google-drive",
                url: confirmed_url,
            });
        }
        Ok(response)
    }
}
