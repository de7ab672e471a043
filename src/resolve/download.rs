//! Streaming a resolved response body into an owned temporary directory.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use reqwest::Response;
use tempfile::TempDir;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use super::provider::Provider;
use crate::error::DownloadError;
use crate::http_client::ensure_success;

/// Upper bound for a single write to disk.
pub const CHUNK_SIZE: usize = 1 << 20;

/// File name of the downloaded video inside its temp directory.
const DOWNLOAD_FILE_NAME: &str = "input.mp4";

/// A downloaded video and the private directory holding it.
///
/// Dropping the value removes the directory and the file, so the caller's
/// scope decides the lifetime on every exit path.
#[derive(Debug)]
pub struct DownloadedVideo {
    dir: TempDir,
    path: PathBuf,
    provider: Provider,
    bytes: u64,
}

impl DownloadedVideo {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    /// Number of bytes written.
    pub fn len(&self) -> u64 {
        self.bytes
    }

    pub fn is_empty(&self) -> bool {
        self.bytes == 0
    }

    /// Delete the directory now, reporting any IO failure.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Stream `response` into a fresh `viddl_*` directory under `root`, or
/// under the system temp directory when `root` is `None`.
pub async fn download_to_temp(
    response: Response,
    provider: Provider,
    root: Option<&Path>,
) -> Result<DownloadedVideo, DownloadError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("viddl_");
    let dir = match root {
        Some(root) => {
            tokio::fs::create_dir_all(root).await?;
            builder.tempdir_in(root)?
        }
        None => builder.tempdir()?,
    };
    let path = dir.path().join(DOWNLOAD_FILE_NAME);
    let bytes = stream_to_file(response, &path).await?;
    info!(%provider, bytes, path = %path.display(), "Download complete");
    Ok(DownloadedVideo {
        dir,
        path,
        provider,
        bytes,
    })
}

/// Stream a response body to `path`, failing on a non-2xx status.
pub async fn stream_to_file(response: Response, path: &Path) -> Result<u64, DownloadError> {
    let response = ensure_success(response)?;
    let mut file = tokio::fs::File::create(path).await?;
    let mut body = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = body.next().await {
        written += write_chunk(&mut file, &chunk?).await?;
    }

    file.flush().await?;
    debug!(written, "Body streamed to disk");
    Ok(written)
}

/// Write one network chunk in bounded pieces. Empty keep-alive chunks are
/// skipped.
async fn write_chunk<W: AsyncWrite + Unpin>(out: &mut W, chunk: &[u8]) -> std::io::Result<u64> {
    if chunk.is_empty() {
        return Ok(0);
    }
    for piece in chunk.chunks(CHUNK_SIZE) {
        out.write_all(piece).await?;
    }
    Ok(chunk.len() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http_client::DownloadClient;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn empty_chunks_are_not_written() {
        let mut out = Vec::new();
        assert_eq!(write_chunk(&mut out, &[]).await.unwrap(), 0);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn oversized_chunks_are_written_whole() {
        let mut out = Vec::new();
        let chunk = vec![7u8; CHUNK_SIZE * 2 + 3];
        let written = write_chunk(&mut out, &chunk).await.unwrap();
        assert_eq!(written, chunk.len() as u64);
        assert_eq!(out, chunk);
    }

    #[tokio::test]
    async fn download_lands_in_owned_dir() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/clip.mp4"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(b"fake-mp4".to_vec(), "video/mp4"),
            )
            .mount(&server)
            .await;

        let client = DownloadClient::new().unwrap();
        let response = client.get(&format!("{}/clip.mp4", server.uri())).await.unwrap();
        let root = tempfile::tempdir().unwrap();
        let video = download_to_temp(response, Provider::Generic, Some(root.path()))
            .await
            .unwrap();

        assert!(video.dir().starts_with(root.path()));
        assert!(video
            .dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("viddl_"));
        assert_eq!(std::fs::read(video.path()).unwrap(), b"fake-mp4");
        assert_eq!(video.len(), 8);
        let dir = video.dir().to_path_buf();
        drop(video);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn non_success_status_fails_without_writing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = DownloadClient::new().unwrap();
        let response = client.get(&format!("{}/clip.mp4", server.uri())).await.unwrap();
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("out.mp4");
        let err = stream_to_file(response, &target).await.unwrap_err();

        assert!(matches!(err, DownloadError::Status { status: 500, .. }));
        assert!(!target.exists());
    }
}
