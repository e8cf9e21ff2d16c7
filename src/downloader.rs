//! 画像ダウンロード
//!
//! 失敗は [`DownloadOutcome::Failed`] として返し、呼び出し側の処理は止めない。

use std::path::{Path, PathBuf};

use futures::StreamExt;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{ItemFailure, ScraperError};

/// ファイルへ書き込む単位
pub const DOWNLOAD_CHUNK_SIZE: usize = 1024;

/// 1件分のダウンロード結果（index は抽出時と同じ 0 始まり）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DownloadOutcome {
    Saved {
        index: usize,
        bytes_written: u64,
        path: PathBuf,
    },
    Failed {
        index: usize,
        reason: ItemFailure,
    },
}

impl DownloadOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Saved { index, .. } | Self::Failed { index, .. } => *index,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

/// 保存ファイル名 `{query}_{index + 1}.{ext}`
///
/// 同じクエリで再実行したときに上書きされるよう、名前は入力だけで決まる。
pub fn image_file_name(query: &str, index: usize, extension: &str) -> String {
    format!("{}_{}.{}", sanitize_file_stem(query), index + 1, extension)
}

fn sanitize_file_stem(query: &str) -> String {
    let stem: String = query
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if stem.is_empty() || stem.chars().all(|c| c == '.') {
        "image".to_string()
    } else {
        stem
    }
}

#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new(user_agent: &str) -> Result<Self, ScraperError> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// `url` の内容を `path` に保存する
    pub async fn download(&self, index: usize, url: &str, path: &Path) -> DownloadOutcome {
        match self.fetch_to_file(url, path).await {
            Ok(bytes_written) => DownloadOutcome::Saved {
                index,
                bytes_written,
                path: path.to_path_buf(),
            },
            Err(reason) => DownloadOutcome::Failed { index, reason },
        }
    }

    async fn fetch_to_file(&self, url: &str, path: &Path) -> Result<u64, ItemFailure> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ItemFailure::FileIO(format!("{}: {}", parent.display(), e)))?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ItemFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ItemFailure::NonSuccessStatus {
                status: status.as_u16(),
            });
        }

        let file = tokio::fs::File::create(path)
            .await
            .map_err(|e| ItemFailure::FileIO(format!("{}: {}", path.display(), e)))?;

        let result = write_body(response, file).await;
        if result.is_err() {
            // 途中まで書いたファイルは残さない
            if let Err(e) = tokio::fs::remove_file(path).await {
                debug!("Failed to remove partial file {:?}: {}", path, e);
            }
        }
        result
    }
}

async fn write_body(
    response: reqwest::Response,
    mut file: tokio::fs::File,
) -> Result<u64, ItemFailure> {
    let mut stream = response.bytes_stream();
    let mut written = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| ItemFailure::Transport(e.to_string()))?;
        for block in chunk.chunks(DOWNLOAD_CHUNK_SIZE) {
            file.write_all(block)
                .await
                .map_err(|e| ItemFailure::FileIO(e.to_string()))?;
            written += block.len() as u64;
        }
    }

    file.flush()
        .await
        .map_err(|e| ItemFailure::FileIO(e.to_string()))?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn downloader() -> Downloader {
        Downloader::new("image-scraper-test").unwrap()
    }

    #[test]
    fn test_image_file_name_is_one_based() {
        assert_eq!(image_file_name("dragons", 2, "jpg"), "dragons_3.jpg");
        assert_eq!(image_file_name("dragons", 0, "jpg"), "dragons_1.jpg");
    }

    #[test]
    fn test_image_file_name_sanitizes_separators() {
        assert_eq!(image_file_name("red/blue", 0, "jpg"), "red_blue_1.jpg");
        assert_eq!(image_file_name("a:b?", 4, "png"), "a_b__5.png");
        assert_eq!(image_file_name("  ", 0, "jpg"), "image_1.jpg");
        assert_eq!(image_file_name("..", 0, "jpg"), "image_1.jpg");
        assert_eq!(image_file_name("blue dragon", 0, "jpg"), "blue dragon_1.jpg");
    }

    #[tokio::test]
    async fn test_download_writes_file_and_creates_directory() {
        let mut server = mockito::Server::new_async().await;
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        let mock = server
            .mock("GET", "/dragon.jpg")
            .with_status(200)
            .with_header("content-type", "image/jpeg")
            .with_body(&body)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir
            .path()
            .join("nested/downloaded_images")
            .join(image_file_name("dragons", 2, "jpg"));
        let url = format!("{}/dragon.jpg", server.url());

        let outcome = downloader().download(2, &url, &path).await;

        mock.assert_async().await;
        assert_eq!(
            outcome,
            DownloadOutcome::Saved {
                index: 2,
                bytes_written: body.len() as u64,
                path: path.clone(),
            }
        );
        assert!(path.ends_with("dragons_3.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), body);
    }

    #[tokio::test]
    async fn test_download_overwrites_existing_file() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/new.jpg")
            .with_status(200)
            .with_body("new")
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dragons_1.jpg");
        std::fs::write(&path, b"stale content from a previous run").unwrap();

        let outcome = downloader()
            .download(0, &format!("{}/new.jpg", server.url()), &path)
            .await;

        assert!(outcome.is_saved());
        assert_eq!(std::fs::read(&path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_non_success_status_is_item_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.jpg")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dragons_1.jpg");

        let outcome = downloader()
            .download(0, &format!("{}/missing.jpg", server.url()), &path)
            .await;

        assert_eq!(
            outcome,
            DownloadOutcome::Failed {
                index: 0,
                reason: ItemFailure::NonSuccessStatus { status: 404 },
            }
        );
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_transport_error_is_item_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dragons_1.jpg");

        let outcome = downloader()
            .download(7, "http://127.0.0.1:1/unreachable.jpg", &path)
            .await;

        assert_eq!(outcome.index(), 7);
        assert!(matches!(
            outcome,
            DownloadOutcome::Failed {
                reason: ItemFailure::Transport(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_item_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dragons_1.jpg");

        let outcome = downloader()
            .download(0, "data:image/jpeg;base64,AAAA", &path)
            .await;

        assert!(!outcome.is_saved());
    }
}
