//! 1回分の実行（抽出 → ダウンロード）

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::downloader::{image_file_name, DownloadOutcome, Downloader};
use crate::error::ScraperError;
use crate::pipeline::{self, ExtractionResult, SearchQuery, Timeouts};
use crate::provider::{Provider, ProviderProfile};
use crate::traits::BrowserSession;

/// 実行結果
///
/// `downloads` は抽出に成功したインデックスの分だけ、抽出と同じ順で並ぶ。
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub provider: Provider,
    pub query: String,
    pub requested: usize,
    pub thumbnails_found: usize,
    pub extractions: Vec<ExtractionResult>,
    pub downloads: Vec<DownloadOutcome>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl ScrapeReport {
    pub fn downloaded(&self) -> usize {
        self.downloads.iter().filter(|d| d.is_saved()).count()
    }

    pub fn saved_paths(&self) -> Vec<&PathBuf> {
        self.downloads
            .iter()
            .filter_map(|d| match d {
                DownloadOutcome::Saved { path, .. } => Some(path),
                DownloadOutcome::Failed { .. } => None,
            })
            .collect()
    }

    /// 抽出・ダウンロードのどちらかで失敗した件数
    pub fn failed(&self) -> usize {
        self.extractions.len() - self.downloaded()
    }
}

pub struct ImageScraper {
    config: ScraperConfig,
    profile: ProviderProfile,
    downloader: Downloader,
}

impl ImageScraper {
    pub fn new(config: ScraperConfig) -> Result<Self, ScraperError> {
        let downloader = Downloader::new(&config.user_agent)?;
        Ok(Self::with_downloader(config, downloader))
    }

    pub fn with_downloader(config: ScraperConfig, downloader: Downloader) -> Self {
        let profile = config.provider.profile();
        Self {
            config,
            profile,
            downloader,
        }
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    /// 検索ページから画像を取得して保存する
    ///
    /// サムネイルが1件も出ない場合のみエラー。それ以外の失敗はレポートに記録して続行する。
    pub async fn run<S: BrowserSession>(&self, session: &S) -> Result<ScrapeReport, ScraperError> {
        let started_at = Utc::now();
        let query = SearchQuery::new(self.config.query.clone(), self.config.count);
        let timeouts = Timeouts {
            page_load: self.config.page_load_timeout,
            reveal: self.config.reveal_timeout,
        };

        let mut extraction = pipeline::extract(session, &self.profile, &query, timeouts).await?;
        let thumbnails_found = extraction.found();
        if extraction.len() < query.count {
            warn!(
                "Only {} of {} requested images are available",
                extraction.len(),
                query.count
            );
        }

        tokio::fs::create_dir_all(&self.config.output_dir).await?;

        let mut extractions = Vec::with_capacity(extraction.len());
        let mut downloads = Vec::new();

        while let Some(result) = extraction.next().await {
            match &result {
                ExtractionResult::Extracted { index, url } => {
                    let outcome = self.save(*index, url).await;
                    downloads.push(outcome);
                }
                ExtractionResult::Failed { index, reason } => {
                    warn!("Failed to download image {}: {}", index + 1, reason);
                }
            }
            extractions.push(result);
        }

        let report = ScrapeReport {
            provider: self.config.provider,
            query: self.config.query.clone(),
            requested: self.config.count,
            thumbnails_found,
            extractions,
            downloads,
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "{}/{} images downloaded ({} failed)",
            report.downloaded(),
            report.requested,
            report.failed()
        );
        Ok(report)
    }

    async fn save(&self, index: usize, url: &str) -> DownloadOutcome {
        let file_name = image_file_name(&self.config.query, index, &self.config.file_extension);
        let path = self.config.output_dir.join(file_name);

        let outcome = self.downloader.download(index, url, &path).await;
        match &outcome {
            DownloadOutcome::Saved { bytes_written, .. } => {
                info!(
                    "Image {} downloaded successfully ({} bytes)",
                    index + 1,
                    bytes_written
                );
            }
            DownloadOutcome::Failed { reason, .. } => {
                warn!("Failed to download image {}: {}", index + 1, reason);
            }
        }
        outcome
    }
}
