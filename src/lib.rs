//! 画像検索スクレイパーライブラリ
//!
//! - ブラウザで画像検索ページ（Google / Yandex）を開く
//! - サムネイルごとにフル画像を表示させてURLを取得
//! - 取得したURLから画像をダウンロードして保存
//!
//! 1件の失敗はその画像だけの結果として記録され、残りの処理は続行する。
//!
//! # 使用例
//!
//! ```rust,ignore
//! use image_scraper::{Provider, ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new(Provider::Google, "dragons")
//!         .with_count(20)
//!         .with_output_dir("./downloaded_images")
//!         .with_headless(false);
//!
//!     let report = service.call(request).await.unwrap();
//!     println!("downloaded: {}/{}", report.downloaded(), report.requested);
//! }
//! ```
//!
//! # ブラウザを自前で管理する場合
//!
//! ```rust,ignore
//! use image_scraper::{BrowserSession, ChromeSession, ImageScraper, Provider, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new(Provider::Yandex, "dragons", 10);
//!     let mut session = ChromeSession::launch(&config).await.unwrap();
//!
//!     let scraper = ImageScraper::new(config).unwrap();
//!     let result = scraper.run(&session).await;
//!     session.close().await.unwrap();
//!
//!     for path in result.unwrap().saved_paths() {
//!         println!("{:?}", path);
//!     }
//! }
//! ```

pub mod chrome;
pub mod config;
pub mod downloader;
pub mod error;
pub mod pipeline;
pub mod provider;
pub mod scraper;
pub mod service;
pub mod traits;

#[cfg(test)]
mod mock_session;

// 主要な型をリエクスポート
pub use chrome::ChromeSession;
pub use config::ScraperConfig;
pub use downloader::{image_file_name, DownloadOutcome, Downloader};
pub use error::{ItemFailure, ScraperError};
pub use pipeline::{extract, Extraction, ExtractionResult, SearchQuery, Timeouts};
pub use provider::{Locator, Provider, ProviderProfile, RevealInteraction};
pub use scraper::{ImageScraper, ScrapeReport};
pub use service::{ScrapeRequest, ScraperService};
pub use traits::{BrowserSession, Condition};
