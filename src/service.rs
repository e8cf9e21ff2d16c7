use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::task::{Context, Poll};

use tower::Service;
use tracing::{info, warn};

use crate::chrome::ChromeSession;
use crate::config::{ScraperConfig, DEFAULT_COUNT, DEFAULT_OUTPUT_DIR};
use crate::error::ScraperError;
use crate::provider::Provider;
use crate::scraper::{ImageScraper, ScrapeReport};
use crate::traits::BrowserSession;

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub provider: Provider,
    pub query: String,
    pub count: usize,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
}

impl ScrapeRequest {
    pub fn new(provider: Provider, query: impl Into<String>) -> Self {
        Self {
            provider,
            query: query.into(),
            count: DEFAULT_COUNT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            headless: true,
            chrome_executable: None,
        }
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = path.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_chrome_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_executable = Some(path.into());
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        let config = ScraperConfig::new(req.provider, req.query, req.count)
            .with_output_dir(req.output_dir)
            .with_headless(req.headless);
        match req.chrome_executable {
            Some(path) => config.with_chrome_executable(path),
            None => config,
        }
    }
}

/// tower::Serviceを実装したスクレイパーサービス
///
/// 呼び出しごとにブラウザを起動し、結果に関わらず終了させる。
#[derive(Debug, Clone, Default)]
pub struct ScraperService {}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = ScrapeReport;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!(
            "Scrape request: provider={}, query={:?}, count={}",
            req.provider, req.query, req.count
        );

        Box::pin(async move {
            if req.count == 0 {
                return Err(ScraperError::Invocation(
                    "取得枚数は1以上を指定してください".into(),
                ));
            }

            let config: ScraperConfig = req.into();
            let scraper = ImageScraper::new(config)?;
            let mut session = ChromeSession::launch(scraper.config()).await?;

            let result = scraper.run(&session).await;

            // 致命的エラーの場合もブラウザは必ず閉じる
            if let Err(e) = session.close().await {
                warn!("Failed to close browser session: {}", e);
            }

            result
        })
    }
}
