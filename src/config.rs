use std::path::PathBuf;
use std::time::Duration;

use crate::provider::Provider;

pub const DEFAULT_QUERY: &str = "dragons";
pub const DEFAULT_COUNT: usize = 20;
pub const DEFAULT_OUTPUT_DIR: &str = "downloaded_images";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub provider: Provider,
    pub query: String,
    pub count: usize,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    /// 最初のサムネイルが出現するまでの待機上限
    pub page_load_timeout: Duration,
    /// reveal 後の詳細要素の待機上限
    pub reveal_timeout: Duration,
    pub poll_interval: Duration,
    pub file_extension: String,
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            provider: Provider::Google,
            query: DEFAULT_QUERY.to_string(),
            count: DEFAULT_COUNT,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            headless: true,
            chrome_executable: None,
            page_load_timeout: Duration::from_secs(10),
            reveal_timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            file_extension: "jpg".to_string(),
            user_agent: concat!("image-scraper/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ScraperConfig {
    pub fn new(provider: Provider, query: impl Into<String>, count: usize) -> Self {
        Self {
            provider,
            query: query.into(),
            count,
            ..Default::default()
        }
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

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    pub fn with_reveal_timeout(mut self, timeout: Duration) -> Self {
        self.reveal_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_file_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = ext.into();
        self
    }

    /// Chrome の実行パス。未指定なら環境変数 CHROME_PATH / CHROMIUM_PATH を見る
    pub fn resolve_chrome_executable(&self) -> Option<PathBuf> {
        self.chrome_executable.clone().or_else(|| {
            std::env::var("CHROME_PATH")
                .or_else(|_| std::env::var("CHROMIUM_PATH"))
                .ok()
                .map(PathBuf::from)
        })
    }
}
