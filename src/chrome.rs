//! chromiumoxide による [`BrowserSession`] 実装

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::provider::Locator;
use crate::traits::{BrowserSession, Condition};

const VISIBLE_FN: &str = r#"
    function() {
        const style = window.getComputedStyle(this);
        const rect = this.getBoundingClientRect();
        return style.display !== 'none' &&
               style.visibility !== 'hidden' &&
               style.opacity !== '0' &&
               rect.width > 0 && rect.height > 0;
    }
"#;

const INTERACTABLE_FN: &str = r#"
    function() {
        const style = window.getComputedStyle(this);
        const rect = this.getBoundingClientRect();
        return this.isConnected &&
               !this.disabled &&
               style.display !== 'none' &&
               style.visibility !== 'hidden' &&
               style.pointerEvents !== 'none' &&
               rect.width > 0 && rect.height > 0;
    }
"#;

/// ヘッドレス時の起動オプション（--headless と --no-sandbox はビルダー側で付与）
const HEADLESS_ARGS: [&str; 4] = [
    "--disable-gpu",
    "--disable-web-security",
    "--allow-running-insecure-content",
    "--allow-cross-origin-auth-prompt",
];

pub struct ChromeSession {
    browser: Option<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    poll_interval: Duration,
    debug: bool,
}

impl ChromeSession {
    /// ブラウザを起動して空のページを開く
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        info!("Initializing browser (headless: {})...", config.headless);

        let mut builder = BrowserConfig::builder()
            .window_size(1280, 800)
            .request_timeout(Duration::from_secs(60));

        if let Some(path) = config.resolve_chrome_executable() {
            builder = builder.chrome_executable(path);
        }

        if config.headless {
            builder = builder.no_sandbox();
            for arg in HEADLESS_ARGS {
                builder = builder.arg(arg);
            }
        } else {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler.abort();
                return Err(ScraperError::BrowserInit(e.to_string()));
            }
        };

        info!("Browser initialized successfully");
        Ok(Self {
            browser: Some(browser),
            page,
            handler,
            poll_interval: config.poll_interval,
            debug: !config.headless,
        })
    }

    async fn call_bool(element: &Element, function: &str) -> Result<bool, ScraperError> {
        let returns = element
            .call_js_fn(function, false)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        debug!("Navigated to {}", url);
        Ok(())
    }

    async fn execute_script(&self, source: &str) -> Result<(), ScraperError> {
        self.page
            .evaluate(source)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<Element>, ScraperError> {
        let elements = self
            .page
            .find_elements(locator.css)
            .await
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", locator, e)))?;

        if !locator.has_size_filter() {
            return Ok(elements);
        }

        // 上部バーなどの小さいアイコンを除外
        let mut matched = Vec::with_capacity(elements.len());
        for element in elements {
            match element.bounding_box().await {
                Ok(bounds) if locator.accepts_size(bounds.width, bounds.height) => {
                    matched.push(element)
                }
                Ok(_) => {}
                Err(e) => debug!("No bounding box for {}: {}", locator.css, e),
            }
        }
        Ok(matched)
    }

    async fn find(&self, locator: &Locator) -> Result<Option<Element>, ScraperError> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    async fn check(&self, condition: &Condition<'_, Element>) -> Result<bool, ScraperError> {
        match condition {
            Condition::Present(locator) => Ok(!self.find_all(locator).await?.is_empty()),
            Condition::Visible(locator) => {
                for element in self.find_all(locator).await? {
                    if Self::call_bool(&element, VISIBLE_FN).await? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Interactable(element) => Self::call_bool(element, INTERACTABLE_FN).await,
        }
    }

    async fn pointer_move_and_click(&self, element: &Element) -> Result<(), ScraperError> {
        element
            .click()
            .await
            .map_err(|e| ScraperError::NotInteractable(e.to_string()))?;
        Ok(())
    }

    async fn pointer_move_only(&self, element: &Element) -> Result<(), ScraperError> {
        element
            .hover()
            .await
            .map_err(|e| ScraperError::NotInteractable(e.to_string()))?;
        Ok(())
    }

    async fn get_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        element
            .attribute(name)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        info!("Closing browser...");

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                debug!("Failed to close browser: {}", e);
            }
            if let Err(e) = browser.wait().await {
                debug!("Failed to wait for browser exit: {}", e);
            }
        }
        self.handler.abort();

        info!("Browser closed");
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    async fn debug_snapshot(&self) -> Option<String> {
        if !self.debug {
            return None;
        }
        match self
            .page
            .screenshot(ScreenshotParams::builder().full_page(true).build())
            .await
        {
            Ok(png) => {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(&png);
                Some(format!("data:image/png;base64,{}", encoded))
            }
            Err(e) => {
                debug!("Failed to capture screenshot: {}", e);
                None
            }
        }
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
