use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::error::ScraperError;
use crate::provider::Locator;

/// 待機条件
#[derive(Debug)]
pub enum Condition<'a, E> {
    /// セレクタに一致する要素が1つ以上存在する
    Present(&'a Locator),
    /// セレクタに一致する要素のいずれかが表示されている
    Visible(&'a Locator),
    /// 要素が表示されていて操作可能
    Interactable(&'a E),
}

impl<E> Condition<'_, E> {
    fn describe(&self) -> String {
        match self {
            Self::Present(locator) => format!("presence of {}", locator),
            Self::Visible(locator) => format!("visibility of {}", locator),
            Self::Interactable(_) => "element to be interactable".to_string(),
        }
    }
}

/// 抽出パイプラインが必要とするブラウザ操作
///
/// 実ブラウザ（[`crate::chrome::ChromeSession`]）でもテスト用の実装でも、
/// この契約だけを満たせばパイプラインを動かせる。
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// 要素ハンドル。再ナビゲーション後は無効
    type Element: Send + Sync;

    /// ページ遷移
    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// スクリプト実行（戻り値は使わない）
    async fn execute_script(&self, source: &str) -> Result<(), ScraperError>;

    /// 一致する要素をDOM順で全て取得
    async fn find_all(&self, locator: &Locator) -> Result<Vec<Self::Element>, ScraperError>;

    /// 最初に一致した要素を取得
    async fn find(&self, locator: &Locator) -> Result<Option<Self::Element>, ScraperError>;

    /// 条件を1回だけ評価
    async fn check(&self, condition: &Condition<'_, Self::Element>) -> Result<bool, ScraperError>;

    /// ポインタを要素に移動してクリック
    async fn pointer_move_and_click(&self, element: &Self::Element) -> Result<(), ScraperError>;

    /// ポインタを要素に移動するだけ（ホバー）
    async fn pointer_move_only(&self, element: &Self::Element) -> Result<(), ScraperError>;

    /// 属性値を取得。存在しない場合は None
    async fn get_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, ScraperError>;

    /// リソース解放
    async fn close(&mut self) -> Result<(), ScraperError>;

    /// 条件を満たすまでの待機間隔
    fn poll_interval(&self) -> Duration {
        Duration::from_millis(250)
    }

    /// 条件が真になるまでポーリングする
    ///
    /// タイムアウトした場合は [`ScraperError::Timeout`] を返す。
    /// 評価中のエラーは条件未成立として扱い、待機を続ける。
    /// 1回の評価も残り時間で打ち切るので、応答しないブラウザでも期限を超えない。
    async fn wait_until(
        &self,
        condition: &Condition<'_, Self::Element>,
        timeout: Duration,
    ) -> Result<(), ScraperError> {
        let start = Instant::now();
        let interval = self.poll_interval();

        loop {
            let remaining = timeout.saturating_sub(start.elapsed());
            match tokio::time::timeout(remaining, self.check(condition)).await {
                Ok(Ok(true)) => return Ok(()),
                Ok(Ok(false)) => {}
                Ok(Err(e)) => debug!("Condition check error ({}): {}", condition.describe(), e),
                Err(_) => debug!("Condition check did not answer ({})", condition.describe()),
            }

            if start.elapsed() >= timeout {
                return Err(ScraperError::Timeout(format!(
                    "waiting for {} ({:?})",
                    condition.describe(),
                    timeout
                )));
            }

            tokio::time::sleep(interval).await;
        }
    }

    /// デバッグ用のページスナップショット（data URL）。対応しない実装は None
    async fn debug_snapshot(&self) -> Option<String> {
        None
    }
}
