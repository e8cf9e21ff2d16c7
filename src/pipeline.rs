//! 抽出パイプライン
//!
//! 検索結果ページからフル画像URLを1件ずつ取り出す。
//! ページが読み込めない場合だけ実行全体を失敗させ、それ以降の失敗は
//! 該当インデックスの [`ExtractionResult::Failed`] に閉じ込めて次へ進む。

use std::iter::Enumerate;
use std::time::{Duration, Instant};

use futures::Stream;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{ItemFailure, ScraperError};
use crate::provider::{ProviderProfile, RevealInteraction, SCROLL_SCRIPT};
use crate::traits::{BrowserSession, Condition};

/// 検索語と取得枚数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    pub count: usize,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, count: usize) -> Self {
        Self {
            text: text.into(),
            count,
        }
    }
}

/// パイプラインの待機上限
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub page_load: Duration,
    pub reveal: Duration,
}

/// 1サムネイル分の抽出結果（index は 0 始まり）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExtractionResult {
    Extracted { index: usize, url: String },
    Failed { index: usize, reason: ItemFailure },
}

impl ExtractionResult {
    pub fn index(&self) -> usize {
        match self {
            Self::Extracted { index, .. } | Self::Failed { index, .. } => *index,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Extracted { url, .. } => Some(url),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, Self::Extracted { .. })
    }
}

/// 抽出中のページ
///
/// サムネイルを DOM 順に1件ずつ消費する。各要素はブラウザ操作を伴うため
/// 巻き戻しはできず、やり直すには新しくナビゲーションする必要がある。
pub struct Extraction<'s, S: BrowserSession> {
    session: &'s S,
    profile: &'s ProviderProfile,
    reveal_timeout: Duration,
    thumbnails: Enumerate<std::vec::IntoIter<S::Element>>,
    found: usize,
    selected: usize,
    /// 直前に取得できたURL。詳細パネルの切り替わり待ちに使う
    last_url: Option<String>,
}

/// 検索ページを開き、サムネイルを確定させる
///
/// 最初のサムネイルが `timeouts.page_load` 以内に出現しなければ
/// [`ScraperError::ProviderPageLoadTimeout`] を返す。
pub async fn extract<'s, S: BrowserSession>(
    session: &'s S,
    profile: &'s ProviderProfile,
    query: &SearchQuery,
    timeouts: Timeouts,
) -> Result<Extraction<'s, S>, ScraperError> {
    let url = profile.search_url(&query.text);
    info!("Opening {} search page: {}", profile.name(), url);
    session.navigate(&url).await?;

    let scrolls = profile.scroll_count(query.count);
    debug!("Scrolling {} time(s) to load more images", scrolls);
    for i in 0..scrolls {
        if let Err(e) = session.execute_script(SCROLL_SCRIPT).await {
            warn!("Scroll {}/{} failed: {}", i + 1, scrolls, e);
        }
    }

    if let Err(e) = session
        .wait_until(&Condition::Present(&profile.thumbnail), timeouts.page_load)
        .await
    {
        warn!("No thumbnails appeared on {} page: {}", profile.name(), e);
        if let Some(snapshot) = session.debug_snapshot().await {
            debug!("Page snapshot: {}", snapshot);
        }
        return Err(ScraperError::ProviderPageLoadTimeout {
            provider: profile.name().to_string(),
            timeout: timeouts.page_load,
        });
    }

    let mut thumbnails = session.find_all(&profile.thumbnail).await?;
    let found = thumbnails.len();
    thumbnails.truncate(query.count);
    let selected = thumbnails.len();
    info!(
        "Found {} thumbnails, processing {} (requested {})",
        found, selected, query.count
    );

    Ok(Extraction {
        session,
        profile,
        reveal_timeout: timeouts.reveal,
        thumbnails: thumbnails.into_iter().enumerate(),
        found,
        selected,
        last_url: None,
    })
}

impl<'s, S: BrowserSession> Extraction<'s, S> {
    /// ページ上で見つかったサムネイル数
    pub fn found(&self) -> usize {
        self.found
    }

    /// 処理対象の件数 (`min(requested, found)`)
    pub fn len(&self) -> usize {
        self.selected
    }

    pub fn is_empty(&self) -> bool {
        self.selected == 0
    }

    /// 次のサムネイルを処理する。全件終わったら None
    pub async fn next(&mut self) -> Option<ExtractionResult> {
        let (index, thumbnail) = self.thumbnails.next()?;

        let result = match self.resolve(&thumbnail).await {
            Ok(url) => {
                debug!("Image {} url: {}", index + 1, url);
                self.last_url = Some(url.clone());
                ExtractionResult::Extracted { index, url }
            }
            Err(reason) => {
                debug!("Image {} extraction failed: {}", index + 1, reason);
                ExtractionResult::Failed { index, reason }
            }
        };
        Some(result)
    }

    pub fn into_stream(self) -> impl Stream<Item = ExtractionResult> + 's
    where
        S: 's,
        S::Element: 's,
    {
        futures::stream::unfold(self, |mut extraction| async move {
            let result = extraction.next().await?;
            Some((result, extraction))
        })
    }

    async fn resolve(&self, thumbnail: &S::Element) -> Result<String, ItemFailure> {
        let session = self.session;
        let profile = self.profile;

        session
            .wait_until(
                &Condition::Interactable(thumbnail),
                profile.interactable_timeout,
            )
            .await
            .map_err(|e| match e {
                ScraperError::Timeout(msg) => ItemFailure::ElementNotInteractable(msg),
                other => other.into(),
            })?;

        match profile.reveal {
            RevealInteraction::ClickThenWait => {
                session
                    .pointer_move_and_click(thumbnail)
                    .await
                    .map_err(|e| ItemFailure::ElementNotInteractable(e.to_string()))?;
                session
                    .wait_until(
                        &Condition::Present(&profile.reveal_target),
                        self.reveal_timeout,
                    )
                    .await?;
            }
            RevealInteraction::HoverThenWait => {
                session
                    .pointer_move_only(thumbnail)
                    .await
                    .map_err(|e| ItemFailure::ElementNotInteractable(e.to_string()))?;
                session
                    .wait_until(
                        &Condition::Visible(&profile.reveal_target),
                        self.reveal_timeout,
                    )
                    .await?;
            }
        }

        if profile.full_image != profile.reveal_target {
            session
                .wait_until(&Condition::Present(&profile.full_image), self.reveal_timeout)
                .await?;
        }

        self.read_url().await
    }

    /// フル画像のURLを読む
    ///
    /// 詳細パネルは前のサムネイルの画像を表示したまま残ることがあるので、
    /// 直前の結果と同じURLの間は reveal_timeout まで読み直す。
    async fn read_url(&self) -> Result<String, ItemFailure> {
        let session = self.session;
        let profile = self.profile;
        let start = Instant::now();

        loop {
            let element = session.find(&profile.full_image).await?.ok_or_else(|| {
                ItemFailure::TimeoutWaitingForElement(format!("{} disappeared", profile.full_image))
            })?;

            let url = match session.get_attribute(&element, profile.url_attribute).await? {
                Some(url) if !url.trim().is_empty() => url.trim().to_string(),
                _ => {
                    return Err(ItemFailure::AttributeMissing {
                        attribute: profile.url_attribute.to_string(),
                    })
                }
            };
            if self.last_url.as_deref() != Some(url.as_str()) {
                return Ok(url);
            }

            if start.elapsed() >= self.reveal_timeout {
                return Err(ItemFailure::TimeoutWaitingForElement(format!(
                    "{} still shows the previous image ({:?})",
                    profile.full_image, self.reveal_timeout
                )));
            }
            debug!("Detail panel still shows {}, retrying", url);
            tokio::time::sleep(session.poll_interval()).await;
        }
    }
}
