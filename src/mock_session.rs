//! テスト用のブラウザセッション
//!
//! サムネイルごとに「操作可能か」「reveal 後に詳細要素が出るか」「URLを持つか」を
//! 決めておき、パイプラインからの呼び出しを記録する。

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::provider::{Locator, ProviderProfile};
use crate::traits::{BrowserSession, Condition};

#[derive(Debug, Clone)]
pub(crate) struct MockThumbnail {
    interactable: bool,
    reveals: bool,
    /// reveal_target が存在しても表示されない
    target_hidden: bool,
    /// full_image が reveal_target と別要素のとき、出現しない
    link_missing: bool,
    /// 直前のサムネイルの URL を返し続ける読み取り回数
    stale_reads: usize,
    full_url: Option<String>,
    thumbnail_src: String,
}

impl MockThumbnail {
    pub(crate) fn ok(url: &str) -> Self {
        Self {
            interactable: true,
            reveals: true,
            target_hidden: false,
            link_missing: false,
            stale_reads: 0,
            full_url: Some(url.to_string()),
            thumbnail_src: "data:image/jpeg;base64,AAAA".to_string(),
        }
    }

    pub(crate) fn ok_many(n: usize) -> Vec<Self> {
        (0..n)
            .map(|i| Self::ok(&format!("https://img.example/{}.jpg", i)))
            .collect()
    }

    pub(crate) fn missing_url() -> Self {
        Self {
            full_url: None,
            ..Self::ok("")
        }
    }

    pub(crate) fn with_url(mut self, url: &str) -> Self {
        self.full_url = Some(url.to_string());
        self
    }

    pub(crate) fn never_revealed(mut self) -> Self {
        self.reveals = false;
        self
    }

    pub(crate) fn hidden_target(mut self) -> Self {
        self.target_hidden = true;
        self
    }

    pub(crate) fn without_link(mut self) -> Self {
        self.link_missing = true;
        self
    }

    pub(crate) fn stale_for(mut self, reads: usize) -> Self {
        self.stale_reads = reads;
        self
    }

    pub(crate) fn not_interactable(mut self) -> Self {
        self.interactable = false;
        self
    }

    pub(crate) fn with_thumbnail_src(mut self, src: &str) -> Self {
        self.thumbnail_src = src.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum MockElement {
    Thumbnail(usize),
    Detail(usize),
}

#[derive(Debug, Default)]
struct State {
    navigations: Vec<String>,
    scripts: Vec<String>,
    interactions: Vec<(String, usize)>,
    attribute_reads: Vec<(String, String)>,
    revealed: Option<usize>,
    reads_since_reveal: usize,
    closed: bool,
}

pub(crate) struct MockSession {
    profile: ProviderProfile,
    thumbnails: Vec<MockThumbnail>,
    check_delay: Option<Duration>,
    state: Mutex<State>,
}

impl MockSession {
    pub(crate) fn new(profile: ProviderProfile, thumbnails: Vec<MockThumbnail>) -> Self {
        Self {
            profile,
            thumbnails,
            check_delay: None,
            state: Mutex::new(State::default()),
        }
    }

    /// check() が応答するまでの遅延（応答しないブラウザの代わり）
    pub(crate) fn with_check_delay(mut self, delay: Duration) -> Self {
        self.check_delay = Some(delay);
        self
    }

    pub(crate) fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.state.lock().unwrap().scripts.clone()
    }

    pub(crate) fn interactions(&self) -> Vec<(String, usize)> {
        self.state.lock().unwrap().interactions.clone()
    }

    pub(crate) fn attribute_reads(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().attribute_reads.clone()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// reveal 後の要素の (存在, 表示) 状態
    fn detail_state(&self, locator: &Locator) -> Option<(usize, bool)> {
        let revealed = self.state.lock().unwrap().revealed?;
        let thumb = &self.thumbnails[revealed];
        if !thumb.reveals {
            return None;
        }
        if *locator == self.profile.reveal_target {
            Some((revealed, !thumb.target_hidden))
        } else if *locator == self.profile.full_image {
            (!thumb.link_missing).then_some((revealed, true))
        } else {
            None
        }
    }

    /// 更新が遅れている間は直前のサムネイルの URL を返す
    fn detail_url(&self, i: usize) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        let reads = state.reads_since_reveal;
        state.reads_since_reveal += 1;
        if i > 0 && reads < self.thumbnails[i].stale_reads {
            return self.thumbnails[i - 1].full_url.clone();
        }
        self.thumbnails[i].full_url.clone()
    }

    fn record_interaction(&self, kind: &str, element: &MockElement) -> Result<(), ScraperError> {
        let MockElement::Thumbnail(i) = element else {
            return Err(ScraperError::NotInteractable("not a thumbnail".into()));
        };
        let mut state = self.state.lock().unwrap();
        state.interactions.push((kind.to_string(), *i));
        state.revealed = Some(*i);
        state.reads_since_reveal = 0;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for MockSession {
    type Element = MockElement;

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        state.revealed = None;
        Ok(())
    }

    async fn execute_script(&self, source: &str) -> Result<(), ScraperError> {
        self.state.lock().unwrap().scripts.push(source.to_string());
        Ok(())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<MockElement>, ScraperError> {
        if *locator == self.profile.thumbnail {
            return Ok((0..self.thumbnails.len())
                .map(MockElement::Thumbnail)
                .collect());
        }
        Ok(self
            .detail_state(locator)
            .map(|(i, _)| MockElement::Detail(i))
            .into_iter()
            .collect())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<MockElement>, ScraperError> {
        Ok(self.find_all(locator).await?.into_iter().next())
    }

    async fn check(&self, condition: &Condition<'_, MockElement>) -> Result<bool, ScraperError> {
        if let Some(delay) = self.check_delay {
            tokio::time::sleep(delay).await;
        }
        match condition {
            Condition::Present(locator) => Ok(!self.find_all(locator).await?.is_empty()),
            Condition::Visible(locator) => {
                if *locator == &self.profile.thumbnail {
                    return Ok(!self.thumbnails.is_empty());
                }
                Ok(self.detail_state(locator).is_some_and(|(_, visible)| visible))
            }
            Condition::Interactable(MockElement::Thumbnail(i)) => {
                Ok(self.thumbnails[*i].interactable)
            }
            Condition::Interactable(MockElement::Detail(_)) => Ok(true),
        }
    }

    async fn pointer_move_and_click(&self, element: &MockElement) -> Result<(), ScraperError> {
        self.record_interaction("click", element)
    }

    async fn pointer_move_only(&self, element: &MockElement) -> Result<(), ScraperError> {
        self.record_interaction("hover", element)
    }

    async fn get_attribute(
        &self,
        element: &MockElement,
        name: &str,
    ) -> Result<Option<String>, ScraperError> {
        let (css, value) = match element {
            MockElement::Thumbnail(i) => (
                self.profile.thumbnail.css,
                (name == "src").then(|| self.thumbnails[*i].thumbnail_src.clone()),
            ),
            MockElement::Detail(i) => (
                self.profile.full_image.css,
                if name == self.profile.url_attribute {
                    self.detail_url(*i)
                } else {
                    None
                },
            ),
        };
        self.state
            .lock()
            .unwrap()
            .attribute_reads
            .push((css.to_string(), name.to_string()));
        Ok(value)
    }

    async fn close(&mut self) -> Result<(), ScraperError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(5)
    }
}
