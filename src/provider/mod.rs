//! 画像検索プロバイダ定義
//!
//! プロバイダごとのページ構造の違い（URL、サムネイルの探し方、
//! フル画像を表示させる操作、URLを読む要素と属性）を [`ProviderProfile`] に閉じ込める。
//! 抽出パイプラインはプロファイルだけを見て動き、どのプロバイダかは意識しない。

mod google;
mod yandex;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::ScraperError;

/// スクロール1回で読み込まれるおおよその画像数
pub const DEFAULT_SCROLL_BATCH_SIZE: usize = 50;

/// 追加読み込みを促すためのスクロール
pub const SCROLL_SCRIPT: &str = "window.scrollBy(0,10000)";

/// アイコン類を除外するためのサムネイル最小サイズ（論理ピクセル）
pub const MIN_THUMBNAIL_SIZE: f64 = 100.0;

/// 対応プロバイダ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Google,
    Yandex,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::Google, Provider::Yandex];

    pub fn name(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Yandex => "yandex",
        }
    }

    /// 起動時に一度だけ作るプロファイル
    pub fn profile(self) -> ProviderProfile {
        match self {
            Self::Google => google::profile(),
            Self::Yandex => yandex::profile(),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Provider {
    type Err = ScraperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == lower)
            .ok_or_else(|| {
                ScraperError::Invocation(format!(
                    "未知の画像検索サイトです: {} (google/yandex)",
                    s
                ))
            })
    }
}

/// 要素の探し方（CSSセレクタ + 描画サイズの下限）
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    pub css: &'static str,
    pub min_width: f64,
    pub min_height: f64,
}

impl Locator {
    pub const fn css(css: &'static str) -> Self {
        Self {
            css,
            min_width: 0.0,
            min_height: 0.0,
        }
    }

    pub const fn with_min_size(self, min_width: f64, min_height: f64) -> Self {
        Self {
            css: self.css,
            min_width,
            min_height,
        }
    }

    pub fn has_size_filter(&self) -> bool {
        self.min_width > 0.0 || self.min_height > 0.0
    }

    pub fn accepts_size(&self, width: f64, height: f64) -> bool {
        width >= self.min_width && height >= self.min_height
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.has_size_filter() {
            write!(
                f,
                "{} (>= {}x{})",
                self.css, self.min_width, self.min_height
            )
        } else {
            f.write_str(self.css)
        }
    }
}

/// サムネイルからフル画像を表示させる操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealInteraction {
    /// ポインタを移動してクリックし、詳細パネルの出現を待つ
    ClickThenWait,
    /// ポインタを移動するだけで、ダウンロードボタンが表示されるのを待つ
    HoverThenWait,
}

/// プロバイダごとの不変な設定
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub provider: Provider,
    pub url_template: fn(&str) -> String,
    pub scroll_batch_size: usize,
    pub thumbnail: Locator,
    /// サムネイルが操作可能になるまでの待機上限
    pub interactable_timeout: Duration,
    pub reveal: RevealInteraction,
    /// reveal 後に出現（Click）または表示（Hover）を待つ要素
    pub reveal_target: Locator,
    /// URLを読み取る要素。reveal_target と同じとは限らない
    pub full_image: Locator,
    pub url_attribute: &'static str,
}

impl ProviderProfile {
    pub fn name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn search_url(&self, query: &str) -> String {
        (self.url_template)(query)
    }

    /// 検索前に実行するスクロール回数 (`requested / scroll_batch_size` の切り捨て)
    ///
    /// 読み込み枚数を保証するものではなく、足りない場合は見つかった分だけ処理する。
    pub fn scroll_count(&self, requested: usize) -> usize {
        if self.scroll_batch_size == 0 {
            return 0;
        }
        requested / self.scroll_batch_size
    }
}

/// クエリ文字列をURLのクエリパラメータ用にエンコード
pub(crate) fn encode_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.as_bytes()).collect()
}
