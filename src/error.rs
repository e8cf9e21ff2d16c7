use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// 実行全体を止めるエラー
#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("要素を操作できません: {0}")]
    NotInteractable(String),

    #[error("検索結果ページの読み込みタイムアウト ({provider}, {timeout:?})")]
    ProviderPageLoadTimeout { provider: String, timeout: Duration },

    #[error("引数エラー: {0}")]
    Invocation(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),
}

impl ScraperError {
    /// 実行を中断すべきエラーか（1件単位に閉じ込められないもの）
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::BrowserInit(_) | Self::ProviderPageLoadTimeout { .. } | Self::Invocation(_)
        )
    }
}

/// 1件分の失敗理由
///
/// 抽出・ダウンロードのどちらの段階でも、この型に変換された時点で
/// その画像だけの失敗として扱われ、後続の処理は継続する。
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ItemFailure {
    #[error("要素の待機がタイムアウトしました: {0}")]
    TimeoutWaitingForElement(String),

    #[error("要素を操作できません: {0}")]
    ElementNotInteractable(String),

    #[error("属性 '{attribute}' が空または存在しません")]
    AttributeMissing { attribute: String },

    #[error("ブラウザ操作エラー: {0}")]
    Browser(String),

    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("HTTPステータス異常: {status}")]
    NonSuccessStatus { status: u16 },

    #[error("ファイル書き込みエラー: {0}")]
    FileIO(String),
}

impl From<ScraperError> for ItemFailure {
    fn from(err: ScraperError) -> Self {
        match err {
            ScraperError::Timeout(msg) => Self::TimeoutWaitingForElement(msg),
            ScraperError::NotInteractable(msg) => Self::ElementNotInteractable(msg),
            ScraperError::Http(e) => Self::Transport(e.to_string()),
            ScraperError::FileIO(e) => Self::FileIO(e.to_string()),
            other => Self::Browser(other.to_string()),
        }
    }
}
