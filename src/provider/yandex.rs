//! Yandex 画像検索
//!
//! サムネイルにホバーするとダウンロードボタンが表示される。
//! URLはサムネイル自身ではなく、別要素のダウンロードリンクの href から読む。

use std::time::Duration;

use super::{
    encode_query, Locator, Provider, ProviderProfile, RevealInteraction,
    DEFAULT_SCROLL_BATCH_SIZE, MIN_THUMBNAIL_SIZE,
};

const SEARCH_URL: &str = "https://yandex.com/images/search";
const THUMBNAIL_SELECTOR: &str = "img.ContentImage-Image";
const DOWNLOAD_BUTTON_SELECTOR: &str = "a.Button2";
const DOWNLOAD_LINK_SELECTOR: &str = ".SerpPolaroid-Download";

fn search_url(query: &str) -> String {
    format!("{}?text={}", SEARCH_URL, encode_query(query))
}

pub(super) fn profile() -> ProviderProfile {
    ProviderProfile {
        provider: Provider::Yandex,
        url_template: search_url,
        scroll_batch_size: DEFAULT_SCROLL_BATCH_SIZE,
        thumbnail: Locator::css(THUMBNAIL_SELECTOR)
            .with_min_size(MIN_THUMBNAIL_SIZE, MIN_THUMBNAIL_SIZE),
        interactable_timeout: Duration::from_secs(20),
        reveal: RevealInteraction::HoverThenWait,
        reveal_target: Locator::css(DOWNLOAD_BUTTON_SELECTOR),
        full_image: Locator::css(DOWNLOAD_LINK_SELECTOR),
        url_attribute: "href",
    }
}
