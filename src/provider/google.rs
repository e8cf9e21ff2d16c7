//! Google 画像検索
//!
//! サムネイルをクリックすると右側に詳細パネルが開き、
//! その中の img の src がフル画像のURLになる。

use std::time::Duration;

use super::{
    encode_query, Locator, Provider, ProviderProfile, RevealInteraction,
    DEFAULT_SCROLL_BATCH_SIZE, MIN_THUMBNAIL_SIZE,
};

const SEARCH_URL: &str = "https://www.google.com/search";
const THUMBNAIL_SELECTOR: &str = "img.YQ4gaf";
const DETAIL_IMAGE_SELECTOR: &str = "img.sFlh5c.pT0Scc.iPVvYb";

fn search_url(query: &str) -> String {
    format!("{}?q={}&tbm=isch", SEARCH_URL, encode_query(query))
}

pub(super) fn profile() -> ProviderProfile {
    let detail_image = Locator::css(DETAIL_IMAGE_SELECTOR);
    ProviderProfile {
        provider: Provider::Google,
        url_template: search_url,
        scroll_batch_size: DEFAULT_SCROLL_BATCH_SIZE,
        thumbnail: Locator::css(THUMBNAIL_SELECTOR)
            .with_min_size(MIN_THUMBNAIL_SIZE, MIN_THUMBNAIL_SIZE),
        interactable_timeout: Duration::from_secs(15),
        reveal: RevealInteraction::ClickThenWait,
        reveal_target: detail_image.clone(),
        full_image: detail_image,
        url_attribute: "src",
    }
}
